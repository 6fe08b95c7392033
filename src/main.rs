use clap::Parser;
use kimchigold::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
