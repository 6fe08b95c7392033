//! Tracing subscriber setup.
//!
//! Logs go to stderr so stdout stays clean for results. `RUST_LOG` overrides
//! the level chosen from the verbosity flag.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

pub fn level_for(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "kimchigold=warn",
        1 => "kimchigold=info",
        _ => "kimchigold=debug",
    }
}

pub fn init_tracing(verbosity: u8) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbosity)));

    // A second init (tests, embedding) keeps the first subscriber.
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(false))
        .with(filter)
        .try_init();
}
