//! kimchigold: tracks the gold "kimchi premium" (domestic Korean gold price
//! over the converted international price) and backtests trading it.
//!
//! Hexagonal architecture: domain logic in [`domain`], port traits in [`ports`],
//! concrete implementations in [`adapters`].

pub mod domain;
pub mod ports;
pub mod adapters;
pub mod cli;
pub mod logging;
