//! Core domain types and logic.

pub mod price_record;
pub mod outlier;
pub mod portfolio;
pub mod execution;
pub mod backtest;
pub mod optimizer;
pub mod metrics;
pub mod config_validation;
pub mod error;
