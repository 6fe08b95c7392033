//! Configuration validation.
//!
//! Checks the values present in a config file before any command runs.
//! Absent keys are fine; they fall back to defaults.

use crate::domain::error::KimchiError;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_config(config: &dyn ConfigPort) -> Result<(), KimchiError> {
    validate_outlier_config(config)?;
    validate_backtest_config(config)?;
    validate_optimizer_config(config)?;
    Ok(())
}

pub fn validate_outlier_config(config: &dyn ConfigPort) -> Result<(), KimchiError> {
    if let Some(raw) = config.get_string("outlier", "window_days") {
        match raw.trim().parse::<i64>() {
            Ok(days) if days > 0 => {}
            _ => {
                return Err(invalid(
                    "outlier",
                    "window_days",
                    "window_days must be a positive integer",
                ));
            }
        }
    }
    if let Some(multiplier) = parse_double(config, "outlier", "multiplier")? {
        if multiplier < 0.0 {
            return Err(invalid(
                "outlier",
                "multiplier",
                "multiplier must be a non-negative number",
            ));
        }
    }
    Ok(())
}

pub fn validate_backtest_config(config: &dyn ConfigPort) -> Result<(), KimchiError> {
    parse_date(config, "backtest", "start_date")?;

    let buy = parse_double(config, "backtest", "buy_threshold")?;
    let sell = parse_double(config, "backtest", "sell_threshold")?;
    if let (Some(buy), Some(sell)) = (buy, sell) {
        if buy >= sell {
            return Err(invalid(
                "backtest",
                "buy_threshold",
                "buy_threshold must be below sell_threshold",
            ));
        }
    }

    if let Some(value) = parse_double(config, "backtest", "initial_investment")? {
        if value <= 0.0 {
            return Err(invalid(
                "backtest",
                "initial_investment",
                "initial_investment must be positive",
            ));
        }
    }
    for key in ["reentry_band", "commission_pct", "slippage_pct"] {
        if let Some(value) = parse_double(config, "backtest", key)? {
            if value < 0.0 {
                return Err(invalid("backtest", key, &format!("{key} must be non-negative")));
            }
        }
    }
    if let Some(raw) = config.get_string("backtest", "force_initial_entry") {
        let known = ["true", "yes", "1", "false", "no", "0"];
        if !known.contains(&raw.trim().to_lowercase().as_str()) {
            return Err(invalid(
                "backtest",
                "force_initial_entry",
                "force_initial_entry must be a boolean",
            ));
        }
    }
    Ok(())
}

pub fn validate_optimizer_config(config: &dyn ConfigPort) -> Result<(), KimchiError> {
    let min = parse_double(config, "optimizer", "min_threshold")?;
    let max = parse_double(config, "optimizer", "max_threshold")?;
    let step = parse_double(config, "optimizer", "step")?;

    if let Some(min) = min {
        if min <= 0.0 {
            return Err(invalid("optimizer", "min_threshold", "min_threshold must be positive"));
        }
    }
    if let (Some(min), Some(max)) = (min, max) {
        if max < min {
            return Err(invalid(
                "optimizer",
                "max_threshold",
                "max_threshold must not be below min_threshold",
            ));
        }
    }
    if let Some(step) = step {
        if step <= 0.0 {
            return Err(invalid("optimizer", "step", "step must be positive"));
        }
    }
    Ok(())
}

fn invalid(section: &str, key: &str, reason: &str) -> KimchiError {
    KimchiError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_double(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<f64>, KimchiError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(Some(v)),
            _ => Err(invalid(section, key, &format!("{key} must be a number"))),
        },
    }
}

fn parse_date(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
) -> Result<Option<NaiveDate>, KimchiError> {
    match config.get_string(section, key) {
        None => Ok(None),
        Some(raw) => NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d")
            .map(Some)
            .map_err(|_| {
                invalid(
                    section,
                    key,
                    &format!("invalid {key} format, expected YYYY-MM-DD"),
                )
            }),
    }
}
