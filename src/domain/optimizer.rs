//! Symmetric threshold search.
//!
//! For every `t` in `min..=max` by `step`, backtest the pair `(-t, +t)` and
//! rank by total return percent, then trade count, then smaller `t`.

use chrono::NaiveDate;

use super::backtest::{
    run_backtest, BacktestConfig, BacktestResult, DEFAULT_INITIAL_INVESTMENT, DEFAULT_REENTRY_BAND,
};
use super::error::KimchiError;
use super::price_record::PriceRecord;

pub const DEFAULT_MIN_THRESHOLD: f64 = 0.5;
pub const DEFAULT_MAX_THRESHOLD: f64 = 5.0;
pub const DEFAULT_STEP: f64 = 0.5;

/// Largest number of thresholds a single search may test.
pub const MAX_GRID_POINTS: usize = 10_000;

/// Grid points are rounded to this precision.
const GRID_PRECISION: f64 = 1e9;

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizerConfig {
    pub start_date: NaiveDate,
    pub min_threshold: f64,
    pub max_threshold: f64,
    pub step: f64,
    pub initial_investment: f64,
    pub reentry_band: f64,
    pub force_initial_entry: bool,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl OptimizerConfig {
    pub fn new(start_date: NaiveDate) -> Self {
        OptimizerConfig {
            start_date,
            min_threshold: DEFAULT_MIN_THRESHOLD,
            max_threshold: DEFAULT_MAX_THRESHOLD,
            step: DEFAULT_STEP,
            initial_investment: DEFAULT_INITIAL_INVESTMENT,
            reentry_band: DEFAULT_REENTRY_BAND,
            force_initial_entry: true,
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }

    fn backtest_config(&self, threshold: f64) -> BacktestConfig {
        BacktestConfig {
            start_date: self.start_date,
            buy_threshold: -threshold,
            sell_threshold: threshold,
            initial_investment: self.initial_investment,
            reentry_band: self.reentry_band,
            force_initial_entry: self.force_initial_entry,
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OptimizationEntry {
    pub threshold: f64,
    pub result: BacktestResult,
}

impl OptimizationEntry {
    pub fn buy_threshold(&self) -> f64 {
        -self.threshold
    }

    pub fn sell_threshold(&self) -> f64 {
        self.threshold
    }
}

/// Inclusive grid `min, min + step, ..., <= max`.
pub fn threshold_grid(min: f64, max: f64, step: f64) -> Result<Vec<f64>, KimchiError> {
    if !(step > 0.0) || !step.is_finite() {
        return Err(KimchiError::configuration("threshold step must be positive"));
    }
    if !(min > 0.0) || !max.is_finite() {
        return Err(KimchiError::configuration(
            "minimum threshold must be positive",
        ));
    }
    if max < min {
        return Err(KimchiError::configuration(format!(
            "maximum threshold ({max}) is below minimum threshold ({min})"
        )));
    }

    let intervals = ((max - min) / step + 1e-9).floor();
    if intervals >= MAX_GRID_POINTS as f64 {
        return Err(KimchiError::configuration(format!(
            "threshold grid {min}..={max} by {step} exceeds {MAX_GRID_POINTS} points"
        )));
    }
    let count = intervals as usize + 1;
    Ok((0..count)
        .map(|i| ((min + i as f64 * step) * GRID_PRECISION).round() / GRID_PRECISION)
        .collect())
}

pub fn search(
    series: &[PriceRecord],
    config: &OptimizerConfig,
) -> Result<Vec<OptimizationEntry>, KimchiError> {
    let grid = threshold_grid(config.min_threshold, config.max_threshold, config.step)?;
    tracing::info!(
        "testing {} thresholds from ±{}% to ±{}% (step {}%)",
        grid.len(),
        config.min_threshold,
        config.max_threshold,
        config.step
    );

    let mut entries = Vec::with_capacity(grid.len());
    for threshold in grid {
        let result = run_backtest(series, &config.backtest_config(threshold))?;
        tracing::debug!(
            "±{:.2}%: return {:.2}%, {} trades",
            threshold,
            result.total_return_percent,
            result.trade_count
        );
        entries.push(OptimizationEntry { threshold, result });
    }

    rank(&mut entries);
    Ok(entries)
}

fn rank(entries: &mut [OptimizationEntry]) {
    entries.sort_by(|a, b| {
        b.result
            .total_return_percent
            .total_cmp(&a.result.total_return_percent)
            .then_with(|| b.result.trade_count.cmp(&a.result.trade_count))
            .then_with(|| a.threshold.abs().total_cmp(&b.threshold.abs()))
    });
}
