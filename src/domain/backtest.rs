//! Premium threshold backtest.
//!
//! Replays the price series day by day from the start date. The strategy
//! holds either all cash or all gold:
//!
//! - the first row on/after `start_date` buys unconditionally (when
//!   `force_initial_entry` is set),
//! - gold is sold when `premium_percent >= sell_threshold`,
//! - cash is spent when `premium_percent <= buy_threshold`,
//! - after a sell, buying stays suppressed until the premium is observed
//!   within `[-reentry_band, +reentry_band]` on a later day.

use chrono::NaiveDate;
use serde::Serialize;

use super::error::KimchiError;
use super::execution::{self, ExecutionConfig, Fill};
use super::portfolio::{EquityPoint, Portfolio};
use super::price_record::{validate_series, PriceRecord};

pub const DEFAULT_BUY_THRESHOLD: f64 = -3.0;
pub const DEFAULT_SELL_THRESHOLD: f64 = 3.0;
pub const DEFAULT_INITIAL_INVESTMENT: f64 = 1_000_000.0;
pub const DEFAULT_REENTRY_BAND: f64 = 0.16;

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestConfig {
    pub start_date: NaiveDate,
    pub buy_threshold: f64,
    pub sell_threshold: f64,
    pub initial_investment: f64,
    pub reentry_band: f64,
    pub force_initial_entry: bool,
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

impl BacktestConfig {
    /// Defaults for everything but the start date.
    pub fn new(start_date: NaiveDate) -> Self {
        BacktestConfig {
            start_date,
            buy_threshold: DEFAULT_BUY_THRESHOLD,
            sell_threshold: DEFAULT_SELL_THRESHOLD,
            initial_investment: DEFAULT_INITIAL_INVESTMENT,
            reentry_band: DEFAULT_REENTRY_BAND,
            force_initial_entry: true,
            commission_pct: 0.0,
            slippage_pct: 0.0,
        }
    }

    fn execution(&self) -> ExecutionConfig {
        ExecutionConfig {
            commission_pct: self.commission_pct,
            slippage_pct: self.slippage_pct,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TradeAction {
    Buy,
    Sell,
}

impl std::fmt::Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TradeAction::Buy => write!(f, "BUY"),
            TradeAction::Sell => write!(f, "SELL"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeReason {
    InitialEntry,
    BuyThreshold,
    SellThreshold,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub date: NaiveDate,
    pub action: TradeAction,
    pub reason: TradeReason,
    pub price_per_gram: f64,
    pub quantity_grams: f64,
    pub cash_balance: f64,
    /// Fee charged on this fill, in KRW.
    pub commission: f64,
    pub premium_percent: f64,
    pub realized_pnl: Option<f64>,
}

impl TradeEvent {
    fn from_fill(
        record: &PriceRecord,
        action: TradeAction,
        reason: TradeReason,
        fill: Fill,
    ) -> Self {
        TradeEvent {
            date: record.date,
            action,
            reason,
            price_per_gram: fill.execution_price,
            quantity_grams: fill.quantity,
            cash_balance: fill.cash_after,
            commission: fill.commission,
            premium_percent: record.premium_percent,
            realized_pnl: fill.realized_pnl,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BacktestResult {
    pub initial_investment: f64,
    pub final_portfolio_value: f64,
    pub total_return_amount: f64,
    pub total_return_percent: f64,
    pub trade_count: usize,
    pub average_return_per_trade: f64,
    pub trades: Vec<TradeEvent>,
    pub equity_curve: Vec<EquityPoint>,
}

/// Reject inputs before any simulated trade is recorded.
pub fn validate(series: &[PriceRecord], config: &BacktestConfig) -> Result<(), KimchiError> {
    let (first, last) = match (series.first(), series.last()) {
        (Some(f), Some(l)) => (f, l),
        _ => return Err(KimchiError::configuration("price series is empty")),
    };
    validate_series(series)?;

    if config.buy_threshold.is_nan()
        || config.sell_threshold.is_nan()
        || config.buy_threshold >= config.sell_threshold
    {
        return Err(KimchiError::configuration(format!(
            "buy threshold ({}) must be below sell threshold ({})",
            config.buy_threshold, config.sell_threshold
        )));
    }
    if config.start_date < first.date || config.start_date > last.date {
        return Err(KimchiError::configuration(format!(
            "start date {} is outside the series range {} to {}",
            config.start_date, first.date, last.date
        )));
    }
    if !(config.initial_investment > 0.0) || !config.initial_investment.is_finite() {
        return Err(KimchiError::configuration(
            "initial investment must be positive",
        ));
    }
    if !(config.reentry_band >= 0.0) {
        return Err(KimchiError::configuration(
            "re-entry band must be non-negative",
        ));
    }
    if !(config.commission_pct >= 0.0) || !(config.slippage_pct >= 0.0) {
        return Err(KimchiError::configuration(
            "commission and slippage must be non-negative",
        ));
    }
    Ok(())
}

pub fn run_backtest(
    series: &[PriceRecord],
    config: &BacktestConfig,
) -> Result<BacktestResult, KimchiError> {
    validate(series, config)?;

    let exec = config.execution();
    let mut portfolio = Portfolio::new(config.initial_investment);
    let mut trades = Vec::new();
    let mut reentry_pending = false;

    let start = series.partition_point(|r| r.date < config.start_date);

    for (i, record) in series[start..].iter().enumerate() {
        let price = record.domestic_price_per_gram;
        let premium = record.premium_percent;

        if i == 0 && config.force_initial_entry {
            if let Some(fill) = execution::buy_all(&mut portfolio, price, &exec) {
                trades.push(TradeEvent::from_fill(
                    record,
                    TradeAction::Buy,
                    TradeReason::InitialEntry,
                    fill,
                ));
            }
        } else if portfolio.holds_gold() {
            if premium >= config.sell_threshold {
                if let Some(fill) = execution::sell_all(&mut portfolio, price, &exec) {
                    trades.push(TradeEvent::from_fill(
                        record,
                        TradeAction::Sell,
                        TradeReason::SellThreshold,
                        fill,
                    ));
                    reentry_pending = true;
                }
            }
        } else {
            if reentry_pending && premium.abs() <= config.reentry_band {
                tracing::debug!("{}: premium {:.2}% back in re-entry band", record.date, premium);
                reentry_pending = false;
            }
            if !reentry_pending && premium <= config.buy_threshold {
                if let Some(fill) = execution::buy_all(&mut portfolio, price, &exec) {
                    trades.push(TradeEvent::from_fill(
                        record,
                        TradeAction::Buy,
                        TradeReason::BuyThreshold,
                        fill,
                    ));
                }
            }
        }

        portfolio.record_equity(record.date, price);
    }

    // Validation guarantees a non-empty series.
    let last_price = series
        .last()
        .map(|r| r.domestic_price_per_gram)
        .unwrap_or_default();
    let final_portfolio_value = portfolio.total_value(last_price);
    let total_return_amount = final_portfolio_value - config.initial_investment;
    let total_return_percent = total_return_amount / config.initial_investment * 100.0;
    let trade_count = trades.len();
    // A buy/sell pair counts as one trade.
    let average_return_per_trade = if trade_count > 0 {
        total_return_amount / (trade_count as f64 / 2.0)
    } else {
        0.0
    };

    tracing::debug!(
        "backtest {:+.2}/{:+.2}: {} trades, return {:.2}%",
        config.buy_threshold,
        config.sell_threshold,
        trade_count,
        total_return_percent
    );

    Ok(BacktestResult {
        initial_investment: config.initial_investment,
        final_portfolio_value,
        total_return_amount,
        total_return_percent,
        trade_count,
        average_return_per_trade,
        trades,
        equity_curve: portfolio.equity_curve,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// One row per day from 2024-01-01, as (domestic price, premium %).
    fn make_series(rows: &[(f64, f64)]) -> Vec<PriceRecord> {
        let start = date(2024, 1, 1);
        rows.iter()
            .enumerate()
            .map(|(i, &(price, premium))| PriceRecord {
                date: start + Duration::days(i as i64),
                domestic_price_per_gram: price,
                international_price_usd_per_oz: 2_000.0,
                usd_krw_rate: 1_300.0,
                international_price_per_gram_krw: price / (1.0 + premium / 100.0),
                premium_amount: price - price / (1.0 + premium / 100.0),
                premium_percent: premium,
            })
            .collect()
    }

    fn config(buy: f64, sell: f64) -> BacktestConfig {
        BacktestConfig {
            buy_threshold: buy,
            sell_threshold: sell,
            ..BacktestConfig::new(date(2024, 1, 1))
        }
    }

    #[test]
    fn default_config() {
        let c = BacktestConfig::new(date(2024, 1, 1));
        assert_eq!(c.buy_threshold, -3.0);
        assert_eq!(c.sell_threshold, 3.0);
        assert_eq!(c.initial_investment, 1_000_000.0);
        assert_eq!(c.reentry_band, 0.16);
        assert!(c.force_initial_entry);
        assert_eq!(c.commission_pct, 0.0);
        assert_eq!(c.slippage_pct, 0.0);
    }

    #[test]
    fn forced_entry_then_sell() {
        let series = make_series(&[(86_400.0, 0.27), (90_000.0, 1.0), (104_769.52, 6.08)]);
        let result = run_backtest(&series, &config(-3.0, 3.0)).unwrap();

        assert_eq!(result.trade_count, 2);
        let buy = &result.trades[0];
        assert_eq!(buy.action, TradeAction::Buy);
        assert_eq!(buy.reason, TradeReason::InitialEntry);
        assert_eq!(buy.date, date(2024, 1, 1));
        assert_relative_eq!(buy.quantity_grams, 1_000_000.0 / 86_400.0);
        assert_eq!(buy.cash_balance, 0.0);

        let sell = &result.trades[1];
        assert_eq!(sell.action, TradeAction::Sell);
        assert_eq!(sell.date, date(2024, 1, 3));
        let expected = 1_000_000.0 / 86_400.0 * 104_769.52;
        assert_relative_eq!(sell.cash_balance, expected, max_relative = 1e-12);
        assert_relative_eq!(result.final_portfolio_value, expected, max_relative = 1e-12);
        assert!(sell.realized_pnl.unwrap() > 200_000.0);
    }

    #[test]
    fn unrealized_position_is_marked_at_last_price() {
        let series = make_series(&[(100_000.0, 0.1), (105_000.0, 1.0), (110_000.0, 2.0)]);
        let result = run_backtest(&series, &config(-3.0, 3.0)).unwrap();

        assert_eq!(result.trade_count, 1);
        assert_relative_eq!(result.final_portfolio_value, 1_100_000.0, max_relative = 1e-12);
        assert_relative_eq!(result.total_return_amount, 100_000.0, epsilon = 1e-6);
        assert_relative_eq!(result.total_return_percent, 10.0, max_relative = 1e-9);
        // One open buy counts as half a round trip.
        assert_relative_eq!(result.average_return_per_trade, 200_000.0, max_relative = 1e-9);
    }

    #[test]
    fn sell_boundary_is_inclusive() {
        let series = make_series(&[(100.0, 0.0), (100.0, 3.0)]);
        let result = run_backtest(&series, &config(-3.0, 3.0)).unwrap();
        assert_eq!(result.trades.last().unwrap().action, TradeAction::Sell);

        let series = make_series(&[(100.0, 0.0), (100.0, 2.99)]);
        let result = run_backtest(&series, &config(-3.0, 3.0)).unwrap();
        assert_eq!(result.trade_count, 1);
    }

    #[test]
    fn buy_boundary_is_inclusive() {
        // sell at day 2, re-enable at day 3 (in band), buy at day 4 at exactly -0.5
        let series = make_series(&[(100.0, 0.0), (110.0, 1.0), (105.0, 0.1), (90.0, -0.5)]);
        let result = run_backtest(&series, &config(-0.5, 0.5)).unwrap();

        let actions: Vec<_> = result.trades.iter().map(|t| t.action).collect();
        assert_eq!(
            actions,
            vec![TradeAction::Buy, TradeAction::Sell, TradeAction::Buy]
        );
        assert_eq!(result.trades[2].reason, TradeReason::BuyThreshold);
        assert_eq!(result.trades[2].date, date(2024, 1, 4));
    }

    #[test]
    fn reentry_suppressed_until_band_seen() {
        // After the sell the premium jumps straight from +4 to -5 without
        // passing through the band, so no buy may happen.
        let series = make_series(&[
            (100.0, 0.0),
            (110.0, 4.0),
            (95.0, -5.0),
            (94.0, -6.0),
            (96.0, -4.0),
        ]);
        let result = run_backtest(&series, &config(-3.0, 3.0)).unwrap();

        assert_eq!(result.trade_count, 2);
        assert_eq!(result.trades[1].action, TradeAction::Sell);
        assert_relative_eq!(result.final_portfolio_value, 1_100_000.0, max_relative = 1e-12);
    }

    #[test]
    fn band_reenables_but_does_not_buy() {
        let series = make_series(&[
            (100.0, 0.0),
            (110.0, 4.0),
            (100.0, 0.05),
            (100.0, 0.5),
            (90.0, -3.5),
        ]);
        let result = run_backtest(&series, &config(-3.0, 3.0)).unwrap();

        assert_eq!(result.trade_count, 3);
        let rebuy = &result.trades[2];
        assert_eq!(rebuy.date, date(2024, 1, 5));
        assert_eq!(rebuy.reason, TradeReason::BuyThreshold);
    }

    #[test]
    fn band_and_buy_on_same_day() {
        // Buy threshold inside the band: the day that clears re-entry also buys.
        let series = make_series(&[(100.0, 0.0), (110.0, 1.0), (100.0, -0.15)]);
        let result = run_backtest(&series, &config(-0.1, 0.5)).unwrap();

        assert_eq!(result.trade_count, 3);
        assert_eq!(result.trades[2].date, date(2024, 1, 3));
    }

    #[test]
    fn configurable_reentry_band() {
        let series = make_series(&[(100.0, 0.0), (110.0, 4.0), (100.0, 1.0), (90.0, -3.5)]);

        let narrow = run_backtest(&series, &config(-3.0, 3.0)).unwrap();
        assert_eq!(narrow.trade_count, 2);

        let wide = run_backtest(
            &series,
            &BacktestConfig {
                reentry_band: 1.0,
                ..config(-3.0, 3.0)
            },
        )
        .unwrap();
        assert_eq!(wide.trade_count, 3);
    }

    #[test]
    fn without_forced_entry_waits_for_threshold() {
        let series = make_series(&[(100.0, 0.5), (100.0, -1.0), (95.0, -3.2), (105.0, 3.1)]);
        let result = run_backtest(
            &series,
            &BacktestConfig {
                force_initial_entry: false,
                ..config(-3.0, 3.0)
            },
        )
        .unwrap();

        assert_eq!(result.trade_count, 2);
        assert_eq!(result.trades[0].date, date(2024, 1, 3));
        assert_eq!(result.trades[0].reason, TradeReason::BuyThreshold);
    }

    #[test]
    fn no_trades_keeps_cash() {
        let series = make_series(&[(100.0, 0.5), (100.0, 1.0)]);
        let result = run_backtest(
            &series,
            &BacktestConfig {
                force_initial_entry: false,
                ..config(-3.0, 3.0)
            },
        )
        .unwrap();

        assert_eq!(result.trade_count, 0);
        assert_eq!(result.final_portfolio_value, 1_000_000.0);
        assert_eq!(result.average_return_per_trade, 0.0);
    }

    #[test]
    fn start_date_skips_earlier_rows() {
        let series = make_series(&[(100.0, 5.0), (100.0, 5.0), (120.0, 0.0), (130.0, 4.0)]);
        let result = run_backtest(
            &series,
            &BacktestConfig {
                start_date: date(2024, 1, 3),
                ..config(-3.0, 3.0)
            },
        )
        .unwrap();

        assert_eq!(result.trades[0].date, date(2024, 1, 3));
        assert_eq!(result.equity_curve.len(), 2);
    }

    #[test]
    fn start_date_in_gap_uses_next_row() {
        let mut series = make_series(&[(100.0, 0.0), (110.0, 0.0)]);
        series[1].date = date(2024, 1, 10);
        let result = run_backtest(
            &series,
            &BacktestConfig {
                start_date: date(2024, 1, 5),
                ..config(-3.0, 3.0)
            },
        )
        .unwrap();
        assert_eq!(result.trades[0].date, date(2024, 1, 10));
    }

    #[test]
    fn costs_reduce_return() {
        let series = make_series(&[(100_000.0, 0.0), (110_000.0, 4.0)]);
        let free = run_backtest(&series, &config(-3.0, 3.0)).unwrap();
        let costly = run_backtest(
            &series,
            &BacktestConfig {
                commission_pct: 0.16,
                slippage_pct: 0.05,
                ..config(-3.0, 3.0)
            },
        )
        .unwrap();

        assert!(costly.final_portfolio_value < free.final_portfolio_value);
        assert!(costly.trades[0].price_per_gram > 100_000.0);
    }

    #[test]
    fn trade_events_carry_commission() {
        let series = make_series(&[(100_000.0, 0.0), (110_000.0, 4.0)]);
        let free = run_backtest(&series, &config(-3.0, 3.0)).unwrap();
        assert!(free.trades.iter().all(|t| t.commission == 0.0));

        let costly = run_backtest(
            &series,
            &BacktestConfig {
                commission_pct: 0.16,
                ..config(-3.0, 3.0)
            },
        )
        .unwrap();
        let buy = &costly.trades[0];
        let sell = &costly.trades[1];
        // The buy budget splits into gold plus its fee.
        assert_relative_eq!(
            buy.commission,
            1_000_000.0 - 1_000_000.0 / 1.0016,
            max_relative = 1e-9
        );
        assert_relative_eq!(
            sell.commission,
            sell.quantity_grams * sell.price_per_gram * 0.0016,
            max_relative = 1e-9
        );
    }

    #[test]
    fn rejects_unusable_price() {
        let series = make_series(&[(100.0, 0.0), (0.0, 0.0), (100.0, 0.0)]);
        let err = run_backtest(&series, &config(-3.0, 3.0)).unwrap_err();
        assert!(matches!(err, KimchiError::Data { .. }));
    }

    #[test]
    fn equity_curve_tracks_every_day() {
        let series = make_series(&[(100.0, 0.0), (110.0, 1.0), (121.0, 4.0), (90.0, 2.0)]);
        let result = run_backtest(&series, &config(-3.0, 3.0)).unwrap();

        let equity: Vec<f64> = result.equity_curve.iter().map(|p| p.equity).collect();
        assert_eq!(equity.len(), 4);
        assert_relative_eq!(equity[0], 1_000_000.0, max_relative = 1e-12);
        assert_relative_eq!(equity[1], 1_100_000.0, max_relative = 1e-12);
        assert_relative_eq!(equity[2], 1_210_000.0, max_relative = 1e-12);
        // Sold on day 3, so the drop on day 4 is not felt.
        assert_relative_eq!(equity[3], 1_210_000.0, max_relative = 1e-12);
    }

    #[test]
    fn rejects_inverted_thresholds() {
        let series = make_series(&[(100.0, 0.0)]);
        let err = run_backtest(&series, &config(3.0, 3.0)).unwrap_err();
        assert!(matches!(err, KimchiError::Configuration { .. }));
        let err = run_backtest(&series, &config(4.0, 3.0)).unwrap_err();
        assert!(matches!(err, KimchiError::Configuration { .. }));
    }

    #[test]
    fn rejects_empty_series() {
        let err = run_backtest(&[], &config(-3.0, 3.0)).unwrap_err();
        assert!(matches!(err, KimchiError::Configuration { reason } if reason.contains("empty")));
    }

    #[test]
    fn rejects_start_date_out_of_range() {
        let series = make_series(&[(100.0, 0.0), (100.0, 0.0)]);
        for start in [date(2023, 12, 31), date(2024, 1, 3)] {
            let err = run_backtest(
                &series,
                &BacktestConfig {
                    start_date: start,
                    ..config(-3.0, 3.0)
                },
            )
            .unwrap_err();
            assert!(matches!(err, KimchiError::Configuration { .. }));
        }
    }

    #[test]
    fn rejects_unsorted_series() {
        let mut series = make_series(&[(100.0, 0.0), (100.0, 0.0), (100.0, 0.0)]);
        series.swap(1, 2);
        let err = run_backtest(&series, &config(-3.0, 3.0)).unwrap_err();
        assert!(matches!(err, KimchiError::Data { .. }));
    }

    #[test]
    fn rejects_non_positive_investment() {
        let series = make_series(&[(100.0, 0.0)]);
        let err = run_backtest(
            &series,
            &BacktestConfig {
                initial_investment: 0.0,
                ..config(-3.0, 3.0)
            },
        )
        .unwrap_err();
        assert!(matches!(err, KimchiError::Configuration { .. }));
    }
}
