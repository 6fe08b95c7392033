//! Round-trip and drawdown statistics for a backtest result.

use super::backtest::{BacktestResult, TradeAction};
use super::portfolio::EquityPoint;

#[derive(Debug, Clone, PartialEq)]
pub struct Metrics {
    pub round_trips: usize,
    pub trades_won: usize,
    pub trades_lost: usize,
    pub win_rate: f64,
    pub realized_pnl: f64,
    pub largest_win: f64,
    pub largest_loss: f64,
    /// Peak-to-trough decline as a fraction of the peak.
    pub max_drawdown: f64,
    pub max_drawdown_duration: i64,
}

impl Metrics {
    pub fn compute(result: &BacktestResult) -> Self {
        let mut round_trips = 0usize;
        let mut trades_won = 0usize;
        let mut trades_lost = 0usize;
        let mut realized_pnl = 0.0_f64;
        let mut largest_win = 0.0_f64;
        let mut largest_loss = 0.0_f64;

        let sells = result
            .trades
            .iter()
            .filter(|t| t.action == TradeAction::Sell)
            .filter_map(|t| t.realized_pnl);

        for pnl in sells {
            round_trips += 1;
            realized_pnl += pnl;
            if pnl > 0.0 {
                trades_won += 1;
                largest_win = largest_win.max(pnl);
            } else if pnl < 0.0 {
                trades_lost += 1;
                largest_loss = largest_loss.max(pnl.abs());
            }
        }

        let win_rate = if round_trips > 0 {
            trades_won as f64 / round_trips as f64
        } else {
            0.0
        };

        let (max_drawdown, max_drawdown_duration) = compute_drawdown(&result.equity_curve);

        Metrics {
            round_trips,
            trades_won,
            trades_lost,
            win_rate,
            realized_pnl,
            largest_win,
            largest_loss,
            max_drawdown,
            max_drawdown_duration,
        }
    }
}

/// Returns (max drawdown fraction, longest days spent below a prior peak).
fn compute_drawdown(curve: &[EquityPoint]) -> (f64, i64) {
    let Some(first) = curve.first() else {
        return (0.0, 0);
    };

    let mut peak = first.equity;
    let mut peak_date = first.date;
    let mut max_dd = 0.0_f64;
    let mut max_duration = 0i64;

    for point in curve {
        if point.equity >= peak {
            peak = point.equity;
            peak_date = point.date;
        } else {
            if peak > 0.0 {
                max_dd = max_dd.max((peak - point.equity) / peak);
            }
            max_duration = max_duration.max((point.date - peak_date).num_days());
        }
    }

    (max_dd, max_duration)
}
