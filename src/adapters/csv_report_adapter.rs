//! Trade log writer: one CSV row per backtest event.

use crate::domain::backtest::{BacktestResult, TradeAction, TradeReason};
use crate::domain::error::KimchiError;
use crate::ports::report_port::ReportPort;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct TradeRow {
    date: String,
    action: TradeAction,
    reason: TradeReason,
    price_per_gram: String,
    quantity_grams: String,
    cash_balance: String,
    commission: String,
    premium_percent: String,
    realized_pnl: Option<String>,
}

pub struct CsvReportAdapter;

impl ReportPort for CsvReportAdapter {
    fn write_trades(&self, result: &BacktestResult, output_path: &Path) -> Result<(), KimchiError> {
        let mut wtr = csv::Writer::from_path(output_path).map_err(|e| {
            KimchiError::storage(format!("failed to create {}: {}", output_path.display(), e))
        })?;

        for trade in &result.trades {
            let row = TradeRow {
                date: trade.date.format("%Y-%m-%d").to_string(),
                action: trade.action,
                reason: trade.reason,
                price_per_gram: format!("{:.2}", trade.price_per_gram),
                quantity_grams: format!("{:.4}", trade.quantity_grams),
                cash_balance: format!("{:.0}", trade.cash_balance),
                commission: format!("{:.0}", trade.commission),
                premium_percent: format!("{:.2}", trade.premium_percent),
                realized_pnl: trade.realized_pnl.map(|p| format!("{:.0}", p)),
            };
            wtr.serialize(row)
                .map_err(|e| KimchiError::storage(format!("failed to write trade: {}", e)))?;
        }
        wtr.flush()?;

        tracing::info!(
            "wrote {} trades to {}",
            result.trades.len(),
            output_path.display()
        );
        Ok(())
    }
}
