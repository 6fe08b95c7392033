//! Fill simulation: slippage, commission and all-in/all-out sizing.

use super::portfolio::Portfolio;

/// Execution costs, both in percent.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionConfig {
    pub commission_pct: f64,
    pub slippage_pct: f64,
}

/// Commission: trade_value * pct / 100.
pub fn calculate_commission(trade_value: f64, config: &ExecutionConfig) -> f64 {
    trade_value * config.commission_pct / 100.0
}

/// Buy: execution_price = market_price * (1 + slippage_pct / 100)
pub fn apply_slippage_buy(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 + slippage_pct / 100.0)
}

/// Sell: execution_price = market_price * (1 - slippage_pct / 100)
pub fn apply_slippage_sell(market_price: f64, slippage_pct: f64) -> f64 {
    market_price * (1.0 - slippage_pct / 100.0)
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fill {
    pub execution_price: f64,
    pub quantity: f64,
    pub commission: f64,
    pub cash_after: f64,
    /// Set on sells only.
    pub realized_pnl: Option<f64>,
}

/// Spend all cash on gold. Returns `None` when there is no cash to spend.
///
/// The budget covers both the gold and the commission on it:
/// gross = cash / (1 + commission_pct / 100), quantity = gross / execution_price.
pub fn buy_all(
    portfolio: &mut Portfolio,
    market_price: f64,
    config: &ExecutionConfig,
) -> Option<Fill> {
    if portfolio.cash <= 0.0 || market_price <= 0.0 {
        return None;
    }

    let budget = portfolio.cash;
    let execution_price = apply_slippage_buy(market_price, config.slippage_pct);
    let gross = budget / (1.0 + config.commission_pct / 100.0);
    let commission = calculate_commission(gross, config);
    let quantity = gross / execution_price;

    portfolio.cash = 0.0;
    portfolio.grams += quantity;
    portfolio.cost_basis += budget;

    Some(Fill {
        execution_price,
        quantity,
        commission,
        cash_after: portfolio.cash,
        realized_pnl: None,
    })
}

/// Sell the whole position. Returns `None` when nothing is held.
pub fn sell_all(
    portfolio: &mut Portfolio,
    market_price: f64,
    config: &ExecutionConfig,
) -> Option<Fill> {
    if !portfolio.holds_gold() {
        return None;
    }

    let quantity = portfolio.grams;
    let execution_price = apply_slippage_sell(market_price, config.slippage_pct);
    let proceeds = quantity * execution_price;
    let commission = calculate_commission(proceeds, config);
    let net = proceeds - commission;
    let realized_pnl = net - portfolio.cost_basis;

    portfolio.cash += net;
    portfolio.grams = 0.0;
    portfolio.cost_basis = 0.0;

    Some(Fill {
        execution_price,
        quantity,
        commission,
        cash_after: portfolio.cash,
        realized_pnl: Some(realized_pnl),
    })
}
