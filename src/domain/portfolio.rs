//! Cash/gold holdings and equity tracking for a single backtest run.

use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct EquityPoint {
    pub date: NaiveDate,
    pub equity: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Portfolio {
    pub cash: f64,
    /// Grams of gold held; fractional.
    pub grams: f64,
    /// Cash committed to the open position, including commission.
    pub cost_basis: f64,
    pub equity_curve: Vec<EquityPoint>,
}

impl Portfolio {
    pub fn new(initial_investment: f64) -> Self {
        Portfolio {
            cash: initial_investment,
            grams: 0.0,
            cost_basis: 0.0,
            equity_curve: Vec::new(),
        }
    }

    pub fn holds_gold(&self) -> bool {
        self.grams > 0.0
    }

    /// Cash plus gold marked at `price_per_gram`.
    pub fn total_value(&self, price_per_gram: f64) -> f64 {
        self.cash + self.grams * price_per_gram
    }

    pub fn record_equity(&mut self, date: NaiveDate, price_per_gram: f64) {
        let equity = self.total_value(price_per_gram);
        self.equity_curve.push(EquityPoint { date, equity });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_portfolio_holds_cash() {
        let p = Portfolio::new(1_000_000.0);
        assert!((p.cash - 1_000_000.0).abs() < f64::EPSILON);
        assert!(!p.holds_gold());
        assert!(p.equity_curve.is_empty());
    }

    #[test]
    fn total_value_marks_gold() {
        let mut p = Portfolio::new(1_000_000.0);
        p.cash = 500.0;
        p.grams = 10.0;
        assert!((p.total_value(90_000.0) - 900_500.0).abs() < 1e-9);
        assert!(p.holds_gold());
    }

    #[test]
    fn record_equity_appends() {
        let mut p = Portfolio::new(1_000.0);
        let d = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        p.record_equity(d, 100.0);
        p.grams = 2.0;
        p.cash = 0.0;
        p.record_equity(d.succ_opt().unwrap(), 600.0);

        assert_eq!(p.equity_curve.len(), 2);
        assert!((p.equity_curve[0].equity - 1_000.0).abs() < f64::EPSILON);
        assert!((p.equity_curve[1].equity - 1_200.0).abs() < f64::EPSILON);
    }
}
