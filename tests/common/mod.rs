#![allow(dead_code)]

use chrono::NaiveDate;
use kimchigold::adapters::csv_adapter::CSV_HEADERS;
use kimchigold::domain::error::KimchiError;
use kimchigold::domain::price_record::PriceRecord;
use kimchigold::ports::data_port::{PriceSeriesPort, QuotePort};
use std::cell::Cell;
use std::io::Write;

pub struct MockSeriesPort {
    pub records: Vec<PriceRecord>,
    pub error: Option<String>,
    pub calls: Cell<usize>,
}

impl MockSeriesPort {
    pub fn new(records: Vec<PriceRecord>) -> Self {
        Self {
            records,
            error: None,
            calls: Cell::new(0),
        }
    }

    pub fn failing(reason: &str) -> Self {
        Self {
            records: Vec::new(),
            error: Some(reason.to_string()),
            calls: Cell::new(0),
        }
    }
}

impl PriceSeriesPort for MockSeriesPort {
    fn load_series(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRecord>, KimchiError> {
        self.calls.set(self.calls.get() + 1);
        if let Some(reason) = &self.error {
            return Err(KimchiError::storage(reason.clone()));
        }
        Ok(self
            .records
            .iter()
            .filter(|r| r.date >= start_date && r.date <= end_date)
            .cloned()
            .collect())
    }

    fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, KimchiError> {
        Ok(match (self.records.first(), self.records.last()) {
            (Some(f), Some(l)) => Some((f.date, l.date, self.records.len())),
            _ => None,
        })
    }
}

pub struct MockQuotePort {
    pub quote: Option<PriceRecord>,
}

impl QuotePort for MockQuotePort {
    fn current_quote(&self) -> Result<Option<PriceRecord>, KimchiError> {
        Ok(self.quote.clone())
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Record with a fixed domestic price and premium; the converted price is
/// backed out of the premium.
pub fn make_record(date_str: &str, price: f64, premium_percent: f64) -> PriceRecord {
    let converted = price / (1.0 + premium_percent / 100.0);
    PriceRecord {
        date: NaiveDate::parse_from_str(date_str, "%Y-%m-%d").unwrap(),
        domestic_price_per_gram: price,
        international_price_usd_per_oz: 2_300.0,
        usd_krw_rate: 1_350.0,
        international_price_per_gram_krw: converted,
        premium_amount: price - converted,
        premium_percent,
    }
}

/// Consecutive daily records from `start` with a constant price.
pub fn daily_premiums(start: NaiveDate, price: f64, premiums: &[f64]) -> Vec<PriceRecord> {
    premiums
        .iter()
        .enumerate()
        .map(|(i, &p)| {
            let d = start + chrono::Duration::days(i as i64);
            make_record(&d.format("%Y-%m-%d").to_string(), price, p)
        })
        .collect()
}

pub fn write_temp_file(content: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.flush().unwrap();
    file
}

/// Price log CSV in the on-disk layout, premiums derived from the quotes.
pub fn price_log_csv(rows: &[(&str, f64, f64, f64)]) -> String {
    let mut out = CSV_HEADERS.join(",");
    out.push('\n');
    for (d, domestic, intl, rate) in rows {
        let rec = PriceRecord::from_quotes(
            NaiveDate::parse_from_str(d, "%Y-%m-%d").unwrap(),
            *domestic,
            *intl,
            *rate,
        )
        .unwrap();
        out.push_str(&format!(
            "{},{:.2},{:.2},{:.2},{:.2},{:.2}\n",
            d, domestic, intl, rate, rec.premium_amount, rec.premium_percent
        ));
    }
    out
}
