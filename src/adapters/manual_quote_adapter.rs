//! Current quote supplied by hand (command line or a collection job that has
//! already scraped the three prices).

use crate::domain::error::KimchiError;
use crate::domain::price_record::PriceRecord;
use crate::ports::data_port::QuotePort;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct ManualQuoteAdapter {
    date: NaiveDate,
    domestic_price_per_gram: Option<f64>,
    international_price_usd_per_oz: Option<f64>,
    usd_krw_rate: Option<f64>,
}

impl ManualQuoteAdapter {
    pub fn new(
        date: NaiveDate,
        domestic_price_per_gram: Option<f64>,
        international_price_usd_per_oz: Option<f64>,
        usd_krw_rate: Option<f64>,
    ) -> Self {
        Self {
            date,
            domestic_price_per_gram,
            international_price_usd_per_oz,
            usd_krw_rate,
        }
    }
}

impl QuotePort for ManualQuoteAdapter {
    fn current_quote(&self) -> Result<Option<PriceRecord>, KimchiError> {
        let (Some(domestic), Some(international), Some(rate)) = (
            self.domestic_price_per_gram,
            self.international_price_usd_per_oz,
            self.usd_krw_rate,
        ) else {
            return Ok(None);
        };

        PriceRecord::from_quotes(self.date, domestic, international, rate)
            .map(Some)
            .map_err(|e| KimchiError::QuoteUnavailable {
                reason: e.to_string(),
            })
    }
}
