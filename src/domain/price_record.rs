//! Daily price record and series validation.
//!
//! One record per calendar date. The premium compares the domestic price
//! (KRW/g) against the international price (USD/oz) converted to KRW/g.

use chrono::NaiveDate;

use super::error::KimchiError;

/// Grams per troy ounce.
pub const TROY_OUNCE_GRAMS: f64 = 31.1035;

#[derive(Debug, Clone, PartialEq)]
pub struct PriceRecord {
    pub date: NaiveDate,
    pub domestic_price_per_gram: f64,
    pub international_price_usd_per_oz: f64,
    pub usd_krw_rate: f64,
    pub international_price_per_gram_krw: f64,
    pub premium_amount: f64,
    pub premium_percent: f64,
}

impl PriceRecord {
    /// Build a record from the three raw quotes, deriving the converted price
    /// and the premium.
    pub fn from_quotes(
        date: NaiveDate,
        domestic_price_per_gram: f64,
        international_price_usd_per_oz: f64,
        usd_krw_rate: f64,
    ) -> Result<Self, KimchiError> {
        for (name, value) in [
            ("domestic price", domestic_price_per_gram),
            ("international price", international_price_usd_per_oz),
            ("exchange rate", usd_krw_rate),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(KimchiError::data(format!(
                    "{name} must be a positive number, got {value}"
                )));
            }
        }

        let converted = convert_to_krw_per_gram(international_price_usd_per_oz, usd_krw_rate);
        let (premium_amount, premium_percent) = premium(domestic_price_per_gram, converted);

        Ok(PriceRecord {
            date,
            domestic_price_per_gram,
            international_price_usd_per_oz,
            usd_krw_rate,
            international_price_per_gram_krw: converted,
            premium_amount,
            premium_percent,
        })
    }
}

/// USD per troy ounce → KRW per gram.
pub fn convert_to_krw_per_gram(usd_per_oz: f64, usd_krw_rate: f64) -> f64 {
    usd_per_oz * usd_krw_rate / TROY_OUNCE_GRAMS
}

/// Returns (amount, percent) of the domestic price over the converted price.
pub fn premium(domestic_per_gram: f64, international_per_gram_krw: f64) -> (f64, f64) {
    let amount = domestic_per_gram - international_per_gram_krw;
    (amount, amount / international_per_gram_krw * 100.0)
}

/// Reject a record the engines cannot price or classify: a non-positive or
/// non-finite domestic price, or a non-finite premium.
pub fn validate_record(record: &PriceRecord) -> Result<(), KimchiError> {
    let price = record.domestic_price_per_gram;
    if !price.is_finite() || price <= 0.0 {
        return Err(KimchiError::data(format!(
            "{}: domestic price must be a positive number, got {price}",
            record.date
        )));
    }
    if !record.premium_percent.is_finite() {
        return Err(KimchiError::data(format!(
            "{}: premium percent must be a finite number, got {}",
            record.date, record.premium_percent
        )));
    }
    Ok(())
}

/// Reject a series that is not strictly ascending by date or that holds an
/// unusable record.
pub fn validate_series(series: &[PriceRecord]) -> Result<(), KimchiError> {
    for record in series {
        validate_record(record)?;
    }
    for pair in series.windows(2) {
        let (prev, next) = (&pair[0], &pair[1]);
        if next.date == prev.date {
            return Err(KimchiError::data(format!("duplicate date {}", next.date)));
        }
        if next.date < prev.date {
            return Err(KimchiError::data(format!(
                "rows out of order: {} follows {}",
                next.date, prev.date
            )));
        }
    }
    Ok(())
}
