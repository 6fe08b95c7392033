//! Price data ports: the historical series loader and the current-quote fetcher.

use crate::domain::error::KimchiError;
use crate::domain::price_record::PriceRecord;
use chrono::NaiveDate;

pub trait PriceSeriesPort {
    /// Records dated within `[start_date, end_date]`, ascending by date.
    fn load_series(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRecord>, KimchiError>;

    /// First date, last date and row count, or `None` when nothing is logged.
    fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, KimchiError>;
}

pub trait QuotePort {
    /// Today's record, or `None` when the upstream source could not be parsed.
    fn current_quote(&self) -> Result<Option<PriceRecord>, KimchiError>;
}
