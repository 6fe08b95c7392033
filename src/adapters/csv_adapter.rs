//! CSV price log adapter.
//!
//! One row per day, columns read by position:
//! date, domestic KRW/g, international USD/oz, USD/KRW, premium KRW/g, premium %.

use crate::domain::error::KimchiError;
use crate::domain::price_record::{
    convert_to_krw_per_gram, validate_record, validate_series, PriceRecord,
};
use crate::ports::data_port::PriceSeriesPort;
use chrono::NaiveDate;
use csv::StringRecord;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub const CSV_HEADERS: [&str; 6] = [
    "날짜",
    "국내금(원/g)",
    "국제금(달러/온스)",
    "환율(원/달러)",
    "김치프리미엄(원/g)",
    "김치프리미엄(%)",
];

pub struct CsvPriceLog {
    path: PathBuf,
}

impl CsvPriceLog {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every logged record, validated ascending and unique.
    pub fn load_all(&self) -> Result<Vec<PriceRecord>, KimchiError> {
        let content = fs::read_to_string(&self.path).map_err(|e| {
            KimchiError::storage(format!("failed to read {}: {}", self.path.display(), e))
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut records = Vec::new();

        for (idx, result) in rdr.records().enumerate() {
            let row = result
                .map_err(|e| KimchiError::data(format!("CSV parse error: {}", e)))?;
            // header is line 1
            records.push(parse_row(&row, idx + 2)?);
        }

        validate_series(&records)?;
        tracing::debug!("loaded {} rows from {}", records.len(), self.path.display());
        Ok(records)
    }

    pub fn is_date_logged(&self, date: NaiveDate) -> Result<bool, KimchiError> {
        if !self.path.exists() {
            return Ok(false);
        }
        Ok(self.load_all()?.iter().any(|r| r.date == date))
    }

    /// Append one record, writing the header first when the file is new.
    /// A date already present or earlier than the last logged date is rejected.
    pub fn append_record(&self, record: &PriceRecord) -> Result<(), KimchiError> {
        let exists = self.path.exists();
        if exists {
            if let Some(last) = self.load_all()?.last() {
                if record.date <= last.date {
                    return Err(KimchiError::data(format!(
                        "{} is not after the last logged date {}",
                        record.date, last.date
                    )));
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| {
                KimchiError::storage(format!("failed to open {}: {}", self.path.display(), e))
            })?;

        let mut wtr = csv::Writer::from_writer(file);
        let write_err =
            |e: csv::Error| KimchiError::storage(format!("failed to write row: {}", e));
        if !exists {
            wtr.write_record(CSV_HEADERS).map_err(write_err)?;
        }
        wtr.write_record(format_row(record)).map_err(write_err)?;
        wtr.flush()?;

        tracing::info!(
            "logged {} premium {:.2}% to {}",
            record.date,
            record.premium_percent,
            self.path.display()
        );
        Ok(())
    }
}

impl PriceSeriesPort for CsvPriceLog {
    fn load_series(
        &self,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceRecord>, KimchiError> {
        let mut records = self.load_all()?;
        records.retain(|r| r.date >= start_date && r.date <= end_date);
        Ok(records)
    }

    fn date_range(&self) -> Result<Option<(NaiveDate, NaiveDate, usize)>, KimchiError> {
        let records = self.load_all()?;
        Ok(match (records.first(), records.last()) {
            (Some(first), Some(last)) => Some((first.date, last.date, records.len())),
            _ => None,
        })
    }
}

fn parse_row(row: &StringRecord, line: usize) -> Result<PriceRecord, KimchiError> {
    let field = |idx: usize, name: &str| {
        row.get(idx)
            .map(str::trim)
            .ok_or_else(|| KimchiError::data(format!("line {line}: missing {name} column")))
    };
    let number = |idx: usize, name: &str| -> Result<f64, KimchiError> {
        field(idx, name)?
            .replace(',', "")
            .parse::<f64>()
            .map_err(|e| KimchiError::data(format!("line {line}: invalid {name} value: {e}")))
    };

    let date_str = field(0, "date")?;
    // Older rows may carry a time component after the date.
    let date = NaiveDate::parse_from_str(date_str.get(..10).unwrap_or(date_str), "%Y-%m-%d")
        .map_err(|e| KimchiError::data(format!("line {line}: invalid date format: {e}")))?;

    let domestic_price_per_gram = number(1, "domestic price")?;
    let international_price_usd_per_oz = number(2, "international price")?;
    let usd_krw_rate = number(3, "exchange rate")?;
    let premium_amount = number(4, "premium amount")?;
    let premium_percent = number(5, "premium percent")?;

    let record = PriceRecord {
        date,
        domestic_price_per_gram,
        international_price_usd_per_oz,
        usd_krw_rate,
        international_price_per_gram_krw: convert_to_krw_per_gram(
            international_price_usd_per_oz,
            usd_krw_rate,
        ),
        premium_amount,
        premium_percent,
    };
    validate_record(&record).map_err(|e| match e {
        KimchiError::Data { reason } => KimchiError::data(format!("line {line}: {reason}")),
        other => other,
    })?;
    Ok(record)
}

fn format_row(record: &PriceRecord) -> [String; 6] {
    [
        record.date.format("%Y-%m-%d").to_string(),
        format!("{:.2}", record.domestic_price_per_gram),
        format!("{:.2}", record.international_price_usd_per_oz),
        format!("{:.2}", record.usd_krw_rate),
        format!("{:.2}", record.premium_amount),
        format!("{:.2}", record.premium_percent),
    ]
}
