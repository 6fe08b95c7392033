//! IQR outlier analysis of the premium series.
//!
//! Q1/Q3 use linear interpolation between closest ranks:
//! pos = (n-1) * q, Q = v[floor(pos)] + (v[ceil(pos)] - v[floor(pos)]) * frac(pos)
//! lower = Q1 - k * (Q3 - Q1), upper = Q3 + k * (Q3 - Q1)

use chrono::{Duration, NaiveDate};

use super::error::KimchiError;
use super::price_record::{validate_series, PriceRecord};

pub const DEFAULT_WINDOW_DAYS: i64 = 365;
pub const DEFAULT_IQR_MULTIPLIER: f64 = 1.5;
/// Fewer samples than this leave the verdict indeterminate.
pub const MIN_OUTLIER_POINTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OutlierBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
}

impl OutlierBounds {
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower_bound && value <= self.upper_bound
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutlierVerdict {
    Outlier,
    NotOutlier,
    Indeterminate,
}

impl std::fmt::Display for OutlierVerdict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutlierVerdict::Outlier => write!(f, "True"),
            OutlierVerdict::NotOutlier => write!(f, "False"),
            OutlierVerdict::Indeterminate => write!(f, "Indeterminate"),
        }
    }
}

/// Verdict plus the figures it was derived from.
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierAnalysis {
    pub verdict: OutlierVerdict,
    pub bounds: Option<OutlierBounds>,
    pub latest_date: Option<NaiveDate>,
    pub latest_value: Option<f64>,
    pub sample_size: usize,
}

/// Rows dated within `[as_of - window_days, as_of]`. A window reaching past
/// the earliest representable date covers everything up to `as_of`.
pub fn filter_recent(
    series: &[PriceRecord],
    as_of: NaiveDate,
    window_days: i64,
) -> &[PriceRecord] {
    let cutoff = Duration::try_days(window_days)
        .and_then(|span| as_of.checked_sub_signed(span))
        .unwrap_or(NaiveDate::MIN);
    let start = series.partition_point(|r| r.date < cutoff);
    let end = series.partition_point(|r| r.date <= as_of);
    if start >= end {
        return &[];
    }
    &series[start..end]
}

/// Quantile of an ascending-sorted, non-empty slice.
pub fn quartile(sorted: &[f64], q: f64) -> f64 {
    let pos = (sorted.len() - 1) as f64 * q;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
}

pub fn compute_bounds(values: &[f64], multiplier: f64) -> Option<OutlierBounds> {
    if values.len() < MIN_OUTLIER_POINTS {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let q1 = quartile(&sorted, 0.25);
    let q3 = quartile(&sorted, 0.75);
    let iqr = q3 - q1;

    Some(OutlierBounds {
        q1,
        q3,
        lower_bound: q1 - multiplier * iqr,
        upper_bound: q3 + multiplier * iqr,
    })
}

/// Window must be positive; the multiplier finite and non-negative.
pub fn check_parameters(window_days: i64, multiplier: f64) -> Result<(), KimchiError> {
    if window_days <= 0 {
        return Err(KimchiError::configuration(format!(
            "window must be at least one day, got {window_days}"
        )));
    }
    if !multiplier.is_finite() || multiplier < 0.0 {
        return Err(KimchiError::configuration(format!(
            "IQR multiplier must be a non-negative number, got {multiplier}"
        )));
    }
    Ok(())
}

/// Classify the latest premium in the window ending at `as_of`.
///
/// The series must be strictly ascending by date with usable values;
/// anything else is a `Data` error.
pub fn analyze(
    series: &[PriceRecord],
    as_of: NaiveDate,
    window_days: i64,
    multiplier: f64,
) -> Result<OutlierAnalysis, KimchiError> {
    check_parameters(window_days, multiplier)?;
    validate_series(series)?;

    let window = filter_recent(series, as_of, window_days);
    let values: Vec<f64> = window.iter().map(|r| r.premium_percent).collect();
    let latest = window.last();

    let bounds = compute_bounds(&values, multiplier);
    let verdict = match (bounds, latest) {
        (Some(b), Some(rec)) if !b.contains(rec.premium_percent) => OutlierVerdict::Outlier,
        (Some(_), Some(_)) => OutlierVerdict::NotOutlier,
        _ => {
            tracing::warn!(
                "only {} data points in the last {} days, need {}",
                values.len(),
                window_days,
                MIN_OUTLIER_POINTS
            );
            OutlierVerdict::Indeterminate
        }
    };

    Ok(OutlierAnalysis {
        verdict,
        bounds,
        latest_date: latest.map(|r| r.date),
        latest_value: latest.map(|r| r.premium_percent),
        sample_size: values.len(),
    })
}

pub fn is_outlier(
    series: &[PriceRecord],
    as_of: NaiveDate,
    window_days: i64,
    multiplier: f64,
) -> Result<OutlierVerdict, KimchiError> {
    Ok(analyze(series, as_of, window_days, multiplier)?.verdict)
}

/// Analyze with today's quote standing in as the latest value. Logged rows
/// dated on or after the quote are ignored.
pub fn analyze_with_quote(
    series: &[PriceRecord],
    quote: &PriceRecord,
    window_days: i64,
    multiplier: f64,
) -> Result<OutlierAnalysis, KimchiError> {
    validate_series(series)?;
    let keep = series.partition_point(|r| r.date < quote.date);
    let mut combined = Vec::with_capacity(keep + 1);
    combined.extend_from_slice(&series[..keep]);
    combined.push(quote.clone());
    analyze(&combined, quote.date, window_days, multiplier)
}
