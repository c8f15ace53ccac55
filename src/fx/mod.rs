pub mod nbp;

use crate::trade::Trade;
use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Read;

pub use nbp::NbpRateSource;

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("rate fetch failed: {0}")]
    RateFetchFailed(String),
    #[error("no rate found for {date} in the {lookback_days} days before it")]
    RateNotFound { date: NaiveDate, lookback_days: u32 },
}

/// Settings for building and querying the rate table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateSettings {
    /// ISO code of the currency the trades are quoted in
    pub currency: String,
    /// Days fetched before the first trade so its lookback has data
    pub span_padding_days: i64,
    /// Longest range (inclusive, in days) a single rate query may cover
    pub max_window_days: u32,
    /// How many days before a trade date to search for a published rate
    pub max_lookback_days: u32,
}

impl Default for RateSettings {
    fn default() -> Self {
        RateSettings {
            currency: "USD".to_string(),
            span_padding_days: 5,
            max_window_days: 93,
            max_lookback_days: 30,
        }
    }
}

/// A published mid rate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RatePoint {
    pub effective_date: NaiveDate,
    pub mid: Decimal,
}

/// Anything that can answer a date-range rate query
pub trait RateSource {
    fn fetch(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<RatePoint>, RateError>;
}

/// Date-indexed exchange rates, with gaps on weekends and holidays
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FxRateTable {
    rates: BTreeMap<NaiveDate, Decimal>,
}

impl FromIterator<RatePoint> for FxRateTable {
    fn from_iter<I: IntoIterator<Item = RatePoint>>(iter: I) -> Self {
        FxRateTable {
            rates: iter.into_iter().map(|p| (p.effective_date, p.mid)).collect(),
        }
    }
}

impl FxRateTable {
    /// Fetch every rate in `[start, end]`, one sequential query per window
    pub fn fetch<S>(
        source: &S,
        start: NaiveDate,
        end: NaiveDate,
        max_window_days: u32,
    ) -> Result<Self, RateError>
    where
        S: RateSource + ?Sized,
    {
        let mut rates = BTreeMap::new();
        for (window_start, window_end) in tile_windows(start, end, max_window_days) {
            let points = source.fetch(window_start, window_end)?;
            log::info!(
                "{} rates fetched for {} to {}",
                points.len(),
                window_start,
                window_end
            );
            rates.extend(points.into_iter().map(|p| (p.effective_date, p.mid)));
        }

        if rates.is_empty() {
            return Err(RateError::RateFetchFailed(format!(
                "no rates returned for {} to {}",
                start, end
            )));
        }
        Ok(FxRateTable { rates })
    }

    /// Fetch the rates needed to value `trades`, which must be sorted by date.
    ///
    /// The span starts `span_padding_days` before the first trade and ends on the last.
    pub fn fetch_for_trades<S>(
        source: &S,
        trades: &[Trade],
        settings: &RateSettings,
    ) -> Result<Self, RateError>
    where
        S: RateSource + ?Sized,
    {
        let (Some(first), Some(last)) = (trades.first(), trades.last()) else {
            return Ok(FxRateTable::default());
        };
        let start = first.date() - Duration::days(settings.span_padding_days);
        Self::fetch(source, start, last.date(), settings.max_window_days)
    }

    /// Rate for a trade on `date`: the latest rate published strictly before it,
    /// searching back at most `max_lookback_days` days.
    pub fn resolve(&self, date: NaiveDate, max_lookback_days: u32) -> Result<Decimal, RateError> {
        for days_back in 1..=i64::from(max_lookback_days) {
            let day = date - Duration::days(days_back);
            if let Some(rate) = self.rates.get(&day) {
                if days_back > 1 {
                    log::debug!("Rate for {} taken from {} ({} days back)", date, day, days_back);
                }
                return Ok(*rate);
            }
        }
        Err(RateError::RateNotFound {
            date,
            lookback_days: max_lookback_days,
        })
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.rates.keys().next().copied()
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.rates.keys().next_back().copied()
    }
}

/// Read a rate table previously written as `{"YYYY-MM-DD": "rate"}` JSON
pub fn read_rate_table<R: Read>(reader: R) -> anyhow::Result<FxRateTable> {
    let table: FxRateTable = serde_json::from_reader(reader)?;
    Ok(table)
}

/// Split `[start, end]` into consecutive inclusive windows of at most `max_window_days`
/// days. Windows neither overlap nor leave gaps and the last one ends on `end`.
pub fn tile_windows(
    start: NaiveDate,
    end: NaiveDate,
    max_window_days: u32,
) -> Vec<(NaiveDate, NaiveDate)> {
    let window_len = Duration::days(i64::from(max_window_days.max(1)) - 1);
    let mut windows = Vec::new();
    let mut window_start = start;
    while window_start <= end {
        let window_end = (window_start + window_len).min(end);
        windows.push((window_start, window_end));
        window_start = window_end + Duration::days(1);
    }
    windows
}
