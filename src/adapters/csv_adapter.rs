//! CSV file data adapter.
//!
//! Reads K-bar series from `{code}.csv` files with a
//! `timestamp,open,high,low,close,volume` header.

use crate::domain::error::GridtraderError;
use crate::domain::kbar::KBar;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use std::fs;
use std::path::PathBuf;

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    /// Accepts a full timestamp or a bare date (taken as midnight).
    fn parse_timestamp(value: &str) -> Result<NaiveDateTime, GridtraderError> {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S") {
            return Ok(dt);
        }
        NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(|d| d.and_hms_opt(0, 0, 0).unwrap_or_default())
            .map_err(|e| GridtraderError::Data {
                reason: format!("invalid timestamp {:?}: {}", value, e),
            })
    }

    fn parse_field<T: std::str::FromStr>(
        record: &csv::StringRecord,
        index: usize,
        name: &str,
    ) -> Result<T, GridtraderError>
    where
        T::Err: std::fmt::Display,
    {
        record
            .get(index)
            .ok_or_else(|| GridtraderError::Data {
                reason: format!("missing {} column", name),
            })?
            .parse()
            .map_err(|e| GridtraderError::Data {
                reason: format!("invalid {} value: {}", name, e),
            })
    }

    fn read_all(&self, code: &str) -> Result<Vec<KBar>, GridtraderError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| GridtraderError::Data {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;

        let mut rdr = csv::Reader::from_reader(content.as_bytes());
        let mut bars = Vec::new();

        for result in rdr.records() {
            let record = result.map_err(|e| GridtraderError::Data {
                reason: format!("CSV parse error: {}", e),
            })?;

            let time_str = record.get(0).ok_or_else(|| GridtraderError::Data {
                reason: "missing timestamp column".into(),
            })?;
            let time = Self::parse_timestamp(time_str)?;

            let bar = KBar {
                time,
                open: Self::parse_field(&record, 1, "open")?,
                high: Self::parse_field(&record, 2, "high")?,
                low: Self::parse_field(&record, 3, "low")?,
                close: Self::parse_field(&record, 4, "close")?,
                volume: Self::parse_field(&record, 5, "volume")?,
            };
            if !bar.is_well_formed() {
                return Err(GridtraderError::Data {
                    reason: format!("inconsistent OHLC values at {}", bar.time),
                });
            }
            bars.push(bar);
        }

        bars.sort_by_key(|b| b.time);
        Ok(bars)
    }
}

impl DataPort for CsvAdapter {
    fn fetch_kbars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<KBar>, GridtraderError> {
        let mut bars = self.read_all(code)?;
        bars.retain(|b| {
            let date = b.time.date();
            date >= start_date && date <= end_date
        });
        Ok(bars)
    }

    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, GridtraderError> {
        let bars = self.read_all(code)?;
        let (Some(first), Some(last)) = (bars.first(), bars.last()) else {
            return Ok(None);
        };
        Ok(Some((first.time.date(), last.time.date(), bars.len())))
    }
}
