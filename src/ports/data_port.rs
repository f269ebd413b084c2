//! Data access port trait.

use crate::domain::error::GridtraderError;
use crate::domain::kbar::KBar;
use chrono::NaiveDate;

pub trait DataPort {
    /// Fetch the K-bar series for `code` between the two dates inclusive,
    /// sorted by time ascending.
    fn fetch_kbars(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<KBar>, GridtraderError>;

    /// Earliest and latest bar dates plus bar count, or `None` when the
    /// series has no data at all.
    fn get_data_range(
        &self,
        code: &str,
    ) -> Result<Option<(NaiveDate, NaiveDate, usize)>, GridtraderError>;
}
