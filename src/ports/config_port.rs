//! Configuration access port trait.

use crate::domain::error::SlopeFilterError;
use chrono::NaiveDate;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;

    /// Optional `YYYY-MM-DD` date. Present but malformed is an error.
    fn get_date(&self, section: &str, key: &str) -> Result<Option<NaiveDate>, SlopeFilterError> {
        match self.get_string(section, key) {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                .map(Some)
                .map_err(|_| {
                    SlopeFilterError::invalid(
                        section,
                        key,
                        "invalid date format (expected YYYY-MM-DD)",
                    )
                }),
        }
    }
}
