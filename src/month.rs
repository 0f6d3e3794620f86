use std::fmt::Display;
use std::str::FromStr;

use chrono::{Datelike, Local, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::errors::NeedsbookError;

/// A calendar month, written as `YYYY-MM`.
///
/// Month arithmetic works on the year/month pair directly, so the result never
/// depends on the day of month or on the local timezone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    pub fn new(year: i32, month: u32) -> Result<Self, NeedsbookError> {
        if !(1..=12).contains(&month) {
            return Err(NeedsbookError::Parse(format!(
                "month must be between 1 and 12, got {month}"
            )));
        }
        if !(0..=9999).contains(&year) {
            return Err(NeedsbookError::Parse(format!(
                "year must have four digits, got {year}"
            )));
        }
        Ok(Self { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    pub fn current() -> Self {
        Self::from_date(Local::now().date_naive())
    }

    /// The month before `self`, or `None` at `0000-01`.
    pub fn previous(&self) -> Option<Self> {
        if self.month > 1 {
            Some(Self {
                year: self.year,
                month: self.month - 1,
            })
        } else if self.year > 0 {
            Some(Self {
                year: self.year - 1,
                month: 12,
            })
        } else {
            None
        }
    }

    /// The `count` months ending at `self`, newest first. Stops early at
    /// `0000-01`.
    pub fn recent(&self, count: usize) -> Vec<Self> {
        std::iter::successors(Some(*self), MonthKey::previous)
            .take(count)
            .collect()
    }
}

impl Display for MonthKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = NeedsbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || NeedsbookError::Parse(format!("'{s}' is not a month, expected YYYY-MM"));
        let (year, month) = s.trim().split_once('-').ok_or_else(invalid)?;
        if year.len() != 4 || month.len() != 2 {
            return Err(invalid());
        }
        if !year.chars().chain(month.chars()).all(|c| c.is_ascii_digit()) {
            return Err(invalid());
        }
        let year = year.parse::<i32>().map_err(|_| invalid())?;
        let month = month.parse::<u32>().map_err(|_| invalid())?;
        Self::new(year, month)
    }
}

impl TryFrom<String> for MonthKey {
    type Error = NeedsbookError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<MonthKey> for String {
    fn from(value: MonthKey) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn previous_crosses_year_boundary() {
        assert_eq!(key("2024-01").previous(), Some(key("2023-12")));
        assert_eq!(key("2024-03").previous(), Some(key("2024-02")));
    }

    #[test]
    fn year_zero_has_no_predecessor() {
        assert_eq!(key("0000-02").previous(), Some(key("0000-01")));
        assert_eq!(key("0000-01").previous(), None);
        assert_eq!(key("0001-01").previous(), Some(key("0000-12")));
    }

    #[test]
    fn recent_stops_at_year_zero() {
        let months = key("0000-03").recent(18);
        assert_eq!(months, [key("0000-03"), key("0000-02"), key("0000-01")]);
        for month in key("0001-06").recent(usize::MAX) {
            assert_eq!(month.to_string().parse::<MonthKey>().unwrap(), month);
        }
    }

    #[test]
    fn formats_with_padding() {
        assert_eq!(MonthKey::new(987, 4).unwrap().to_string(), "0987-04");
        assert_eq!(key("2024-11").to_string(), "2024-11");
    }

    #[test]
    fn rejects_malformed_keys() {
        for bad in ["2024-13", "2024-00", "2024-1", "24-01", "2024/01", "", "abcd-ef", "2024-+1"] {
            assert!(bad.parse::<MonthKey>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn recent_lists_newest_first() {
        let months: Vec<String> = key("2024-02")
            .recent(4)
            .into_iter()
            .map(|m| m.to_string())
            .collect();
        assert_eq!(months, ["2024-02", "2024-01", "2023-12", "2023-11"]);
    }

    #[test]
    fn dst_transition_days_stay_in_their_month() {
        // last Sunday of March and October, the usual European DST switches
        let march = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let october = NaiveDate::from_ymd_opt(2024, 10, 27).unwrap();
        assert_eq!(MonthKey::from_date(march), key("2024-03"));
        assert_eq!(MonthKey::from_date(october), key("2024-10"));
        assert_eq!(MonthKey::from_date(march).previous(), Some(key("2024-02")));
    }

    proptest! {
        #[test]
        fn same_month_same_key(year in 1i32..9999, month in 1u32..=12, d1 in 1u32..=28, d2 in 1u32..=28) {
            let a = NaiveDate::from_ymd_opt(year, month, d1).unwrap();
            let b = NaiveDate::from_ymd_opt(year, month, d2).unwrap();
            prop_assert_eq!(MonthKey::from_date(a), MonthKey::from_date(b));
        }

        #[test]
        fn previous_is_calendar_predecessor(year in 1i32..9999, month in 1u32..=12, day in 1u32..=28) {
            let date = NaiveDate::from_ymd_opt(year, month, day).unwrap();
            let first_of_month = NaiveDate::from_ymd_opt(year, month, 1).unwrap();
            let day_before = first_of_month.pred_opt().unwrap();
            prop_assert_eq!(MonthKey::from_date(date).previous(), Some(MonthKey::from_date(day_before)));
        }

        #[test]
        fn text_form_parses_back(year in 0i32..=9999, month in 1u32..=12) {
            let month_key = MonthKey::new(year, month).unwrap();
            prop_assert_eq!(month_key.to_string().parse::<MonthKey>().unwrap(), month_key);
        }
    }
}
