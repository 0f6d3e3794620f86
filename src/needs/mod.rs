use std::fmt::Display;
use std::str::FromStr;

use inquire::{error::InquireResult, required, CustomType, Text};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::NeedsbookError;
use crate::month::MonthKey;

pub mod template;

pub fn item_name() -> InquireResult<String> {
    Text::new("Item:")
        .with_validator(required!("Require a non-empty name"))
        .with_placeholder("Example: Rent")
        .prompt()
}

pub fn money_amount(currency: &str, name: &str) -> InquireResult<Decimal> {
    CustomType::new(&format!("Amount {name}:"))
        .with_formatter(&|decimal: Decimal| format!("{:.2} {}", decimal, currency))
        .with_error_message("Please type a valid number")
        .with_help_message(&format!(
            "Type the amount in {} using a decimal point as a separator",
            currency
        ))
        .prompt()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NeedId(pub u64);

impl Display for NeedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "need-{}", self.0)
    }
}

impl FromStr for NeedId {
    type Err = NeedsbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().strip_prefix("need-").unwrap_or(s.trim());
        digits
            .parse::<u64>()
            .map(NeedId)
            .map_err(|_| NeedsbookError::Parse(format!("'{s}' is not a need id")))
    }
}

/// A single baseline cost, either in the template or in a month's list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedItem {
    pub id: NeedId,
    pub name: String,
    pub amount: Decimal,
    /// First month (inclusive) in which a template item is copied into a month.
    pub start: Option<MonthKey>,
    /// Last month (inclusive) in which a template item is copied into a month.
    pub end: Option<MonthKey>,
}

impl NeedItem {
    pub fn new(id: NeedId, name: impl Into<String>, amount: Decimal) -> Self {
        Self {
            id,
            name: name.into(),
            amount,
            start: None,
            end: None,
        }
    }

    pub fn with_window(mut self, start: Option<MonthKey>, end: Option<MonthKey>) -> Self {
        self.start = start;
        self.end = end;
        self
    }

    pub fn is_active_in(&self, month: MonthKey) -> bool {
        self.start.map_or(true, |start| start <= month) && self.end.map_or(true, |end| month <= end)
    }

    /// The same item under a new id.
    pub fn copied_as(&self, id: NeedId) -> Self {
        Self { id, ..self.clone() }
    }

    pub fn apply(&mut self, patch: &NeedPatch) {
        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(amount) = patch.amount {
            self.amount = amount;
        }
    }
}

impl Display for NeedItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:>8} {:24} {:10.2}",
            self.id.to_string(),
            self.name,
            self.amount
        )?;
        match (self.start, self.end) {
            (None, None) => Ok(()),
            (Some(start), None) => write!(f, "  from {start}"),
            (None, Some(end)) => write!(f, "  until {end}"),
            (Some(start), Some(end)) => write!(f, "  {start} to {end}"),
        }
    }
}

/// Fields to overwrite on an existing item. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NeedPatch {
    pub name: Option<String>,
    pub amount: Option<Decimal>,
}

impl NeedPatch {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.amount.is_none()
    }
}

/// Sum of all amounts, saturating at `Decimal::MAX` instead of overflowing.
pub fn total(items: &[NeedItem]) -> Decimal {
    items.iter().fold(Decimal::ZERO, |sum, item| {
        sum.checked_add(item.amount).unwrap_or(Decimal::MAX)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn window_is_inclusive() {
        let item = NeedItem::new(NeedId(1), "Gym", Decimal::new(300, 0))
            .with_window(Some(key("2024-02")), Some(key("2024-05")));
        assert!(!item.is_active_in(key("2024-01")));
        assert!(item.is_active_in(key("2024-02")));
        assert!(item.is_active_in(key("2024-05")));
        assert!(!item.is_active_in(key("2024-06")));
    }

    #[test]
    fn item_without_window_is_always_active() {
        let item = NeedItem::new(NeedId(1), "Rent", Decimal::new(4000, 0));
        assert!(item.is_active_in(key("1999-01")));
        assert!(item.is_active_in(key("2099-12")));
    }

    #[test]
    fn open_ended_windows() {
        let from = NeedItem::new(NeedId(1), "Phone", Decimal::ONE).with_window(Some(key("2024-06")), None);
        assert!(!from.is_active_in(key("2024-05")));
        assert!(from.is_active_in(key("2030-01")));

        let until = NeedItem::new(NeedId(2), "Loan", Decimal::ONE).with_window(None, Some(key("2024-06")));
        assert!(until.is_active_in(key("2020-01")));
        assert!(!until.is_active_in(key("2024-07")));
    }

    #[test]
    fn patch_keeps_id_and_untouched_fields() {
        let mut item = NeedItem::new(NeedId(7), "Internet", Decimal::new(250, 0));
        item.apply(&NeedPatch {
            name: None,
            amount: Some(Decimal::new(300, 0)),
        });
        assert_eq!(item.id, NeedId(7));
        assert_eq!(item.name, "Internet");
        assert_eq!(item.amount, Decimal::new(300, 0));
    }

    #[test]
    fn parses_ids_with_and_without_prefix() {
        assert_eq!("need-12".parse::<NeedId>().unwrap(), NeedId(12));
        assert_eq!("12".parse::<NeedId>().unwrap(), NeedId(12));
        assert!("rent".parse::<NeedId>().is_err());
        assert_eq!(NeedId(3).to_string(), "need-3");
    }

    #[test]
    fn total_is_exact_sum() {
        let items = [
            NeedItem::new(NeedId(1), "A", Decimal::new(10010, 2)),
            NeedItem::new(NeedId(2), "B", Decimal::new(4990, 2)),
        ];
        assert_eq!(total(&items), Decimal::new(150, 0));
        assert_eq!(total(&[]), Decimal::ZERO);
    }

    #[test]
    fn total_saturates_instead_of_overflowing() {
        let items = [
            NeedItem::new(NeedId(1), "A", Decimal::MAX),
            NeedItem::new(NeedId(2), "B", Decimal::MAX),
            NeedItem::new(NeedId(3), "C", Decimal::ONE),
        ];
        assert_eq!(total(&items), Decimal::MAX);
    }
}
