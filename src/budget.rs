use std::fmt::Display;

use rust_decimal::Decimal;

use crate::month::MonthKey;
use crate::needs::{total, NeedItem};
use crate::parse::format_amount;
use crate::store::{FinanceState, Profile};

pub const FALLBACK_CURRENCY: &str = "MAD";

/// Baseline amount of a month; a month that was never created counts as zero.
pub fn baseline_total(items: Option<&[NeedItem]>) -> Decimal {
    items.map(total).unwrap_or(Decimal::ZERO)
}

pub fn display_currency(profile: &Profile) -> &str {
    profile
        .currency
        .as_deref()
        .filter(|currency| !currency.trim().is_empty())
        .unwrap_or(FALLBACK_CURRENCY)
}

/// Everything shown for one month. Built fresh from the state on every read.
#[derive(Debug)]
pub struct BudgetView<'a> {
    pub month: MonthKey,
    pub items: Option<&'a [NeedItem]>,
    pub total: Decimal,
    pub currency: &'a str,
    decimal_sep: char,
}

impl<'a> BudgetView<'a> {
    pub fn new(state: &'a FinanceState, month: MonthKey, decimal_sep: char) -> Self {
        let items = state.month(month);
        Self {
            month,
            items,
            total: baseline_total(items),
            currency: display_currency(&state.profile),
            decimal_sep,
        }
    }

    fn money(&self, value: Decimal) -> String {
        format!("{} {}", format_amount(value, self.decimal_sep), self.currency)
    }
}

impl Display for BudgetView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Needs for {}", self.month)?;
        writeln!(f, "Baseline (this month): {}", self.money(self.total))?;
        let Some(items) = self.items else {
            writeln!(f, "Not set yet")?;
            writeln!(f, "Create the month first, then you can edit items.")?;
            return writeln!(
                f,
                "Tip: use `needs copy-previous` when only one item changes (like ending a subscription)."
            );
        };
        writeln!(f, "Month-specific list")?;
        if items.is_empty() {
            writeln!(f, "No needs items yet")?;
            return writeln!(
                f,
                "Add your baseline costs with `needs add` (rent, bills, transport...)."
            );
        }
        writeln!(f, "{:>8} {:24} {:>16}", "id", "item", "amount")?;
        for item in items {
            writeln!(
                f,
                "{:>8} {:24} {:>16}",
                item.id.to_string(),
                item.name,
                self.money(item.amount)
            )?;
        }
        Ok(())
    }
}

/// One line of the month overview.
#[derive(Debug, PartialEq, Eq)]
pub struct MonthSummary {
    pub month: MonthKey,
    pub created: bool,
    pub item_count: usize,
    pub total: Decimal,
}

pub fn month_overview(state: &FinanceState, newest: MonthKey, count: usize) -> Vec<MonthSummary> {
    newest
        .recent(count)
        .into_iter()
        .map(|month| {
            let items = state.month(month);
            MonthSummary {
                month,
                created: items.is_some(),
                item_count: items.map_or(0, <[NeedItem]>::len),
                total: baseline_total(items),
            }
        })
        .collect()
}
