use serde::{Deserialize, Serialize};

use crate::month::MonthKey;

use super::{NeedId, NeedItem, NeedPatch};

/// The recurring baseline costs that new months start from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NeedsTemplate {
    items: Vec<NeedItem>,
}

impl NeedsTemplate {
    pub fn items(&self) -> &[NeedItem] {
        &self.items
    }

    pub fn active_in(&self, month: MonthKey) -> impl Iterator<Item = &NeedItem> {
        self.items.iter().filter(move |item| item.is_active_in(month))
    }

    pub fn push(&mut self, item: NeedItem) {
        self.items.push(item);
    }

    pub fn update(&mut self, id: NeedId, patch: &NeedPatch) -> bool {
        match self.items.iter_mut().find(|item| item.id == id) {
            Some(item) => {
                item.apply(patch);
                true
            }
            None => false,
        }
    }

    pub fn remove(&mut self, id: NeedId) -> bool {
        let before = self.items.len();
        self.items.retain(|item| item.id != id);
        self.items.len() != before
    }
}

/// A window is valid unless it ends before it starts.
pub fn valid_window(start: Option<MonthKey>, end: Option<MonthKey>) -> bool {
    match (start, end) {
        (Some(start), Some(end)) => start <= end,
        _ => true,
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn key(s: &str) -> MonthKey {
        s.parse().unwrap()
    }

    #[test]
    fn filters_by_activity_window_in_order() {
        let mut template = NeedsTemplate::default();
        template.push(NeedItem::new(NeedId(1), "Rent", Decimal::new(4000, 0)));
        template.push(
            NeedItem::new(NeedId(2), "Streaming", Decimal::new(60, 0))
                .with_window(None, Some(key("2024-02"))),
        );
        template.push(NeedItem::new(NeedId(3), "Transport", Decimal::new(300, 0)));

        let names: Vec<&str> = template
            .active_in(key("2024-03"))
            .map(|item| item.name.as_str())
            .collect();
        assert_eq!(names, ["Rent", "Transport"]);
        assert_eq!(template.active_in(key("2024-02")).count(), 3);
    }

    #[test]
    fn update_and_remove_report_misses() {
        let mut template = NeedsTemplate::default();
        template.push(NeedItem::new(NeedId(1), "Rent", Decimal::new(4000, 0)));
        let patch = NeedPatch {
            name: Some("Flat".into()),
            amount: None,
        };
        assert!(!template.update(NeedId(9), &patch));
        assert!(template.update(NeedId(1), &patch));
        assert_eq!(template.items()[0].name, "Flat");
        assert!(!template.remove(NeedId(9)));
        assert!(template.remove(NeedId(1)));
        assert!(template.items().is_empty());
    }

    #[test]
    fn window_ordering() {
        assert!(valid_window(None, None));
        assert!(valid_window(Some(key("2024-01")), Some(key("2024-01"))));
        assert!(!valid_window(Some(key("2024-02")), Some(key("2024-01"))));
    }
}
