use std::collections::BTreeMap;
use std::fmt::Display;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::errors::NeedsbookError;
use crate::month::MonthKey;
use crate::needs::template::{valid_window, NeedsTemplate};
use crate::needs::{NeedId, NeedItem, NeedPatch};
use crate::parse::MAX_AMOUNT;

use self::confirm::Confirmation;

pub mod confirm;
pub mod snapshot;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub currency: Option<String>,
    pub has_completed_setup: bool,
}

/// Everything the application knows, saved and loaded as one snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinanceState {
    pub profile: Profile,
    pub needs_template: NeedsTemplate,
    /// A missing key means the month was never created, which is different
    /// from a created month without items.
    pub month_needs: BTreeMap<MonthKey, Vec<NeedItem>>,
    #[serde(default)]
    last_id: u64,
}

impl FinanceState {
    pub fn month(&self, month: MonthKey) -> Option<&[NeedItem]> {
        self.month_needs.get(&month).map(Vec::as_slice)
    }

    pub fn has_month(&self, month: MonthKey) -> bool {
        self.month_needs.contains_key(&month)
    }

    fn fresh_id(&mut self) -> NeedId {
        self.last_id += 1;
        NeedId(self.last_id)
    }

    fn copy_with_fresh_ids<'a>(&mut self, items: impl IntoIterator<Item = &'a NeedItem>) -> Vec<NeedItem> {
        items
            .into_iter()
            .map(|item| item.copied_as(self.fresh_id()))
            .collect()
    }

    /// Moves the id counter past every id in use, so that snapshots written by
    /// hand or by an older version never hand out a duplicate id.
    pub fn repair_id_counter(&mut self) {
        let highest = self
            .needs_template
            .items()
            .iter()
            .chain(self.month_needs.values().flatten())
            .map(|item| item.id.0)
            .max()
            .unwrap_or(0);
        self.last_id = self.last_id.max(highest);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    CompleteSetup {
        currency: String,
    },
    SetCurrency {
        currency: String,
    },
    CreateFromTemplate {
        month: MonthKey,
    },
    CreateFromPreviousMonth {
        month: MonthKey,
    },
    ResetToTemplate {
        month: MonthKey,
    },
    AddItem {
        month: MonthKey,
        name: String,
        amount: Decimal,
    },
    UpdateItem {
        month: MonthKey,
        id: NeedId,
        patch: NeedPatch,
    },
    DeleteItem {
        month: MonthKey,
        id: NeedId,
    },
    AddTemplateItem {
        name: String,
        amount: Decimal,
        start: Option<MonthKey>,
        end: Option<MonthKey>,
    },
    UpdateTemplateItem {
        id: NeedId,
        patch: NeedPatch,
    },
    RemoveTemplateItem {
        id: NeedId,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoredReason {
    EmptyName,
    EmptyPatch,
    InvalidWindow,
    MonthNotCreated(MonthKey),
    MonthAlreadyCreated(MonthKey),
    NoEarlierMonth(MonthKey),
    UnknownItem(NeedId),
}

impl Display for IgnoredReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IgnoredReason::EmptyName => write!(f, "the name is empty"),
            IgnoredReason::EmptyPatch => write!(f, "there is nothing to change"),
            IgnoredReason::InvalidWindow => write!(f, "the start month is after the end month"),
            IgnoredReason::MonthNotCreated(month) => {
                write!(f, "{month} has not been created yet")
            }
            IgnoredReason::MonthAlreadyCreated(month) => {
                write!(f, "{month} already has a needs list")
            }
            IgnoredReason::NoEarlierMonth(month) => {
                write!(f, "{month} has no previous month to copy from")
            }
            IgnoredReason::UnknownItem(id) => write!(f, "there is no item {id}"),
        }
    }
}

/// What happened to a dispatched action. None of these are errors: the state
/// is consistent after each of them, and only `Applied` changed it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Applied,
    Ignored(IgnoredReason),
    MissingSourceMonth { source: MonthKey },
    Declined,
}

impl Outcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied)
    }
}

impl Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Applied => write!(f, "Done."),
            Outcome::Ignored(reason) => write!(f, "Nothing changed: {reason}."),
            Outcome::MissingSourceMonth { source } => write!(
                f,
                "No needs list found for {source}. Create from template first."
            ),
            Outcome::Declined => write!(f, "Cancelled, the list was left as it was."),
        }
    }
}

fn clamp_amount(amount: Decimal) -> Decimal {
    amount.clamp(Decimal::ZERO, MAX_AMOUNT)
}

fn clamp_patch(patch: &NeedPatch) -> NeedPatch {
    NeedPatch {
        name: patch.name.clone(),
        amount: patch.amount.map(clamp_amount),
    }
}

fn create_from_template(state: &mut FinanceState, month: MonthKey) {
    let template = state.needs_template.clone();
    let items = state.copy_with_fresh_ids(template.active_in(month));
    state.month_needs.insert(month, items);
}

/// Applies `action` to `state`. Never prompts and never touches the disk, so
/// anything that needs the user's consent has to be settled before calling it.
pub fn reduce(mut state: FinanceState, action: &Action) -> (FinanceState, Outcome) {
    let outcome = match action {
        Action::CompleteSetup { currency } => {
            let currency = currency.trim();
            state.profile.currency = (!currency.is_empty()).then(|| currency.to_uppercase());
            state.profile.has_completed_setup = true;
            Outcome::Applied
        }
        Action::SetCurrency { currency } => {
            let currency = currency.trim();
            state.profile.currency = (!currency.is_empty()).then(|| currency.to_uppercase());
            Outcome::Applied
        }
        Action::CreateFromTemplate { month } => {
            if state.has_month(*month) {
                Outcome::Ignored(IgnoredReason::MonthAlreadyCreated(*month))
            } else {
                create_from_template(&mut state, *month);
                Outcome::Applied
            }
        }
        Action::ResetToTemplate { month } => {
            create_from_template(&mut state, *month);
            Outcome::Applied
        }
        Action::CreateFromPreviousMonth { month } => {
            if state.has_month(*month) {
                return (state, Outcome::Ignored(IgnoredReason::MonthAlreadyCreated(*month)));
            }
            let Some(source) = month.previous() else {
                return (state, Outcome::Ignored(IgnoredReason::NoEarlierMonth(*month)));
            };
            if let Some(previous) = state.month_needs.get(&source).cloned() {
                let items = state.copy_with_fresh_ids(&previous);
                state.month_needs.insert(*month, items);
                Outcome::Applied
            } else {
                Outcome::MissingSourceMonth { source }
            }
        }
        Action::AddItem {
            month,
            name,
            amount,
        } => {
            let name = name.trim();
            if !state.has_month(*month) {
                Outcome::Ignored(IgnoredReason::MonthNotCreated(*month))
            } else if name.is_empty() {
                Outcome::Ignored(IgnoredReason::EmptyName)
            } else {
                let item = NeedItem::new(state.fresh_id(), name, clamp_amount(*amount));
                state.month_needs.entry(*month).or_default().push(item);
                Outcome::Applied
            }
        }
        Action::UpdateItem { month, id, patch } => match state.month_needs.get_mut(month) {
            None => Outcome::Ignored(IgnoredReason::MonthNotCreated(*month)),
            Some(_) if patch.is_empty() => Outcome::Ignored(IgnoredReason::EmptyPatch),
            Some(items) => match items.iter_mut().find(|item| item.id == *id) {
                Some(item) => {
                    item.apply(&clamp_patch(patch));
                    Outcome::Applied
                }
                None => Outcome::Ignored(IgnoredReason::UnknownItem(*id)),
            },
        },
        Action::DeleteItem { month, id } => match state.month_needs.get_mut(month) {
            None => Outcome::Ignored(IgnoredReason::MonthNotCreated(*month)),
            Some(items) => {
                let before = items.len();
                items.retain(|item| item.id != *id);
                if items.len() == before {
                    Outcome::Ignored(IgnoredReason::UnknownItem(*id))
                } else {
                    Outcome::Applied
                }
            }
        },
        Action::AddTemplateItem {
            name,
            amount,
            start,
            end,
        } => {
            let name = name.trim();
            if name.is_empty() {
                Outcome::Ignored(IgnoredReason::EmptyName)
            } else if !valid_window(*start, *end) {
                Outcome::Ignored(IgnoredReason::InvalidWindow)
            } else {
                let item = NeedItem::new(state.fresh_id(), name, clamp_amount(*amount))
                    .with_window(*start, *end);
                state.needs_template.push(item);
                Outcome::Applied
            }
        }
        Action::UpdateTemplateItem { id, patch } => {
            if patch.is_empty() {
                Outcome::Ignored(IgnoredReason::EmptyPatch)
            } else if state.needs_template.update(*id, &clamp_patch(patch)) {
                Outcome::Applied
            } else {
                Outcome::Ignored(IgnoredReason::UnknownItem(*id))
            }
        }
        Action::RemoveTemplateItem { id } => {
            if state.needs_template.remove(*id) {
                Outcome::Applied
            } else {
                Outcome::Ignored(IgnoredReason::UnknownItem(*id))
            }
        }
    };
    (state, outcome)
}

/// Owns the state and runs every change through [`reduce`].
#[derive(Debug, Default)]
pub struct Store {
    state: FinanceState,
}

impl Store {
    pub fn new(mut state: FinanceState) -> Self {
        state.repair_id_counter();
        Self { state }
    }

    pub fn state(&self) -> &FinanceState {
        &self.state
    }

    /// Swaps in a whole new state, as when restoring a backup.
    pub fn replace(&mut self, state: FinanceState) {
        *self = Self::new(state);
    }

    /// The question to ask before `action` may run, if it would overwrite
    /// something the user created.
    pub fn confirmation_for(&self, action: &Action) -> Option<String> {
        match action {
            Action::ResetToTemplate { month } if self.state.has_month(*month) => Some(format!(
                "Reset {month}? This will overwrite your current list."
            )),
            _ => None,
        }
    }

    pub fn dispatch(
        &mut self,
        action: Action,
        confirmation: &mut dyn Confirmation,
    ) -> Result<Outcome, NeedsbookError> {
        if let Some(question) = self.confirmation_for(&action) {
            if !confirmation.confirm(&question)? {
                info!(?action, "overwrite declined");
                return Ok(Outcome::Declined);
            }
        }
        let state = std::mem::take(&mut self.state);
        let (state, outcome) = reduce(state, &action);
        self.state = state;
        debug!(?action, ?outcome, "action dispatched");
        Ok(outcome)
    }
}
