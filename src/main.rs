use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};
use inquire::{Password, Text};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use self::budget::{display_currency, month_overview, BudgetView, FALLBACK_CURRENCY};
use self::config::{load_config, NeedsbookConfig};
use self::errors::NeedsbookError;
use self::month::MonthKey;
use self::needs::{NeedId, NeedPatch};
use self::parse::{coerce_amount, format_amount};
use self::store::confirm::{AssumeYes, Confirmation, PromptConfirmation};
use self::store::{snapshot, Action, FinanceState, Store};

mod backup;
mod budget;
mod config;
pub mod errors;
mod month;
mod needs;
mod parse;
mod store;

fn month_arg(s: &str) -> Result<MonthKey, String> {
    s.parse().map_err(|e: NeedsbookError| e.to_string())
}

fn id_arg(s: &str) -> Result<NeedId, String> {
    s.parse().map_err(|e: NeedsbookError| e.to_string())
}

#[derive(Parser, Debug)]
#[command(version, about = "Month-by-month baseline budget", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
    #[arg(short, long, global = true)]
    debug: bool,
    /// Snapshot file to use instead of the configured one
    #[arg(long, global = true)]
    data: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// First-time setup of the profile
    Setup {
        #[arg(short, long)]
        currency: Option<String>,
    },
    Settings {
        #[arg(short, long)]
        currency: String,
    },
    /// Show the needs of a month
    Status {
        #[arg(short, long, value_parser = month_arg)]
        month: Option<MonthKey>,
    },
    /// Which of the recent months have a needs list
    Months {
        #[arg(short, long, default_value_t = 18, value_parser = clap::value_parser!(u16).range(1..=1200))]
        count: u16,
    },
    Needs {
        #[command(subcommand)]
        action: NeedsCommand,
    },
    Template {
        #[command(subcommand)]
        action: TemplateCommand,
    },
    Backup {
        #[command(subcommand)]
        action: BackupCommand,
    },
}

#[derive(Subcommand, Debug)]
enum NeedsCommand {
    CreateFromTemplate {
        #[arg(short, long, value_parser = month_arg)]
        month: Option<MonthKey>,
    },
    /// Start the month as a copy of the month before
    CopyPrevious {
        #[arg(short, long, value_parser = month_arg)]
        month: Option<MonthKey>,
    },
    /// Overwrite the month with the template
    Reset {
        #[arg(short, long, value_parser = month_arg)]
        month: Option<MonthKey>,
        #[arg(short, long)]
        yes: bool,
    },
    /// Add an item; asks for name and amount when no name is given
    Add {
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(short, long, value_parser = month_arg)]
        month: Option<MonthKey>,
    },
    Edit {
        #[arg(long, value_parser = id_arg)]
        id: NeedId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
        #[arg(short, long, value_parser = month_arg)]
        month: Option<MonthKey>,
    },
    Delete {
        #[arg(long, value_parser = id_arg)]
        id: NeedId,
        #[arg(short, long, value_parser = month_arg)]
        month: Option<MonthKey>,
    },
}

#[derive(Subcommand, Debug)]
enum TemplateCommand {
    List,
    Add {
        #[arg(short, long)]
        name: String,
        #[arg(short, long)]
        amount: Option<String>,
        /// First month the item applies to
        #[arg(long, value_parser = month_arg)]
        start: Option<MonthKey>,
        /// Last month the item applies to
        #[arg(long, value_parser = month_arg)]
        end: Option<MonthKey>,
    },
    Edit {
        #[arg(long, value_parser = id_arg)]
        id: NeedId,
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short, long)]
        amount: Option<String>,
    },
    Remove {
        #[arg(long, value_parser = id_arg)]
        id: NeedId,
    },
}

#[derive(Subcommand, Debug)]
enum BackupCommand {
    Export {
        path: PathBuf,
        /// Protect the backup with a passphrase
        #[arg(short, long)]
        encrypt: bool,
    },
    /// Replace all data with the content of a backup
    Import {
        path: PathBuf,
        #[arg(short, long)]
        yes: bool,
    },
}

fn init_logging(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Only setup is reachable before setup, and setup is unreachable after it.
fn check_setup_gate(command: &Command, state: &FinanceState) -> Result<(), NeedsbookError> {
    match (command, state.profile.has_completed_setup) {
        (Command::Setup { .. }, true) => Err(NeedsbookError::SetupAlreadyCompleted),
        (Command::Setup { .. }, false) | (_, true) => Ok(()),
        (_, false) => Err(NeedsbookError::SetupRequired),
    }
}

fn confirmation(yes: bool) -> Box<dyn Confirmation> {
    if yes {
        Box::new(AssumeYes)
    } else {
        Box::new(PromptConfirmation)
    }
}

fn patch(name: Option<String>, amount: Option<String>) -> NeedPatch {
    NeedPatch {
        name,
        amount: amount.as_deref().map(coerce_amount),
    }
}

struct App {
    store: Store,
    config: NeedsbookConfig,
}

impl App {
    /// Runs one action and reports what happened. Returns whether the state
    /// changed and has to be saved.
    fn dispatch(&mut self, action: Action, yes: bool) -> Result<bool, NeedsbookError> {
        let outcome = self.store.dispatch(action, confirmation(yes).as_mut())?;
        println!("{outcome}");
        Ok(outcome.is_applied())
    }

    fn dispatch_for_month(&mut self, action: Action, month: MonthKey, yes: bool) -> Result<bool, NeedsbookError> {
        let changed = self.dispatch(action, yes)?;
        if changed {
            self.print_month(month);
        }
        Ok(changed)
    }

    fn print_month(&self, month: MonthKey) {
        print!("{}", BudgetView::new(self.store.state(), month, self.config.decimal_sep));
    }

    fn run(&mut self, command: Command, data_path: &Path) -> Result<bool, NeedsbookError> {
        match command {
            Command::Setup { currency } => {
                let currency = match currency {
                    Some(currency) => currency,
                    None => Text::new("Currency:")
                        .with_default(self.config.default_currency.as_deref().unwrap_or(FALLBACK_CURRENCY))
                        .with_help_message("Currency code used to display amounts, e.g. EUR")
                        .prompt()?,
                };
                self.dispatch(Action::CompleteSetup { currency }, false)
            }
            Command::Settings { currency } => self.dispatch(Action::SetCurrency { currency }, false),
            Command::Status { month } => {
                self.print_month(month.unwrap_or_else(MonthKey::current));
                Ok(false)
            }
            Command::Months { count } => {
                let state = self.store.state();
                let currency = display_currency(&state.profile);
                for summary in month_overview(state, MonthKey::current(), usize::from(count)) {
                    if summary.created {
                        println!(
                            "{}  {:>3} items  {:>14} {}",
                            summary.month,
                            summary.item_count,
                            format_amount(summary.total, self.config.decimal_sep),
                            currency
                        );
                    } else {
                        println!("{}  not set yet", summary.month);
                    }
                }
                Ok(false)
            }
            Command::Needs { action } => self.run_needs(action),
            Command::Template { action } => self.run_template(action),
            Command::Backup { action } => self.run_backup(action, data_path),
        }
    }

    fn run_needs(&mut self, command: NeedsCommand) -> Result<bool, NeedsbookError> {
        match command {
            NeedsCommand::CreateFromTemplate { month } => {
                let month = month.unwrap_or_else(MonthKey::current);
                self.dispatch_for_month(Action::CreateFromTemplate { month }, month, false)
            }
            NeedsCommand::CopyPrevious { month } => {
                let month = month.unwrap_or_else(MonthKey::current);
                self.dispatch_for_month(Action::CreateFromPreviousMonth { month }, month, false)
            }
            NeedsCommand::Reset { month, yes } => {
                let month = month.unwrap_or_else(MonthKey::current);
                self.dispatch_for_month(Action::ResetToTemplate { month }, month, yes)
            }
            NeedsCommand::Add {
                name,
                amount,
                month,
            } => {
                let month = month.unwrap_or_else(MonthKey::current);
                let (name, amount) = match (name, amount) {
                    (Some(name), amount) => (name, amount.as_deref().map(coerce_amount).unwrap_or_default()),
                    (None, Some(amount)) => (needs::item_name()?, coerce_amount(&amount)),
                    (None, None) => {
                        let name = needs::item_name()?;
                        let currency = display_currency(&self.store.state().profile).to_owned();
                        let amount = needs::money_amount(&currency, &name)?;
                        (name, amount)
                    }
                };
                self.dispatch_for_month(Action::AddItem { month, name, amount }, month, false)
            }
            NeedsCommand::Edit {
                id,
                name,
                amount,
                month,
            } => {
                let month = month.unwrap_or_else(MonthKey::current);
                let patch = patch(name, amount);
                self.dispatch_for_month(Action::UpdateItem { month, id, patch }, month, false)
            }
            NeedsCommand::Delete { id, month } => {
                let month = month.unwrap_or_else(MonthKey::current);
                self.dispatch_for_month(Action::DeleteItem { month, id }, month, false)
            }
        }
    }

    fn run_template(&mut self, command: TemplateCommand) -> Result<bool, NeedsbookError> {
        let changed = match command {
            TemplateCommand::List => false,
            TemplateCommand::Add {
                name,
                amount,
                start,
                end,
            } => {
                let amount = amount.as_deref().map(coerce_amount).unwrap_or_default();
                self.dispatch(
                    Action::AddTemplateItem {
                        name,
                        amount,
                        start,
                        end,
                    },
                    false,
                )?
            }
            TemplateCommand::Edit { id, name, amount } => {
                let patch = patch(name, amount);
                self.dispatch(Action::UpdateTemplateItem { id, patch }, false)?
            }
            TemplateCommand::Remove { id } => self.dispatch(Action::RemoveTemplateItem { id }, false)?,
        };
        let template = &self.store.state().needs_template;
        if template.items().is_empty() {
            println!("The template is empty. Add recurring costs with `template add`.");
        } else {
            println!("The template is just a starting point. Once a month is created, it becomes independent.");
            for item in template.items() {
                println!("{item}");
            }
        }
        Ok(changed)
    }

    fn run_backup(&mut self, command: BackupCommand, data_path: &Path) -> Result<bool, NeedsbookError> {
        match command {
            BackupCommand::Export { path, encrypt } => {
                let passphrase = if encrypt {
                    Some(Password::new("Backup passphrase:").prompt()?)
                } else {
                    None
                };
                backup::export(&path, self.store.state(), passphrase)?;
                println!("Backup written to {}", path.display());
                Ok(false)
            }
            BackupCommand::Import { path, yes } => {
                self.import_backup(&path, data_path, confirmation(yes).as_mut())
            }
        }
    }

    fn import_backup(
        &mut self,
        path: &Path,
        data_path: &Path,
        confirmation: &mut dyn Confirmation,
    ) -> Result<bool, NeedsbookError> {
        let state = backup::import(path, || {
            Ok(Password::new("Backup passphrase:").without_confirmation().prompt()?)
        })?;
        let question = format!(
            "Replace all data in {} with {}?",
            data_path.display(),
            path.display()
        );
        if !confirmation.confirm(&question)? {
            println!("Cancelled, nothing was imported.");
            return Ok(false);
        }
        self.store.replace(state);
        println!("Backup restored from {}", path.display());
        Ok(true)
    }
}

fn main() -> Result<(), NeedsbookError> {
    let args = Args::parse();
    init_logging(args.debug);
    let config = load_config(&std::env::current_dir()?)?;
    let data_path = args.data.clone().unwrap_or_else(|| config.data_path());

    let store = Store::new(snapshot::load(&data_path)?);
    check_setup_gate(&args.command, store.state())?;
    debug!(state = ?store.state(), "state before");

    let mut app = App { store, config };
    if app.run(args.command, &data_path)? {
        debug!(state = ?app.store.state(), "state after");
        snapshot::save(&data_path, app.store.state())?;
    }

    Ok(())
}
