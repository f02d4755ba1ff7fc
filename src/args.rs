//! These structs provide the CLI interface for the kakeibo CLI.

use crate::calendar::Month;
use crate::model::{Amount, Category};
use chrono::NaiveDate;
use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt::{Display, Formatter};
use std::ops::Deref;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::error;
use tracing_subscriber::filter::LevelFilter;

/// kakeibo: a calendar-based household expense book.
///
/// Record what you spend on each day, attach photos of receipts, and see how the month adds up by
/// category. Expenses are kept in a Supabase project, or in a local SQLite database if you would
/// rather not run a server.
#[derive(Debug, Parser, Clone)]
pub struct Args {
    #[clap(flatten)]
    common: Common,

    #[command(subcommand)]
    command: Command,
}

impl Args {
    pub fn new(common: Common, command: Command) -> Self {
        Self { common, command }
    }

    pub fn common(&self) -> &Common {
        &self.common
    }

    pub fn command(&self) -> &Command {
        &self.command
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Create the data directory and its configuration file.
    ///
    /// With `--backend local` everything is stored in `$KAKEIBO_HOME`. With `--backend supabase`
    /// you also pass the project URL and anon key, and then sign in with `kakeibo login`.
    Init(InitArgs),
    /// Sign in to the Supabase project and save the session.
    Login(LoginArgs),
    /// Show the calendar for a month with daily totals and the category breakdown.
    Month(MonthArgs),
    /// List the expenses of one day.
    Day(DayArgs),
    /// Record an expense, optionally with a receipt image.
    Add(AddArgs),
    /// Change an expense or replace its receipt.
    Edit(EditArgs),
    /// Delete an expense and its receipt.
    Delete(DeleteArgs),
    /// Print a temporary link to an expense's receipt.
    Receipt(ReceiptArgs),
}

/// Arguments common to all subcommands.
#[derive(Debug, Parser, Clone)]
pub struct Common {
    /// The logging verbosity. One of, from least to most verbose:
    /// off, error, warn, info, debug, trace
    ///
    /// This can be overridden by RUST_LOG.
    #[arg(long, default_value_t = LevelFilter::INFO)]
    log_level: LevelFilter,

    /// The directory where kakeibo data and configuration is held. Defaults to ~/kakeibo
    #[arg(long, env = "KAKEIBO_HOME", default_value_t = default_kakeibo_home())]
    kakeibo_home: DisplayPath,
}

impl Common {
    pub fn new(log_level: LevelFilter, kakeibo_home: PathBuf) -> Self {
        Self {
            log_level,
            kakeibo_home: kakeibo_home.into(),
        }
    }

    pub fn log_level(&self) -> LevelFilter {
        self.log_level
    }

    pub fn kakeibo_home(&self) -> &DisplayPath {
        &self.kakeibo_home
    }
}

/// Which kind of backend `kakeibo init` sets up.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    #[default]
    Local,
    Supabase,
}

serde_plain::derive_display_from_serialize!(BackendKind);

/// (Not shown): Args for the `kakeibo init` command.
#[derive(Debug, Parser, Clone)]
pub struct InitArgs {
    #[arg(long, value_enum, default_value_t = BackendKind::Local)]
    backend: BackendKind,

    /// The project URL, e.g. https://xyzcompany.supabase.co. Required for the supabase backend.
    #[arg(long, required_if_eq("backend", "supabase"))]
    url: Option<String>,

    /// The project's public anon key. Required for the supabase backend.
    #[arg(long, required_if_eq("backend", "supabase"))]
    anon_key: Option<String>,
}

impl InitArgs {
    pub fn new(backend: BackendKind, url: Option<String>, anon_key: Option<String>) -> Self {
        Self {
            backend,
            url,
            anon_key,
        }
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn anon_key(&self) -> Option<&str> {
        self.anon_key.as_deref()
    }
}

/// (Not shown): Args for the `kakeibo login` command.
#[derive(Debug, Parser, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    email: String,

    #[arg(long, env = "KAKEIBO_PASSWORD", hide_env_values = true)]
    password: String,
}

impl LoginArgs {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn password(&self) -> &str {
        &self.password
    }
}

/// (Not shown): Args for the `kakeibo month` command.
#[derive(Debug, Parser, Clone)]
pub struct MonthArgs {
    /// The month to show as YYYY-MM. Defaults to the current month.
    #[arg(long)]
    month: Option<Month>,
}

impl MonthArgs {
    pub fn new(month: Option<Month>) -> Self {
        Self { month }
    }

    pub fn month(&self) -> Option<Month> {
        self.month
    }
}

/// (Not shown): Args for the `kakeibo day` command.
#[derive(Debug, Parser, Clone)]
pub struct DayArgs {
    /// The day as YYYY-MM-DD.
    #[arg(long)]
    date: NaiveDate,
}

impl DayArgs {
    pub fn new(date: NaiveDate) -> Self {
        Self { date }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

/// (Not shown): Args for the `kakeibo add` command.
#[derive(Debug, Parser, Clone)]
pub struct AddArgs {
    /// The day of the expense as YYYY-MM-DD.
    #[arg(long)]
    date: NaiveDate,

    /// Whole yen, e.g. 1200 or ¥1,200.
    #[arg(long)]
    amount: Amount,

    /// One of food, transport, housing, utilities, communications, medical, education,
    /// entertainment, clothing, daily-goods, social, other (or the Japanese label).
    #[arg(long)]
    category: Category,

    #[arg(long)]
    description: Option<String>,

    /// A JPEG, PNG, WebP or HEIC image of 5MB or less.
    #[arg(long)]
    receipt: Option<PathBuf>,
}

impl AddArgs {
    pub fn new(
        date: NaiveDate,
        amount: Amount,
        category: Category,
        description: Option<String>,
        receipt: Option<PathBuf>,
    ) -> Self {
        Self {
            date,
            amount,
            category,
            description,
            receipt,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn amount(&self) -> Amount {
        self.amount
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn receipt(&self) -> Option<&Path> {
        self.receipt.as_deref()
    }
}

/// (Not shown): Args for the `kakeibo edit` command.
#[derive(Debug, Parser, Clone)]
pub struct EditArgs {
    /// The day the expense is recorded on, as YYYY-MM-DD.
    #[arg(long)]
    date: NaiveDate,

    /// The id of the expense, as shown by `kakeibo day`.
    #[arg(long)]
    id: String,

    #[arg(long)]
    amount: Option<Amount>,

    #[arg(long)]
    category: Option<Category>,

    /// The new description. Pass an empty string to remove it.
    #[arg(long)]
    description: Option<String>,

    /// A new receipt image, replacing the current one.
    #[arg(long)]
    receipt: Option<PathBuf>,
}

impl EditArgs {
    pub fn new(date: NaiveDate, id: impl Into<String>) -> Self {
        Self {
            date,
            id: id.into(),
            amount: None,
            category: None,
            description: None,
            receipt: None,
        }
    }

    pub fn with_amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_receipt(mut self, receipt: impl Into<PathBuf>) -> Self {
        self.receipt = Some(receipt.into());
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn amount(&self) -> Option<Amount> {
        self.amount
    }

    pub fn category(&self) -> Option<&Category> {
        self.category.as_ref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn receipt(&self) -> Option<&Path> {
        self.receipt.as_deref()
    }
}

/// (Not shown): Args for the `kakeibo delete` command.
#[derive(Debug, Parser, Clone)]
pub struct DeleteArgs {
    /// The day the expense is recorded on, as YYYY-MM-DD.
    #[arg(long)]
    date: NaiveDate,

    #[arg(long)]
    id: String,
}

impl DeleteArgs {
    pub fn new(date: NaiveDate, id: impl Into<String>) -> Self {
        Self {
            date,
            id: id.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// (Not shown): Args for the `kakeibo receipt` command.
#[derive(Debug, Parser, Clone)]
pub struct ReceiptArgs {
    /// The day the expense is recorded on, as YYYY-MM-DD.
    #[arg(long)]
    date: NaiveDate,

    #[arg(long)]
    id: String,
}

impl ReceiptArgs {
    pub fn new(date: NaiveDate, id: impl Into<String>) -> Self {
        Self {
            date,
            id: id.into(),
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

fn default_kakeibo_home() -> DisplayPath {
    DisplayPath(match dirs::home_dir() {
        Some(home) => home.join("kakeibo"),
        None => {
            error!(
                "There was an error when trying to get your home directory. You can get around \
                this by providing --kakeibo-home or KAKEIBO_HOME instead of relying on the \
                default directory.",
            );
            PathBuf::from("kakeibo")
        }
    })
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct DisplayPath(PathBuf);

impl From<PathBuf> for DisplayPath {
    fn from(value: PathBuf) -> Self {
        DisplayPath(value)
    }
}

impl Deref for DisplayPath {
    type Target = Path;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<Path> for DisplayPath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl Display for DisplayPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.to_string_lossy())
    }
}

impl FromStr for DisplayPath {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(PathBuf::from(s)))
    }
}

impl DisplayPath {
    pub fn path(&self) -> &Path {
        &self.0
    }
}
