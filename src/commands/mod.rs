//! Command handlers for the kakeibo CLI.
//!
//! This module contains implementations for all CLI subcommands.

mod add;
mod day;
mod delete;
mod edit;
mod init;
mod login;
mod month;
mod receipt;

use crate::error::{ErrorType, IntoResult};
use crate::ledger::{Ledger, Warning};
use crate::model::{Expense, ExpenseId};
use crate::Result;
use anyhow::Context;
use chrono::NaiveDate;
use serde::Serialize;
use std::fmt::Debug;
use tracing::{debug, info};

pub use add::add;
pub use day::{day, DaySummary};
pub use delete::delete;
pub use edit::edit;
pub use init::init;
pub use login::login;
pub use month::month;
pub use receipt::receipt;

/// The output type for a command. This allows the command to return a consistent message and,
/// optionally, structured data.
#[derive(Debug, Clone, Serialize)]
pub struct Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// A message that can be printed to the user regarding the outcome of the command execution.
    message: String,

    /// Any structured data that needs to be output from the call.
    structure: Option<T>,
}

impl<T, S> From<S> for Out<T>
where
    T: Debug + Clone + Serialize,
    S: Into<String>,
{
    fn from(value: S) -> Self {
        Out::new_message(value)
    }
}

impl<T> Out<T>
where
    T: Serialize + Clone + Debug,
{
    /// Create a new `Out` object that has `Some(structure)`.
    pub fn new<S>(message: S, structure: T) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: Some(structure),
        }
    }

    /// Create a new `Out` object that has `None` for `structure`.
    pub fn new_message<S>(message: S) -> Self
    where
        S: Into<String>,
    {
        Self {
            message: message.into(),
            structure: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn structure(&self) -> Option<&T> {
        self.structure.as_ref()
    }

    /// Print the message to `info!` and the structured data (if it exists) as JSON to `debug!`.
    pub fn print(&self) {
        info!("{}", self.message);
        if let Some(structure) = self.structure() {
            if let Ok(json) = serde_json::to_string_pretty(structure) {
                debug!("Command output:\n\n{json}\n\n");
            }
        }
    }
}

/// Loads `date` and finds the expense `id` on it.
async fn find_expense(ledger: &mut Ledger, date: NaiveDate, id: &str) -> Result<Expense> {
    ledger.load_day(date).await?;
    ledger
        .cache()
        .get(&ExpenseId::new(id), date)
        .cloned()
        .with_context(|| format!("There is no expense '{id}' on {date}"))
        .pub_result(ErrorType::Validation)
}

/// Appends any receipt warnings to a command's message.
fn with_warnings(message: String, warnings: &[Warning]) -> String {
    warnings.iter().fold(message, |mut message, warning| {
        message.push_str("\nWarning: ");
        message.push_str(&warning.to_string());
        message
    })
}

/// A one-line description of an expense.
fn describe(expense: &Expense) -> String {
    let mut line = format!(
        "{}  {:>10}  {}",
        expense.id,
        expense.amount.to_string(),
        expense.category.label()
    );
    if let Some(description) = &expense.description {
        line.push_str("  ");
        line.push_str(description);
    }
    if expense.has_receipt() {
        line.push_str("  [receipt]");
    }
    line
}
