use crate::args::EditArgs;
use crate::commands::{describe, find_expense, with_warnings, Out};
use crate::error::{ErrorType, IntoResult};
use crate::ledger::{Ledger, Outcome};
use crate::model::{Expense, ExpenseChanges, ReceiptFile};
use crate::{Config, Result};

/// Changes the fields given in `args` on an existing expense. A new receipt replaces the current
/// one in the order set by `receipt_replacement` in the config.
pub async fn edit(config: Config, args: EditArgs) -> Result<Out<Outcome<Expense>>> {
    let receipt = match args.receipt() {
        Some(path) => Some(
            ReceiptFile::load(path)
                .await
                .pub_result(ErrorType::Validation)?,
        ),
        None => None,
    };
    let mut changes = ExpenseChanges::default();
    if let Some(amount) = args.amount() {
        changes = changes.amount(amount);
    }
    if let Some(category) = args.category() {
        changes = changes.category(category.clone());
    }
    if let Some(description) = args.description() {
        changes = changes.description(description);
    }

    let mut ledger = Ledger::open(&config).await?;
    let current = find_expense(&mut ledger, args.date(), args.id()).await?;
    let outcome = ledger.update(&current, changes, receipt).await?;
    let message = format!("Updated {}", describe(&outcome.value));
    Ok(Out::new(with_warnings(message, &outcome.warnings), outcome))
}
