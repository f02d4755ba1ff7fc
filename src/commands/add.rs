use crate::args::AddArgs;
use crate::commands::{with_warnings, Out};
use crate::error::{ErrorType, IntoResult};
use crate::ledger::{Ledger, Outcome};
use crate::model::{Expense, NewExpense, ReceiptFile};
use crate::{Config, Result};

/// Records a new expense. A receipt that cannot be uploaded does not stop the expense from being
/// saved; the problem is reported as a warning instead.
pub async fn add(config: Config, args: AddArgs) -> Result<Out<Outcome<Expense>>> {
    let receipt = match args.receipt() {
        Some(path) => Some(
            ReceiptFile::load(path)
                .await
                .pub_result(ErrorType::Validation)?,
        ),
        None => None,
    };
    let expense = NewExpense::new(
        args.date(),
        args.amount(),
        args.category().clone(),
        args.description().map(str::to_string),
    );

    let mut ledger = Ledger::open(&config).await?;
    let outcome = ledger.create(expense, receipt).await?;
    let added = &outcome.value;
    let message = format!(
        "Added {} for {} on {} ({})",
        added.amount,
        added.category.label(),
        added.date,
        added.id
    );
    Ok(Out::new(with_warnings(message, &outcome.warnings), outcome))
}
