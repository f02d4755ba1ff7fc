//! Delete command handler.

use crate::args::DeleteArgs;
use crate::commands::{describe, find_expense, with_warnings, Out};
use crate::ledger::{Ledger, Outcome};
use crate::{Config, Result};

/// Permanently deletes an expense along with its receipt image.
pub async fn delete(config: Config, args: DeleteArgs) -> Result<Out<Outcome<()>>> {
    let mut ledger = Ledger::open(&config).await?;
    let expense = find_expense(&mut ledger, args.date(), args.id()).await?;
    let outcome = ledger.delete(&expense).await?;
    let message = format!("Deleted {}", describe(&expense));
    Ok(Out::new(with_warnings(message, &outcome.warnings), outcome))
}
