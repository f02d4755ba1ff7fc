use crate::args::ReceiptArgs;
use crate::commands::{find_expense, Out};
use crate::ledger::Ledger;
use crate::{Config, Result};

/// Prints a link to an expense's receipt that stays valid for `signed_url_ttl` seconds.
pub async fn receipt(config: Config, args: ReceiptArgs) -> Result<Out<Option<String>>> {
    let mut ledger = Ledger::open(&config).await?;
    let expense = find_expense(&mut ledger, args.date(), args.id()).await?;
    match ledger.receipt_url(&expense).await? {
        Some(url) => Ok(Out::new(url.clone(), Some(url))),
        None => Ok(Out::new(
            format!("Expense {} has no receipt", expense.id),
            None,
        )),
    }
}
