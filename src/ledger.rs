//! The create, update and delete flows for an expense and its receipt image.
//!
//! A `Ledger` owns the store and the cache for one view. Each flow runs its remote calls one after
//! another and only touches the cache once the row-level call has succeeded. Receipt problems never
//! fail a flow; they come back as `Warning`s on the `Outcome`.

use crate::aggregate::{self, MonthView};
use crate::api::{self, Store};
use crate::cache::ExpenseCache;
use crate::calendar::{DateRange, Month};
use crate::config::ReceiptReplacement;
use crate::error::{ErrorType, IntoResult, Result};
use crate::model::{Expense, ExpenseChanges, ExpenseId, NewExpense, ReceiptFile};
use crate::Config;
use chrono::{NaiveDate, Utc};
use serde::Serialize;
use std::fmt::{Display, Formatter};
use tracing::{debug, warn};

/// Something that went wrong with a receipt while the row-level change went through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Warning {
    /// The new receipt could not be uploaded, the expense was saved without it.
    ReceiptUploadFailed { message: String },
    /// There was no signed-in user to own the receipt, so it was not uploaded.
    NoSignedInUser,
    /// The receipt was uploaded but could not be linked to the expense. The upload was removed.
    ReceiptAttachFailed { message: String },
    /// The receipt being replaced could not be deleted and may be left in storage.
    OldReceiptDeleteFailed { path: String, message: String },
    /// The receipt of a deleted expense could not be deleted and may be left in storage.
    ReceiptDeleteFailed { path: String, message: String },
}

impl Display for Warning {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Warning::ReceiptUploadFailed { message } => {
                write!(f, "The receipt could not be uploaded: {message}")
            }
            Warning::NoSignedInUser => {
                write!(f, "The receipt was not uploaded because no user is signed in")
            }
            Warning::ReceiptAttachFailed { message } => {
                write!(f, "The receipt could not be attached to the expense: {message}")
            }
            Warning::OldReceiptDeleteFailed { path, message } => {
                write!(f, "The previous receipt '{path}' could not be deleted: {message}")
            }
            Warning::ReceiptDeleteFailed { path, message } => {
                write!(f, "The receipt '{path}' could not be deleted: {message}")
            }
        }
    }
}

/// The result of a flow that succeeded, possibly only in part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Outcome<T> {
    pub value: T,
    pub warnings: Vec<Warning>,
}

impl<T> Outcome<T> {
    fn new(value: T, warnings: Vec<Warning>) -> Self {
        Self { value, warnings }
    }

    /// True when the row changed but something about its receipt did not work out.
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}

/// Drives one view: loads expenses into its cache and keeps the cache in step with the store as
/// expenses are created, changed and deleted.
pub struct Ledger {
    store: Box<dyn Store + Send>,
    cache: ExpenseCache,
    replacement: ReceiptReplacement,
    signed_url_ttl: u64,
}

impl Ledger {
    /// Connects to the backend named in `config`.
    pub async fn open(config: &Config) -> Result<Self> {
        let store = api::store(config).await?;
        Ok(Self::new(
            store,
            config.receipt_replacement(),
            config.signed_url_ttl(),
        ))
    }

    pub(crate) fn new(
        store: Box<dyn Store + Send>,
        replacement: ReceiptReplacement,
        signed_url_ttl: u64,
    ) -> Self {
        Self {
            store,
            cache: ExpenseCache::new(),
            replacement,
            signed_url_ttl,
        }
    }

    pub fn cache(&self) -> &ExpenseCache {
        &self.cache
    }

    pub async fn load_month(&mut self, month: Month) -> Result<()> {
        self.load_range(month.interval()).await
    }

    pub async fn load_range(&mut self, range: DateRange) -> Result<()> {
        self.cache
            .load_range(self.store.as_mut(), range)
            .await
            .pub_result(ErrorType::Query)
    }

    pub async fn load_day(&mut self, date: NaiveDate) -> Result<()> {
        self.cache
            .load_day(self.store.as_mut(), date)
            .await
            .pub_result(ErrorType::Query)
    }

    pub fn month_view(&self, month: Month, today: NaiveDate) -> MonthView {
        aggregate::month_view(month, &self.cache, today)
    }

    /// Saves a new expense and, if given, uploads its receipt and links it to the row.
    pub async fn create(
        &mut self,
        expense: NewExpense,
        receipt: Option<ReceiptFile>,
    ) -> Result<Outcome<Expense>> {
        expense.validate()?;
        let mut row = self
            .store
            .insert(&expense)
            .await
            .pub_result(ErrorType::Mutation)?;
        debug!("Inserted expense {} on {}", row.id, row.date);

        let mut warnings = Vec::new();
        if let Some(receipt) = &receipt {
            if let Some(path) = self.upload_receipt(&row.id, receipt, &mut warnings).await {
                let attach = ExpenseChanges::default().receipt_path(Some(path.clone()));
                let attached = self.store.update(&row.id, &attach).await;
                match attached {
                    Ok(updated) => row = updated,
                    Err(e) => {
                        push(&mut warnings, Warning::ReceiptAttachFailed {
                            message: format!("{e:#}"),
                        });
                        if let Err(e) = self.store.delete_blob(&path).await {
                            warn!("Unable to remove the unattached receipt '{path}': {e:#}");
                        }
                    }
                }
            }
        }

        self.cache.insert(row.clone());
        Ok(Outcome::new(row, warnings))
    }

    /// Applies `changes` to `current` and, if given, replaces its receipt in the order set by the
    /// configured `ReceiptReplacement`.
    pub async fn update(
        &mut self,
        current: &Expense,
        changes: ExpenseChanges,
        receipt: Option<ReceiptFile>,
    ) -> Result<Outcome<Expense>> {
        changes.validate()?;
        if changes.is_empty() && receipt.is_none() {
            debug!("Nothing to change on expense {}", current.id);
            return Ok(Outcome::new(current.clone(), Vec::new()));
        }

        let mut warnings = Vec::new();
        let updated = match (receipt, self.replacement) {
            (None, _) => self.apply(&current.id, &changes).await?,
            (Some(receipt), ReceiptReplacement::DeleteFirst) => {
                self.replace_delete_first(current, changes, &receipt, &mut warnings)
                    .await?
            }
            (Some(receipt), ReceiptReplacement::UploadFirst) => {
                self.replace_upload_first(current, changes, &receipt, &mut warnings)
                    .await?
            }
        };

        if !self.cache.replace(updated.clone()) {
            debug!("Expense {} is not in the loaded range", updated.id);
        }
        Ok(Outcome::new(updated, warnings))
    }

    /// Deletes the receipt, then the row. A receipt that cannot be deleted does not stop the row
    /// from being deleted.
    pub async fn delete(&mut self, expense: &Expense) -> Result<Outcome<()>> {
        let mut warnings = Vec::new();
        if let Some(path) = &expense.receipt_path {
            if let Err(e) = self.store.delete_blob(path).await {
                push(&mut warnings, Warning::ReceiptDeleteFailed {
                    path: path.clone(),
                    message: format!("{e:#}"),
                });
            }
        }
        self.store
            .delete(&expense.id)
            .await
            .pub_result(ErrorType::Mutation)?;
        debug!("Deleted expense {}", expense.id);
        self.cache.remove(&expense.id, expense.date);
        Ok(Outcome::new((), warnings))
    }

    /// A temporary link to the expense's receipt, or `None` if it has no receipt.
    pub async fn receipt_url(&mut self, expense: &Expense) -> Result<Option<String>> {
        let Some(path) = &expense.receipt_path else {
            return Ok(None);
        };
        let url = self
            .store
            .signed_url(path, self.signed_url_ttl)
            .await
            .pub_result(ErrorType::Query)?;
        Ok(Some(url))
    }

    /// Deletes the old receipt, uploads the new one, then updates the row. If the old receipt is
    /// gone and the new one did not upload, the row's receipt is cleared.
    async fn replace_delete_first(
        &mut self,
        current: &Expense,
        mut changes: ExpenseChanges,
        receipt: &ReceiptFile,
        warnings: &mut Vec<Warning>,
    ) -> Result<Expense> {
        let mut old_deleted = false;
        if let Some(old) = &current.receipt_path {
            match self.store.delete_blob(old).await {
                Ok(()) => old_deleted = true,
                Err(e) => push(warnings, Warning::OldReceiptDeleteFailed {
                    path: old.clone(),
                    message: format!("{e:#}"),
                }),
            }
        }
        match self.upload_receipt(&current.id, receipt, warnings).await {
            Some(path) => changes = changes.receipt_path(Some(path)),
            None if old_deleted => changes = changes.receipt_path(None),
            None => {}
        }
        if changes.is_empty() {
            return Ok(current.clone());
        }
        self.apply(&current.id, &changes).await
    }

    /// Uploads the new receipt and updates the row, then deletes the old receipt. If the row update
    /// fails the new upload is removed again.
    async fn replace_upload_first(
        &mut self,
        current: &Expense,
        mut changes: ExpenseChanges,
        receipt: &ReceiptFile,
        warnings: &mut Vec<Warning>,
    ) -> Result<Expense> {
        let uploaded = self.upload_receipt(&current.id, receipt, warnings).await;
        if let Some(path) = &uploaded {
            changes = changes.receipt_path(Some(path.clone()));
        }
        let updated = if changes.is_empty() {
            current.clone()
        } else {
            match self.apply(&current.id, &changes).await {
                Ok(updated) => updated,
                Err(e) => {
                    if let Some(path) = &uploaded {
                        if let Err(e) = self.store.delete_blob(path).await {
                            warn!("Unable to remove the unattached receipt '{path}': {e:#}");
                        }
                    }
                    return Err(e);
                }
            }
        };
        if let (Some(_), Some(old)) = (&uploaded, &current.receipt_path) {
            if let Err(e) = self.store.delete_blob(old).await {
                push(warnings, Warning::OldReceiptDeleteFailed {
                    path: old.clone(),
                    message: format!("{e:#}"),
                });
            }
        }
        Ok(updated)
    }

    async fn apply(&mut self, id: &ExpenseId, changes: &ExpenseChanges) -> Result<Expense> {
        self.store
            .update(id, changes)
            .await
            .pub_result(ErrorType::Mutation)
    }

    /// Uploads `receipt` for the expense `id` and returns its path, or records why it could not.
    async fn upload_receipt(
        &mut self,
        id: &ExpenseId,
        receipt: &ReceiptFile,
        warnings: &mut Vec<Warning>,
    ) -> Option<String> {
        let user = match self.store.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                push(warnings, Warning::NoSignedInUser);
                return None;
            }
            Err(e) => {
                push(warnings, Warning::ReceiptUploadFailed {
                    message: format!("{e:#}"),
                });
                return None;
            }
        };
        let path = receipt.storage_path(&user, id.as_str(), Utc::now());
        match self
            .store
            .upload_blob(&path, receipt.bytes(), receipt.content_type())
            .await
        {
            Ok(()) => {
                debug!("Uploaded receipt '{path}'");
                Some(path)
            }
            Err(e) => {
                push(warnings, Warning::ReceiptUploadFailed {
                    message: format!("{e:#}"),
                });
                None
            }
        }
    }
}

fn push(warnings: &mut Vec<Warning>, warning: Warning) {
    warn!("{warning}");
    warnings.push(warning);
}
