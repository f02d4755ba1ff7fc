use crate::api::{Filter, Store};
use crate::db::Db;
use crate::error::Res;
use crate::model::{Expense, ExpenseChanges, ExpenseId, NewExpense};
use crate::{utils, Config};
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, SubsecRound, Utc};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};
use url::Url;
use uuid::Uuid;

/// Implements the `Store` trait with the SQLite database and receipts directory inside
/// `$KAKEIBO_HOME`. There is a single local user whose id was generated by `kakeibo init`.
pub(crate) struct LocalStore {
    db: Db,
    receipts: PathBuf,
    user_id: String,
}

impl LocalStore {
    pub(crate) async fn open(config: &Config, user_id: String) -> Res<Self> {
        let db = Db::load(config.sqlite_path())
            .await
            .context("Unable to load SQLite DB")?;
        debug!(
            "Opened {} with {} expenses",
            config.sqlite_path().display(),
            db.count_expenses().await?
        );
        Ok(Self::new(db, config.receipts_dir(), user_id))
    }

    pub(crate) fn new(db: Db, receipts: impl Into<PathBuf>, user_id: String) -> Self {
        Self {
            db,
            receipts: receipts.into(),
            user_id,
        }
    }

    /// Maps a blob path onto the receipts directory. Paths that could escape it are rejected.
    fn blob_file(&self, path: &str) -> Res<PathBuf> {
        let relative = Path::new(path);
        let is_plain = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if path.is_empty() || !is_plain {
            bail!("Invalid receipt path '{path}'");
        }
        Ok(self.receipts.join(relative))
    }
}

#[async_trait::async_trait]
impl Store for LocalStore {
    async fn query(&mut self, filter: Filter) -> Res<Vec<Expense>> {
        trace!("query {filter:?}");
        self.db.select_expenses(&self.user_id, filter).await
    }

    async fn insert(&mut self, expense: &NewExpense) -> Res<Expense> {
        trace!("insert {expense:?}");
        let now = now();
        let row = Expense {
            id: ExpenseId::new(Uuid::new_v4().to_string()),
            owner: self.user_id.clone(),
            date: expense.date,
            amount: expense.amount,
            category: expense.category.clone(),
            description: expense.description.clone(),
            receipt_path: None,
            created_at: now,
            updated_at: now,
        };
        self.db.insert_expense(&row).await?;
        Ok(row)
    }

    async fn update(&mut self, id: &ExpenseId, changes: &ExpenseChanges) -> Res<Expense> {
        trace!("update {id} {changes:?}");
        let mut row = self
            .db
            .select_expense(&self.user_id, id)
            .await?
            .with_context(|| format!("No expense with id '{id}'"))?;
        changes.apply_to(&mut row);
        row.updated_at = now();
        if !self.db.update_expense(&row).await? {
            bail!("No expense with id '{id}'");
        }
        Ok(row)
    }

    async fn delete(&mut self, id: &ExpenseId) -> Res<()> {
        trace!("delete {id}");
        if !self.db.delete_expense(&self.user_id, id).await? {
            bail!("No expense with id '{id}'");
        }
        Ok(())
    }

    async fn upload_blob(&mut self, path: &str, bytes: &[u8], _content_type: &str) -> Res<()> {
        trace!("upload_blob {path} ({} bytes)", bytes.len());
        let file = self.blob_file(path)?;
        if let Some(parent) = file.parent() {
            utils::make_dir(parent).await?;
        }
        utils::write(&file, bytes).await
    }

    async fn delete_blob(&mut self, path: &str) -> Res<()> {
        trace!("delete_blob {path}");
        let file = self.blob_file(path)?;
        utils::remove_file(&file).await
    }

    /// Local receipts never expire, so the URL is a plain `file://` URL.
    async fn signed_url(&mut self, path: &str, _ttl_seconds: u64) -> Res<String> {
        let file = self.blob_file(path)?;
        if !file.is_file() {
            bail!("The receipt '{path}' does not exist");
        }
        let url = Url::from_file_path(&file)
            .map_err(|_| anyhow!("Unable to make a URL for '{}'", file.display()))?;
        Ok(url.to_string())
    }

    async fn current_user(&mut self) -> Res<Option<String>> {
        Ok(Some(self.user_id.clone()))
    }
}

/// The current time at the precision the database keeps.
fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}
