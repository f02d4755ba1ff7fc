//! An in-memory `Store` for tests. It records every call and can be told to fail any of them.

use crate::api::{Filter, Store};
use crate::error::Res;
use crate::model::{Expense, ExpenseChanges, ExpenseId, NewExpense};
use anyhow::{bail, Context};
use chrono::{DateTime, Duration, TimeZone, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

/// A call made to the `MemoryStore`, in the order it was made.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Query(Filter),
    Insert,
    Update(ExpenseId),
    Delete(ExpenseId),
    UploadBlob(String),
    DeleteBlob(String),
    SignedUrl(String),
    CurrentUser,
}

impl Call {
    pub(crate) fn is_blob(&self) -> bool {
        matches!(
            self,
            Call::UploadBlob(_) | Call::DeleteBlob(_) | Call::SignedUrl(_)
        )
    }
}

#[derive(Debug, Default)]
pub(crate) struct State {
    pub(crate) rows: Vec<Expense>,
    pub(crate) blobs: BTreeMap<String, Vec<u8>>,
    pub(crate) calls: Vec<Call>,
    pub(crate) user: Option<String>,
    pub(crate) fail_query: bool,
    pub(crate) fail_insert: bool,
    pub(crate) fail_update: bool,
    pub(crate) fail_delete: bool,
    pub(crate) fail_upload: bool,
    pub(crate) fail_delete_blob: bool,
    next_id: u64,
}

/// Clones share the same state, so a test can keep a handle after moving the store into a
/// `Ledger`.
#[derive(Debug, Clone, Default)]
pub(crate) struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    /// A store with a signed-in user named `user-1`.
    pub(crate) fn new() -> Self {
        let store = Self::default();
        store.with(|s| s.user = Some("user-1".to_string()));
        store
    }

    /// Runs `f` with the locked state.
    pub(crate) fn with<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut state = self.state.lock().unwrap();
        f(&mut state)
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.with(|s| s.calls.clone())
    }

    pub(crate) fn clear_calls(&self) {
        self.with(|s| s.calls.clear())
    }

    pub(crate) fn blob_paths(&self) -> Vec<String> {
        self.with(|s| s.blobs.keys().cloned().collect())
    }

    pub(crate) fn row(&self, id: &ExpenseId) -> Option<Expense> {
        self.with(|s| s.rows.iter().find(|e| &e.id == id).cloned())
    }

    /// Adds a row directly, bypassing the call log.
    pub(crate) fn seed(&self, expense: Expense) {
        self.with(|s| s.rows.push(expense))
    }

    pub(crate) fn seed_blob(&self, path: &str) {
        self.with(|s| s.blobs.insert(path.to_string(), vec![0]));
    }
}

#[async_trait::async_trait]
impl Store for MemoryStore {
    async fn query(&mut self, filter: Filter) -> Res<Vec<Expense>> {
        self.with(|s| {
            s.calls.push(Call::Query(filter));
            if s.fail_query {
                bail!("query failed");
            }
            let mut rows: Vec<Expense> = s
                .rows
                .iter()
                .filter(|e| filter.matches(e.date))
                .cloned()
                .collect();
            rows.sort_by_key(|e| e.created_at);
            Ok(rows)
        })
    }

    async fn insert(&mut self, expense: &NewExpense) -> Res<Expense> {
        self.with(|s| {
            s.calls.push(Call::Insert);
            if s.fail_insert {
                bail!("insert failed");
            }
            s.next_id += 1;
            let created = base_time() + Duration::seconds(s.next_id as i64);
            let row = Expense {
                id: ExpenseId::new(format!("e{}", s.next_id)),
                owner: s.user.clone().unwrap_or_default(),
                date: expense.date,
                amount: expense.amount,
                category: expense.category.clone(),
                description: expense.description.clone(),
                receipt_path: None,
                created_at: created,
                updated_at: created,
            };
            s.rows.push(row.clone());
            Ok(row)
        })
    }

    async fn update(&mut self, id: &ExpenseId, changes: &ExpenseChanges) -> Res<Expense> {
        self.with(|s| {
            s.calls.push(Call::Update(id.clone()));
            if s.fail_update {
                bail!("update failed");
            }
            let row = s
                .rows
                .iter_mut()
                .find(|e| &e.id == id)
                .with_context(|| format!("no row {id}"))?;
            changes.apply_to(row);
            row.updated_at += Duration::minutes(1);
            Ok(row.clone())
        })
    }

    async fn delete(&mut self, id: &ExpenseId) -> Res<()> {
        self.with(|s| {
            s.calls.push(Call::Delete(id.clone()));
            if s.fail_delete {
                bail!("delete failed");
            }
            s.rows.retain(|e| &e.id != id);
            Ok(())
        })
    }

    async fn upload_blob(&mut self, path: &str, bytes: &[u8], _content_type: &str) -> Res<()> {
        self.with(|s| {
            s.calls.push(Call::UploadBlob(path.to_string()));
            if s.fail_upload {
                bail!("upload failed");
            }
            s.blobs.insert(path.to_string(), bytes.to_vec());
            Ok(())
        })
    }

    async fn delete_blob(&mut self, path: &str) -> Res<()> {
        self.with(|s| {
            s.calls.push(Call::DeleteBlob(path.to_string()));
            if s.fail_delete_blob {
                bail!("blob delete failed");
            }
            s.blobs.remove(path);
            Ok(())
        })
    }

    async fn signed_url(&mut self, path: &str, ttl_seconds: u64) -> Res<String> {
        self.with(|s| {
            s.calls.push(Call::SignedUrl(path.to_string()));
            if !s.blobs.contains_key(path) {
                bail!("no blob {path}");
            }
            Ok(format!("memory://{path}?ttl={ttl_seconds}"))
        })
    }

    async fn current_user(&mut self) -> Res<Option<String>> {
        self.with(|s| {
            s.calls.push(Call::CurrentUser);
            Ok(s.user.clone())
        })
    }
}

fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap()
}
