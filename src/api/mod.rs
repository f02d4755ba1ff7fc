//! The remote store that holds expense rows and receipt blobs.
//!
//! The rest of the crate only talks to the `Store` trait. `SupabaseStore` is the hosted backend and
//! `LocalStore` keeps everything in a SQLite file and a directory of receipt images so the whole
//! program can be run without a network connection to a backend.

mod local;
#[cfg(test)]
mod memory;
mod session;
mod supabase;

use crate::config::Backend;
use crate::error::{ErrorType, IntoResult, Res, Result};
use crate::model::{Expense, ExpenseChanges, ExpenseId, NewExpense};
use crate::Config;
use chrono::NaiveDate;
use tracing::debug;

pub(crate) use local::LocalStore;
#[cfg(test)]
pub(crate) use memory::{Call, MemoryStore};
pub(crate) use session::{Session, SessionFile};
pub(crate) use supabase::SupabaseStore;

/// The name of the table holding expense rows.
pub(crate) const EXPENSES: &str = "expenses";

/// The name of the bucket holding receipt images.
pub(crate) const RECEIPTS: &str = "receipts";

/// Which rows a `Store::query` should return, always by the `date` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Filter {
    /// `date = on`
    On(NaiveDate),
    /// `date >= start AND date < end`
    Between { start: NaiveDate, end: NaiveDate },
}

impl Filter {
    pub fn matches(&self, date: NaiveDate) -> bool {
        match self {
            Filter::On(on) => date == *on,
            Filter::Between { start, end } => *start <= date && date < *end,
        }
    }
}

/// The operations the expense logic needs from the backend. Every call is a single
/// request/response. Results of `query` are ordered by creation time, oldest first, with ties in
/// whatever order the backend assigned.
#[async_trait::async_trait]
pub trait Store {
    /// Fetches the expense rows matching `filter`, ordered by `created_at` ascending.
    async fn query(&mut self, filter: Filter) -> Res<Vec<Expense>>;

    /// Inserts a row and returns it as stored, with its id and timestamps.
    async fn insert(&mut self, expense: &NewExpense) -> Res<Expense>;

    /// Applies a partial update to the row with `id` and returns the updated row.
    async fn update(&mut self, id: &ExpenseId, changes: &ExpenseChanges) -> Res<Expense>;

    /// Permanently deletes the row with `id`.
    async fn delete(&mut self, id: &ExpenseId) -> Res<()>;

    /// Stores `bytes` in the receipts bucket at `path`.
    async fn upload_blob(&mut self, path: &str, bytes: &[u8], content_type: &str) -> Res<()>;

    /// Removes the blob at `path` from the receipts bucket.
    async fn delete_blob(&mut self, path: &str) -> Res<()>;

    /// Returns a temporary URL for viewing the blob at `path`.
    async fn signed_url(&mut self, path: &str, ttl_seconds: u64) -> Res<String>;

    /// The id of the signed-in user, used to namespace blob paths.
    async fn current_user(&mut self) -> Res<Option<String>>;
}

/// Creates the `Store` described by the configured backend.
pub(crate) async fn store(config: &Config) -> Result<Box<dyn Store + Send>> {
    match config.backend() {
        Backend::Local { user_id } => {
            debug!("Using the local store at {}", config.root().display());
            let store = LocalStore::open(config, user_id.clone())
                .await
                .pub_result(ErrorType::Config)?;
            Ok(Box::new(store))
        }
        Backend::Supabase { url, anon_key } => {
            debug!("Using the Supabase store at {url}");
            let session = SessionFile::load(config.session_path())
                .await
                .pub_result(ErrorType::Auth)?;
            let store = SupabaseStore::new(url, anon_key.clone(), Some(session))
                .pub_result(ErrorType::Config)?;
            Ok(Box::new(store))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_matches_half_open() {
        let start = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 6, 1).unwrap();
        let filter = Filter::Between { start, end };
        assert!(filter.matches(start));
        assert!(filter.matches(NaiveDate::from_ymd_opt(2024, 5, 31).unwrap()));
        assert!(!filter.matches(end));
        assert!(!filter.matches(NaiveDate::from_ymd_opt(2024, 4, 30).unwrap()));
    }

    #[test]
    fn test_filter_on() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        assert!(Filter::On(day).matches(day));
        assert!(!Filter::On(day).matches(day.succ_opt().unwrap()));
    }
}
