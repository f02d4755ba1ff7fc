//! This module is responsible for reading, writing and managing the SQLite database used by the
//! local store.

mod migrations;

use crate::api::Filter;
use crate::error::Res;
use crate::model::{date_key, Amount, Category, Expense, ExpenseId};
use anyhow::{bail, Context};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::path::Path;
use tracing::debug;

const SELECT_BY_DATE: &str = "SELECT id, user_id, date, amount, category, description, \
    receipt_path, created_at, updated_at FROM expenses WHERE user_id = ? AND date = ? \
    ORDER BY created_at, seq";

const SELECT_BY_RANGE: &str = "SELECT id, user_id, date, amount, category, description, \
    receipt_path, created_at, updated_at FROM expenses WHERE user_id = ? AND date >= ? \
    AND date < ? ORDER BY created_at, seq";

const SELECT_BY_ID: &str = "SELECT id, user_id, date, amount, category, description, \
    receipt_path, created_at, updated_at FROM expenses WHERE user_id = ? AND id = ?";

#[derive(Debug, Clone)]
pub(crate) struct Db {
    pool: SqlitePool,
}

impl Db {
    /// - Fails if a file already exists at `path`
    /// - Creates a new SQLite file at `path`
    /// - Creates the schema at the current version
    pub(crate) async fn init(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if path.exists() {
            bail!("A database already exists at '{}'", path.display());
        }
        let pool = connect(path, true).await?;
        sqlx::query("CREATE TABLE schema_version (version INTEGER NOT NULL)")
            .execute(&pool)
            .await
            .context("Failed to create schema_version table")?;
        sqlx::query("INSERT INTO schema_version (version) VALUES (0)")
            .execute(&pool)
            .await
            .context("Failed to insert initial schema version")?;
        migrations::run(&pool, 0, migrations::CURRENT_VERSION).await?;
        debug!("Created database at {}", path.display());
        Ok(Self { pool })
    }

    /// - Fails if there is no SQLite file at `path`
    /// - Brings the schema up to date if it is older than this program
    pub(crate) async fn load(path: impl AsRef<Path>) -> Res<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            bail!("The database file is missing '{}'", path.display());
        }
        let pool = connect(path, false).await?;
        let version = migrations::version(&pool).await?;
        if version > migrations::CURRENT_VERSION {
            bail!(
                "The database schema is version {version}, which is newer than this program \
                supports ({})",
                migrations::CURRENT_VERSION
            );
        }
        migrations::run(&pool, version, migrations::CURRENT_VERSION).await?;
        Ok(Self { pool })
    }

    /// Rows owned by `user_id` that match `filter`, oldest first. Rows created in the same
    /// instant keep their insertion order.
    pub(crate) async fn select_expenses(&self, user_id: &str, filter: Filter) -> Res<Vec<Expense>> {
        let rows = match filter {
            Filter::On(date) => {
                sqlx::query(SELECT_BY_DATE)
                    .bind(user_id)
                    .bind(date_key(date))
                    .fetch_all(&self.pool)
                    .await
            }
            Filter::Between { start, end } => {
                sqlx::query(SELECT_BY_RANGE)
                    .bind(user_id)
                    .bind(date_key(start))
                    .bind(date_key(end))
                    .fetch_all(&self.pool)
                    .await
            }
        }
        .context("Failed to select expenses")?;
        rows.iter().map(expense_from_row).collect()
    }

    pub(crate) async fn select_expense(
        &self,
        user_id: &str,
        id: &ExpenseId,
    ) -> Res<Option<Expense>> {
        let row = sqlx::query(SELECT_BY_ID)
            .bind(user_id)
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("Failed to select expense {id}"))?;
        row.as_ref().map(expense_from_row).transpose()
    }

    pub(crate) async fn insert_expense(&self, expense: &Expense) -> Res<()> {
        sqlx::query(
            "INSERT INTO expenses (id, user_id, date, amount, category, description, \
            receipt_path, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(expense.id.as_str())
        .bind(&expense.owner)
        .bind(expense.date_key())
        .bind(expense.amount.value())
        .bind(expense.category.wire_name())
        .bind(expense.description.as_deref())
        .bind(expense.receipt_path.as_deref())
        .bind(timestamp(expense.created_at))
        .bind(timestamp(expense.updated_at))
        .execute(&self.pool)
        .await
        .context("Failed to insert expense")?;
        Ok(())
    }

    /// Writes every mutable column of `expense`. Returns false if no row with its id exists for
    /// its owner.
    pub(crate) async fn update_expense(&self, expense: &Expense) -> Res<bool> {
        let result = sqlx::query(
            "UPDATE expenses SET amount = ?, category = ?, description = ?, receipt_path = ?, \
            updated_at = ? WHERE user_id = ? AND id = ?",
        )
        .bind(expense.amount.value())
        .bind(expense.category.wire_name())
        .bind(expense.description.as_deref())
        .bind(expense.receipt_path.as_deref())
        .bind(timestamp(expense.updated_at))
        .bind(&expense.owner)
        .bind(expense.id.as_str())
        .execute(&self.pool)
        .await
        .with_context(|| format!("Failed to update expense {}", expense.id))?;
        Ok(result.rows_affected() > 0)
    }

    /// Returns false if there was nothing to delete.
    pub(crate) async fn delete_expense(&self, user_id: &str, id: &ExpenseId) -> Res<bool> {
        let result = sqlx::query("DELETE FROM expenses WHERE user_id = ? AND id = ?")
            .bind(user_id)
            .bind(id.as_str())
            .execute(&self.pool)
            .await
            .with_context(|| format!("Failed to delete expense {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub(crate) async fn count_expenses(&self) -> Res<u64> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM expenses")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count expenses")?;
        Ok(u64::try_from(row.0).unwrap_or_default())
    }
}

async fn connect(path: &Path, create: bool) -> Res<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(create);
    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .with_context(|| format!("Unable to open SQLite database at '{}'", path.display()))
}

/// Fixed-width UTC timestamps so that text ordering matches time ordering.
fn timestamp(t: DateTime<Utc>) -> String {
    t.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn expense_from_row(row: &SqliteRow) -> Res<Expense> {
    let id: String = row.try_get("id")?;
    let date: String = row.try_get("date")?;
    let category: String = row.try_get("category")?;
    let created_at: String = row.try_get("created_at")?;
    let updated_at: String = row.try_get("updated_at")?;
    Ok(Expense {
        date: NaiveDate::parse_from_str(&date, "%Y-%m-%d")
            .with_context(|| format!("Bad date '{date}' on expense {id}"))?,
        owner: row.try_get("user_id")?,
        amount: Amount::new(row.try_get("amount")?),
        category: Category::from_stored(&category),
        description: row.try_get("description")?,
        receipt_path: row.try_get("receipt_path")?,
        created_at: parse_timestamp(&created_at)?,
        updated_at: parse_timestamp(&updated_at)?,
        id: ExpenseId::new(id),
    })
}

fn parse_timestamp(s: &str) -> Res<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|t| t.with_timezone(&Utc))
        .with_context(|| format!("Bad timestamp '{s}'"))
}
