use crate::error::{Error, Result};
use crate::model::{Amount, Category};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

/// The opaque identifier the store assigns to an expense row.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ExpenseId(String);

impl ExpenseId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for ExpenseId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Formats a date the way it is keyed in the cache and stored in the `date` column.
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// One row of the `expenses` table, as returned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expense {
    pub id: ExpenseId,
    #[serde(rename = "user_id")]
    pub owner: String,
    pub date: NaiveDate,
    pub amount: Amount,
    pub category: Category,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub receipt_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Expense {
    pub fn date_key(&self) -> String {
        date_key(self.date)
    }

    pub fn has_receipt(&self) -> bool {
        self.receipt_path.is_some()
    }
}

/// The fields sent when inserting an expense. The store fills in the id, owner and timestamps.
///
/// A receipt is never part of the insert; it is attached by a follow-up update once the id is
/// known.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub date: NaiveDate,
    pub amount: Amount,
    pub category: Category,
    pub description: Option<String>,
}

impl NewExpense {
    pub fn new(
        date: NaiveDate,
        amount: Amount,
        category: Category,
        description: Option<String>,
    ) -> Self {
        Self {
            date,
            amount,
            category,
            description: normalize_description(description),
        }
    }

    /// Checks the shape of the input before anything is sent to the store.
    pub fn validate(&self) -> Result<()> {
        validate_amount(self.amount)?;
        validate_category(&self.category)
    }
}

/// A partial update of an expense. `None` leaves a field as it is.
///
/// For the nullable fields, `Some(None)` writes a null and `Some(Some(..))` writes a value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExpenseChanges {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<Amount>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub receipt_path: Option<Option<String>>,
}

impl ExpenseChanges {
    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn category(mut self, category: Category) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the description. An empty string clears it.
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(normalize_description(Some(description.into())));
        self
    }

    pub fn receipt_path(mut self, receipt_path: Option<String>) -> Self {
        self.receipt_path = Some(receipt_path);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.amount.is_none()
            && self.category.is_none()
            && self.description.is_none()
            && self.receipt_path.is_none()
    }

    /// Checks the fields that are being changed.
    pub fn validate(&self) -> Result<()> {
        if let Some(amount) = self.amount {
            validate_amount(amount)?;
        }
        if let Some(category) = &self.category {
            validate_category(category)?;
        }
        Ok(())
    }

    /// Applies these changes to `expense`. Used by stores that do not return the updated row
    /// from the database itself.
    pub fn apply_to(&self, expense: &mut Expense) {
        if let Some(amount) = self.amount {
            expense.amount = amount;
        }
        if let Some(category) = &self.category {
            expense.category = category.clone();
        }
        if let Some(description) = &self.description {
            expense.description = description.clone();
        }
        if let Some(receipt_path) = &self.receipt_path {
            expense.receipt_path = receipt_path.clone();
        }
    }
}

fn validate_amount(amount: Amount) -> Result<()> {
    if !amount.is_positive() {
        return Err(Error::validation(format!(
            "Amount must be 1 yen or more, got {}",
            amount.value()
        )));
    }
    if amount > Amount::MAX {
        return Err(Error::validation(format!(
            "Amount must be at most {}, got {amount}",
            Amount::MAX
        )));
    }
    Ok(())
}

fn validate_category(category: &Category) -> Result<()> {
    if !category.is_known() {
        return Err(Error::validation(format!(
            "Select one of the known categories, got '{category}'"
        )));
    }
    Ok(())
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|d| !d.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_deserialize_store_row() {
        let json = r#"{
            "id": "5b7c1c2e-0000-4000-8000-000000000001",
            "user_id": "user-1",
            "date": "2024-05-03",
            "amount": 1000,
            "category": "food",
            "description": null,
            "receipt_path": "user-1/5b7c_1714700000000.jpg",
            "created_at": "2024-05-03T09:15:30.123456+00:00",
            "updated_at": "2024-05-03T09:15:30.123456+00:00"
        }"#;
        let expense: Expense = serde_json::from_str(json).unwrap();
        assert_eq!(expense.owner, "user-1");
        assert_eq!(expense.date_key(), "2024-05-03");
        assert_eq!(expense.amount, Amount::new(1000));
        assert_eq!(expense.category, Category::Food);
        assert!(expense.description.is_none());
        assert!(expense.has_receipt());
    }

    #[test]
    fn test_new_expense_validation() {
        let ok = NewExpense::new(date("2024-05-03"), Amount::new(1000), Category::Food, None);
        assert!(ok.validate().is_ok());

        let zero = NewExpense::new(date("2024-05-03"), Amount::new(0), Category::Food, None);
        assert!(zero.validate().unwrap_err().is_validation());

        let negative = NewExpense::new(date("2024-05-03"), Amount::new(-5), Category::Food, None);
        assert!(negative.validate().unwrap_err().is_validation());

        let at_max = NewExpense::new(date("2024-05-03"), Amount::MAX, Category::Food, None);
        assert!(at_max.validate().is_ok());
        let over = NewExpense::new(
            date("2024-05-03"),
            Amount::new(Amount::MAX.value() + 1),
            Category::Food,
            None,
        );
        assert!(over.validate().unwrap_err().is_validation());

        let unknown = NewExpense::new(
            date("2024-05-03"),
            Amount::new(100),
            Category::Unrecognized("pets".into()),
            None,
        );
        assert!(unknown.validate().unwrap_err().is_validation());
    }

    #[test]
    fn test_blank_description_becomes_none() {
        let new = NewExpense::new(date("2024-05-03"), Amount::new(1), Category::Other, Some("  ".into()));
        assert!(new.description.is_none());
        let changes = ExpenseChanges::default().description("");
        assert_eq!(changes.description, Some(None));
    }

    #[test]
    fn test_changes_serialize_only_present_fields() {
        let changes = ExpenseChanges::default().amount(Amount::new(2500));
        let json = serde_json::to_value(&changes).unwrap();
        assert_eq!(json, serde_json::json!({ "amount": 2500 }));

        let clear = ExpenseChanges::default().receipt_path(None);
        let json = serde_json::to_value(&clear).unwrap();
        assert_eq!(json, serde_json::json!({ "receipt_path": null }));
    }

    #[test]
    fn test_changes_validation() {
        assert!(ExpenseChanges::default().validate().is_ok());
        assert!(ExpenseChanges::default().amount(Amount::new(0)).validate().is_err());
        assert!(ExpenseChanges::default()
            .category(Category::Unrecognized("x".into()))
            .validate()
            .is_err());
    }
}
