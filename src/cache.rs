//! The in-memory view of the expenses in the currently loaded date range.

use crate::api::{Filter, Store};
use crate::calendar::DateRange;
use crate::error::Res;
use crate::model::{Expense, ExpenseId};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Expenses grouped by date. Each bucket keeps the order the store returned them in, which is
/// creation order, and is never re-sorted. A date with no expenses has no bucket, so
/// `has_expenses` is a key lookup.
///
/// `load_range`, `load_day`, `insert`, `replace` and `remove` are the only ways the contents
/// change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpenseCache {
    range: Option<DateRange>,
    buckets: BTreeMap<NaiveDate, Vec<Expense>>,
}

impl ExpenseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetches every expense dated in `range` with one query and replaces the whole cache with
    /// the result. If the query fails the cache is left exactly as it was.
    pub async fn load_range(
        &mut self,
        store: &mut (dyn Store + Send),
        range: DateRange,
    ) -> Res<()> {
        let filter = Filter::Between {
            start: range.start,
            end: range.end,
        };
        let rows = store.query(filter).await?;
        debug!(
            "Loaded {} expenses from {} to {}",
            rows.len(),
            range.start,
            range.end
        );
        self.set(range, rows);
        Ok(())
    }

    /// Like `load_range` but for a single day, using an equality query on the date.
    pub async fn load_day(&mut self, store: &mut (dyn Store + Send), date: NaiveDate) -> Res<()> {
        let rows = store.query(Filter::On(date)).await?;
        debug!("Loaded {} expenses on {date}", rows.len());
        self.set(DateRange::day(date), rows);
        Ok(())
    }

    fn set(&mut self, range: DateRange, rows: Vec<Expense>) {
        let mut buckets: BTreeMap<NaiveDate, Vec<Expense>> = BTreeMap::new();
        for row in rows {
            buckets.entry(row.date).or_default().push(row);
        }
        self.range = Some(range);
        self.buckets = buckets;
    }

    /// Appends `expense` to the end of its date's bucket.
    pub fn insert(&mut self, expense: Expense) {
        self.buckets.entry(expense.date).or_default().push(expense);
    }

    /// Overwrites the expense with `updated.id` in the bucket for `updated.date`, keeping its
    /// position. Returns false, and changes nothing, if it is not there.
    pub fn replace(&mut self, updated: Expense) -> bool {
        let Some(bucket) = self.buckets.get_mut(&updated.date) else {
            return false;
        };
        match bucket.iter_mut().find(|e| e.id == updated.id) {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    /// Removes the expense `id` from the bucket for `date`, dropping the bucket if it empties.
    pub fn remove(&mut self, id: &ExpenseId, date: NaiveDate) -> Option<Expense> {
        let bucket = self.buckets.get_mut(&date)?;
        let index = bucket.iter().position(|e| &e.id == id)?;
        let removed = bucket.remove(index);
        if bucket.is_empty() {
            self.buckets.remove(&date);
        }
        Some(removed)
    }

    /// The range of the last successful load, if any.
    pub fn range(&self) -> Option<DateRange> {
        self.range
    }

    /// The expenses on `date` in creation order. Empty if there are none.
    pub fn day(&self, date: NaiveDate) -> &[Expense] {
        self.buckets.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn has_expenses(&self, date: NaiveDate) -> bool {
        self.buckets.contains_key(&date)
    }

    pub fn get(&self, id: &ExpenseId, date: NaiveDate) -> Option<&Expense> {
        self.day(date).iter().find(|e| &e.id == id)
    }

    /// Every bucket in date order.
    pub fn buckets(&self) -> impl Iterator<Item = (NaiveDate, &[Expense])> {
        self.buckets.iter().map(|(date, v)| (*date, v.as_slice()))
    }

    /// Every cached expense, by date and then creation order.
    pub fn iter(&self) -> impl Iterator<Item = &Expense> {
        self.buckets.values().flatten()
    }

    pub fn len(&self) -> usize {
        self.buckets.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
