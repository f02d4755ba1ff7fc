//! Totals derived from an `ExpenseCache`: the per-day badges on the calendar and the per-category
//! summary for the month. Everything here is a pure function of the cache.

use crate::cache::ExpenseCache;
use crate::calendar::Month;
use crate::model::{Amount, Category};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;

/// One row of the category summary.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category: Category,
    pub amount: Amount,
    /// Percentage of the month's total, `0.0..=100.0`.
    pub share: f64,
}

/// One square of the calendar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCell {
    pub date: NaiveDate,
    pub in_month: bool,
    pub total: Amount,
    /// Only days of the displayed month that have spending get a badge.
    pub show_badge: bool,
    pub is_today: bool,
}

/// Everything needed to draw a month.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthView {
    pub month: Month,
    pub cells: Vec<DayCell>,
    pub total: Amount,
    pub by_category: Vec<CategoryTotal>,
}

/// The sum of the expenses on `date`, zero if there are none.
pub fn daily_total(cache: &ExpenseCache, date: NaiveDate) -> Amount {
    cache.day(date).iter().map(|e| e.amount).sum()
}

/// The sum of every cached expense.
pub fn monthly_total(cache: &ExpenseCache) -> Amount {
    cache.iter().map(|e| e.amount).sum()
}

/// Spending per category, largest first. Categories with equal totals stay in category order and
/// categories with no expenses are left out.
pub fn monthly_by_category(cache: &ExpenseCache) -> Vec<CategoryTotal> {
    let mut sums: BTreeMap<&Category, Amount> = BTreeMap::new();
    for expense in cache.iter() {
        *sums.entry(&expense.category).or_default() += expense.amount;
    }
    let total = monthly_total(cache);
    let mut totals: Vec<CategoryTotal> = sums
        .into_iter()
        .map(|(category, amount)| CategoryTotal {
            category: category.clone(),
            amount,
            share: share(amount, total),
        })
        .collect();
    totals.sort_by(|a, b| b.amount.cmp(&a.amount));
    totals
}

fn share(amount: Amount, total: Amount) -> f64 {
    if total.is_zero() {
        return 0.0;
    }
    amount.value() as f64 / total.value() as f64 * 100.0
}

/// Combines the grid for `month` with the cached totals.
pub fn month_view(month: Month, cache: &ExpenseCache, today: NaiveDate) -> MonthView {
    let cells = month
        .grid()
        .into_iter()
        .map(|day| {
            let total = daily_total(cache, day.date);
            DayCell {
                date: day.date,
                in_month: day.in_month,
                total,
                show_badge: day.in_month && total.is_positive(),
                is_today: day.date == today,
            }
        })
        .collect();
    MonthView {
        month,
        cells,
        total: monthly_total(cache),
        by_category: monthly_by_category(cache),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::tests::{expense, loaded, may_2024, ymd};

    fn may() -> Month {
        Month::new(2024, 5).unwrap()
    }

    #[tokio::test]
    async fn test_may_2024_totals() {
        let cache = loaded(may_2024(), may()).await;
        assert_eq!(daily_total(&cache, ymd(2024, 5, 3)), Amount::new(3000));
        assert_eq!(daily_total(&cache, ymd(2024, 5, 10)), Amount::new(500));
        assert_eq!(daily_total(&cache, ymd(2024, 5, 4)), Amount::ZERO);
        assert_eq!(monthly_total(&cache), Amount::new(3500));

        let by_category = monthly_by_category(&cache);
        assert_eq!(by_category.len(), 2);
        assert_eq!(by_category[0].category, Category::Transport);
        assert_eq!(by_category[0].amount, Amount::new(2000));
        assert_eq!(format!("{:.1}", by_category[0].share), "57.1");
        assert_eq!(by_category[1].category, Category::Food);
        assert_eq!(by_category[1].amount, Amount::new(1500));
        assert_eq!(format!("{:.1}", by_category[1].share), "42.9");
    }

    #[tokio::test]
    async fn test_ties_in_category_order() {
        let rows = vec![
            expense(1, ymd(2024, 5, 1), 500, Category::Social),
            expense(2, ymd(2024, 5, 2), 500, Category::Food),
            expense(3, ymd(2024, 5, 3), 500, Category::from_stored("pets")),
        ];
        let cache = loaded(rows, may()).await;
        let order: Vec<Category> = monthly_by_category(&cache)
            .into_iter()
            .map(|t| t.category)
            .collect();
        assert_eq!(
            order,
            vec![
                Category::Food,
                Category::Social,
                Category::from_stored("pets")
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_cache() {
        let cache = ExpenseCache::new();
        assert!(monthly_by_category(&cache).is_empty());
        assert_eq!(monthly_total(&cache), Amount::ZERO);
        assert_eq!(daily_total(&cache, ymd(2024, 5, 3)), Amount::ZERO);
    }

    #[tokio::test]
    async fn test_huge_amounts_do_not_overflow() {
        let big = i64::MAX / 2 + 1;
        let rows = vec![
            expense(1, ymd(2024, 5, 3), big, Category::Food),
            expense(2, ymd(2024, 5, 4), big, Category::Food),
        ];
        let cache = loaded(rows, may()).await;
        assert_eq!(monthly_total(&cache), Amount::new(i64::MAX));
        let by_category = monthly_by_category(&cache);
        assert_eq!(by_category.len(), 1);
        assert_eq!(by_category[0].amount, Amount::new(i64::MAX));
        assert_eq!(format!("{:.1}", by_category[0].share), "100.0");
    }

    #[tokio::test]
    async fn test_pure() {
        let cache = loaded(may_2024(), may()).await;
        let before = cache.clone();
        assert_eq!(monthly_by_category(&cache), monthly_by_category(&cache));
        assert_eq!(
            daily_total(&cache, ymd(2024, 5, 3)),
            daily_total(&cache, ymd(2024, 5, 3))
        );
        assert_eq!(cache, before);
    }

    #[tokio::test]
    async fn test_month_view_badges() {
        let cache = loaded(may_2024(), may()).await;
        let view = month_view(may(), &cache, ymd(2024, 5, 10));
        assert_eq!(view.cells.len(), 35);
        assert_eq!(view.total, Amount::new(3500));

        let badges: Vec<NaiveDate> = view
            .cells
            .iter()
            .filter(|c| c.show_badge)
            .map(|c| c.date)
            .collect();
        assert_eq!(badges, vec![ymd(2024, 5, 3), ymd(2024, 5, 10)]);

        let today: Vec<&DayCell> = view.cells.iter().filter(|c| c.is_today).collect();
        assert_eq!(today.len(), 1);
        assert_eq!(today[0].total, Amount::new(500));
    }

    #[test]
    fn test_no_badge_outside_month() {
        // A cache that still holds a neighbouring day, as after a day view load.
        let mut cache = ExpenseCache::new();
        cache.insert(expense(1, ymd(2024, 4, 30), 800, Category::Food));
        let view = month_view(may(), &cache, ymd(2024, 5, 1));
        let cell = view.cells.iter().find(|c| c.date == ymd(2024, 4, 30)).unwrap();
        assert_eq!(cell.total, Amount::new(800));
        assert!(!cell.in_month);
        assert!(!cell.show_badge);
    }
}
