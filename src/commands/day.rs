use crate::aggregate;
use crate::args::DayArgs;
use crate::commands::{describe, Out};
use crate::ledger::Ledger;
use crate::model::{Amount, Expense};
use crate::{Config, Result};
use chrono::NaiveDate;
use serde::Serialize;

/// The expenses recorded on one day.
#[derive(Debug, Clone, Serialize)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub total: Amount,
    pub expenses: Vec<Expense>,
}

/// Lists the expenses of a day in the order they were recorded, with the day's total.
pub async fn day(config: Config, args: DayArgs) -> Result<Out<DaySummary>> {
    let date = args.date();
    let mut ledger = Ledger::open(&config).await?;
    ledger.load_day(date).await?;
    let summary = DaySummary {
        date,
        total: aggregate::daily_total(ledger.cache(), date),
        expenses: ledger.cache().day(date).to_vec(),
    };

    let mut message = format!("{date}  合計 {}", summary.total);
    if summary.expenses.is_empty() {
        message.push_str("\nNo expenses");
    }
    for expense in &summary.expenses {
        message.push_str("\n  ");
        message.push_str(&describe(expense));
    }
    Ok(Out::new(message, summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Category;
    use crate::test::TestEnv;

    #[tokio::test]
    async fn test_day_command() {
        let env = TestEnv::new().await;
        let date = NaiveDate::from_ymd_opt(2024, 5, 3).unwrap();
        let first = env.add(date, 1000, Category::Food).await;
        let second = env.add(date, 2000, Category::Transport).await;
        env.add(date.succ_opt().unwrap(), 500, Category::Food).await;

        let out = day(env.config(), DayArgs::new(date)).await.unwrap();
        let summary = out.structure().unwrap();
        assert_eq!(summary.total, Amount::new(3000));
        assert_eq!(summary.expenses, vec![first.clone(), second]);
        assert!(out.message().starts_with("2024-05-03  合計 ¥3,000"));
        assert!(out.message().contains(first.id.as_str()));
        assert!(out.message().contains("食費"));
    }

    #[tokio::test]
    async fn test_empty_day() {
        let env = TestEnv::new().await;
        let date = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        let out = day(env.config(), DayArgs::new(date)).await.unwrap();
        assert!(out.message().contains("No expenses"));
        assert_eq!(out.structure().unwrap().total, Amount::ZERO);
    }
}
