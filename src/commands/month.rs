use crate::aggregate::MonthView;
use crate::args::MonthArgs;
use crate::calendar::Month;
use crate::commands::Out;
use crate::ledger::Ledger;
use crate::{Config, Result};
use chrono::{Datelike, NaiveDate};
use std::fmt::Write;

const CELL_WIDTH: usize = 9;
const WEEKDAYS: [&str; 7] = ["日", "月", "火", "水", "木", "金", "土"];

/// Loads a month and renders it as a calendar with a badge on every day that has spending,
/// followed by the month's total and its breakdown by category.
///
/// `today` is marked in the calendar and picks the month when `args` does not name one.
pub async fn month(config: Config, args: MonthArgs, today: NaiveDate) -> Result<Out<MonthView>> {
    let month = args.month().unwrap_or_else(|| Month::containing(today));
    let mut ledger = Ledger::open(&config).await?;
    ledger.load_month(month).await?;
    let view = ledger.month_view(month, today);
    Ok(Out::new(render(&view), view))
}

fn render(view: &MonthView) -> String {
    let mut out = format!("{}\n", view.month);
    for weekday in WEEKDAYS {
        // The labels are double width.
        let _ = write!(out, "{weekday:<width$}", width = CELL_WIDTH - 1);
    }
    out.push('\n');

    for week in view.cells.chunks(7) {
        let mut days = String::new();
        let mut badges = String::new();
        for cell in week {
            let day = if !cell.in_month {
                String::new()
            } else if cell.is_today {
                format!("[{}]", cell.date.day())
            } else {
                cell.date.day().to_string()
            };
            let badge = if cell.show_badge {
                cell.total.to_string()
            } else {
                String::new()
            };
            let _ = write!(days, "{day:<width$}", width = CELL_WIDTH);
            let _ = write!(badges, "{badge:<width$}", width = CELL_WIDTH);
        }
        out.push_str(days.trim_end());
        out.push('\n');
        if !badges.trim().is_empty() {
            out.push_str(badges.trim_end());
            out.push('\n');
        }
    }

    let _ = write!(out, "\n合計 {}", view.total);
    for total in &view.by_category {
        let _ = write!(
            out,
            "\n  {} {:>10} {:>5.1}%",
            total.category.label(),
            total.amount.to_string(),
            total.share
        );
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Amount, Category};
    use crate::test::TestEnv;

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[tokio::test]
    async fn test_month_command() {
        let env = TestEnv::new().await;
        env.add(ymd(2024, 5, 3), 1000, Category::Food).await;
        env.add(ymd(2024, 5, 3), 2000, Category::Transport).await;
        env.add(ymd(2024, 5, 10), 500, Category::Food).await;
        env.add(ymd(2024, 6, 1), 9999, Category::Other).await;

        let args = MonthArgs::new(Month::new(2024, 5));
        let out = month(env.config(), args, ymd(2024, 5, 10)).await.unwrap();
        let view = out.structure().unwrap();
        assert_eq!(view.total, Amount::new(3500));
        assert_eq!(view.by_category[0].category, Category::Transport);

        let message = out.message();
        assert!(message.starts_with("2024-05\n"), "{message}");
        assert!(message.contains("¥3,000"), "{message}");
        assert!(message.contains("[10]"), "{message}");
        assert!(message.contains("合計 ¥3,500"), "{message}");
        assert!(message.contains("交通費") && message.contains("57.1%"), "{message}");
        assert!(!message.contains("¥9,999"), "{message}");
    }

    #[tokio::test]
    async fn test_month_defaults_to_today() {
        let env = TestEnv::new().await;
        let out = month(env.config(), MonthArgs::new(None), ymd(2025, 1, 15))
            .await
            .unwrap();
        assert_eq!(out.structure().unwrap().month, Month::new(2025, 1).unwrap());
        assert!(out.message().contains("合計 ¥0"));
    }
}
