//! Month arithmetic: the half-open query interval for a month and the Sunday-aligned grid used to
//! draw it.

use crate::error::Res;
use anyhow::{bail, Context};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// A calendar month. `month` is 1-indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Month {
    year: i32,
    month: u32,
}

/// A half-open date interval `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// The interval covering the single day `date`.
    pub fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date.succ_opt().unwrap_or(NaiveDate::MAX),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date < self.end
    }

    /// Every date in the interval, in order.
    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> {
        let end = self.end;
        self.start.iter_days().take_while(move |d| *d < end)
    }
}

/// One square of the calendar grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridDay {
    pub date: NaiveDate,
    /// False for the leading and trailing days borrowed from the neighbouring months. Only used to
    /// dim those squares.
    pub in_month: bool,
}

impl Month {
    /// Returns `None` unless `month` is in `1..=12` and both neighbouring months are representable,
    /// so that the interval and the grid of any `Month` always exist.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        let first = |(year, month): (i32, u32)| NaiveDate::from_ymd_opt(year, month, 1);
        first((year, month))?;
        first(following(year, month)?)?;
        first(preceding(year, month)?)?;
        Some(Self { year, month })
    }

    /// The month containing `date`. Dates in the first or last representable month give the
    /// nearest month that has both neighbours.
    pub fn containing(date: NaiveDate) -> Self {
        let (year, month) = (date.year(), date.month());
        Self::new(year, month)
            .or_else(|| following(year, month).and_then(|(y, m)| Self::new(y, m)))
            .or_else(|| preceding(year, month).and_then(|(y, m)| Self::new(y, m)))
            .unwrap_or(Self { year, month })
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    pub fn last_day(&self) -> NaiveDate {
        self.end().pred_opt().unwrap_or(NaiveDate::MAX)
    }

    /// The 1st of the following month.
    fn end(&self) -> NaiveDate {
        following(self.year, self.month)
            .and_then(|(year, month)| NaiveDate::from_ymd_opt(year, month, 1))
            .unwrap_or(NaiveDate::MAX)
    }

    /// The following month, or this month if it is the last one that can be represented.
    pub fn next(&self) -> Self {
        following(self.year, self.month)
            .and_then(|(year, month)| Self::new(year, month))
            .unwrap_or(*self)
    }

    /// The preceding month, or this month if it is the first one that can be represented.
    pub fn previous(&self) -> Self {
        preceding(self.year, self.month)
            .and_then(|(year, month)| Self::new(year, month))
            .unwrap_or(*self)
    }

    /// The interval used to query this month's expenses: the 1st of this month up to, but not
    /// including, the 1st of the next.
    pub fn interval(&self) -> DateRange {
        DateRange {
            start: self.first_day(),
            end: self.end(),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date.year() == self.year && date.month() == self.month
    }

    /// The dates drawn for this month: from the Sunday on or before the 1st through the Saturday
    /// on or after the last day. The length is always a multiple of 7.
    pub fn grid(&self) -> Vec<GridDay> {
        let first = self.first_day();
        let last = self.last_day();
        let lead = u64::from(first.weekday().num_days_from_sunday());
        let trail = u64::from(6 - last.weekday().num_days_from_sunday());
        let start = first - Days::new(lead);
        let end = last + Days::new(trail);
        start
            .iter_days()
            .take_while(|d| *d <= end)
            .map(|date| GridDay {
                date,
                in_month: self.contains(date),
            })
            .collect()
    }
}

fn following(year: i32, month: u32) -> Option<(i32, u32)> {
    if month == 12 {
        Some((year.checked_add(1)?, 1))
    } else {
        Some((year, month + 1))
    }
}

fn preceding(year: i32, month: u32) -> Option<(i32, u32)> {
    if month == 1 {
        Some((year.checked_sub(1)?, 12))
    } else {
        Some((year, month - 1))
    }
}

impl Display for Month {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parses `YYYY-MM`.
impl FromStr for Month {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Res<Self> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .with_context(|| format!("Expected a month like 2024-05, got '{s}'"))?;
        let year: i32 = year
            .parse()
            .with_context(|| format!("Invalid year in '{s}'"))?;
        let month: u32 = month
            .parse()
            .with_context(|| format!("Invalid month in '{s}'"))?;
        match Month::new(year, month) {
            Some(m) => Ok(m),
            None => bail!("'{s}' is not a valid month"),
        }
    }
}
