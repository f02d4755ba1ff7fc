//! kakeibo keeps a household expense book organised around a calendar.
//!
//! Expenses are dated, categorised yen amounts that may carry a photo of the receipt. A `Ledger`
//! loads a month (or a day) of expenses from a `Store` into an `ExpenseCache`, keeps that cache in
//! step with the store as expenses are created, changed and deleted, and derives the calendar
//! badges and category totals shown for the month.

pub mod aggregate;
mod api;
pub mod args;
mod cache;
pub mod calendar;
pub mod commands;
mod config;
mod db;
mod error;
mod ledger;
pub mod model;
mod utils;

pub use aggregate::{CategoryTotal, DayCell, MonthView};
pub use api::{Filter, Store};
pub use cache::ExpenseCache;
pub use calendar::{DateRange, GridDay, Month};
pub use config::{Backend, Config, ReceiptReplacement, DEFAULT_SIGNED_URL_TTL};
pub use error::{Error, ErrorType, Result};
pub use ledger::{Ledger, Outcome, Warning};
