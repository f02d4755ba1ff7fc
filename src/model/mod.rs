//! Types that represent the core data model, such as `Expense` and `Category`.
mod amount;
mod category;
mod expense;
mod receipt;

pub use amount::{Amount, AmountError};
pub use category::{Category, CategoryError, FALLBACK_COLOR};
pub use expense::{date_key, Expense, ExpenseChanges, ExpenseId, NewExpense};
pub use receipt::{ReceiptFile, ACCEPTED_IMAGE_TYPES, MAX_FILE_SIZE};
