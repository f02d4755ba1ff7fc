use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The colour used for any category that has no colour of its own.
pub const FALLBACK_COLOR: &str = "#6b7280";

/// The fixed set of expense categories.
///
/// The core only ever constructs the twelve known variants. Rows written by other clients may carry
/// a label this version does not know; those are kept as `Unrecognized` so that they still show up
/// in totals, and they render with `FALLBACK_COLOR`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Category {
    Food,
    Transport,
    Housing,
    Utilities,
    Communications,
    Medical,
    Education,
    Entertainment,
    Clothing,
    DailyGoods,
    Social,
    Other,
    Unrecognized(String),
}

impl Category {
    /// All known categories in display order.
    pub const ALL: [Category; 12] = [
        Category::Food,
        Category::Transport,
        Category::Housing,
        Category::Utilities,
        Category::Communications,
        Category::Medical,
        Category::Education,
        Category::Entertainment,
        Category::Clothing,
        Category::DailyGoods,
        Category::Social,
        Category::Other,
    ];

    /// The name stored in the local `category` column. The hosted table stores `label` instead.
    pub fn wire_name(&self) -> &str {
        match self {
            Category::Food => "food",
            Category::Transport => "transport",
            Category::Housing => "housing",
            Category::Utilities => "utilities",
            Category::Communications => "communications",
            Category::Medical => "medical",
            Category::Education => "education",
            Category::Entertainment => "entertainment",
            Category::Clothing => "clothing",
            Category::DailyGoods => "daily_goods",
            Category::Social => "social",
            Category::Other => "other",
            Category::Unrecognized(s) => s,
        }
    }

    /// The Japanese display label.
    pub fn label(&self) -> &str {
        match self {
            Category::Food => "食費",
            Category::Transport => "交通費",
            Category::Housing => "住居費",
            Category::Utilities => "光熱費",
            Category::Communications => "通信費",
            Category::Medical => "医療費",
            Category::Education => "教育費",
            Category::Entertainment => "娯楽費",
            Category::Clothing => "衣服費",
            Category::DailyGoods => "日用品",
            Category::Social => "交際費",
            Category::Other => "その他",
            Category::Unrecognized(s) => s,
        }
    }

    /// The hex colour used for this category's dot and bar.
    pub fn color(&self) -> &'static str {
        match self {
            Category::Food => "#ef4444",
            Category::Transport => "#f97316",
            Category::Housing => "#eab308",
            Category::Utilities => "#84cc16",
            Category::Communications => "#22c55e",
            Category::Medical => "#14b8a6",
            Category::Education => "#06b6d4",
            Category::Entertainment => "#3b82f6",
            Category::Clothing => "#8b5cf6",
            Category::DailyGoods => "#a855f7",
            Category::Social => "#ec4899",
            Category::Other => FALLBACK_COLOR,
            Category::Unrecognized(_) => FALLBACK_COLOR,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Category::Unrecognized(_))
    }

    /// Looks up a known category by wire name, hyphenated name, or display label.
    fn lookup(s: &str) -> Option<Category> {
        let normalized = s.trim().to_lowercase().replace('-', "_");
        Category::ALL
            .into_iter()
            .find(|c| c.wire_name() == normalized || c.label() == s.trim())
    }

    /// Maps a stored value to a category, keeping unknown labels instead of failing.
    pub fn from_stored(s: &str) -> Category {
        Category::lookup(s).unwrap_or_else(|| Category::Unrecognized(s.to_string()))
    }
}

/// An error returned when user input does not name one of the known categories.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryError(String);

impl Display for CategoryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Unknown category '{}'", self.0)
    }
}

impl std::error::Error for CategoryError {}

/// Parses user input. Unlike `from_stored`, this rejects anything outside the known set.
impl FromStr for Category {
    type Err = CategoryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Category::lookup(s).ok_or_else(|| CategoryError(s.to_string()))
    }
}

impl Display for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl Serialize for Category {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.wire_name())
    }
}

impl<'de> Deserialize<'de> for Category {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Category::from_stored(&s))
    }
}
