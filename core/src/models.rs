use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::NaiveDate;
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};

// --- Identifiers ---

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

id_type!(
    /// Canonical item identity. Every engine stage past the demand
    /// collector works on this, never on display names.
    ItemId
);
id_type!(SessionId);
id_type!(RecipeId);
id_type!(MealId);

// --- Catalog ---

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default)]
    pub uuid: String,
    pub name: String,
    pub is_staple: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staple_amount: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub store_order_index: Option<i64>,
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Recipe {
    pub id: RecipeId,
    pub uuid: String,
    pub name: String,
    pub ingredients: Vec<RecipeIngredient>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecipeIngredient {
    pub item: ItemId,
    pub item_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

// --- Planning ---

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: SessionId,
    pub uuid: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub starts_on: Option<NaiveDate>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct Meal {
    pub id: MealId,
    pub session: SessionId,
    /// `None` places the meal in the unscheduled bucket.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub recipes: Vec<RecipeId>,
    pub items: Vec<MealItem>,
}

/// A direct (non-recipe) item attached to a meal, e.g. a side.
#[derive(Debug, Clone, Serialize)]
pub struct MealItem {
    pub item: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MealDay {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<NaiveDate>,
    pub meals: Vec<Meal>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StapleStatus {
    #[default]
    Pending,
    Included,
    Excluded,
}

impl StapleStatus {
    pub const ALL: [StapleStatus; 3] = [Self::Pending, Self::Included, Self::Excluded];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Included => "included",
            Self::Excluded => "excluded",
        }
    }
}

impl fmt::Display for StapleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StapleStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        match lower.as_str() {
            "pending" => Ok(Self::Pending),
            "included" | "include" | "yes" => Ok(Self::Included),
            "excluded" | "exclude" | "no" => Ok(Self::Excluded),
            _ => bail!("Invalid staple status '{s}'. Must be one of: pending, included, excluded"),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StapleSelection {
    pub session: SessionId,
    pub item: ItemId,
    pub item_name: String,
    pub status: StapleStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub staple_amount: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AdhocItem {
    pub session: SessionId,
    pub item: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ItemExclusion {
    pub session: SessionId,
    pub item: ItemId,
}

/// Persisted check-off state, unique per (session, item).
#[derive(Debug, Clone, Serialize)]
pub struct ChecklistEntry {
    pub id: i64,
    pub session: SessionId,
    pub item: ItemId,
    pub checked: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// One row of a batch store-order commit. `None` clears the position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderAssignment {
    pub item: ItemId,
    pub order_index: Option<i64>,
}

// --- Normalization ---

/// Canonical form of an item name: trimmed, inner whitespace collapsed,
/// lower-cased. Blank input has no identity.
#[must_use]
pub fn normalize_item_name(raw: &str) -> Option<String> {
    let joined = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if joined.is_empty() {
        None
    } else {
        Some(joined.to_lowercase())
    }
}

/// Amounts are opaque display strings; only surrounding whitespace is dropped.
#[must_use]
pub fn normalize_amount(raw: Option<&str>) -> Option<String> {
    raw.map(str::trim)
        .filter(|a| !a.is_empty())
        .map(ToString::to_string)
}

pub fn validate_session_name(name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        bail!("Session name must not be blank");
    }
    Ok(trimmed.to_string())
}
