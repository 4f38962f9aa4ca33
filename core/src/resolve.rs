use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use anyhow::bail;
use serde::{Deserialize, Serialize};

use crate::checklist::DisplayEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortMode {
    #[default]
    StoreOrder,
    Alphabetical,
}

impl SortMode {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoreOrder => "store-order",
            Self::Alphabetical => "alphabetical",
        }
    }
}

impl fmt::Display for SortMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "store-order" | "store" | "store_order" => Ok(Self::StoreOrder),
            "alphabetical" | "alpha" | "a-z" => Ok(Self::Alphabetical),
            _ => bail!("Invalid sort mode '{s}'. Must be one of: store-order, alphabetical"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub entries: Vec<DisplayEntry>,
    /// Entries with no store position, whatever the mode.
    pub unpositioned_count: usize,
}

fn by_name(a: &DisplayEntry, b: &DisplayEntry) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// Sorts reconciled entries for display. Both modes use stable sorts, so
/// equal keys keep their reconciled order.
#[must_use]
pub fn resolve(mut entries: Vec<DisplayEntry>, mode: SortMode) -> Resolved {
    let unpositioned_count = entries.iter().filter(|e| e.order_index.is_none()).count();

    match mode {
        SortMode::Alphabetical => entries.sort_by(by_name),
        SortMode::StoreOrder => entries.sort_by(|a, b| match (a.order_index, b.order_index) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => by_name(a, b),
        }),
    }

    Resolved {
        entries,
        unpositioned_count,
    }
}
