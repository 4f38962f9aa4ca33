use thiserror::Error;

use crate::models::ItemId;

pub type ShoppingResult<T> = std::result::Result<T, ShoppingError>;

/// Failures reported across the list engine boundary.
///
/// None of these are fatal to the caller; each maps to a refused operation
/// or a flagged-dirty state.
#[derive(Error, Debug)]
pub enum ShoppingError {
    #[error("Cannot resolve item '{name}'")]
    ItemResolution { name: String },

    #[error("Unknown item: {0}")]
    UnknownItem(ItemId),

    #[error("Persistence failed: {0}")]
    Persistence(String),
}

impl ShoppingError {
    pub(crate) fn persistence(err: &anyhow::Error) -> Self {
        Self::Persistence(format!("{err:#}"))
    }
}
