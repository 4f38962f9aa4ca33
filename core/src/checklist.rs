//! Reconciles freshly aggregated demand against persisted check-off state.
//!
//! # Invariants
//! - `checked` is looked up by (session, item); it survives an item leaving
//!   demand and coming back.
//! - Persisted rows whose item is no longer demanded still surface as bare
//!   entries. Nothing persisted is dropped silently.
//! - A toggle is one idempotent upsert; a failed upsert reverts the
//!   optimistic display change.

use std::collections::HashMap;

use serde::Serialize;

use crate::aggregate::{Aggregate, AggregatedItem};
use crate::catalog::Catalog;
use crate::error::{ShoppingError, ShoppingResult};
use crate::models::{ChecklistEntry, ItemId, SessionId};

/// Persistence seam for checklist toggles.
///
/// Implementations must key the write on (session, item) with a uniqueness
/// constraint so concurrent callers cannot create duplicate rows.
pub trait ChecklistStore {
    fn upsert_checklist_entry(
        &self,
        session: SessionId,
        item: ItemId,
        checked: bool,
    ) -> anyhow::Result<ChecklistEntry>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DisplayEntry {
    pub item: ItemId,
    pub name: String,
    /// `None` for bare entries that only exist on the persisted checklist.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aggregated: Option<AggregatedItem>,
    pub checked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
}

impl DisplayEntry {
    #[must_use]
    pub fn is_bare(&self) -> bool {
        self.aggregated.is_none()
    }
}

#[must_use]
pub fn reconcile(
    session: SessionId,
    needed: &Aggregate,
    persisted: &[ChecklistEntry],
    catalog: &Catalog,
) -> Vec<DisplayEntry> {
    let checked_by_item: HashMap<ItemId, bool> = persisted
        .iter()
        .filter(|e| e.session == session)
        .map(|e| (e.item, e.checked))
        .collect();

    let mut entries: Vec<DisplayEntry> = needed
        .iter()
        .map(|agg| DisplayEntry {
            item: agg.item,
            name: agg.name.clone(),
            aggregated: Some(agg.clone()),
            checked: checked_by_item.get(&agg.item).copied().unwrap_or(false),
            order_index: agg.order_index,
        })
        .collect();

    for row in persisted.iter().filter(|e| e.session == session) {
        if needed.contains(row.item) {
            continue;
        }
        let Some(item) = catalog.get(row.item) else {
            log::warn!("checklist row {} references missing item {}", row.id, row.item);
            continue;
        };
        entries.push(DisplayEntry {
            item: row.item,
            name: item.name.clone(),
            aggregated: None,
            checked: row.checked,
            order_index: item.store_order_index,
        });
    }

    entries
}

/// A reversible checklist state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleCommand {
    pub item: ItemId,
    pub checked: bool,
    pub previous: bool,
}

impl ToggleCommand {
    /// Captures the current state of `item` so the command can be undone.
    #[must_use]
    pub fn new(entries: &[DisplayEntry], item: ItemId, checked: bool) -> Option<Self> {
        let previous = entries.iter().find(|e| e.item == item)?.checked;
        Some(Self {
            item,
            checked,
            previous,
        })
    }

    pub fn apply(&self, entries: &mut [DisplayEntry]) {
        for entry in entries.iter_mut().filter(|e| e.item == self.item) {
            entry.checked = self.checked;
        }
    }

    #[must_use]
    pub fn inverse(&self) -> Self {
        Self {
            item: self.item,
            checked: self.previous,
            previous: self.checked,
        }
    }
}

/// Optimistically applies a toggle to the display entries, persists it, and
/// rolls the display back if the store rejects the write.
pub fn toggle_checked<S: ChecklistStore + ?Sized>(
    entries: &mut [DisplayEntry],
    store: &S,
    session: SessionId,
    item: ItemId,
    checked: bool,
) -> ShoppingResult<ChecklistEntry> {
    let command =
        ToggleCommand::new(entries, item, checked).ok_or(ShoppingError::UnknownItem(item))?;
    command.apply(entries);

    match store.upsert_checklist_entry(session, item, checked) {
        Ok(row) => Ok(row),
        Err(err) => {
            log::warn!("checklist toggle failed for item {item} in session {session}: {err:#}");
            command.inverse().apply(entries);
            Err(ShoppingError::persistence(&err))
        }
    }
}
