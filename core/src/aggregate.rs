//! Merges demand records into one entry per item.
//!
//! # Invariants
//! - Exactly one entry per `ItemId`, however many sources contributed.
//! - `recipe_count` counts recipe-ingredient occurrences only.
//! - Provenance flags are independent; an item can be staple and side at once.
//! - Iteration order is recipe demand, then staples, then meal items, then
//!   ad-hoc items, each in first-seen order.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::demand::{DemandRecord, DemandSource};
use crate::models::ItemId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregatedItem {
    pub item: ItemId,
    pub name: String,
    pub amounts: Vec<String>,
    pub recipe_count: u32,
    pub is_staple: bool,
    pub is_side: bool,
    pub is_ad_hoc: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_index: Option<i64>,
}

impl AggregatedItem {
    fn new(item: ItemId, catalog: &Catalog) -> Self {
        Self {
            item,
            name: catalog.name(item).unwrap_or_default().to_string(),
            amounts: Vec::new(),
            recipe_count: 0,
            is_staple: false,
            is_side: false,
            is_ad_hoc: false,
            order_index: catalog.order_index(item),
        }
    }
}

/// Insertion-ordered `ItemId -> AggregatedItem` mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Aggregate {
    entries: Vec<AggregatedItem>,
    index: HashMap<ItemId, usize>,
}

impl Aggregate {
    #[must_use]
    pub fn get(&self, item: ItemId) -> Option<&AggregatedItem> {
        self.index.get(&item).map(|&i| &self.entries[i])
    }

    fn get_mut(&mut self, item: ItemId) -> Option<&mut AggregatedItem> {
        self.index.get(&item).map(|&i| &mut self.entries[i])
    }

    fn insert(&mut self, entry: AggregatedItem) {
        self.index.insert(entry.item, self.entries.len());
        self.entries.push(entry);
    }

    #[must_use]
    pub fn contains(&self, item: ItemId) -> bool {
        self.index.contains_key(&item)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &AggregatedItem> {
        self.entries.iter()
    }

    pub fn item_ids(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.entries.iter().map(|e| e.item)
    }

    /// Keeps entries matching `keep`, preserving order.
    #[must_use]
    pub fn retain(self, mut keep: impl FnMut(&AggregatedItem) -> bool) -> Self {
        self.entries.into_iter().filter(|e| keep(e)).collect()
    }
}

impl FromIterator<AggregatedItem> for Aggregate {
    fn from_iter<T: IntoIterator<Item = AggregatedItem>>(iter: T) -> Self {
        let mut aggregate = Aggregate::default();
        for entry in iter {
            if let Some(existing) = aggregate.get_mut(entry.item) {
                *existing = entry;
            } else {
                aggregate.insert(entry);
            }
        }
        aggregate
    }
}

impl IntoIterator for Aggregate {
    type Item = AggregatedItem;
    type IntoIter = std::vec::IntoIter<AggregatedItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Builds the aggregate from raw demand, attaching store positions from
/// the catalog.
#[must_use]
pub fn aggregate(demand: &[DemandRecord], catalog: &Catalog) -> Aggregate {
    let mut agg = Aggregate::default();

    for record in demand.iter().filter(|d| d.source == DemandSource::Recipe) {
        if let Some(entry) = agg.get_mut(record.item) {
            entry.recipe_count += 1;
            if let Some(amount) = &record.amount {
                entry.amounts.push(amount.clone());
            }
        } else {
            let mut entry = AggregatedItem::new(record.item, catalog);
            entry.recipe_count = 1;
            entry.amounts.extend(record.amount.clone());
            agg.insert(entry);
        }
    }

    // Staple, side, and ad-hoc demand only flag an existing entry; the
    // recipe-driven amounts stay untouched.
    let flagged = [
        DemandSource::Staple,
        DemandSource::MealItem,
        DemandSource::Adhoc,
    ];
    for source in flagged {
        for record in demand.iter().filter(|d| d.source == source) {
            if let Some(entry) = agg.get_mut(record.item) {
                set_flag(entry, source);
            } else {
                let mut entry = AggregatedItem::new(record.item, catalog);
                entry.amounts.extend(record.amount.clone());
                set_flag(&mut entry, source);
                agg.insert(entry);
            }
        }
    }

    agg
}

fn set_flag(entry: &mut AggregatedItem, source: DemandSource) {
    match source {
        DemandSource::Staple => entry.is_staple = true,
        DemandSource::MealItem => entry.is_side = true,
        DemandSource::Adhoc => entry.is_ad_hoc = true,
        DemandSource::Recipe => {}
    }
}
