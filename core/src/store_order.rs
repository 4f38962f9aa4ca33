//! Store-order editing: the catalog split into positioned and unpositioned
//! partitions, with change detection against the last saved sequence.
//!
//! # Invariants
//! - `ordered` and `unordered` are disjoint and together hold every item.
//! - `unordered` stays alphabetical.
//! - The saved baseline only moves after a fully successful commit.

use serde::Serialize;

use crate::error::{ShoppingError, ShoppingResult};
use crate::models::{Item, ItemId, OrderAssignment};

/// Persistence seam for the batch store-order write.
///
/// The batch must be applied atomically: either every assignment lands or
/// none do.
pub trait OrderStore {
    fn commit_store_order(&self, batch: &[OrderAssignment]) -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderSlot {
    pub item: ItemId,
    pub name: String,
}

impl From<&Item> for OrderSlot {
    fn from(item: &Item) -> Self {
        Self {
            item: item.id,
            name: item.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StoreOrderManager {
    ordered: Vec<OrderSlot>,
    unordered: Vec<OrderSlot>,
    baseline: Vec<ItemId>,
}

fn name_key(name: &str) -> String {
    name.to_lowercase()
}

impl StoreOrderManager {
    /// Partitions the catalog by `store_order_index`. Positioned items sort by
    /// index (name breaks ties), the rest alphabetically.
    #[must_use]
    pub fn from_items(items: &[Item]) -> Self {
        let mut positioned: Vec<(i64, OrderSlot)> = Vec::new();
        let mut unordered: Vec<OrderSlot> = Vec::new();
        for item in items {
            match item.store_order_index {
                Some(index) => positioned.push((index, OrderSlot::from(item))),
                None => unordered.push(OrderSlot::from(item)),
            }
        }
        positioned.sort_by(|(a, sa), (b, sb)| a.cmp(b).then_with(|| sa.name.cmp(&sb.name)));
        unordered.sort_by_cached_key(|slot| name_key(&slot.name));

        let ordered: Vec<OrderSlot> = positioned.into_iter().map(|(_, slot)| slot).collect();
        let baseline = ordered.iter().map(|s| s.item).collect();
        Self {
            ordered,
            unordered,
            baseline,
        }
    }

    #[must_use]
    pub fn ordered(&self) -> &[OrderSlot] {
        &self.ordered
    }

    #[must_use]
    pub fn unordered(&self) -> &[OrderSlot] {
        &self.unordered
    }

    #[must_use]
    pub fn contains(&self, item: ItemId) -> bool {
        self.ordered.iter().any(|s| s.item == item) || self.unordered.iter().any(|s| s.item == item)
    }

    /// Moves one positioned item. Returns `false` (and changes nothing) when
    /// the indices are equal or out of range.
    pub fn move_within_ordered(&mut self, from: usize, to: usize) -> bool {
        if from == to || from >= self.ordered.len() || to >= self.ordered.len() {
            return false;
        }
        let slot = self.ordered.remove(from);
        self.ordered.insert(to, slot);
        true
    }

    /// Gives an unpositioned item a position, appending when `at` is `None`
    /// or past the end.
    pub fn promote(&mut self, item: ItemId, at: Option<usize>) -> bool {
        let Some(pos) = self.unordered.iter().position(|s| s.item == item) else {
            return false;
        };
        let slot = self.unordered.remove(pos);
        let at = at.unwrap_or(self.ordered.len()).min(self.ordered.len());
        self.ordered.insert(at, slot);
        true
    }

    /// Clears an item's position, returning it to the alphabetical pool.
    pub fn demote(&mut self, item: ItemId) -> bool {
        let Some(pos) = self.ordered.iter().position(|s| s.item == item) else {
            return false;
        };
        let slot = self.ordered.remove(pos);
        self.insert_unordered(slot);
        true
    }

    /// Adds a newly created catalog item to the unpositioned pool.
    pub fn insert_item(&mut self, item: &Item) -> bool {
        if self.contains(item.id) {
            return false;
        }
        self.insert_unordered(OrderSlot::from(item));
        true
    }

    pub fn remove_item(&mut self, item: ItemId) -> bool {
        if let Some(pos) = self.ordered.iter().position(|s| s.item == item) {
            self.ordered.remove(pos);
            return true;
        }
        if let Some(pos) = self.unordered.iter().position(|s| s.item == item) {
            self.unordered.remove(pos);
            return true;
        }
        false
    }

    fn insert_unordered(&mut self, slot: OrderSlot) {
        let key = name_key(&slot.name);
        let at = self
            .unordered
            .partition_point(|s| name_key(&s.name) <= key);
        self.unordered.insert(at, slot);
    }

    /// Exact positional comparison against the last saved sequence.
    #[must_use]
    pub fn has_pending_changes(&self) -> bool {
        self.ordered.len() != self.baseline.len()
            || self
                .ordered
                .iter()
                .zip(&self.baseline)
                .any(|(slot, saved)| slot.item != *saved)
    }

    /// The batch `commit` would write: dense 1..N for the ordered sequence,
    /// `None` for everything unpositioned.
    #[must_use]
    pub fn pending_assignments(&self) -> Vec<OrderAssignment> {
        let ordered = self.ordered.iter().zip(1_i64..).map(|(slot, index)| OrderAssignment {
            item: slot.item,
            order_index: Some(index),
        });
        let unordered = self.unordered.iter().map(|slot| OrderAssignment {
            item: slot.item,
            order_index: None,
        });
        ordered.chain(unordered).collect()
    }

    /// Persists the current order as one batch. On failure the baseline is
    /// left alone so `has_pending_changes` keeps reporting unsaved work.
    pub fn commit<S: OrderStore + ?Sized>(
        &mut self,
        store: &S,
    ) -> ShoppingResult<Vec<OrderAssignment>> {
        let batch = self.pending_assignments();
        if let Err(err) = store.commit_store_order(&batch) {
            log::warn!("store order commit failed ({} assignments): {err:#}", batch.len());
            return Err(ShoppingError::persistence(&err));
        }
        self.baseline = self.ordered.iter().map(|s| s.item).collect();
        log::debug!("store order committed: {} positioned", self.baseline.len());
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use anyhow::bail;

    use super::*;
    use crate::catalog::test_support::{item, positioned};

    #[derive(Default)]
    struct RecordingStore {
        batches: RefCell<Vec<Vec<OrderAssignment>>>,
        fail: bool,
    }

    impl OrderStore for RecordingStore {
        fn commit_store_order(&self, batch: &[OrderAssignment]) -> anyhow::Result<()> {
            if self.fail {
                bail!("batch write rejected");
            }
            self.batches.borrow_mut().push(batch.to_vec());
            Ok(())
        }
    }

    fn manager() -> StoreOrderManager {
        StoreOrderManager::from_items(&[
            positioned(1, "bread", 20),
            positioned(2, "apples", 5),
            item(3, "zucchini"),
            item(4, "carrots"),
            positioned(5, "milk", 40),
        ])
    }

    fn ids(slots: &[OrderSlot]) -> Vec<i64> {
        slots.iter().map(|s| s.item.0).collect()
    }

    #[test]
    fn test_from_items_partitions() {
        let m = manager();
        assert_eq!(ids(m.ordered()), vec![2, 1, 5]);
        assert_eq!(ids(m.unordered()), vec![4, 3]);
        assert!(!m.has_pending_changes());
    }

    #[test]
    fn test_move_within_ordered() {
        let mut m = manager();
        assert!(m.move_within_ordered(0, 2));
        assert_eq!(ids(m.ordered()), vec![1, 5, 2]);
        assert!(m.has_pending_changes());
        assert_eq!(ids(m.unordered()), vec![4, 3]);
    }

    #[test]
    fn test_move_noop_cases() {
        let mut m = manager();
        assert!(!m.move_within_ordered(1, 1));
        assert!(!m.move_within_ordered(0, 3));
        assert!(!m.move_within_ordered(7, 0));
        assert!(!m.has_pending_changes());
    }

    #[test]
    fn test_move_and_back_is_clean() {
        let mut m = manager();
        m.move_within_ordered(0, 1);
        m.move_within_ordered(1, 0);
        assert!(!m.has_pending_changes());
    }

    #[test]
    fn test_promote_at_index_and_append() {
        let mut m = manager();
        assert!(m.promote(ItemId(3), Some(1)));
        assert!(m.promote(ItemId(4), None));
        assert_eq!(ids(m.ordered()), vec![2, 3, 1, 5, 4]);
        assert!(m.unordered().is_empty());
        assert!(!m.promote(ItemId(3), None));
    }

    #[test]
    fn test_promote_clamps_index() {
        let mut m = manager();
        assert!(m.promote(ItemId(4), Some(99)));
        assert_eq!(ids(m.ordered()), vec![2, 1, 5, 4]);
    }

    #[test]
    fn test_demote_keeps_alphabetical() {
        let mut m = manager();
        assert!(m.demote(ItemId(5)));
        assert_eq!(ids(m.unordered()), vec![4, 5, 3]);
        assert_eq!(ids(m.ordered()), vec![2, 1]);
        assert!(m.has_pending_changes());
        assert!(!m.demote(ItemId(5)));
    }

    #[test]
    fn test_insert_and_remove_item() {
        let mut m = manager();
        assert!(m.insert_item(&item(6, "eggs")));
        assert!(!m.insert_item(&item(6, "eggs")));
        assert_eq!(ids(m.unordered()), vec![4, 6, 3]);
        assert!(m.remove_item(ItemId(1)));
        assert!(m.remove_item(ItemId(6)));
        assert!(!m.remove_item(ItemId(42)));
        assert_eq!(ids(m.ordered()), vec![2, 5]);
    }

    #[test]
    fn test_pending_changes_detects_swap_with_same_length() {
        let mut m = manager();
        m.demote(ItemId(1));
        m.promote(ItemId(3), Some(1));
        assert_eq!(m.ordered().len(), 3);
        assert!(m.has_pending_changes());
    }

    #[test]
    fn test_commit_assigns_dense_indices() {
        let store = RecordingStore::default();
        let mut m = manager();
        m.promote(ItemId(4), Some(0));
        let batch = m.commit(&store).unwrap();
        assert_eq!(
            batch,
            vec![
                OrderAssignment { item: ItemId(4), order_index: Some(1) },
                OrderAssignment { item: ItemId(2), order_index: Some(2) },
                OrderAssignment { item: ItemId(1), order_index: Some(3) },
                OrderAssignment { item: ItemId(5), order_index: Some(4) },
                OrderAssignment { item: ItemId(3), order_index: None },
            ]
        );
        assert!(!m.has_pending_changes());
    }

    #[test]
    fn test_commit_twice_is_idempotent() {
        let store = RecordingStore::default();
        let mut m = manager();
        m.move_within_ordered(2, 0);
        let first = m.commit(&store).unwrap();
        assert!(!m.has_pending_changes());
        let second = m.commit(&store).unwrap();
        assert!(!m.has_pending_changes());
        assert_eq!(first, second);
        assert_eq!(store.batches.borrow().len(), 2);
    }

    #[test]
    fn test_failed_commit_stays_dirty() {
        let store = RecordingStore {
            fail: true,
            ..RecordingStore::default()
        };
        let mut m = manager();
        m.move_within_ordered(0, 1);
        let result = m.commit(&store);
        assert!(matches!(result, Err(ShoppingError::Persistence(_))));
        assert!(m.has_pending_changes());
        assert_eq!(ids(m.ordered()), vec![1, 2, 5]);
    }
}
