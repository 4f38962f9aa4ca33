use std::collections::HashMap;

use crate::models::{Item, ItemId};

/// In-memory `ItemId` lookup over the full item catalog.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    items: HashMap<ItemId, Item>,
}

impl Catalog {
    #[must_use]
    pub fn new(items: Vec<Item>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id, i)).collect(),
        }
    }

    #[must_use]
    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.items.get(&id)
    }

    #[must_use]
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    #[must_use]
    pub fn name(&self, id: ItemId) -> Option<&str> {
        self.items.get(&id).map(|i| i.name.as_str())
    }

    #[must_use]
    pub fn order_index(&self, id: ItemId) -> Option<i64> {
        self.items.get(&id).and_then(|i| i.store_order_index)
    }

    #[must_use]
    pub fn staple_amount(&self, id: ItemId) -> Option<&str> {
        self.items.get(&id).and_then(|i| i.staple_amount.as_deref())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::{item, positioned, staple};
    use super::*;

    #[test]
    fn test_catalog_lookups() {
        let catalog = Catalog::new(vec![
            item(1, "eggs"),
            positioned(2, "milk", 4),
            staple(3, "flour", Some("5 lb bag")),
        ]);
        assert_eq!(catalog.len(), 3);
        assert_eq!(catalog.name(ItemId(1)), Some("eggs"));
        assert_eq!(catalog.order_index(ItemId(2)), Some(4));
        assert_eq!(catalog.order_index(ItemId(1)), None);
        assert_eq!(catalog.staple_amount(ItemId(3)), Some("5 lb bag"));
        assert!(!catalog.contains(ItemId(9)));
    }
}
