use std::collections::HashSet;

use crate::aggregate::Aggregate;
use crate::models::ItemId;

/// Drops every excluded item from the aggregate. Exclusion is applied after
/// aggregation and wins over every source.
#[must_use]
pub fn filter_excluded(aggregate: Aggregate, exclusions: &HashSet<ItemId>) -> Aggregate {
    if exclusions.is_empty() {
        return aggregate;
    }
    aggregate.retain(|entry| !exclusions.contains(&entry.item))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::aggregate;
    use crate::catalog::Catalog;
    use crate::catalog::test_support::item;
    use crate::demand::{DemandRecord, DemandSource};

    fn sample() -> Aggregate {
        let catalog = Catalog::new(vec![item(1, "flour"), item(2, "eggs"), item(3, "milk")]);
        let demand = vec![
            DemandRecord {
                item: ItemId(1),
                amount: Some("2 cups".to_string()),
                source: DemandSource::Recipe,
            },
            DemandRecord {
                item: ItemId(1),
                amount: None,
                source: DemandSource::Recipe,
            },
            DemandRecord {
                item: ItemId(1),
                amount: None,
                source: DemandSource::Staple,
            },
            DemandRecord {
                item: ItemId(2),
                amount: None,
                source: DemandSource::MealItem,
            },
            DemandRecord {
                item: ItemId(3),
                amount: None,
                source: DemandSource::Adhoc,
            },
        ];
        aggregate(&demand, &catalog)
    }

    #[test]
    fn test_filter_removes_excluded() {
        let exclusions = HashSet::from([ItemId(2)]);
        let filtered = filter_excluded(sample(), &exclusions);
        assert_eq!(filtered.len(), 2);
        assert!(!filtered.contains(ItemId(2)));
    }

    #[test]
    fn test_filter_is_idempotent() {
        let exclusions = HashSet::from([ItemId(1), ItemId(9)]);
        let once = filter_excluded(sample(), &exclusions);
        let twice = filter_excluded(once.clone(), &exclusions);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_exclusion_overrides_staple_and_recipes() {
        let agg = sample();
        let flour = agg.get(ItemId(1)).unwrap();
        assert!(flour.is_staple);
        assert_eq!(flour.recipe_count, 2);

        let filtered = filter_excluded(agg, &HashSet::from([ItemId(1)]));
        assert!(filtered.get(ItemId(1)).is_none());
    }

    #[test]
    fn test_empty_exclusions_is_identity() {
        let agg = sample();
        assert_eq!(filter_excluded(agg.clone(), &HashSet::new()), agg);
    }
}
