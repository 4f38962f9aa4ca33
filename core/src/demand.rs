//! Demand collection: flattens a session's meals, staples, and ad-hoc
//! additions into one sequence of per-item contributions.
//!
//! Nothing is merged here. Every contribution is kept so the aggregator can
//! count recipe occurrences. References that no longer resolve (a meal that
//! points at a deleted recipe, an ingredient whose item vanished from the
//! catalog) are skipped instead of failing the whole list.

use std::collections::HashMap;

use serde::Serialize;

use crate::catalog::Catalog;
use crate::models::{
    AdhocItem, ItemId, Meal, Recipe, RecipeId, SessionId, StapleSelection, StapleStatus,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DemandSource {
    Recipe,
    MealItem,
    Staple,
    Adhoc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DemandRecord {
    pub item: ItemId,
    pub amount: Option<String>,
    pub source: DemandSource,
}

impl DemandRecord {
    fn new(item: ItemId, amount: Option<&str>, source: DemandSource) -> Self {
        Self {
            item,
            amount: amount.map(ToString::to_string),
            source,
        }
    }
}

/// Everything the collector reads for one planning session.
#[derive(Debug, Clone, Copy)]
pub struct PlanningInputs<'a> {
    pub session: SessionId,
    pub meals: &'a [Meal],
    pub recipes: &'a HashMap<RecipeId, Recipe>,
    pub staples: &'a [StapleSelection],
    pub adhoc: &'a [AdhocItem],
}

/// Enumerates demand in meal order, then staples, then ad-hoc items.
///
/// Only `Included` staple selections produce demand; their amount is the
/// item's default staple amount from the catalog.
#[must_use]
pub fn collect_demand(inputs: &PlanningInputs<'_>, catalog: &Catalog) -> Vec<DemandRecord> {
    let mut demand = Vec::new();

    for meal in inputs.meals {
        if meal.session != inputs.session {
            log::debug!(
                "skipping meal {} from session {} while collecting session {}",
                meal.id,
                meal.session,
                inputs.session
            );
            continue;
        }

        for recipe_id in &meal.recipes {
            let Some(recipe) = inputs.recipes.get(recipe_id) else {
                log::warn!("meal {} references missing recipe {recipe_id}", meal.id);
                continue;
            };
            for ingredient in &recipe.ingredients {
                if !catalog.contains(ingredient.item) {
                    log::warn!(
                        "recipe {} references missing item {}",
                        recipe.id,
                        ingredient.item
                    );
                    continue;
                }
                demand.push(DemandRecord::new(
                    ingredient.item,
                    ingredient.amount.as_deref(),
                    DemandSource::Recipe,
                ));
            }
        }

        for meal_item in &meal.items {
            if !catalog.contains(meal_item.item) {
                log::warn!("meal {} references missing item {}", meal.id, meal_item.item);
                continue;
            }
            demand.push(DemandRecord::new(
                meal_item.item,
                meal_item.amount.as_deref(),
                DemandSource::MealItem,
            ));
        }
    }

    for selection in inputs.staples {
        if selection.session != inputs.session || selection.status != StapleStatus::Included {
            continue;
        }
        if !catalog.contains(selection.item) {
            log::warn!("staple selection references missing item {}", selection.item);
            continue;
        }
        demand.push(DemandRecord::new(
            selection.item,
            catalog.staple_amount(selection.item),
            DemandSource::Staple,
        ));
    }

    for adhoc in inputs.adhoc {
        if adhoc.session != inputs.session {
            continue;
        }
        if !catalog.contains(adhoc.item) {
            log::warn!("ad-hoc entry references missing item {}", adhoc.item);
            continue;
        }
        demand.push(DemandRecord::new(
            adhoc.item,
            adhoc.amount.as_deref(),
            DemandSource::Adhoc,
        ));
    }

    demand
}


#[cfg(test)]
mod tests {
    use super::test_support::{adhoc, meal, recipe, recipe_map, selection};
    use super::*;
    use crate::catalog::test_support::{item, staple};

    fn catalog() -> Catalog {
        Catalog::new(vec![
            item(1, "flour"),
            item(2, "eggs"),
            item(3, "lettuce"),
            staple(4, "milk", Some("1 gal")),
            item(5, "batteries"),
        ])
    }

    #[test]
    fn test_collect_preserves_every_contribution() {
        let recipes = recipe_map(vec![recipe(
            10,
            "pancakes",
            &[(1, Some("2 cups")), (2, Some("3"))],
        )]);
        let meals = vec![meal(100, 1, &[10], &[]), meal(101, 1, &[10], &[(3, None)])];
        let inputs = PlanningInputs {
            session: SessionId(1),
            meals: &meals,
            recipes: &recipes,
            staples: &[],
            adhoc: &[],
        };

        let demand = collect_demand(&inputs, &catalog());
        assert_eq!(demand.len(), 5);
        let recipe_rows = demand
            .iter()
            .filter(|d| d.source == DemandSource::Recipe)
            .count();
        assert_eq!(recipe_rows, 4);
        assert_eq!(
            demand[4],
            DemandRecord {
                item: ItemId(3),
                amount: None,
                source: DemandSource::MealItem,
            }
        );
    }

    #[test]
    fn test_collect_only_included_staples_with_default_amount() {
        let recipes = HashMap::new();
        let staples = vec![
            selection(1, 4, StapleStatus::Included),
            selection(1, 1, StapleStatus::Pending),
            selection(1, 2, StapleStatus::Excluded),
        ];
        let inputs = PlanningInputs {
            session: SessionId(1),
            meals: &[],
            recipes: &recipes,
            staples: &staples,
            adhoc: &[],
        };

        let demand = collect_demand(&inputs, &catalog());
        assert_eq!(demand.len(), 1);
        assert_eq!(demand[0].item, ItemId(4));
        assert_eq!(demand[0].amount.as_deref(), Some("1 gal"));
        assert_eq!(demand[0].source, DemandSource::Staple);
    }

    #[test]
    fn test_collect_skips_missing_recipe() {
        let recipes = recipe_map(vec![recipe(10, "salad", &[(3, Some("1 head"))])]);
        let meals = vec![meal(100, 1, &[99, 10], &[])];
        let inputs = PlanningInputs {
            session: SessionId(1),
            meals: &meals,
            recipes: &recipes,
            staples: &[],
            adhoc: &[],
        };

        let demand = collect_demand(&inputs, &catalog());
        assert_eq!(demand.len(), 1);
        assert_eq!(demand[0].item, ItemId(3));
    }

    #[test]
    fn test_collect_skips_unknown_items() {
        let recipes = recipe_map(vec![recipe(10, "mystery", &[(42, None), (1, None)])]);
        let meals = vec![meal(100, 1, &[10], &[(43, None)])];
        let adhoc_items = vec![adhoc(1, 44, None), adhoc(1, 5, Some("AA x8"))];
        let inputs = PlanningInputs {
            session: SessionId(1),
            meals: &meals,
            recipes: &recipes,
            staples: &[],
            adhoc: &adhoc_items,
        };

        let demand = collect_demand(&inputs, &catalog());
        let items: Vec<ItemId> = demand.iter().map(|d| d.item).collect();
        assert_eq!(items, vec![ItemId(1), ItemId(5)]);
    }

    #[test]
    fn test_collect_ignores_other_sessions() {
        let recipes = recipe_map(vec![recipe(10, "pancakes", &[(1, None)])]);
        let meals = vec![meal(100, 2, &[10], &[])];
        let adhoc_items = vec![adhoc(2, 5, None)];
        let staples = vec![selection(2, 4, StapleStatus::Included)];
        let inputs = PlanningInputs {
            session: SessionId(1),
            meals: &meals,
            recipes: &recipes,
            staples: &staples,
            adhoc: &adhoc_items,
        };

        assert!(collect_demand(&inputs, &catalog()).is_empty());
    }
}
