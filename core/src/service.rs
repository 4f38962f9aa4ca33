use std::collections::HashSet;
use std::path::Path;

use anyhow::Result;

use crate::aggregate::aggregate;
use crate::catalog::Catalog;
use crate::checklist::{DisplayEntry, reconcile, toggle_checked};
use crate::db::Database;
use crate::demand::{PlanningInputs, collect_demand};
use crate::error::{ShoppingError, ShoppingResult};
use crate::exclusion::filter_excluded;
use crate::list::ShoppingList;
use crate::models::{
    AdhocItem, ChecklistEntry, Item, ItemExclusion, ItemId, MealDay, OrderAssignment, SessionId,
    StapleSelection, StapleStatus, normalize_item_name,
};
use crate::resolve::{SortMode, resolve};
use crate::store_order::StoreOrderManager;

/// Session-scoped facade over the list engine and its record store.
///
/// Every list operation takes the session explicitly; there is no notion of
/// a current session here.
pub struct ShoppingService {
    db: Database,
}

impl ShoppingService {
    pub fn new(db_path: &Path) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self { db })
    }

    pub fn new_in_memory() -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self { db })
    }

    /// Direct access for plain record CRUD (recipes, meals, sessions).
    #[must_use]
    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn catalog(&self) -> Result<Catalog> {
        Ok(Catalog::new(self.db.list_items()?))
    }

    // --- Identity ---

    /// Resolves a free-text name to an item, creating it if needed.
    pub fn resolve_item(&self, name: &str) -> ShoppingResult<Item> {
        if normalize_item_name(name).is_none() {
            return Err(ShoppingError::ItemResolution {
                name: name.to_string(),
            });
        }
        self.db.get_or_create_item(name).map_err(|err| {
            log::warn!("could not resolve item '{name}': {err:#}");
            ShoppingError::ItemResolution {
                name: name.to_string(),
            }
        })
    }

    // --- List pipeline ---

    /// Runs collection, aggregation, exclusion and reconciliation for one
    /// session, returning unsorted display entries.
    pub fn display_entries(&self, session: SessionId) -> Result<Vec<DisplayEntry>> {
        self.db.get_session(session)?;
        let catalog = self.catalog()?;
        let meals = self.db.list_meals(session)?;
        let recipes = self.db.recipes_by_id()?;
        let staples = self.db.list_staple_selections(session)?;
        let adhoc = self.db.list_adhoc_items(session)?;

        let inputs = PlanningInputs {
            session,
            meals: &meals,
            recipes: &recipes,
            staples: &staples,
            adhoc: &adhoc,
        };
        let demand = collect_demand(&inputs, &catalog);
        let needed = aggregate(&demand, &catalog);

        let exclusions: HashSet<ItemId> = self
            .db
            .list_exclusions(session)?
            .into_iter()
            .map(|e| e.item)
            .collect();
        let needed = filter_excluded(needed, &exclusions);

        // Excluded items must not resurface through their persisted rows.
        let persisted: Vec<ChecklistEntry> = self
            .db
            .list_checklist_entries(session)?
            .into_iter()
            .filter(|e| !exclusions.contains(&e.item))
            .collect();

        log::debug!(
            "session {session}: {} demand records, {} needed, {} persisted rows",
            demand.len(),
            needed.len(),
            persisted.len()
        );
        Ok(reconcile(session, &needed, &persisted, &catalog))
    }

    pub fn build_shopping_list(&self, session: SessionId, mode: SortMode) -> Result<ShoppingList> {
        let entries = self.display_entries(session)?;
        Ok(ShoppingList::from_resolved(
            session,
            mode,
            resolve(entries, mode),
        ))
    }

    // --- Checklist ---

    /// Sets the checked state of an item currently on the session's list.
    pub fn toggle_item(
        &self,
        session: SessionId,
        item: ItemId,
        checked: bool,
    ) -> ShoppingResult<ChecklistEntry> {
        let mut entries = self
            .display_entries(session)
            .map_err(|err| ShoppingError::persistence(&err))?;
        toggle_checked(&mut entries, &self.db, session, item, checked)
    }

    /// Puts an item on the checklist directly, unchecked. An existing row is
    /// returned unchanged.
    pub fn add_checklist_item(
        &self,
        session: SessionId,
        name: &str,
    ) -> ShoppingResult<ChecklistEntry> {
        let item = self.resolve_item(name)?;
        self.db
            .insert_checklist_entry_if_absent(session, item.id)
            .map_err(|err| ShoppingError::persistence(&err))
    }

    pub fn clear_checked(&self, session: SessionId) -> Result<usize> {
        let removed = self.db.clear_checked(session)?;
        log::info!("cleared {removed} checked entries from session {session}");
        Ok(removed)
    }

    pub fn reset_checklist(&self, session: SessionId) -> Result<usize> {
        let removed = self.db.reset_checklist(session)?;
        log::info!("reset checklist for session {session} ({removed} entries)");
        Ok(removed)
    }

    // --- Ad-hoc items and exclusions ---

    pub fn add_adhoc_item(
        &self,
        session: SessionId,
        name: &str,
        amount: Option<&str>,
    ) -> ShoppingResult<AdhocItem> {
        let item = self.resolve_item(name)?;
        self.db
            .upsert_adhoc_item(session, item.id, amount)
            .map_err(|err| ShoppingError::persistence(&err))
    }

    pub fn remove_adhoc_item(&self, session: SessionId, item: ItemId) -> Result<bool> {
        self.db.remove_adhoc_item(session, item)
    }

    pub fn exclude_item(&self, session: SessionId, item: ItemId) -> Result<ItemExclusion> {
        self.db.get_item(item)?;
        self.db.add_exclusion(session, item)
    }

    pub fn include_item(&self, session: SessionId, item: ItemId) -> Result<bool> {
        self.db.remove_exclusion(session, item)
    }

    // --- Staples ---

    pub fn staple_selections(&self, session: SessionId) -> Result<Vec<StapleSelection>> {
        self.db.list_staple_selections(session)
    }

    pub fn set_staple_status(
        &self,
        session: SessionId,
        item: ItemId,
        status: StapleStatus,
    ) -> Result<()> {
        self.db.set_staple_status(session, item, status)
    }

    // --- Meal plan ---

    /// Meals grouped by date ascending, with the unscheduled bucket last.
    pub fn meal_plan(&self, session: SessionId) -> Result<Vec<MealDay>> {
        let mut days: Vec<MealDay> = Vec::new();
        for meal in self.db.list_meals(session)? {
            match days.last_mut() {
                Some(day) if day.date == meal.date => day.meals.push(meal),
                _ => days.push(MealDay {
                    date: meal.date,
                    meals: vec![meal],
                }),
            }
        }
        Ok(days)
    }

    // --- Store order ---

    pub fn store_order(&self) -> Result<StoreOrderManager> {
        Ok(StoreOrderManager::from_items(&self.db.list_items()?))
    }

    pub fn commit_store_order(
        &self,
        manager: &mut StoreOrderManager,
    ) -> ShoppingResult<Vec<OrderAssignment>> {
        manager.commit(&self.db)
    }
}
