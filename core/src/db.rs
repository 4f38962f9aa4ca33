use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, params};
use uuid::Uuid;

use crate::checklist::ChecklistStore;
use crate::models::{
    AdhocItem, ChecklistEntry, Item, ItemExclusion, ItemId, Meal, MealId, MealItem, OrderAssignment,
    Recipe, RecipeId, RecipeIngredient, Session, SessionId, StapleSelection, StapleStatus,
    normalize_amount, normalize_item_name,
};
use crate::store_order::OrderStore;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    #[allow(clippy::too_many_lines)]
    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            log::info!("migrating database schema from version {version} to 1");
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL,
                    name TEXT NOT NULL UNIQUE,
                    is_staple INTEGER NOT NULL DEFAULT 0,
                    staple_amount TEXT,
                    store_order_index INTEGER,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL,
                    name TEXT NOT NULL,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS recipe_ingredients (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    recipe_id INTEGER NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    amount TEXT
                );

                CREATE TABLE IF NOT EXISTS sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL,
                    name TEXT NOT NULL,
                    starts_on TEXT,
                    created_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meals (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    uuid TEXT NOT NULL,
                    session_id INTEGER NOT NULL REFERENCES sessions(id),
                    date TEXT,
                    name TEXT,
                    created_at TEXT NOT NULL
                );

                -- recipe_id has no foreign key: deleting a recipe
                -- leaves the reference behind and list building skips it.
                CREATE TABLE IF NOT EXISTS meal_recipes (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
                    recipe_id INTEGER NOT NULL
                );

                CREATE TABLE IF NOT EXISTS meal_items (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    meal_id INTEGER NOT NULL REFERENCES meals(id) ON DELETE CASCADE,
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    amount TEXT
                );

                CREATE TABLE IF NOT EXISTS staple_selections (
                    session_id INTEGER NOT NULL REFERENCES sessions(id),
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    status TEXT NOT NULL CHECK (status IN ('pending', 'included', 'excluded')),
                    updated_at TEXT NOT NULL,
                    PRIMARY KEY (session_id, item_id)
                );

                CREATE TABLE IF NOT EXISTS adhoc_items (
                    session_id INTEGER NOT NULL REFERENCES sessions(id),
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    amount TEXT,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (session_id, item_id)
                );

                CREATE TABLE IF NOT EXISTS item_exclusions (
                    session_id INTEGER NOT NULL REFERENCES sessions(id),
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (session_id, item_id)
                );

                CREATE TABLE IF NOT EXISTS checklist_entries (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id INTEGER NOT NULL REFERENCES sessions(id),
                    item_id INTEGER NOT NULL REFERENCES items(id),
                    checked INTEGER NOT NULL DEFAULT 0,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (session_id, item_id)
                );

                CREATE INDEX IF NOT EXISTS idx_recipe_ingredients_recipe ON recipe_ingredients(recipe_id);
                CREATE INDEX IF NOT EXISTS idx_meals_session ON meals(session_id);
                CREATE INDEX IF NOT EXISTS idx_meal_recipes_meal ON meal_recipes(meal_id);
                CREATE INDEX IF NOT EXISTS idx_meal_items_meal ON meal_items(meal_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    fn item_from_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
        Ok(Item {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            is_staple: row.get(3)?,
            staple_amount: row.get(4)?,
            store_order_index: row.get(5)?,
            created_at: row.get(6)?,
            updated_at: row.get(7)?,
        })
    }

    fn checklist_entry_from_row(row: &rusqlite::Row) -> rusqlite::Result<ChecklistEntry> {
        Ok(ChecklistEntry {
            id: row.get(0)?,
            session: row.get(1)?,
            item: row.get(2)?,
            checked: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn session_from_row(row: &rusqlite::Row) -> rusqlite::Result<Session> {
        Ok(Session {
            id: row.get(0)?,
            uuid: row.get(1)?,
            name: row.get(2)?,
            starts_on: date_column(row, 3)?,
            created_at: row.get(4)?,
        })
    }

    // --- Items ---

    /// Resolves a name to an item, creating it on first reference.
    pub fn get_or_create_item(&self, name: &str) -> Result<Item> {
        let Some(normalized) = normalize_item_name(name) else {
            bail!("Item name must not be blank");
        };
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO items (uuid, name, is_staple, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4)
             ON CONFLICT(name) DO NOTHING",
            params![uuid, normalized, now, now],
        )?;
        self.find_item_by_name(&normalized)?
            .with_context(|| format!("Item '{normalized}' not found after insert"))
    }

    pub fn get_item(&self, id: ItemId) -> Result<Item> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, is_staple, staple_amount, store_order_index, created_at, updated_at
                 FROM items WHERE id = ?1",
                params![id],
                Self::item_from_row,
            )
            .context("Item not found")
    }

    pub fn find_item_by_name(&self, name: &str) -> Result<Option<Item>> {
        let Some(normalized) = normalize_item_name(name) else {
            return Ok(None);
        };
        let item = self
            .conn
            .query_row(
                "SELECT id, uuid, name, is_staple, staple_amount, store_order_index, created_at, updated_at
                 FROM items WHERE name = ?1",
                params![normalized],
                Self::item_from_row,
            )
            .optional()?;
        Ok(item)
    }

    pub fn list_items(&self) -> Result<Vec<Item>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, is_staple, staple_amount, store_order_index, created_at, updated_at
             FROM items ORDER BY name",
        )?;
        let items = stmt
            .query_map([], Self::item_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    pub fn set_item_staple(
        &self,
        id: ItemId,
        is_staple: bool,
        staple_amount: Option<&str>,
    ) -> Result<Item> {
        let now = Local::now().to_rfc3339();
        let rows = self.conn.execute(
            "UPDATE items SET is_staple = ?1, staple_amount = ?2, updated_at = ?3 WHERE id = ?4",
            params![is_staple, normalize_amount(staple_amount), now, id],
        )?;
        if rows == 0 {
            bail!("Item {id} not found");
        }
        self.get_item(id)
    }

    // --- Recipes ---

    pub fn create_recipe(&self, name: &str) -> Result<Recipe> {
        let name = name.trim();
        if name.is_empty() {
            bail!("Recipe name must not be blank");
        }
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO recipes (uuid, name, created_at, updated_at) VALUES (?1, ?2, ?3, ?4)",
            params![uuid, name, now, now],
        )?;
        let id = RecipeId(self.conn.last_insert_rowid());
        self.get_recipe(id)
    }

    pub fn get_recipe(&self, id: RecipeId) -> Result<Recipe> {
        let (uuid, name, created_at): (String, String, String) = self
            .conn
            .query_row(
                "SELECT uuid, name, created_at FROM recipes WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .context("Recipe not found")?;
        Ok(Recipe {
            id,
            uuid,
            name,
            ingredients: self.get_recipe_ingredients(id)?,
            created_at,
        })
    }

    pub fn get_recipe_by_name(&self, name: &str) -> Result<Recipe> {
        let id: RecipeId = self
            .conn
            .query_row(
                "SELECT id FROM recipes WHERE LOWER(name) = LOWER(?1) ORDER BY id LIMIT 1",
                params![name.trim()],
                |row| row.get(0),
            )
            .context(format!("Recipe '{name}' not found"))?;
        self.get_recipe(id)
    }

    pub fn get_recipe_ingredients(&self, recipe_id: RecipeId) -> Result<Vec<RecipeIngredient>> {
        let mut stmt = self.conn.prepare(
            "SELECT ri.item_id, i.name, ri.amount
             FROM recipe_ingredients ri
             JOIN items i ON ri.item_id = i.id
             WHERE ri.recipe_id = ?1
             ORDER BY ri.id",
        )?;
        let ingredients = stmt
            .query_map(params![recipe_id], |row| {
                Ok(RecipeIngredient {
                    item: row.get(0)?,
                    item_name: row.get(1)?,
                    amount: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ingredients)
    }

    pub fn add_recipe_ingredient(
        &self,
        recipe_id: RecipeId,
        item: ItemId,
        amount: Option<&str>,
    ) -> Result<RecipeIngredient> {
        let found = self.get_item(item)?;
        self.get_recipe(recipe_id)?;
        let now = Local::now().to_rfc3339();
        let amount = normalize_amount(amount);
        self.conn.execute(
            "INSERT INTO recipe_ingredients (recipe_id, item_id, amount) VALUES (?1, ?2, ?3)",
            params![recipe_id, item, amount],
        )?;
        self.conn.execute(
            "UPDATE recipes SET updated_at = ?1 WHERE id = ?2",
            params![now, recipe_id],
        )?;
        Ok(RecipeIngredient {
            item,
            item_name: found.name,
            amount,
        })
    }

    pub fn remove_recipe_ingredient(&self, recipe_id: RecipeId, item: ItemId) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1 AND item_id = ?2",
            params![recipe_id, item],
        )?;
        Ok(rows > 0)
    }

    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare("SELECT id FROM recipes ORDER BY name, id")?;
        let ids: Vec<RecipeId> = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        ids.into_iter().map(|id| self.get_recipe(id)).collect()
    }

    pub fn recipes_by_id(&self) -> Result<HashMap<RecipeId, Recipe>> {
        Ok(self
            .list_recipes()?
            .into_iter()
            .map(|r| (r.id, r))
            .collect())
    }

    /// Deletes the recipe and its ingredients. Meals that attached it keep
    /// their (now dangling) reference.
    pub fn delete_recipe(&self, recipe_id: RecipeId) -> Result<bool> {
        self.conn.execute(
            "DELETE FROM recipe_ingredients WHERE recipe_id = ?1",
            params![recipe_id],
        )?;
        let rows = self
            .conn
            .execute("DELETE FROM recipes WHERE id = ?1", params![recipe_id])?;
        Ok(rows > 0)
    }

    // --- Sessions ---

    pub fn create_session(&self, name: &str, starts_on: Option<NaiveDate>) -> Result<Session> {
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO sessions (uuid, name, starts_on, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![
                uuid,
                name,
                starts_on.map(|d| d.format(DATE_FORMAT).to_string()),
                now
            ],
        )?;
        self.get_session(SessionId(self.conn.last_insert_rowid()))
    }

    pub fn get_session(&self, id: SessionId) -> Result<Session> {
        self.conn
            .query_row(
                "SELECT id, uuid, name, starts_on, created_at FROM sessions WHERE id = ?1",
                params![id],
                Self::session_from_row,
            )
            .context(format!("Session {id} not found"))
    }

    pub fn list_sessions(&self) -> Result<Vec<Session>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, uuid, name, starts_on, created_at FROM sessions ORDER BY id DESC",
        )?;
        let sessions = stmt
            .query_map([], Self::session_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(sessions)
    }

    // --- Meals ---

    pub fn create_meal(
        &self,
        session: SessionId,
        date: Option<NaiveDate>,
        name: Option<&str>,
    ) -> Result<Meal> {
        self.get_session(session)?;
        let now = Local::now().to_rfc3339();
        let uuid = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO meals (uuid, session_id, date, name, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                uuid,
                session,
                date.map(|d| d.format(DATE_FORMAT).to_string()),
                normalize_amount(name),
                now
            ],
        )?;
        self.get_meal(MealId(self.conn.last_insert_rowid()))
    }

    pub fn get_meal(&self, id: MealId) -> Result<Meal> {
        let (session, date, name): (SessionId, Option<NaiveDate>, Option<String>) = self
            .conn
            .query_row(
                "SELECT session_id, date, name FROM meals WHERE id = ?1",
                params![id],
                |row| Ok((row.get(0)?, date_column(row, 1)?, row.get(2)?)),
            )
            .context(format!("Meal {id} not found"))?;
        self.assemble_meal(id, session, date, name)
    }

    fn assemble_meal(
        &self,
        id: MealId,
        session: SessionId,
        date: Option<NaiveDate>,
        name: Option<String>,
    ) -> Result<Meal> {
        let mut stmt = self
            .conn
            .prepare("SELECT recipe_id FROM meal_recipes WHERE meal_id = ?1 ORDER BY id")?;
        let recipes = stmt
            .query_map(params![id], |row| row.get(0))?
            .collect::<Result<Vec<RecipeId>, _>>()?;

        let mut stmt = self
            .conn
            .prepare("SELECT item_id, amount FROM meal_items WHERE meal_id = ?1 ORDER BY id")?;
        let items = stmt
            .query_map(params![id], |row| {
                Ok(MealItem {
                    item: row.get(0)?,
                    amount: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Meal {
            id,
            session,
            date,
            name,
            recipes,
            items,
        })
    }

    /// Meals for a session, dated meals first in date order, unscheduled last.
    pub fn list_meals(&self, session: SessionId) -> Result<Vec<Meal>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, date, name FROM meals
             WHERE session_id = ?1
             ORDER BY date IS NULL, date, id",
        )?;
        let rows = stmt
            .query_map(params![session], |row| {
                Ok((row.get(0)?, date_column(row, 1)?, row.get(2)?))
            })?
            .collect::<Result<Vec<(MealId, Option<NaiveDate>, Option<String>)>, _>>()?;
        rows.into_iter()
            .map(|(id, date, name)| self.assemble_meal(id, session, date, name))
            .collect()
    }

    pub fn attach_recipe(&self, meal: MealId, recipe: RecipeId) -> Result<Meal> {
        self.get_recipe(recipe)?;
        self.get_meal(meal)?;
        self.conn.execute(
            "INSERT INTO meal_recipes (meal_id, recipe_id) VALUES (?1, ?2)",
            params![meal, recipe],
        )?;
        self.get_meal(meal)
    }

    pub fn detach_recipe(&self, meal: MealId, recipe: RecipeId) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM meal_recipes WHERE meal_id = ?1 AND recipe_id = ?2",
            params![meal, recipe],
        )?;
        Ok(rows > 0)
    }

    pub fn add_meal_item(&self, meal: MealId, item: ItemId, amount: Option<&str>) -> Result<Meal> {
        self.get_item(item)?;
        self.get_meal(meal)?;
        self.conn.execute(
            "INSERT INTO meal_items (meal_id, item_id, amount) VALUES (?1, ?2, ?3)",
            params![meal, item, normalize_amount(amount)],
        )?;
        self.get_meal(meal)
    }

    pub fn delete_meal(&self, meal: MealId) -> Result<bool> {
        self.conn
            .execute("DELETE FROM meal_recipes WHERE meal_id = ?1", params![meal])?;
        self.conn
            .execute("DELETE FROM meal_items WHERE meal_id = ?1", params![meal])?;
        let rows = self
            .conn
            .execute("DELETE FROM meals WHERE id = ?1", params![meal])?;
        Ok(rows > 0)
    }

    // --- Staple selections ---

    pub fn set_staple_status(
        &self,
        session: SessionId,
        item: ItemId,
        status: StapleStatus,
    ) -> Result<()> {
        self.get_item(item)?;
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO staple_selections (session_id, item_id, status, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id, item_id) DO UPDATE SET
                status = excluded.status,
                updated_at = excluded.updated_at",
            params![session, item, status.as_str(), now],
        )?;
        Ok(())
    }

    /// One row per staple item; items with no stored choice are `Pending`.
    pub fn list_staple_selections(&self, session: SessionId) -> Result<Vec<StapleSelection>> {
        let mut stmt = self.conn.prepare(
            "SELECT i.id, i.name, i.staple_amount, s.status
             FROM items i
             LEFT JOIN staple_selections s ON s.item_id = i.id AND s.session_id = ?1
             WHERE i.is_staple = 1
             ORDER BY i.name",
        )?;
        let selections = stmt
            .query_map(params![session], |row| {
                let status: Option<String> = row.get(3)?;
                let status = match status {
                    Some(s) => s.parse::<StapleStatus>().map_err(|e| {
                        rusqlite::Error::FromSqlConversionFailure(3, Type::Text, e.into())
                    })?,
                    None => StapleStatus::Pending,
                };
                Ok(StapleSelection {
                    session,
                    item: row.get(0)?,
                    item_name: row.get(1)?,
                    staple_amount: row.get(2)?,
                    status,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(selections)
    }

    // --- Ad-hoc items ---

    pub fn upsert_adhoc_item(
        &self,
        session: SessionId,
        item: ItemId,
        amount: Option<&str>,
    ) -> Result<AdhocItem> {
        let now = Local::now().to_rfc3339();
        let amount = normalize_amount(amount);
        self.conn.execute(
            "INSERT INTO adhoc_items (session_id, item_id, amount, created_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(session_id, item_id) DO UPDATE SET amount = excluded.amount",
            params![session, item, amount, now],
        )?;
        Ok(AdhocItem {
            session,
            item,
            amount,
        })
    }

    pub fn remove_adhoc_item(&self, session: SessionId, item: ItemId) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM adhoc_items WHERE session_id = ?1 AND item_id = ?2",
            params![session, item],
        )?;
        Ok(rows > 0)
    }

    pub fn list_adhoc_items(&self, session: SessionId) -> Result<Vec<AdhocItem>> {
        let mut stmt = self.conn.prepare(
            "SELECT item_id, amount FROM adhoc_items WHERE session_id = ?1 ORDER BY created_at, item_id",
        )?;
        let items = stmt
            .query_map(params![session], |row| {
                Ok(AdhocItem {
                    session,
                    item: row.get(0)?,
                    amount: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(items)
    }

    // --- Exclusions ---

    pub fn add_exclusion(&self, session: SessionId, item: ItemId) -> Result<ItemExclusion> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO item_exclusions (session_id, item_id, created_at) VALUES (?1, ?2, ?3)
             ON CONFLICT(session_id, item_id) DO NOTHING",
            params![session, item, now],
        )?;
        Ok(ItemExclusion { session, item })
    }

    pub fn remove_exclusion(&self, session: SessionId, item: ItemId) -> Result<bool> {
        let rows = self.conn.execute(
            "DELETE FROM item_exclusions WHERE session_id = ?1 AND item_id = ?2",
            params![session, item],
        )?;
        Ok(rows > 0)
    }

    pub fn list_exclusions(&self, session: SessionId) -> Result<Vec<ItemExclusion>> {
        let mut stmt = self
            .conn
            .prepare("SELECT item_id FROM item_exclusions WHERE session_id = ?1 ORDER BY item_id")?;
        let exclusions = stmt
            .query_map(params![session], |row| {
                Ok(ItemExclusion {
                    session,
                    item: row.get(0)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exclusions)
    }

    // --- Checklist ---

    pub fn get_checklist_entry(
        &self,
        session: SessionId,
        item: ItemId,
    ) -> Result<Option<ChecklistEntry>> {
        let entry = self
            .conn
            .query_row(
                "SELECT id, session_id, item_id, checked, created_at, updated_at
                 FROM checklist_entries WHERE session_id = ?1 AND item_id = ?2",
                params![session, item],
                Self::checklist_entry_from_row,
            )
            .optional()?;
        Ok(entry)
    }

    pub fn list_checklist_entries(&self, session: SessionId) -> Result<Vec<ChecklistEntry>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, session_id, item_id, checked, created_at, updated_at
             FROM checklist_entries WHERE session_id = ?1 ORDER BY id",
        )?;
        let entries = stmt
            .query_map(params![session], Self::checklist_entry_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(entries)
    }

    /// Adds an unchecked row unless one already exists, and returns whatever
    /// row the key holds afterwards.
    pub fn insert_checklist_entry_if_absent(
        &self,
        session: SessionId,
        item: ItemId,
    ) -> Result<ChecklistEntry> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO checklist_entries (session_id, item_id, checked, created_at, updated_at)
             VALUES (?1, ?2, 0, ?3, ?4)
             ON CONFLICT(session_id, item_id) DO NOTHING",
            params![session, item, now, now],
        )?;
        self.get_checklist_entry(session, item)?
            .context("Checklist entry not found after insert")
    }

    /// Deletes checked rows, returning how many were removed.
    pub fn clear_checked(&self, session: SessionId) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM checklist_entries WHERE session_id = ?1 AND checked = 1",
            params![session],
        )?;
        Ok(rows)
    }

    pub fn reset_checklist(&self, session: SessionId) -> Result<usize> {
        let rows = self.conn.execute(
            "DELETE FROM checklist_entries WHERE session_id = ?1",
            params![session],
        )?;
        Ok(rows)
    }
}

impl ChecklistStore for Database {
    fn upsert_checklist_entry(
        &self,
        session: SessionId,
        item: ItemId,
        checked: bool,
    ) -> Result<ChecklistEntry> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO checklist_entries (session_id, item_id, checked, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(session_id, item_id) DO UPDATE SET
                checked = excluded.checked,
                updated_at = excluded.updated_at",
            params![session, item, checked, now, now],
        )?;
        self.get_checklist_entry(session, item)?
            .context("Checklist entry not found after upsert")
    }
}

impl OrderStore for Database {
    fn commit_store_order(&self, batch: &[OrderAssignment]) -> Result<()> {
        let now = Local::now().to_rfc3339();
        let tx = self.conn.unchecked_transaction()?;
        for assignment in batch {
            let rows = tx.execute(
                "UPDATE items SET store_order_index = ?1, updated_at = ?2 WHERE id = ?3",
                params![assignment.order_index, now, assignment.item],
            )?;
            if rows == 0 {
                // Dropping `tx` rolls the whole batch back.
                bail!("Item {} not found", assignment.item);
            }
        }
        tx.commit()?;
        Ok(())
    }
}

fn date_column(row: &rusqlite::Row, idx: usize) -> rusqlite::Result<Option<NaiveDate>> {
    let value: Option<String> = row.get(idx)?;
    value
        .map(|s| {
            NaiveDate::parse_from_str(&s, DATE_FORMAT)
                .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.into()))
        })
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(db: &Database, name: &str) -> Item {
        db.get_or_create_item(name).unwrap()
    }

    #[test]
    fn test_get_or_create_item_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        let first = db.get_or_create_item("  Flour").unwrap();
        let second = db.get_or_create_item("FLOUR ").unwrap();
        assert_eq!(first.id, second.id);
        assert_eq!(first.name, "flour");
        assert_eq!(db.list_items().unwrap().len(), 1);
    }

    #[test]
    fn test_get_or_create_item_rejects_blank() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.get_or_create_item("   ").is_err());
        assert!(db.list_items().unwrap().is_empty());
    }

    #[test]
    fn test_find_item_by_name() {
        let db = Database::open_in_memory().unwrap();
        let eggs = item(&db, "eggs");
        assert_eq!(db.find_item_by_name("Eggs").unwrap().unwrap().id, eggs.id);
        assert!(db.find_item_by_name("ham").unwrap().is_none());
        assert!(db.find_item_by_name("").unwrap().is_none());
    }

    #[test]
    fn test_set_item_staple() {
        let db = Database::open_in_memory().unwrap();
        let milk = item(&db, "milk");
        let updated = db.set_item_staple(milk.id, true, Some(" 1 gal ")).unwrap();
        assert!(updated.is_staple);
        assert_eq!(updated.staple_amount.as_deref(), Some("1 gal"));
        assert!(db.set_item_staple(ItemId(999), true, None).is_err());
    }

    #[test]
    fn test_recipe_ingredients_keep_order() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe("Pancakes").unwrap();
        let flour = item(&db, "flour");
        let eggs = item(&db, "eggs");
        db.add_recipe_ingredient(recipe.id, flour.id, Some("2 cups"))
            .unwrap();
        db.add_recipe_ingredient(recipe.id, eggs.id, None).unwrap();

        let loaded = db.get_recipe_by_name("pancakes").unwrap();
        assert_eq!(loaded.ingredients.len(), 2);
        assert_eq!(loaded.ingredients[0].item_name, "flour");
        assert_eq!(loaded.ingredients[0].amount.as_deref(), Some("2 cups"));
        assert!(loaded.ingredients[1].amount.is_none());
    }

    #[test]
    fn test_remove_recipe_ingredient() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.create_recipe("Toast").unwrap();
        let bread = item(&db, "bread");
        db.add_recipe_ingredient(recipe.id, bread.id, None).unwrap();
        assert!(db.remove_recipe_ingredient(recipe.id, bread.id).unwrap());
        assert!(!db.remove_recipe_ingredient(recipe.id, bread.id).unwrap());
        assert!(db.get_recipe(recipe.id).unwrap().ingredients.is_empty());
    }

    #[test]
    fn test_delete_recipe_leaves_meal_reference() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let recipe = db.create_recipe("Soup").unwrap();
        let meal = db.create_meal(session.id, None, Some("Dinner")).unwrap();
        db.attach_recipe(meal.id, recipe.id).unwrap();

        assert!(db.delete_recipe(recipe.id).unwrap());
        assert!(db.get_recipe(recipe.id).is_err());
        let meal = db.get_meal(meal.id).unwrap();
        assert_eq!(meal.recipes, vec![recipe.id]);
    }

    #[test]
    fn test_detach_recipe() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let soup = db.create_recipe("Soup").unwrap();
        let salad = db.create_recipe("Salad").unwrap();
        let meal = db.create_meal(session.id, None, Some("Dinner")).unwrap();
        db.attach_recipe(meal.id, soup.id).unwrap();
        db.attach_recipe(meal.id, salad.id).unwrap();

        assert!(db.detach_recipe(meal.id, soup.id).unwrap());
        assert!(!db.detach_recipe(meal.id, soup.id).unwrap());
        assert_eq!(db.get_meal(meal.id).unwrap().recipes, vec![salad.id]);
    }

    #[test]
    fn test_list_meals_orders_unscheduled_last() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2025, 3, 4).unwrap();
        let d1 = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        db.create_meal(session.id, None, Some("Leftovers")).unwrap();
        db.create_meal(session.id, Some(d2), Some("Tacos")).unwrap();
        db.create_meal(session.id, Some(d1), Some("Pasta")).unwrap();

        let meals = db.list_meals(session.id).unwrap();
        let dates: Vec<Option<NaiveDate>> = meals.iter().map(|m| m.date).collect();
        assert_eq!(dates, vec![Some(d1), Some(d2), None]);
    }

    #[test]
    fn test_create_meal_requires_session() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.create_meal(SessionId(42), None, None).is_err());
    }

    #[test]
    fn test_meal_items_and_delete() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let meal = db.create_meal(session.id, None, None).unwrap();
        let lettuce = item(&db, "lettuce");
        let meal = db.add_meal_item(meal.id, lettuce.id, Some("1 head")).unwrap();
        assert_eq!(meal.items.len(), 1);
        assert_eq!(meal.items[0].amount.as_deref(), Some("1 head"));

        assert!(db.delete_meal(meal.id).unwrap());
        assert!(db.list_meals(session.id).unwrap().is_empty());
    }

    #[test]
    fn test_staple_selections_default_to_pending() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let milk = item(&db, "milk");
        let eggs = item(&db, "eggs");
        item(&db, "saffron");
        db.set_item_staple(milk.id, true, Some("1 gal")).unwrap();
        db.set_item_staple(eggs.id, true, None).unwrap();
        db.set_staple_status(session.id, milk.id, StapleStatus::Included)
            .unwrap();

        let selections = db.list_staple_selections(session.id).unwrap();
        assert_eq!(selections.len(), 2);
        assert_eq!(selections[0].item_name, "eggs");
        assert_eq!(selections[0].status, StapleStatus::Pending);
        assert_eq!(selections[1].status, StapleStatus::Included);
        assert_eq!(selections[1].staple_amount.as_deref(), Some("1 gal"));

        db.set_staple_status(session.id, milk.id, StapleStatus::Excluded)
            .unwrap();
        let selections = db.list_staple_selections(session.id).unwrap();
        assert_eq!(selections[1].status, StapleStatus::Excluded);
    }

    #[test]
    fn test_adhoc_upsert_and_remove() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let foil = item(&db, "foil");
        db.upsert_adhoc_item(session.id, foil.id, Some("1 roll"))
            .unwrap();
        db.upsert_adhoc_item(session.id, foil.id, Some("2 rolls"))
            .unwrap();
        let items = db.list_adhoc_items(session.id).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].amount.as_deref(), Some("2 rolls"));

        assert!(db.remove_adhoc_item(session.id, foil.id).unwrap());
        assert!(db.list_adhoc_items(session.id).unwrap().is_empty());
    }

    #[test]
    fn test_exclusions() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let cilantro = item(&db, "cilantro");
        db.add_exclusion(session.id, cilantro.id).unwrap();
        db.add_exclusion(session.id, cilantro.id).unwrap();
        assert_eq!(db.list_exclusions(session.id).unwrap().len(), 1);
        assert!(db.remove_exclusion(session.id, cilantro.id).unwrap());
        assert!(!db.remove_exclusion(session.id, cilantro.id).unwrap());
    }

    #[test]
    fn test_checklist_upsert_is_unique_per_session_item() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let eggs = item(&db, "eggs");

        let first = db.upsert_checklist_entry(session.id, eggs.id, true).unwrap();
        let second = db.upsert_checklist_entry(session.id, eggs.id, true).unwrap();
        assert_eq!(first.id, second.id);
        assert!(second.checked);

        let third = db.upsert_checklist_entry(session.id, eggs.id, false).unwrap();
        assert_eq!(third.id, first.id);
        assert!(!third.checked);
        assert_eq!(db.list_checklist_entries(session.id).unwrap().len(), 1);
    }

    #[test]
    fn test_clear_checked_and_reset() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let eggs = item(&db, "eggs");
        let milk = item(&db, "milk");
        db.upsert_checklist_entry(session.id, eggs.id, true).unwrap();
        db.upsert_checklist_entry(session.id, milk.id, false).unwrap();

        assert_eq!(db.clear_checked(session.id).unwrap(), 1);
        let remaining = db.list_checklist_entries(session.id).unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].item, milk.id);

        assert_eq!(db.reset_checklist(session.id).unwrap(), 1);
        assert!(db.list_checklist_entries(session.id).unwrap().is_empty());
    }

    #[test]
    fn test_commit_store_order_batch() {
        let db = Database::open_in_memory().unwrap();
        let a = item(&db, "apples");
        let b = item(&db, "bread");
        db.commit_store_order(&[
            OrderAssignment {
                item: b.id,
                order_index: Some(1),
            },
            OrderAssignment {
                item: a.id,
                order_index: None,
            },
        ])
        .unwrap();
        assert_eq!(db.get_item(b.id).unwrap().store_order_index, Some(1));
        assert_eq!(db.get_item(a.id).unwrap().store_order_index, None);
    }

    #[test]
    fn test_commit_store_order_rolls_back_on_failure() {
        let db = Database::open_in_memory().unwrap();
        let a = item(&db, "apples");
        let result = db.commit_store_order(&[
            OrderAssignment {
                item: a.id,
                order_index: Some(1),
            },
            OrderAssignment {
                item: ItemId(999),
                order_index: Some(2),
            },
        ]);
        assert!(result.is_err());
        assert_eq!(db.get_item(a.id).unwrap().store_order_index, None);
    }

    #[test]
    fn test_sessions() {
        let db = Database::open_in_memory().unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 3, 3).unwrap();
        let s1 = db.create_session("Week 10", Some(start)).unwrap();
        let s2 = db.create_session("Week 11", None).unwrap();
        assert_eq!(s1.starts_on, Some(start));
        let sessions = db.list_sessions().unwrap();
        assert_eq!(sessions[0].id, s2.id);
        assert!(db.get_session(SessionId(77)).is_err());
    }

    #[test]
    fn test_open_file_database_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        {
            let db = Database::open(&path).unwrap();
            item(&db, "rice");
        }
        let db = Database::open(&path).unwrap();
        assert!(db.find_item_by_name("rice").unwrap().is_some());
    }

    #[test]
    fn test_insert_checklist_entry_if_absent_keeps_existing_row() {
        let db = Database::open_in_memory().unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let eggs = item(&db, "eggs");

        let added = db.insert_checklist_entry_if_absent(session.id, eggs.id).unwrap();
        assert!(!added.checked);

        db.upsert_checklist_entry(session.id, eggs.id, true).unwrap();
        let again = db.insert_checklist_entry_if_absent(session.id, eggs.id).unwrap();
        assert_eq!(again.id, added.id);
        assert!(again.checked);
    }

    #[test]
    fn test_insert_if_absent_does_not_undo_check_from_other_connection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        let adder = Database::open(&path).unwrap();
        let checker = Database::open(&path).unwrap();
        let session = adder.create_session("Week 1", None).unwrap();
        let eggs = item(&adder, "eggs");

        assert!(adder.get_checklist_entry(session.id, eggs.id).unwrap().is_none());
        checker.upsert_checklist_entry(session.id, eggs.id, true).unwrap();
        let entry = adder
            .insert_checklist_entry_if_absent(session.id, eggs.id)
            .unwrap();

        assert!(entry.checked);
        assert_eq!(adder.list_checklist_entries(session.id).unwrap().len(), 1);
    }

    #[test]
    fn test_concurrent_upserts_on_one_file_keep_a_single_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("larder.db");
        let db = Database::open(&path).unwrap();
        let session = db.create_session("Week 1", None).unwrap();
        let eggs = item(&db, "eggs");

        let barrier = std::sync::Arc::new(std::sync::Barrier::new(2));
        let handles: Vec<_> = [true, false]
            .into_iter()
            .map(|checked| {
                let conn = Database::open(&path).unwrap();
                let barrier = std::sync::Arc::clone(&barrier);
                std::thread::spawn(move || {
                    barrier.wait();
                    conn.upsert_checklist_entry(session.id, eggs.id, checked)
                        .unwrap()
                })
            })
            .collect();
        let entries: Vec<ChecklistEntry> =
            handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(entries[0].id, entries[1].id);
        assert_eq!(db.list_checklist_entries(session.id).unwrap().len(), 1);
    }
}
