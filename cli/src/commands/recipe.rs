use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::service::ShoppingService;

use super::helpers::{exit_empty, exit_not_found, lookup_recipe, truncate};

pub(crate) fn cmd_recipe_create(svc: &ShoppingService, name: &str, json: bool) -> Result<()> {
    let recipe = svc.db().create_recipe(name)?;
    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        let id = recipe.id;
        println!("Created recipe: {} (id: {id})", recipe.name);
        println!(
            "Add ingredients with: larder recipe add-ingredient \"{}\" <item> [amount]",
            recipe.name
        );
    }
    Ok(())
}

pub(crate) fn cmd_recipe_add_ingredient(
    svc: &ShoppingService,
    recipe_ref: &str,
    item_name: &str,
    amount: Option<&str>,
    json: bool,
) -> Result<()> {
    let recipe = lookup_recipe(svc.db(), recipe_ref)?;
    let item = svc.resolve_item(item_name)?;
    let ingredient = svc.db().add_recipe_ingredient(recipe.id, item.id, amount)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&ingredient)?);
    } else {
        match &ingredient.amount {
            Some(a) => println!("Added {a} {} to {}", ingredient.item_name, recipe.name),
            None => println!("Added {} to {}", ingredient.item_name, recipe.name),
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_remove_ingredient(
    svc: &ShoppingService,
    recipe_ref: &str,
    item_name: &str,
    json: bool,
) -> Result<()> {
    let recipe = lookup_recipe(svc.db(), recipe_ref)?;
    let removed = match svc.db().find_item_by_name(item_name)? {
        Some(item) => svc.db().remove_recipe_ingredient(recipe.id, item.id)?,
        None => false,
    };
    if !removed {
        exit_not_found(
            &format!("Ingredient '{item_name}' not found in recipe"),
            json,
        );
    }

    if json {
        println!("{}", serde_json::json!({ "removed": item_name }));
    } else {
        println!("Removed {item_name} from {}", recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_recipe_show(svc: &ShoppingService, recipe_ref: &str, json: bool) -> Result<()> {
    let recipe = lookup_recipe(svc.db(), recipe_ref)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
        return Ok(());
    }

    println!("=== {} ===", recipe.name);
    if recipe.ingredients.is_empty() {
        println!("  (no ingredients)");
    }
    for ing in &recipe.ingredients {
        match &ing.amount {
            Some(a) => println!("  {}: {a}", ing.item_name),
            None => println!("  {}", ing.item_name),
        }
    }
    Ok(())
}

pub(crate) fn cmd_recipe_list(svc: &ShoppingService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Ingredients")]
        ingredients: usize,
    }

    let recipes = svc.db().list_recipes()?;
    if recipes.is_empty() {
        exit_empty("No recipes found", json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: r.id.0,
            name: truncate(&r.name, 30),
            ingredients: r.ingredients.len(),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    Ok(())
}

pub(crate) fn cmd_recipe_delete(svc: &ShoppingService, recipe_ref: &str, json: bool) -> Result<()> {
    let recipe = lookup_recipe(svc.db(), recipe_ref)?;
    svc.db().delete_recipe(recipe.id)?;

    if json {
        println!("{}", serde_json::json!({ "deleted": recipe.id }));
    } else {
        println!("Deleted recipe {}", recipe.name);
    }
    Ok(())
}
