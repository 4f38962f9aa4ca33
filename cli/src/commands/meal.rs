use anyhow::Result;

use larder_core::models::{Meal, MealId, SessionId};
use larder_core::service::ShoppingService;

use super::helpers::{exit_empty, exit_not_found, lookup_recipe, parse_optional_date};

pub(crate) fn cmd_meal_add(
    svc: &ShoppingService,
    session: SessionId,
    date: Option<&str>,
    name: Option<&str>,
    json: bool,
) -> Result<()> {
    let date = parse_optional_date(date)?;
    let meal = svc.db().create_meal(session, date, name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
    } else {
        let when = meal
            .date
            .map_or_else(|| "unscheduled".to_string(), |d| d.format("%Y-%m-%d").to_string());
        println!("Added meal {} ({when})", meal.id);
    }
    Ok(())
}

pub(crate) fn cmd_meal_attach_recipe(
    svc: &ShoppingService,
    meal: i64,
    recipe_ref: &str,
    json: bool,
) -> Result<()> {
    let recipe = lookup_recipe(svc.db(), recipe_ref)?;
    let meal = svc.db().attach_recipe(MealId(meal), recipe.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
    } else {
        println!("Attached {} to meal {}", recipe.name, meal.id);
    }
    Ok(())
}

pub(crate) fn cmd_meal_detach_recipe(
    svc: &ShoppingService,
    meal: i64,
    recipe_ref: &str,
    json: bool,
) -> Result<()> {
    let recipe = lookup_recipe(svc.db(), recipe_ref)?;
    if !svc.db().detach_recipe(MealId(meal), recipe.id)? {
        exit_not_found(
            &format!("Recipe {} is not attached to meal {meal}", recipe.name),
            json,
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&svc.db().get_meal(MealId(meal))?)?);
    } else {
        println!("Detached {} from meal {meal}", recipe.name);
    }
    Ok(())
}

pub(crate) fn cmd_meal_add_item(
    svc: &ShoppingService,
    meal: i64,
    item_name: &str,
    amount: Option<&str>,
    json: bool,
) -> Result<()> {
    let item = svc.resolve_item(item_name)?;
    let meal = svc.db().add_meal_item(MealId(meal), item.id, amount)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&meal)?);
    } else {
        println!("Added {} to meal {}", item.name, meal.id);
    }
    Ok(())
}

pub(crate) fn cmd_meal_plan(svc: &ShoppingService, session: SessionId, json: bool) -> Result<()> {
    let plan = svc.meal_plan(session)?;
    if plan.is_empty() {
        exit_empty("No meals planned", json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let catalog = svc.catalog()?;
    let recipes = svc.db().recipes_by_id()?;
    for day in &plan {
        match day.date {
            Some(d) => println!("{}", d.format("%A %Y-%m-%d")),
            None => println!("Unscheduled"),
        }
        for meal in &day.meals {
            println!("  {}", meal_heading(meal));
            for recipe_id in &meal.recipes {
                match recipes.get(recipe_id) {
                    Some(r) => println!("    - {}", r.name),
                    None => println!("    - (deleted recipe {recipe_id})"),
                }
            }
            for item in &meal.items {
                let name = catalog.name(item.item).unwrap_or("?");
                match &item.amount {
                    Some(a) => println!("    + {name}: {a}"),
                    None => println!("    + {name}"),
                }
            }
        }
    }
    Ok(())
}

fn meal_heading(meal: &Meal) -> String {
    match &meal.name {
        Some(name) => format!("[{}] {name}", meal.id),
        None => format!("[{}]", meal.id),
    }
}

pub(crate) fn cmd_meal_delete(svc: &ShoppingService, meal: i64, json: bool) -> Result<()> {
    if !svc.db().delete_meal(MealId(meal))? {
        exit_not_found(&format!("Meal {meal} not found"), json);
    }
    if json {
        println!("{}", serde_json::json!({ "deleted": meal }));
    } else {
        println!("Deleted meal {meal}");
    }
    Ok(())
}
