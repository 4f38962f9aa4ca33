use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::models::Item;
use larder_core::service::ShoppingService;

use super::helpers::{exit_empty, lookup_item, truncate};

pub(crate) fn cmd_item_add(
    svc: &ShoppingService,
    name: &str,
    staple: bool,
    staple_amount: Option<&str>,
    json: bool,
) -> Result<()> {
    let mut item = svc.resolve_item(name)?;
    if staple || staple_amount.is_some() {
        item = svc.db().set_item_staple(item.id, true, staple_amount)?;
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&item)?);
    } else {
        println!("Item {} ({})", item.name, item.id);
    }
    Ok(())
}

pub(crate) fn cmd_item_list(svc: &ShoppingService, staples_only: bool, json: bool) -> Result<()> {
    let items: Vec<Item> = svc
        .db()
        .list_items()?
        .into_iter()
        .filter(|i| !staples_only || i.is_staple)
        .collect();

    if items.is_empty() {
        exit_empty("No items found", json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else {
        print_item_table(&items);
    }
    Ok(())
}

pub(crate) fn cmd_item_staple(
    svc: &ShoppingService,
    reference: &str,
    off: bool,
    amount: Option<&str>,
    json: bool,
) -> Result<()> {
    let item = lookup_item(svc.db(), reference)?;
    let updated = svc.db().set_item_staple(item.id, !off, amount)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&updated)?);
    } else if updated.is_staple {
        match &updated.staple_amount {
            Some(a) => println!("{} is a staple (default: {a})", updated.name),
            None => println!("{} is a staple", updated.name),
        }
    } else {
        println!("{} is no longer a staple", updated.name);
    }
    Ok(())
}

fn print_item_table(items: &[Item]) {
    #[derive(Tabled)]
    struct ItemRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Staple")]
        staple: String,
        #[tabled(rename = "Position")]
        position: String,
    }

    let rows: Vec<ItemRow> = items
        .iter()
        .map(|i| ItemRow {
            id: i.id.0,
            name: truncate(&i.name, 35),
            staple: if i.is_staple {
                i.staple_amount.clone().unwrap_or_else(|| "yes".into())
            } else {
                String::new()
            },
            position: i
                .store_order_index
                .map_or("-".into(), |p| p.to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(3..4)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}
