use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use larder_core::list::ShoppingList;
use larder_core::models::SessionId;
use larder_core::resolve::SortMode;
use larder_core::service::ShoppingService;

use super::helpers::{check_mark, lookup_item};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ListFormat {
    Table,
    Json,
    Csv,
}

pub(crate) fn cmd_list(
    svc: &ShoppingService,
    session: SessionId,
    mode: SortMode,
    format: ListFormat,
    hide_checked: bool,
) -> Result<()> {
    let mut list = svc.build_shopping_list(session, mode)?;
    if hide_checked {
        list.lines.retain(|l| !l.checked);
    }

    match format {
        ListFormat::Json => println!("{}", serde_json::to_string_pretty(&list)?),
        ListFormat::Csv => list.write_csv(std::io::stdout().lock())?,
        ListFormat::Table => print_list_table(&list),
    }
    Ok(())
}

fn print_list_table(list: &ShoppingList) {
    #[derive(Tabled)]
    struct LineRow {
        #[tabled(rename = "")]
        mark: &'static str,
        #[tabled(rename = "Item")]
        text: String,
        #[tabled(rename = "Aisle")]
        position: String,
    }

    if list.lines.is_empty() {
        eprintln!("Shopping list is empty");
        return;
    }

    let rows: Vec<LineRow> = list
        .lines
        .iter()
        .map(|l| LineRow {
            mark: check_mark(l.checked),
            text: if l.is_ad_hoc {
                format!("{} *", l.display_text)
            } else {
                l.display_text.clone()
            },
            position: l.order_index.map_or("-".into(), |p| p.to_string()),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(2..)).with(Alignment::right()))
        .to_string();
    println!("{table}");
    println!("{} of {} remaining", list.remaining(), list.lines.len());

    if list.unpositioned_count > 0 && list.mode == SortMode::StoreOrder {
        eprintln!(
            "{} item(s) have no store position. Place them with `larder order promote <item>`",
            list.unpositioned_count
        );
    }
}

pub(crate) fn cmd_check(
    svc: &ShoppingService,
    session: SessionId,
    reference: &str,
    checked: bool,
    json: bool,
) -> Result<()> {
    let item = lookup_item(svc.db(), reference)?;
    let entry = svc.toggle_item(session, item.id, checked)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        println!("{} {}", check_mark(entry.checked), item.name);
    }
    Ok(())
}

pub(crate) fn cmd_checklist_add(
    svc: &ShoppingService,
    session: SessionId,
    name: &str,
    json: bool,
) -> Result<()> {
    let entry = svc.add_checklist_item(session, name)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entry)?);
    } else {
        let item = svc.db().get_item(entry.item)?;
        println!("{} {}", check_mark(entry.checked), item.name);
    }
    Ok(())
}

pub(crate) fn cmd_checklist_clear(svc: &ShoppingService, session: SessionId, json: bool) -> Result<()> {
    let removed = svc.clear_checked(session)?;
    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!("Cleared {removed} checked item(s)");
    }
    Ok(())
}

pub(crate) fn cmd_checklist_reset(svc: &ShoppingService, session: SessionId, json: bool) -> Result<()> {
    let removed = svc.reset_checklist(session)?;
    if json {
        println!("{}", serde_json::json!({ "removed": removed }));
    } else {
        println!("Reset checklist ({removed} entries removed)");
    }
    Ok(())
}
