use anyhow::{Result, bail};
use serde::Serialize;
use tabled::{Table, Tabled, settings::Style};

use larder_core::service::ShoppingService;
use larder_core::store_order::{OrderSlot, StoreOrderManager};

use super::helpers::lookup_item;

#[derive(Serialize)]
struct OrderView<'a> {
    ordered: &'a [OrderSlot],
    unordered: &'a [OrderSlot],
}

pub(crate) fn cmd_order_show(svc: &ShoppingService, json: bool) -> Result<()> {
    let manager = svc.store_order()?;
    print_order(&manager, json)
}

/// Positions are 1-based on the command line.
pub(crate) fn cmd_order_move(svc: &ShoppingService, from: usize, to: usize, json: bool) -> Result<()> {
    if from == 0 || to == 0 {
        bail!("Positions start at 1");
    }
    let mut manager = svc.store_order()?;
    let len = manager.ordered().len();
    if from > len || to > len {
        bail!("Position out of range (1-{len})");
    }
    manager.move_within_ordered(from - 1, to - 1);
    commit_and_print(svc, &mut manager, json)
}

pub(crate) fn cmd_order_promote(
    svc: &ShoppingService,
    reference: &str,
    at: Option<usize>,
    json: bool,
) -> Result<()> {
    let item = lookup_item(svc.db(), reference)?;
    let mut manager = svc.store_order()?;
    if !manager.promote(item.id, at.map(|p| p.saturating_sub(1))) {
        bail!("{} already has a store position", item.name);
    }
    commit_and_print(svc, &mut manager, json)
}

pub(crate) fn cmd_order_demote(svc: &ShoppingService, reference: &str, json: bool) -> Result<()> {
    let item = lookup_item(svc.db(), reference)?;
    let mut manager = svc.store_order()?;
    if !manager.demote(item.id) {
        bail!("{} has no store position", item.name);
    }
    commit_and_print(svc, &mut manager, json)
}

fn commit_and_print(
    svc: &ShoppingService,
    manager: &mut StoreOrderManager,
    json: bool,
) -> Result<()> {
    if manager.has_pending_changes() {
        let batch = svc.commit_store_order(manager)?;
        log::debug!("saved store order ({} assignments)", batch.len());
    }
    print_order(manager, json)
}

fn print_order(manager: &StoreOrderManager, json: bool) -> Result<()> {
    if json {
        let view = OrderView {
            ordered: manager.ordered(),
            unordered: manager.unordered(),
        };
        println!("{}", serde_json::to_string_pretty(&view)?);
        return Ok(());
    }

    #[derive(Tabled)]
    struct SlotRow {
        #[tabled(rename = "#")]
        position: String,
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Item")]
        name: String,
    }

    let ordered = manager
        .ordered()
        .iter()
        .zip(1..)
        .map(|(slot, pos): (&OrderSlot, usize)| SlotRow {
            position: pos.to_string(),
            id: slot.item.0,
            name: slot.name.clone(),
        });
    let unordered = manager.unordered().iter().map(|slot| SlotRow {
        position: "-".into(),
        id: slot.item.0,
        name: slot.name.clone(),
    });
    let rows: Vec<SlotRow> = ordered.chain(unordered).collect();

    if rows.is_empty() {
        eprintln!("No items yet");
        return Ok(());
    }
    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}
