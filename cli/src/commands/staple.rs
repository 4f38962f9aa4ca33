use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use larder_core::models::{SessionId, StapleStatus};
use larder_core::service::ShoppingService;

use super::helpers::{exit_empty, lookup_item};

pub(crate) fn cmd_staple_list(svc: &ShoppingService, session: SessionId, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct StapleRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Item")]
        name: String,
        #[tabled(rename = "Default amount")]
        amount: String,
        #[tabled(rename = "Status")]
        status: StapleStatus,
    }

    let selections = svc.staple_selections(session)?;
    if selections.is_empty() {
        exit_empty(
            "No staples defined. Mark one with `larder item staple <item>`",
            json,
        );
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&selections)?);
        return Ok(());
    }

    let rows: Vec<StapleRow> = selections
        .iter()
        .map(|s| StapleRow {
            id: s.item.0,
            name: s.item_name.clone(),
            amount: s.staple_amount.clone().unwrap_or_default(),
            status: s.status,
        })
        .collect();
    println!("{}", Table::new(&rows).with(Style::rounded()));

    let pending = selections
        .iter()
        .filter(|s| s.status == StapleStatus::Pending)
        .count();
    if pending > 0 {
        eprintln!("{pending} staple(s) still pending");
    }
    Ok(())
}

pub(crate) fn cmd_staple_set(
    svc: &ShoppingService,
    session: SessionId,
    reference: &str,
    status: &str,
    json: bool,
) -> Result<()> {
    let status: StapleStatus = status.parse()?;
    let item = lookup_item(svc.db(), reference)?;
    if !item.is_staple {
        log::warn!("{} is not marked as a staple; selection stored anyway", item.name);
    }
    svc.set_staple_status(session, item.id, status)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "session": session, "item": item.id, "status": status })
        );
    } else {
        println!("{}: {status}", item.name);
    }
    Ok(())
}
