use anyhow::Result;

use larder_core::models::SessionId;
use larder_core::service::ShoppingService;

use super::helpers::{exit_not_found, lookup_item};

pub(crate) fn cmd_adhoc_add(
    svc: &ShoppingService,
    session: SessionId,
    name: &str,
    amount: Option<&str>,
    json: bool,
) -> Result<()> {
    let added = svc.add_adhoc_item(session, name, amount)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&added)?);
    } else {
        let item = svc.db().get_item(added.item)?;
        match &added.amount {
            Some(a) => println!("Added {}: {a}", item.name),
            None => println!("Added {}", item.name),
        }
    }
    Ok(())
}

pub(crate) fn cmd_adhoc_remove(
    svc: &ShoppingService,
    session: SessionId,
    reference: &str,
    json: bool,
) -> Result<()> {
    let item = lookup_item(svc.db(), reference)?;
    if !svc.remove_adhoc_item(session, item.id)? {
        exit_not_found(&format!("{} is not an ad-hoc item", item.name), json);
    }

    if json {
        println!("{}", serde_json::json!({ "removed": item.id }));
    } else {
        println!("Removed {}", item.name);
    }
    Ok(())
}

pub(crate) fn cmd_exclude_add(
    svc: &ShoppingService,
    session: SessionId,
    reference: &str,
    json: bool,
) -> Result<()> {
    let item = lookup_item(svc.db(), reference)?;
    let exclusion = svc.exclude_item(session, item.id)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&exclusion)?);
    } else {
        println!("Excluded {} from session {session}", item.name);
    }
    Ok(())
}

pub(crate) fn cmd_exclude_remove(
    svc: &ShoppingService,
    session: SessionId,
    reference: &str,
    json: bool,
) -> Result<()> {
    let item = lookup_item(svc.db(), reference)?;
    if !svc.include_item(session, item.id)? {
        exit_not_found(&format!("{} is not excluded", item.name), json);
    }

    if json {
        println!("{}", serde_json::json!({ "included": item.id }));
    } else {
        println!("{} is back on the list", item.name);
    }
    Ok(())
}
