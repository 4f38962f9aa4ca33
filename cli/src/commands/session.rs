use anyhow::Result;
use tabled::{Table, Tabled, settings::Style};

use larder_core::models::validate_session_name;
use larder_core::service::ShoppingService;

use super::helpers::{exit_empty, parse_optional_date, truncate};

pub(crate) fn cmd_session_create(
    svc: &ShoppingService,
    name: &str,
    starts_on: Option<&str>,
    json: bool,
) -> Result<()> {
    let name = validate_session_name(name)?;
    let starts_on = parse_optional_date(starts_on)?;
    let session = svc.db().create_session(&name, starts_on)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&session)?);
    } else {
        println!("Created session: {} (id: {})", session.name, session.id);
    }
    Ok(())
}

pub(crate) fn cmd_session_list(svc: &ShoppingService, json: bool) -> Result<()> {
    #[derive(Tabled)]
    struct SessionRow {
        #[tabled(rename = "ID")]
        id: i64,
        #[tabled(rename = "Name")]
        name: String,
        #[tabled(rename = "Starts")]
        starts_on: String,
    }

    let sessions = svc.db().list_sessions()?;
    if sessions.is_empty() {
        exit_empty("No sessions found", json);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&sessions)?);
        return Ok(());
    }

    let rows: Vec<SessionRow> = sessions
        .iter()
        .map(|s| SessionRow {
            id: s.id.0,
            name: truncate(&s.name, 30),
            starts_on: s
                .starts_on
                .map(|d| d.format("%Y-%m-%d").to_string())
                .unwrap_or_default(),
        })
        .collect();

    println!("{}", Table::new(&rows).with(Style::rounded()));
    Ok(())
}
