use anyhow::{Context, Result, bail};
use chrono::{Local, NaiveDate};
use serde::Serialize;

use larder_core::db::Database;
use larder_core::models::{Item, ItemId, Recipe, RecipeId, SessionId};

pub(crate) fn parse_date(s: &str) -> Result<NaiveDate> {
    match s {
        "today" => Ok(Local::now().date_naive()),
        "yesterday" => Ok(Local::now().date_naive() - chrono::Duration::days(1)),
        "tomorrow" => Ok(Local::now().date_naive() + chrono::Duration::days(1)),
        _ => NaiveDate::parse_from_str(s, "%Y-%m-%d").with_context(|| {
            format!("Invalid date '{s}'. Use YYYY-MM-DD or today/yesterday/tomorrow")
        }),
    }
}

pub(crate) fn parse_optional_date(s: Option<&str>) -> Result<Option<NaiveDate>> {
    s.map(parse_date).transpose()
}

/// Picks the session to act on: an explicit flag, then the configured
/// default, then the most recently created session.
pub(crate) fn resolve_session(
    db: &Database,
    flag: Option<i64>,
    configured: Option<SessionId>,
) -> Result<SessionId> {
    if let Some(id) = flag.map(SessionId).or(configured) {
        return Ok(db.get_session(id)?.id);
    }
    let latest = db.list_sessions()?.into_iter().next();
    match latest {
        Some(session) => {
            log::debug!("no session given, using latest session {}", session.id);
            Ok(session.id)
        }
        None => bail!("No planning session found. Create one with `larder session create <name>`"),
    }
}

/// Accepts either a numeric item ID or an item name.
pub(crate) fn lookup_item(db: &Database, reference: &str) -> Result<Item> {
    if let Ok(id) = reference.trim().parse::<i64>() {
        return db.get_item(ItemId(id));
    }
    db.find_item_by_name(reference)?
        .with_context(|| format!("Item '{reference}' not found"))
}

/// Accepts either a numeric recipe ID or a recipe name.
pub(crate) fn lookup_recipe(db: &Database, reference: &str) -> Result<Recipe> {
    if let Ok(id) = reference.trim().parse::<i64>() {
        return db.get_recipe(RecipeId(id));
    }
    db.get_recipe_by_name(reference)
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// Prints `[]` (or the message) for an empty listing and exits with status 2.
pub(crate) fn exit_empty(message: &str, json: bool) -> ! {
    if json {
        println!("[]");
    } else {
        eprintln!("{message}");
    }
    std::process::exit(2);
}

pub(crate) fn exit_not_found(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    std::process::exit(2);
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max.saturating_sub(3)).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}

pub(crate) fn check_mark(checked: bool) -> &'static str {
    if checked { "[x]" } else { "[ ]" }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_date_keywords() {
        let today = Local::now().date_naive();
        assert_eq!(parse_date("today").unwrap(), today);
        assert_eq!(
            parse_date("yesterday").unwrap(),
            today - chrono::Duration::days(1)
        );
        assert_eq!(
            parse_date("tomorrow").unwrap(),
            today + chrono::Duration::days(1)
        );
    }

    #[test]
    fn test_parse_date_iso() {
        let date = parse_date("2024-01-15").unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
    }

    #[test]
    fn test_parse_date_invalid() {
        assert!(parse_date("nope").is_err());
        assert!(parse_optional_date(None).unwrap().is_none());
    }

    #[test]
    fn test_resolve_session_precedence() {
        let db = Database::open_in_memory().unwrap();
        assert!(resolve_session(&db, None, None).is_err());

        let first = db.create_session("Week 1", None).unwrap();
        let second = db.create_session("Week 2", None).unwrap();
        assert_eq!(resolve_session(&db, None, None).unwrap(), second.id);
        assert_eq!(
            resolve_session(&db, None, Some(first.id)).unwrap(),
            first.id
        );
        assert_eq!(
            resolve_session(&db, Some(second.id.0), Some(first.id)).unwrap(),
            second.id
        );
        assert!(resolve_session(&db, Some(99), None).is_err());
    }

    #[test]
    fn test_lookup_item_by_id_or_name() {
        let db = Database::open_in_memory().unwrap();
        let eggs = db.get_or_create_item("eggs").unwrap();
        assert_eq!(lookup_item(&db, &eggs.id.to_string()).unwrap().id, eggs.id);
        assert_eq!(lookup_item(&db, "Eggs").unwrap().id, eggs.id);
        assert!(lookup_item(&db, "ham").is_err());
    }

    #[test]
    fn test_truncate_utf8() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world this is long", 10), "hello w...");
        assert_eq!(truncate("Crème fraîche", 10), "Crème f...");
    }

    #[test]
    fn test_truncate_tiny_width() {
        assert_eq!(truncate("hello", 2), "...");
        assert_eq!(truncate("hello", 0), "...");
    }

    #[test]
    fn test_json_error() {
        assert_eq!(json_error("nope"), "{\"error\":\"nope\"}");
    }
}
