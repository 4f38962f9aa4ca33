use std::io::Write;

use anyhow::Result;
use serde::Serialize;

use crate::format::format_item;
use crate::models::{ItemId, SessionId};
use crate::resolve::{Resolved, SortMode};

/// One rendered checklist row, ready for the display layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShoppingLine {
    pub item: ItemId,
    pub display_name: String,
    pub display_text: String,
    pub checked: bool,
    pub is_ad_hoc: bool,
    pub order_index: Option<i64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ShoppingList {
    pub session: SessionId,
    pub mode: SortMode,
    pub lines: Vec<ShoppingLine>,
    pub unpositioned_count: usize,
}

impl ShoppingList {
    /// Renders resolved entries. Bare entries show just their name.
    #[must_use]
    pub fn from_resolved(session: SessionId, mode: SortMode, resolved: Resolved) -> Self {
        let lines = resolved
            .entries
            .into_iter()
            .map(|entry| {
                let (display_text, is_ad_hoc) = match &entry.aggregated {
                    Some(agg) => (format_item(agg), agg.is_ad_hoc),
                    None => (entry.name.clone(), false),
                };
                ShoppingLine {
                    item: entry.item,
                    display_name: entry.name,
                    display_text,
                    checked: entry.checked,
                    is_ad_hoc,
                    order_index: entry.order_index,
                }
            })
            .collect();
        Self {
            session,
            mode,
            lines,
            unpositioned_count: resolved.unpositioned_count,
        }
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.lines.iter().filter(|l| !l.checked).count()
    }

    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut wtr = csv::Writer::from_writer(writer);
        for line in &self.lines {
            wtr.serialize(line)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::AggregatedItem;
    use crate::checklist::DisplayEntry;

    fn resolved() -> Resolved {
        Resolved {
            entries: vec![
                DisplayEntry {
                    item: ItemId(1),
                    name: "flour".to_string(),
                    aggregated: Some(AggregatedItem {
                        item: ItemId(1),
                        name: "flour".to_string(),
                        amounts: vec!["2 cups".to_string()],
                        recipe_count: 1,
                        is_staple: false,
                        is_side: false,
                        is_ad_hoc: true,
                        order_index: Some(1),
                    }),
                    checked: true,
                    order_index: Some(1),
                },
                DisplayEntry {
                    item: ItemId(2),
                    name: "paper towels".to_string(),
                    aggregated: None,
                    checked: false,
                    order_index: None,
                },
            ],
            unpositioned_count: 1,
        }
    }

    #[test]
    fn test_from_resolved_renders_lines() {
        let list = ShoppingList::from_resolved(SessionId(3), SortMode::StoreOrder, resolved());
        assert_eq!(list.lines.len(), 2);
        assert_eq!(list.lines[0].display_text, "flour: 2 cups (1 recipe)");
        assert!(list.lines[0].is_ad_hoc);
        assert_eq!(list.lines[1].display_text, "paper towels");
        assert!(!list.lines[1].is_ad_hoc);
        assert_eq!(list.unpositioned_count, 1);
        assert_eq!(list.remaining(), 1);
    }

    #[test]
    fn test_write_csv() {
        let list = ShoppingList::from_resolved(SessionId(3), SortMode::StoreOrder, resolved());
        let mut buf = Vec::new();
        list.write_csv(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert_eq!(
            lines.next().unwrap(),
            "item,display_name,display_text,checked,is_ad_hoc,order_index"
        );
        assert_eq!(
            lines.next().unwrap(),
            "1,flour,flour: 2 cups (1 recipe),true,true,1"
        );
        assert_eq!(lines.next().unwrap(), "2,paper towels,paper towels,false,false,");
    }
}
