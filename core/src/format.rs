//! One display line per aggregated item.

use crate::aggregate::AggregatedItem;

fn recipes_label(count: usize) -> &'static str {
    if count > 1 { "recipes" } else { "recipe" }
}

/// Extra provenance shown next to the recipe count. Ad-hoc is not listed.
fn flag_suffix(item: &AggregatedItem) -> String {
    let mut flags = Vec::new();
    if item.is_staple {
        flags.push("staple");
    }
    if item.is_side {
        flags.push("side");
    }
    if flags.is_empty() {
        String::new()
    } else {
        format!(", {}", flags.join(", "))
    }
}

/// Renders an aggregated item.
///
/// Items with no recipe contribution show their single amount, if any.
/// Recipe items show every collected amount, and either the number of
/// recipes that gave no amount (`+N other recipes`) or the total recipe
/// count, followed by any staple/side flags.
#[must_use]
pub fn format_item(item: &AggregatedItem) -> String {
    let name = &item.name;

    if item.recipe_count == 0 {
        return match item.amounts.first() {
            Some(amount) => format!("{name}: {amount}"),
            None => name.clone(),
        };
    }

    let recipe_count = item.recipe_count as usize;
    let amount_text = item.amounts.join(", ");
    let other_recipes = recipe_count.saturating_sub(item.amounts.len());
    let flags = flag_suffix(item);

    if !amount_text.is_empty() && other_recipes > 0 {
        format!(
            "{name}: {amount_text} (+{other_recipes} other {}{flags})",
            recipes_label(other_recipes)
        )
    } else if !amount_text.is_empty() {
        format!(
            "{name}: {amount_text} ({recipe_count} {}{flags})",
            recipes_label(recipe_count)
        )
    } else {
        format!("{name} ({recipe_count} {}{flags})", recipes_label(recipe_count))
    }
}
