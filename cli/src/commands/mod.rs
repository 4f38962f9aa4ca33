mod adhoc;
mod helpers;
mod item;
mod list;
mod meal;
mod order;
mod recipe;
mod session;
mod staple;

pub(crate) use adhoc::{cmd_adhoc_add, cmd_adhoc_remove, cmd_exclude_add, cmd_exclude_remove};
pub(crate) use helpers::resolve_session;
pub(crate) use item::{cmd_item_add, cmd_item_list, cmd_item_staple};
pub(crate) use list::{
    ListFormat, cmd_check, cmd_checklist_add, cmd_checklist_clear, cmd_checklist_reset, cmd_list,
};
pub(crate) use meal::{
    cmd_meal_add, cmd_meal_add_item, cmd_meal_attach_recipe, cmd_meal_delete,
    cmd_meal_detach_recipe, cmd_meal_plan,
};
pub(crate) use order::{cmd_order_demote, cmd_order_move, cmd_order_promote, cmd_order_show};
pub(crate) use recipe::{
    cmd_recipe_add_ingredient, cmd_recipe_create, cmd_recipe_delete, cmd_recipe_list,
    cmd_recipe_remove_ingredient, cmd_recipe_show,
};
pub(crate) use session::{cmd_session_create, cmd_session_list};
pub(crate) use staple::{cmd_staple_list, cmd_staple_set};
