mod commands;
mod config;
mod server;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::process;

use crate::commands::{
    ListFormat, cmd_adhoc_add, cmd_adhoc_remove, cmd_check, cmd_checklist_add,
    cmd_checklist_clear, cmd_checklist_reset, cmd_exclude_add, cmd_exclude_remove, cmd_item_add,
    cmd_item_list, cmd_item_staple, cmd_list, cmd_meal_add, cmd_meal_add_item,
    cmd_meal_attach_recipe, cmd_meal_delete, cmd_meal_detach_recipe, cmd_meal_plan,
    cmd_order_demote, cmd_order_move,
    cmd_order_promote, cmd_order_show, cmd_recipe_add_ingredient, cmd_recipe_create,
    cmd_recipe_delete, cmd_recipe_list, cmd_recipe_remove_ingredient, cmd_recipe_show,
    cmd_session_create, cmd_session_list, cmd_staple_list, cmd_staple_set, resolve_session,
};
use crate::config::Config;
use larder_core::resolve::SortMode;
use larder_core::service::ShoppingService;

#[derive(Parser)]
#[command(
    name = "larder",
    version,
    about = "Plan meals and shop from one merged list",
    long_about = "Plan meals and shop from one merged list.\n\n\
        Recipes, staples, and ad-hoc items are merged per planning session into a \
        single shopping list, sorted by your store's aisle order."
)]
struct Cli {
    /// Planning session ID (default: config file, then the newest session)
    #[arg(short, long, global = true)]
    session: Option<i64>,
    /// Show debug logging on stderr
    #[arg(short, long, global = true, conflicts_with = "quiet")]
    verbose: bool,
    /// Only log errors
    #[arg(short, long, global = true)]
    quiet: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show the merged shopping list for a session
    List {
        /// Sort mode: store-order or alphabetical (default: from config)
        #[arg(short, long)]
        mode: Option<SortMode>,
        /// Hide items already checked off
        #[arg(long)]
        hide_checked: bool,
        /// Output as JSON
        #[arg(long, conflicts_with = "csv")]
        json: bool,
        /// Output as CSV
        #[arg(long)]
        csv: bool,
    },
    /// Check an item off the list
    Check {
        /// Item name or ID
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put a checked item back on the list
    Uncheck {
        /// Item name or ID
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Maintain the session checklist
    Checklist {
        #[command(subcommand)]
        command: ChecklistCommands,
    },
    /// Manage catalog items
    Item {
        #[command(subcommand)]
        command: ItemCommands,
    },
    /// Manage recipes
    Recipe {
        #[command(subcommand)]
        command: RecipeCommands,
    },
    /// Manage planning sessions
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
    /// Plan meals for a session
    Meal {
        #[command(subcommand)]
        command: MealCommands,
    },
    /// Choose which staples to buy this session
    Staple {
        #[command(subcommand)]
        command: StapleCommands,
    },
    /// One-off items for a session
    Adhoc {
        #[command(subcommand)]
        command: AdhocCommands,
    },
    /// Leave items off a session's list
    Exclude {
        #[command(subcommand)]
        command: ExcludeCommands,
    },
    /// Arrange items in store (aisle) order
    Order {
        #[command(subcommand)]
        command: OrderCommands,
    },
    /// Start the REST API server
    Serve {
        /// Port to listen on
        #[arg(short, long, default_value = "8080")]
        port: u16,
        /// Address to bind to (default: 127.0.0.1, use 0.0.0.0 to expose to network)
        #[arg(short, long, default_value = "127.0.0.1")]
        bind: String,
        /// Disable API key authentication (for development/testing)
        #[arg(long)]
        no_auth: bool,
    },
}

#[derive(Subcommand)]
enum ChecklistCommands {
    /// Add an item to the checklist directly
    Add {
        /// Item name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove checked entries
    Clear {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove every checklist entry for the session
    Reset {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ItemCommands {
    /// Add an item to the catalog
    Add {
        /// Item name
        name: String,
        /// Mark as a staple
        #[arg(long)]
        staple: bool,
        /// Default amount when bought as a staple (e.g. "1 gallon")
        #[arg(long)]
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List catalog items
    List {
        /// Only show staples
        #[arg(long)]
        staples: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Mark or unmark an item as a staple
    Staple {
        /// Item name or ID
        item: String,
        /// Unmark the item
        #[arg(long)]
        off: bool,
        /// Default staple amount
        #[arg(long)]
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum RecipeCommands {
    /// Create a new recipe
    Create {
        /// Recipe name
        name: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add an ingredient to a recipe
    AddIngredient {
        /// Recipe name or ID
        recipe: String,
        /// Ingredient item name
        ingredient: String,
        /// Amount (free text, e.g. "2 cups")
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove an ingredient from a recipe
    RemoveIngredient {
        /// Recipe name or ID
        recipe: String,
        /// Ingredient item name
        ingredient: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show recipe ingredients
    Show {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List all recipes
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a recipe
    Delete {
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Start a new planning session
    Create {
        /// Session name
        name: String,
        /// First day of the session (YYYY-MM-DD or today/yesterday/tomorrow)
        #[arg(long)]
        starts: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// List planning sessions
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum MealCommands {
    /// Add a meal to the session
    Add {
        /// Meal name (e.g. "Taco night")
        name: Option<String>,
        /// Date (YYYY-MM-DD or today/yesterday/tomorrow, default: unscheduled)
        #[arg(long)]
        date: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Attach a recipe to a meal
    AttachRecipe {
        /// Meal ID
        meal: i64,
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Detach a recipe from a meal
    DetachRecipe {
        /// Meal ID
        meal: i64,
        /// Recipe name or ID
        recipe: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Add a loose item to a meal
    AddItem {
        /// Meal ID
        meal: i64,
        /// Item name
        item: String,
        /// Amount (free text)
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the meal plan grouped by day
    Plan {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete a meal
    Delete {
        /// Meal ID
        meal: i64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum StapleCommands {
    /// Show staple selections for the session
    List {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Set a staple's status: pending, included, excluded
    Set {
        /// Item name or ID
        item: String,
        /// New status
        status: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum AdhocCommands {
    /// Add a one-off item
    Add {
        /// Item name
        name: String,
        /// Amount (free text)
        amount: Option<String>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Remove a one-off item
    Remove {
        /// Item name or ID
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ExcludeCommands {
    /// Leave an item off the list
    Add {
        /// Item name or ID
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Put an excluded item back
    Remove {
        /// Item name or ID
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum OrderCommands {
    /// Show positioned and unpositioned items
    Show {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Move a positioned item (1-based positions)
    Move {
        /// Current position
        from: usize,
        /// New position
        to: usize,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Give an item a store position
    Promote {
        /// Item name or ID
        item: String,
        /// Position to insert at (default: end)
        #[arg(long)]
        at: Option<usize>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Clear an item's store position
    Demote {
        /// Item name or ID
        item: String,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: bool, quiet: bool) {
    let mut builder =
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn"));
    if quiet {
        builder.filter_level(log::LevelFilter::Error);
    } else if verbose {
        builder.filter_level(log::LevelFilter::Debug);
    }
    builder.target(env_logger::Target::Stderr).init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}

#[allow(clippy::too_many_lines)]
async fn run(cli: Cli) -> Result<()> {
    let config = Config::load()?;
    log::debug!("using database {}", config.db_path.display());
    let svc = ShoppingService::new(&config.db_path)?;
    let session = || resolve_session(svc.db(), cli.session, config.session);

    match cli.command {
        Commands::List {
            mode,
            hide_checked,
            json,
            csv,
        } => {
            let format = if json {
                ListFormat::Json
            } else if csv {
                ListFormat::Csv
            } else {
                ListFormat::Table
            };
            let mode = mode.unwrap_or(config.sort_mode);
            cmd_list(&svc, session()?, mode, format, hide_checked)
        }
        Commands::Check { item, json } => cmd_check(&svc, session()?, &item, true, json),
        Commands::Uncheck { item, json } => cmd_check(&svc, session()?, &item, false, json),
        Commands::Checklist { command } => match command {
            ChecklistCommands::Add { name, json } => {
                cmd_checklist_add(&svc, session()?, &name, json)
            }
            ChecklistCommands::Clear { json } => cmd_checklist_clear(&svc, session()?, json),
            ChecklistCommands::Reset { json } => cmd_checklist_reset(&svc, session()?, json),
        },
        Commands::Item { command } => match command {
            ItemCommands::Add {
                name,
                staple,
                amount,
                json,
            } => cmd_item_add(&svc, &name, staple, amount.as_deref(), json),
            ItemCommands::List { staples, json } => cmd_item_list(&svc, staples, json),
            ItemCommands::Staple {
                item,
                off,
                amount,
                json,
            } => cmd_item_staple(&svc, &item, off, amount.as_deref(), json),
        },
        Commands::Recipe { command } => match command {
            RecipeCommands::Create { name, json } => cmd_recipe_create(&svc, &name, json),
            RecipeCommands::AddIngredient {
                recipe,
                ingredient,
                amount,
                json,
            } => cmd_recipe_add_ingredient(&svc, &recipe, &ingredient, amount.as_deref(), json),
            RecipeCommands::RemoveIngredient {
                recipe,
                ingredient,
                json,
            } => cmd_recipe_remove_ingredient(&svc, &recipe, &ingredient, json),
            RecipeCommands::Show { recipe, json } => cmd_recipe_show(&svc, &recipe, json),
            RecipeCommands::List { json } => cmd_recipe_list(&svc, json),
            RecipeCommands::Delete { recipe, json } => cmd_recipe_delete(&svc, &recipe, json),
        },
        Commands::Session { command } => match command {
            SessionCommands::Create { name, starts, json } => {
                cmd_session_create(&svc, &name, starts.as_deref(), json)
            }
            SessionCommands::List { json } => cmd_session_list(&svc, json),
        },
        Commands::Meal { command } => match command {
            MealCommands::Add { name, date, json } => {
                cmd_meal_add(&svc, session()?, date.as_deref(), name.as_deref(), json)
            }
            MealCommands::AttachRecipe { meal, recipe, json } => {
                cmd_meal_attach_recipe(&svc, meal, &recipe, json)
            }
            MealCommands::DetachRecipe { meal, recipe, json } => {
                cmd_meal_detach_recipe(&svc, meal, &recipe, json)
            }
            MealCommands::AddItem {
                meal,
                item,
                amount,
                json,
            } => cmd_meal_add_item(&svc, meal, &item, amount.as_deref(), json),
            MealCommands::Plan { json } => cmd_meal_plan(&svc, session()?, json),
            MealCommands::Delete { meal, json } => cmd_meal_delete(&svc, meal, json),
        },
        Commands::Staple { command } => match command {
            StapleCommands::List { json } => cmd_staple_list(&svc, session()?, json),
            StapleCommands::Set { item, status, json } => {
                cmd_staple_set(&svc, session()?, &item, &status, json)
            }
        },
        Commands::Adhoc { command } => match command {
            AdhocCommands::Add { name, amount, json } => {
                cmd_adhoc_add(&svc, session()?, &name, amount.as_deref(), json)
            }
            AdhocCommands::Remove { item, json } => {
                cmd_adhoc_remove(&svc, session()?, &item, json)
            }
        },
        Commands::Exclude { command } => match command {
            ExcludeCommands::Add { item, json } => cmd_exclude_add(&svc, session()?, &item, json),
            ExcludeCommands::Remove { item, json } => {
                cmd_exclude_remove(&svc, session()?, &item, json)
            }
        },
        Commands::Order { command } => match command {
            OrderCommands::Show { json } => cmd_order_show(&svc, json),
            OrderCommands::Move { from, to, json } => cmd_order_move(&svc, from, to, json),
            OrderCommands::Promote { item, at, json } => {
                cmd_order_promote(&svc, &item, at, json)
            }
            OrderCommands::Demote { item, json } => cmd_order_demote(&svc, &item, json),
        },
        Commands::Serve {
            port,
            bind,
            no_auth,
        } => {
            let (api_key, new_api_key) = if no_auth {
                (None, false)
            } else {
                let (key, new) = config.load_or_create_api_key()?;
                (Some(key), new)
            };
            server::start_server(svc, port, &bind, api_key, new_api_key, config.sort_mode).await
        }
    }
}
