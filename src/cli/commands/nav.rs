use clap::{Subcommand, ValueEnum};
use serde_json::json;
use uuid::Uuid;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::navigation::{flatten, Direction, NavItemPatch, NewNavItem};
use crate::services::NavbarService;
use crate::state::{connect_store, nav_rules};

#[derive(Subcommand)]
pub enum NavCommands {
    #[command(about = "List items in menu order, parents before their children")]
    List,

    #[command(about = "Print the navigation as an indented tree")]
    Tree,

    #[command(about = "Append a new item")]
    Add {
        #[arg(long, help = "Display text")]
        label: String,
        #[arg(long, help = "Site path, fragment, or absolute URL")]
        href: String,
        #[arg(long, help = "Parent item id (root when omitted)")]
        parent: Option<Uuid>,
        #[arg(long, help = "Create the item hidden")]
        hidden: bool,
    },

    #[command(about = "Update an item")]
    Update {
        #[arg(help = "Item id")]
        id: Uuid,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        href: Option<String>,
        #[arg(long)]
        visible: Option<bool>,
        #[arg(long, conflicts_with = "root", help = "Move under this parent")]
        parent: Option<Uuid>,
        #[arg(long, help = "Move to the root group")]
        root: bool,
        #[arg(long, help = "1-based position within the sibling group")]
        order: Option<i32>,
    },

    #[command(about = "Delete an item; its children move up into its place")]
    Remove {
        #[arg(help = "Item id")]
        id: Uuid,
    },

    #[command(about = "Swap an item with its previous or next sibling")]
    Move {
        #[arg(help = "Item id")]
        id: Uuid,
        #[arg(value_enum)]
        direction: MoveDirection,
    },

    #[command(about = "Set the full order of one sibling group")]
    Reorder {
        #[arg(long, help = "Parent of the group (root when omitted)")]
        parent: Option<Uuid>,
        #[arg(required = true, num_args = 1.., help = "Every member id, in the new order")]
        ids: Vec<Uuid>,
    },

    #[command(about = "Renumber every sibling group to 1..N")]
    Normalize,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum MoveDirection {
    Up,
    Down,
}

impl From<MoveDirection> for Direction {
    fn from(direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Up => Direction::Up,
            MoveDirection::Down => Direction::Down,
        }
    }
}

pub async fn handle(cmd: NavCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let (store, database) = connect_store(config).await?;
    let service = NavbarService::new(store, nav_rules(config));

    let result = run(cmd, &service, &output_format).await;

    if let Some(database) = database {
        database.close().await;
    }
    result
}

async fn run(cmd: NavCommands, service: &NavbarService, output_format: &OutputFormat) -> anyhow::Result<()> {
    match cmd {
        NavCommands::List => {
            let listing = service.listing(false).await?;
            let items = flatten(&listing.tree);
            if items.is_empty() {
                return output_empty_collection(output_format, "items", "No navigation items");
            }

            match output_format {
                OutputFormat::Json => output_json("items", &items)?,
                OutputFormat::Text => {
                    println!("{:<38} {:<38} {:>5} {:<7} {:<20} {}", "ID", "PARENT", "ORDER", "VISIBLE", "LABEL", "HREF");
                    println!("{}", "-".repeat(130));
                    for item in &items {
                        let parent = item.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());
                        println!(
                            "{:<38} {:<38} {:>5} {:<7} {:<20} {}",
                            item.id, parent, item.order, item.visible, item.label, item.href
                        );
                    }
                }
            }
            Ok(())
        }
        NavCommands::Tree => {
            let listing = service.listing(false).await?;
            if listing.tree.is_empty() {
                return output_empty_collection(output_format, "tree", "No navigation items");
            }

            match output_format {
                OutputFormat::Json => output_json("tree", &listing.tree)?,
                OutputFormat::Text => print!("{}", render_tree(&listing.tree)),
            }
            Ok(())
        }
        NavCommands::Add {
            label,
            href,
            parent,
            hidden,
        } => {
            let item = service
                .create(NewNavItem {
                    id: None,
                    label,
                    href,
                    visible: Some(!hidden),
                    parent_id: parent,
                })
                .await?;
            output_success(
                output_format,
                &format!("Created '{}' ({}) at position {}", item.label, item.id, item.order),
                Some(json!({ "item": item })),
            )
        }
        NavCommands::Update {
            id,
            label,
            href,
            visible,
            parent,
            root,
            order,
        } => {
            let parent_id = if root { Some(None) } else { parent.map(Some) };
            let patch = NavItemPatch {
                label,
                href,
                visible,
                parent_id,
                order,
            };
            if patch.is_empty() {
                return Err(anyhow::anyhow!("Nothing to update; pass at least one field"));
            }

            let item = service.update(id, patch).await?;
            output_success(output_format, &format!("Updated '{}' ({})", item.label, item.id), Some(json!({ "item": item })))
        }
        NavCommands::Remove { id } => {
            service.delete(id).await?;
            output_success(output_format, &format!("Deleted {}", id), Some(json!({ "id": id })))
        }
        NavCommands::Move { id, direction } => {
            let listing = service.move_item(id, direction.into()).await?;
            let order = listing.items.iter().find(|i| i.id == id).map(|i| i.order);
            output_success(
                output_format,
                &format!("Moved {} {:?}; now at position {}", id, direction, order.unwrap_or_default()),
                Some(json!({ "id": id, "order": order })),
            )
        }
        NavCommands::Reorder { parent, ids } => {
            service.reorder(parent, &ids).await?;
            output_success(output_format, &format!("Reordered {} item(s)", ids.len()), None)
        }
        NavCommands::Normalize => {
            let writes = service.normalize().await?;
            output_success(
                output_format,
                &format!("Normalized orders ({} item(s) renumbered)", writes),
                Some(json!({ "writes": writes })),
            )
        }
    }
}
