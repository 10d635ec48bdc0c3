use clap::Subcommand;
use serde_json::json;

use crate::cli::utils::*;
use crate::cli::OutputFormat;
use crate::config::AppConfig;
use crate::identity::{validate_email, Role, UserPatch};
use crate::state::connect_identity;

#[derive(Subcommand)]
pub enum UserCommands {
    #[command(about = "List accounts, newest first")]
    List {
        #[arg(long, help = "Maximum number of accounts")]
        limit: Option<u32>,
    },

    #[command(about = "Create an account")]
    Create {
        #[arg(help = "Email address")]
        email: String,
        #[arg(long, help = "Admin, Staff or Normal (default Normal)")]
        role: Option<Role>,
    },

    #[command(about = "Change an account's role")]
    SetRole {
        #[arg(help = "User id")]
        id: String,
        #[arg(help = "Admin, Staff or Normal")]
        role: Role,
    },

    #[command(about = "Delete an account")]
    Delete {
        #[arg(help = "User id")]
        id: String,
    },
}

pub async fn handle(cmd: UserCommands, config: &AppConfig, output_format: OutputFormat) -> anyhow::Result<()> {
    let identity = connect_identity(config)?;

    match cmd {
        UserCommands::List { limit } => {
            let limit = limit
                .unwrap_or(config.identity.default_list_limit)
                .clamp(1, config.identity.max_list_limit);
            let users = identity.list_users(limit).await?;
            if users.is_empty() {
                return output_empty_collection(&output_format, "users", "No users");
            }

            match output_format {
                OutputFormat::Json => output_json("users", &users)?,
                OutputFormat::Text => {
                    println!("{:<34} {:<32} {:<8} {}", "ID", "EMAIL", "ROLE", "LAST SIGN-IN");
                    println!("{}", "-".repeat(100));
                    for user in &users {
                        let role = user.role.map(|r| r.to_string()).unwrap_or_else(|| "-".to_string());
                        let last = user
                            .last_sign_in_at
                            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                            .unwrap_or_else(|| "never".to_string());
                        println!(
                            "{:<34} {:<32} {:<8} {}",
                            user.id,
                            user.email.as_deref().unwrap_or("-"),
                            role,
                            last
                        );
                    }
                }
            }
            Ok(())
        }
        UserCommands::Create { email, role } => {
            let email = validate_email(&email)?;
            let user = identity.create_user(&email, role).await?;
            output_success(
                &output_format,
                &format!("Created user {} <{}>", user.id, email),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::SetRole { id, role } => {
            let user = identity.update_user(&id, UserPatch { role: Some(role) }).await?;
            output_success(
                &output_format,
                &format!("User {} is now {}", id, role),
                Some(json!({ "user": user })),
            )
        }
        UserCommands::Delete { id } => {
            identity.delete_user(&id).await?;
            output_success(&output_format, &format!("Deleted user {}", id), Some(json!({ "id": id })))
        }
    }
}
