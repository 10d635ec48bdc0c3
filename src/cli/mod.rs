pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "navadmin")]
#[command(about = "navadmin - Operator CLI for the public website navigation")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Inspect and edit navigation items")]
    Nav {
        #[command(subcommand)]
        cmd: commands::nav::NavCommands,
    },

    #[command(about = "Manage staff accounts in the identity provider")]
    Users {
        #[command(subcommand)]
        cmd: commands::users::UserCommands,
    },

    #[command(about = "Mint a development session token (HS256)")]
    Token(commands::token::TokenArgs),

    #[command(about = "Run database migrations")]
    Migrate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn from_cli(cli: &Cli) -> Self {
        if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Text
        }
    }
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);
    let config = crate::config::config().clone();

    match cli.command {
        Commands::Nav { cmd } => commands::nav::handle(cmd, &config, output_format).await,
        Commands::Users { cmd } => commands::users::handle(cmd, &config, output_format).await,
        Commands::Token(args) => commands::token::handle(args, &config, output_format),
        Commands::Migrate => commands::migrate::handle(&config, output_format).await,
    }
}
