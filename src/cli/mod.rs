pub mod commands;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

use crate::config::AppConfig;

#[derive(Parser)]
#[command(name = "giaycung-api")]
#[command(about = "Shoe-cleaning shop API backed by a Google spreadsheet")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Run the HTTP server (default)")]
    Serve {
        #[arg(long, help = "Port to listen on (overrides PORT)")]
        port: Option<u16>,
    },

    #[command(about = "Print a signed admin token")]
    SignToken {
        #[arg(long, help = "Email claim (defaults to ADMIN_EMAIL)")]
        email: Option<String>,
        #[arg(long, help = "Lifetime in hours (defaults to ADMIN_TOKEN_TTL_HOURS)")]
        ttl_hours: Option<u64>,
    },

    #[command(about = "List the sheet tabs and their default headers")]
    Tables,
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

pub async fn run(cli: Cli, config: AppConfig) -> anyhow::Result<()> {
    let output_format = OutputFormat::from_cli(&cli);

    match cli.command.unwrap_or(Commands::Serve { port: None }) {
        Commands::Serve { port } => commands::serve::handle(config, port).await,
        Commands::SignToken { email, ttl_hours } => {
            commands::token::sign(&config, email, ttl_hours, output_format)
        }
        Commands::Tables => commands::tables::handle(output_format),
    }
}
