pub mod commands;
pub mod utils;

use clap::{Parser, Subcommand};
use serde::{Deserialize, Serialize};

#[derive(Parser)]
#[command(name = "vempain")]
#[command(about = "Vempain website maintenance tool")]
#[command(version)]
pub struct Cli {
    #[arg(long, global = true, help = "Output in JSON format")]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    #[command(about = "Page embed maintenance")]
    Embeds {
        #[command(subcommand)]
        cmd: commands::embeds::EmbedsCommands,
    },

    #[command(about = "Password utilities for seeding users")]
    Password {
        #[command(subcommand)]
        cmd: commands::password::PasswordCommands,
    },
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
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

    match cli.command {
        Commands::Embeds { cmd } => commands::embeds::handle(cmd, output_format).await,
        Commands::Password { cmd } => commands::password::handle(cmd, output_format).await,
    }
}
