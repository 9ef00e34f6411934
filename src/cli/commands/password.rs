use clap::Subcommand;
use serde_json::json;

use crate::auth::password::hash_password;
use crate::cli::utils::output_success;
use crate::cli::OutputFormat;

#[derive(Subcommand)]
pub enum PasswordCommands {
    #[command(about = "Print a bcrypt hash for a web_site_users row")]
    Hash {
        #[arg(help = "Plain-text password")]
        password: String,
    },
}

pub async fn handle(cmd: PasswordCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        PasswordCommands::Hash { password } => {
            let hash = tokio::task::spawn_blocking(move || hash_password(&password)).await??;
            match output_format {
                OutputFormat::Text => {
                    println!("{}", hash);
                    Ok(())
                }
                OutputFormat::Json => output_success(&output_format, "Password hashed", Some(json!({ "hash": hash }))),
            }
        }
    }
}
