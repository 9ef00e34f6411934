use clap::Subcommand;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};

use crate::cli::utils::output_success;
use crate::cli::OutputFormat;
use crate::config::config;
use crate::database::models::Page;
use crate::database::repository::PgPageStore;
use crate::database::{DatabaseError, DatabaseManager, PageStore};
use crate::render::LegacyEmbedExtractor;

#[derive(Subcommand)]
pub enum EmbedsCommands {
    #[command(about = "Re-derive the embeds column of every page from its raw body")]
    Extract {
        #[arg(long, help = "Report what would change without writing")]
        dry_run: bool,
    },
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    pub processed: usize,
    pub updated: usize,
}

impl ExtractReport {
    pub fn summary(&self) -> String {
        format!(
            "Processed {} pages, updated {} embeds entries",
            self.processed, self.updated
        )
    }
}

/// Recompute `embeds` for every page, writing only rows whose decoded list
/// differs from the derived one. The `cache` column is left alone.
pub async fn extract_embeds(pages: &dyn PageStore, dry_run: bool) -> Result<ExtractReport, DatabaseError> {
    let mut report = ExtractReport::default();

    for page in pages.find_all().await? {
        report.processed += 1;

        let derived = LegacyEmbedExtractor::parse(page.body.as_deref());
        if page.embeds() == derived {
            continue;
        }

        let encoded = Page::encode_embeds(&derived);

        debug!(
            "Page {} ({}) embeds change: {:?} -> {:?}",
            page.id, page.path, page.embeds, encoded
        );
        if !dry_run {
            pages.update_embeds(page.id, encoded.as_deref()).await?;
        }
        report.updated += 1;
    }

    Ok(report)
}

pub async fn handle(cmd: EmbedsCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    match cmd {
        EmbedsCommands::Extract { dry_run } => {
            let database = DatabaseManager::connect(&config().database).await?;
            let store = PgPageStore::new(database.pool().clone());

            let report = extract_embeds(&store, dry_run).await?;
            database.close().await;

            info!("Embed extraction finished (dry run: {})", dry_run);
            let message = if dry_run {
                format!("{} (dry run, nothing written)", report.summary())
            } else {
                report.summary()
            };
            output_success(
                &output_format,
                &message,
                Some(json!({ "processed": report.processed, "updated": report.updated, "dryRun": dry_run })),
            )
        }
    }
}
