use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

use crate::render::embeds::Embed;

/// A website page as stored in `web_site_page`.
///
/// `cache` and `embeds` are a derived pair: both stay NULL until the first
/// successful render and are always written together.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Page {
    pub id: i64,
    pub page_id: i64,
    pub acl_id: Option<i64>,
    pub body: Option<String>,
    pub header: String,
    pub title: String,
    pub path: String,
    pub secure: bool,
    pub creator: String,
    pub created: DateTime<Utc>,
    pub modifier: Option<String>,
    pub modified: Option<DateTime<Utc>>,
    pub published: Option<DateTime<Utc>>,
    pub cache: Option<String>,
    /// Raw JSON text of the embed list
    pub embeds: Option<String>,
}

impl Page {
    /// Decoded embed list; NULL, empty or unparsable text yields an empty list
    pub fn embeds(&self) -> Vec<Embed> {
        match self.embeds.as_deref() {
            None | Some("") => Vec::new(),
            Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
                tracing::warn!("Page {} has unreadable embeds column: {}", self.id, e);
                Vec::new()
            }),
        }
    }

    /// Encode an embed list for the `embeds` column; an empty list is stored as NULL
    pub fn encode_embeds(embeds: &[Embed]) -> Option<String> {
        if embeds.is_empty() {
            return None;
        }
        serde_json::to_string(embeds).ok()
    }

    pub fn set_embeds(&mut self, embeds: &[Embed]) {
        self.embeds = Self::encode_embeds(embeds);
    }

    /// Metadata exposed to the page-body script as `$PAGE_INFO`
    pub fn info(&self) -> Value {
        json!({
            "path": self.path,
            "page_id": self.page_id,
            "title": self.title,
            "header": self.header,
            "body": self.body,
            "secure": self.secure,
            "acl_id": self.acl_id,
            "creator": self.creator,
            "created": self.created.to_rfc3339(),
            "modifier": self.modifier,
            "modified": self.modified.map(|m| m.to_rfc3339()),
        })
    }
}
