//! Embed directives found in raw page bodies.
//!
//! Two forms are recognised: the canonical placeholder comment
//! `<!--vps:embed:gallery:{id}-->` and the legacy call `showGallery({id})`.
//! Placeholders are scanned first, so they win over a call for the same id.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)<!--\s*vps:embed:(?P<type>[a-z0-9_-]+):(?P<payload>[^\s>]+)\s*-->")
        .expect("placeholder pattern is valid")
});

static SHOW_GALLERY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)showGallery\s*\(\s*(?P<id>\d+)\s*\)").expect("showGallery pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbedKind {
    Gallery,
}

impl EmbedKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbedKind::Gallery => "gallery",
        }
    }
}

/// One embed, serialized as `{"type":"gallery","galleryId":N,"placeholder":"..."}`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Embed {
    #[serde(rename = "type")]
    pub kind: EmbedKind,
    pub gallery_id: i64,
    pub placeholder: String,
}

impl Embed {
    pub fn gallery(id: i64, placeholder: impl Into<String>) -> Self {
        Self {
            kind: EmbedKind::Gallery,
            gallery_id: id,
            placeholder: placeholder.into(),
        }
    }

    /// Wire form the frontend splices on
    pub fn canonical_placeholder(kind: EmbedKind, id: i64) -> String {
        format!("<!--vps:embed:{}:{}-->", kind.as_str(), id)
    }
}

fn parse_id(digits: &str) -> Option<i64> {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// Ordered, de-duplicated embed scan over a raw page body
#[derive(Debug, Clone, Copy, Default)]
pub struct LegacyEmbedExtractor;

impl LegacyEmbedExtractor {
    pub fn parse(body: Option<&str>) -> Vec<Embed> {
        let body = match body {
            Some(b) if !b.is_empty() => b,
            _ => return Vec::new(),
        };

        let mut embeds = Vec::new();
        let mut seen: HashSet<(EmbedKind, i64)> = HashSet::new();

        for caps in PLACEHOLDER.captures_iter(body) {
            if !caps["type"].eq_ignore_ascii_case("gallery") {
                continue;
            }
            let Some(id) = parse_id(&caps["payload"]) else {
                continue;
            };
            if seen.insert((EmbedKind::Gallery, id)) {
                embeds.push(Embed::gallery(id, &caps[0]));
            }
        }

        for caps in SHOW_GALLERY.captures_iter(body) {
            let Some(id) = parse_id(&caps["id"]) else {
                continue;
            };
            if seen.insert((EmbedKind::Gallery, id)) {
                embeds.push(Embed::gallery(
                    id,
                    Embed::canonical_placeholder(EmbedKind::Gallery, id),
                ));
            }
        }

        embeds
    }
}
