//! Legacy page-body rendering: script evaluation, helper shims, embed
//! extraction and the write-once render cache.

pub mod embeds;
pub mod helpers;
pub mod pipeline;
pub mod script;

pub use embeds::{Embed, EmbedKind, LegacyEmbedExtractor};
pub use helpers::{Helper, HelperRegistry};
pub use pipeline::PageRenderPipeline;
