//! Named helpers callable from page bodies.
//!
//! The registry is built once at startup and shared read-only; each render
//! gets its own variables, never its own helpers.

use std::collections::HashMap;
use std::sync::Arc;

use super::embeds::{Embed, EmbedKind};
use super::script::{Output, ScriptError, Value};

pub trait Helper: Send + Sync {
    /// Run the helper, writing any markup to `out`
    fn call(&self, args: &[Value], out: &mut Output) -> Result<Value, ScriptError>;
}

/// Case-insensitive name → helper map
#[derive(Clone, Default)]
pub struct HelperRegistry {
    helpers: HashMap<String, Arc<dyn Helper>>,
}

impl std::fmt::Debug for HelperRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HelperRegistry")
            .field("helpers", &self.names())
            .finish()
    }
}

impl HelperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The shims historic page bodies rely on
    pub fn legacy() -> Self {
        let mut registry = Self::new();
        registry.register("showGallery", Arc::new(ShowGallery));
        registry
    }

    pub fn register(&mut self, name: &str, helper: Arc<dyn Helper>) {
        self.helpers.insert(name.to_ascii_lowercase(), helper);
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Helper>> {
        self.helpers.get(&name.to_ascii_lowercase())
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.helpers.keys().cloned().collect();
        names.sort();
        names
    }
}

/// `showGallery(id)` emits the gallery placeholder instead of gallery markup
pub struct ShowGallery;

impl Helper for ShowGallery {
    fn call(&self, args: &[Value], out: &mut Output) -> Result<Value, ScriptError> {
        let arg = args
            .first()
            .ok_or_else(|| ScriptError::Argument("showGallery() expects 1 argument, 0 given".into()))?;

        let id = arg.to_int().ok_or_else(|| {
            ScriptError::Argument(format!(
                "showGallery(): argument must be of type int, {} given",
                arg.type_name()
            ))
        })?;

        out.write(&Embed::canonical_placeholder(EmbedKind::Gallery, id.max(0)))?;
        Ok(Value::Null)
    }
}
