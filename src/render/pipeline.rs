use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, warn};

use super::embeds::LegacyEmbedExtractor;
use super::helpers::HelperRegistry;
use super::script::{self, Limits};
use crate::config::RenderConfig;
use crate::database::models::Page;
use crate::database::{DatabaseError, PageStore};

/// Renders page bodies and memoizes the result on the page row.
///
/// The cache is write-once: a page with a non-null `cache` is never
/// evaluated again until something outside this pipeline clears it.
#[derive(Clone)]
pub struct PageRenderPipeline {
    pages: Arc<dyn PageStore>,
    helpers: Arc<HelperRegistry>,
    config: RenderConfig,
}

impl PageRenderPipeline {
    pub fn new(pages: Arc<dyn PageStore>, helpers: Arc<HelperRegistry>, config: RenderConfig) -> Self {
        Self {
            pages,
            helpers,
            config,
        }
    }

    /// `Ok(None)` means evaluation failed; `Ok(Some(""))` is a successful empty render.
    /// Only a failure to persist the fresh cache is an error.
    pub async fn render(&self, page: &mut Page) -> Result<Option<String>, DatabaseError> {
        if let Some(cache) = &page.cache {
            debug!("Serving cached body for page {}", page.id);
            return Ok(Some(cache.clone()));
        }

        let output = match self.evaluate(page).await {
            Some(output) => output,
            None => return Ok(None),
        };

        // Embeds come from the raw body, not the rendered output
        let embeds = LegacyEmbedExtractor::parse(page.body.as_deref());
        let encoded = Page::encode_embeds(&embeds);

        self.pages
            .update_cache_and_embeds(page.id, &output, encoded.as_deref())
            .await?;

        page.cache = Some(output.clone());
        page.embeds = encoded;

        debug!(
            "Cached page {} ({} bytes, {} embeds)",
            page.id,
            output.len(),
            embeds.len()
        );
        Ok(Some(output))
    }

    async fn evaluate(&self, page: &Page) -> Option<String> {
        let budget = Duration::from_millis(self.config.timeout_ms);
        let limits = Limits {
            max_steps: self.config.max_steps,
            max_output_bytes: self.config.max_output_bytes,
            deadline: Instant::now().checked_add(budget),
        };

        let body = page.body.clone().unwrap_or_default();
        let info = page.info();
        let helpers = self.helpers.clone();

        debug!("Evaluating body of page {}", page.id);
        let task = tokio::task::spawn_blocking(move || {
            script::evaluate(&body, &info, &helpers, &limits)
        });

        match timeout(budget, task).await {
            Ok(Ok(Ok(evaluation))) => {
                if !evaluation.returned.is_null() {
                    warn!(
                        "Page {} body returned a value ({}); output kept",
                        page.id, evaluation.returned
                    );
                }
                Some(evaluation.output)
            }
            Ok(Ok(Err(e))) => {
                error!("Page evaluation failed for page {}: {}", page.id, e);
                None
            }
            Ok(Err(join_error)) => {
                error!("Page evaluation task for page {} aborted: {}", page.id, join_error);
                None
            }
            Err(_elapsed) => {
                error!(
                    "Page evaluation for page {} timed out after {:?}",
                    page.id, budget
                );
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::render::helpers::Helper;
    use crate::render::script::{Output, ScriptError, Value};
    use crate::testing::{page_fixture, MemoryPageStore};

    struct Counter(Arc<AtomicUsize>);

    impl Helper for Counter {
        fn call(&self, _args: &[Value], out: &mut Output) -> Result<Value, ScriptError> {
            let n = self.0.fetch_add(1, Ordering::SeqCst) + 1;
            out.write(&n.to_string())?;
            Ok(Value::Null)
        }
    }

    struct Stall(Duration);

    impl Helper for Stall {
        fn call(&self, _args: &[Value], _out: &mut Output) -> Result<Value, ScriptError> {
            std::thread::sleep(self.0);
            Ok(Value::Null)
        }
    }

    fn pipeline(store: Arc<MemoryPageStore>, helpers: HelperRegistry) -> PageRenderPipeline {
        PageRenderPipeline::new(store, Arc::new(helpers), RenderConfig::default())
    }

    #[tokio::test]
    async fn cached_page_is_returned_untouched() {
        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(1, "index", "this would not parse <");
        page.cache = Some("<p>cached</p>".to_string());
        store.insert(page.clone());

        let body = pipeline(store.clone(), HelperRegistry::legacy())
            .render(&mut page)
            .await
            .unwrap();
        assert_eq!(body.as_deref(), Some("<p>cached</p>"));
        assert_eq!(store.cache_writes(), 0);
    }

    #[tokio::test]
    async fn render_runs_once_then_serves_cache() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut helpers = HelperRegistry::legacy();
        helpers.register("tick", Arc::new(Counter(calls.clone())));

        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(2, "counter", "echo 'n='; tick();");
        store.insert(page.clone());
        let pipeline = pipeline(store.clone(), helpers);

        let first = pipeline.render(&mut page).await.unwrap();
        let second = pipeline.render(&mut page).await.unwrap();
        assert_eq!(first.as_deref(), Some("n=1"));
        assert_eq!(first, second);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(store.cache_writes(), 1);
    }

    #[tokio::test]
    async fn success_persists_cache_and_raw_body_embeds() {
        let store = Arc::new(MemoryPageStore::default());
        let body = "?><div><?php showGallery(8); ?></div><!-- showGallery(9) -->";
        let mut page = page_fixture(3, "gallery", body);
        store.insert(page.clone());

        let out = pipeline(store.clone(), HelperRegistry::legacy())
            .render(&mut page)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(out, "<div><!--vps:embed:gallery:8--></div><!-- showGallery(9) -->");

        let ids: Vec<i64> = page.embeds().iter().map(|e| e.gallery_id).collect();
        assert_eq!(ids, vec![8, 9]);

        let stored = store.get(3).unwrap();
        assert_eq!(stored.cache.as_deref(), Some(out.as_str()));
        assert_eq!(stored.embeds, page.embeds);
    }

    #[tokio::test]
    async fn empty_render_is_a_success_with_null_embeds() {
        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(4, "blank", "");
        store.insert(page.clone());

        let out = pipeline(store.clone(), HelperRegistry::legacy())
            .render(&mut page)
            .await
            .unwrap();
        assert_eq!(out.as_deref(), Some(""));
        assert_eq!(page.cache.as_deref(), Some(""));
        assert!(page.embeds.is_none());
        assert_eq!(store.cache_writes(), 1);
    }

    #[tokio::test]
    async fn failing_body_leaves_page_untouched() {
        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(5, "broken", "echo 'partial'; undefinedThing(); showGallery(3);");
        store.insert(page.clone());

        let out = pipeline(store.clone(), HelperRegistry::legacy())
            .render(&mut page)
            .await
            .unwrap();
        assert!(out.is_none());
        assert!(page.cache.is_none());
        assert!(page.embeds.is_none());
        assert_eq!(store.cache_writes(), 0);
        assert!(store.get(5).unwrap().cache.is_none());
    }

    #[tokio::test]
    async fn step_budget_failure_is_a_render_failure() {
        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(6, "huge", &"echo 1;".repeat(50));
        store.insert(page.clone());

        let config = RenderConfig {
            max_steps: 20,
            ..RenderConfig::default()
        };
        let pipeline = PageRenderPipeline::new(store.clone(), Arc::new(HelperRegistry::legacy()), config);
        assert!(pipeline.render(&mut page).await.unwrap().is_none());
        assert!(page.cache.is_none());
    }

    #[tokio::test]
    async fn interpreter_deadline_is_a_render_failure() {
        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(8, "slow", &"echo 1; ".repeat(300));
        store.insert(page.clone());

        let config = RenderConfig {
            timeout_ms: 0,
            ..RenderConfig::default()
        };
        let pipeline = PageRenderPipeline::new(store.clone(), Arc::new(HelperRegistry::legacy()), config);
        assert!(pipeline.render(&mut page).await.unwrap().is_none());
        assert!(page.cache.is_none());
        assert_eq!(store.cache_writes(), 0);
    }

    #[tokio::test]
    async fn stalled_evaluation_times_out() {
        let mut helpers = HelperRegistry::legacy();
        helpers.register("stall", Arc::new(Stall(Duration::from_millis(500))));

        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(9, "stalled", "stall(); echo 'late';");
        store.insert(page.clone());

        let config = RenderConfig {
            timeout_ms: 20,
            ..RenderConfig::default()
        };
        let pipeline = PageRenderPipeline::new(store.clone(), Arc::new(helpers), config);
        let started = Instant::now();
        assert!(pipeline.render(&mut page).await.unwrap().is_none());
        assert!(started.elapsed() < Duration::from_millis(500));
        assert!(page.cache.is_none());
        assert_eq!(store.cache_writes(), 0);
    }

    #[tokio::test]
    async fn deeply_nested_body_is_a_render_failure() {
        let store = Arc::new(MemoryPageStore::default());
        let body = format!("echo {}1{};", "(".repeat(200_000), ")".repeat(200_000));
        let mut page = page_fixture(10, "nested", &body);
        store.insert(page.clone());

        let out = pipeline(store.clone(), HelperRegistry::legacy())
            .render(&mut page)
            .await
            .unwrap();
        assert!(out.is_none());
        assert!(page.cache.is_none());
        assert_eq!(store.cache_writes(), 0);
    }

    #[tokio::test]
    async fn persist_failure_propagates() {
        let store = Arc::new(MemoryPageStore::default());
        let mut page = page_fixture(7, "orphan", "echo 'x';");

        let result = pipeline(store, HelperRegistry::legacy()).render(&mut page).await;
        assert!(matches!(result, Err(DatabaseError::NotFound(_))));
        assert!(page.cache.is_none());
    }
}
