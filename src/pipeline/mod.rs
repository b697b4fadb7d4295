//! Model info pipeline
//!
//! Resolves the set of model names (one explicit name, or every installed tag) and
//! fetches each descriptor concurrently:
//!
//! - a producer task feeds `(index, name)` jobs into a bounded channel
//! - `concurrency` fetcher tasks pull jobs and call `describe`
//! - the collector stores each result in the slot of its original index
//!
//! Output order always matches request order, whatever order fetches complete in.
//! A failed fetch only affects its own item.

use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::ollama::{ModelMetadataClient, ModelMetadataSource, OllamaError};
use crate::types::{ModelItem, Settings};

/// Pipeline errors
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Listing models failed: {0}")]
    Listing(#[from] OllamaError),
    #[error("Model listing cancelled")]
    Cancelled,
    #[error("Fetch worker failed: {0}")]
    Worker(String),
}

/// Fetches descriptors for a batch of models
pub struct ModelInfoPipeline {
    source: Arc<dyn ModelMetadataSource>,
    concurrency: usize,
}

impl ModelInfoPipeline {
    /// Pipeline with a single fetcher
    pub fn new(source: Arc<dyn ModelMetadataSource>) -> Self {
        Self {
            source,
            concurrency: 1,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(Arc::new(ModelMetadataClient::from_settings(settings)))
            .with_concurrency(settings.concurrency)
    }

    /// Number of fetcher tasks (at least 1)
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Names to fetch: the target alone (as given), or every installed tag in server order
    pub async fn resolve_names(&self, target: Option<&str>) -> Result<Vec<String>, PipelineError> {
        match target.filter(|name| !name.trim().is_empty()) {
            Some(name) => Ok(vec![name.to_string()]),
            None => {
                let tags = self.source.list_tags().await?;
                Ok(tags.into_iter().map(|tag| tag.name).collect())
            }
        }
    }

    /// Descriptors for `target` (or every installed model), in request order
    pub async fn list(&self, target: Option<&str>) -> Result<Vec<ModelItem>, PipelineError> {
        self.list_with_cancel(target, CancellationToken::new()).await
    }

    /// Same as [`list`](Self::list), aborting when `cancel` fires
    pub async fn list_with_cancel(
        &self,
        target: Option<&str>,
        cancel: CancellationToken,
    ) -> Result<Vec<ModelItem>, PipelineError> {
        let names = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled),
            names = self.resolve_names(target) => names?,
        };

        tracing::debug!("Resolved {} model names", names.len());
        self.fetch_all(names, cancel).await
    }

    /// Fetch descriptors for `names`, one item per name in the same order
    pub async fn fetch_all(
        &self,
        names: Vec<String>,
        cancel: CancellationToken,
    ) -> Result<Vec<ModelItem>, PipelineError> {
        let total = names.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let workers = self.concurrency.min(total);
        let (job_tx, job_rx) = mpsc::channel::<(usize, String)>(workers);
        let (result_tx, mut result_rx) = mpsc::channel::<(usize, ModelItem)>(workers);

        // Producer: emits jobs in request order, closes the channel when done
        let producer_cancel = cancel.clone();
        let producer = tokio::spawn(async move {
            for job in names.into_iter().enumerate() {
                tokio::select! {
                    biased;
                    _ = producer_cancel.cancelled() => break,
                    sent = job_tx.send(job) => {
                        if sent.is_err() {
                            break;
                        }
                    }
                }
            }
        });

        // Fetchers: share the job receiver, one in-flight request each
        let job_rx = Arc::new(Mutex::new(job_rx));
        let mut fetchers = JoinSet::new();
        for _ in 0..workers {
            let jobs = job_rx.clone();
            let results = result_tx.clone();
            let source = self.source.clone();
            let cancel = cancel.clone();

            fetchers.spawn(async move {
                loop {
                    let next = jobs.lock().await.recv().await;
                    let Some((index, name)) = next else {
                        break;
                    };

                    let outcome = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => break,
                        outcome = source.describe(&name) => outcome,
                    };

                    if let Err(e) = &outcome {
                        tracing::debug!("Fetching {} failed: {}", name, e);
                    }

                    if results.send((index, ModelItem::new(name, outcome))).await.is_err() {
                        break;
                    }
                }
            });
        }
        // Fetchers hold the only receivers, so the producer stops if they all exit
        drop(job_rx);
        drop(result_tx);

        // Collector: place each item at its original index
        let mut slots: Vec<Option<ModelItem>> = (0..total).map(|_| None).collect();
        while let Some((index, item)) = result_rx.recv().await {
            slots[index] = Some(item);
        }

        let mut worker_error = None;
        while let Some(joined) = fetchers.join_next().await {
            if let Err(e) = joined {
                worker_error = Some(e.to_string());
            }
        }
        if let Err(e) = producer.await {
            worker_error = Some(e.to_string());
        }

        match slots.into_iter().collect::<Option<Vec<_>>>() {
            Some(items) => Ok(items),
            None if cancel.is_cancelled() => Err(PipelineError::Cancelled),
            None => Err(PipelineError::Worker(
                worker_error.unwrap_or_else(|| "missing result".to_string()),
            )),
        }
    }
}

/// List descriptors for `target` (or every installed model) with a single fetcher
pub async fn list_model_items(
    source: Arc<dyn ModelMetadataSource>,
    target: Option<&str>,
) -> Result<Vec<ModelItem>, PipelineError> {
    ModelInfoPipeline::new(source).list(target).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ModelDescriptor, TagEntry};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn descriptor(family: &str) -> ModelDescriptor {
        ModelDescriptor {
            parameter_count: 8_030_261_312,
            context_length: 131_072,
            embedding_length: 4_096,
            quantization_level: "Q4_K_M".to_string(),
            family: family.to_string(),
            parameter_size: "8.0B".to_string(),
            format: "gguf".to_string(),
            model_type: "model".to_string(),
        }
    }

    fn tag(name: &str) -> TagEntry {
        TagEntry {
            name: name.to_string(),
            model_ref: name.to_string(),
            modified_at: None,
            size_bytes: 0,
            digest: String::new(),
            details: Default::default(),
        }
    }

    /// In-memory source with per-name latency and optional failures
    #[derive(Default)]
    struct FakeSource {
        tags: Option<Vec<TagEntry>>,
        delays: HashMap<String, Duration>,
        failing: Vec<String>,
        tag_calls: AtomicUsize,
        describe_calls: AtomicUsize,
    }

    impl FakeSource {
        fn with_tags(names: &[&str]) -> Self {
            Self {
                tags: Some(names.iter().map(|n| tag(n)).collect()),
                ..Default::default()
            }
        }

        fn delay(mut self, name: &str, millis: u64) -> Self {
            self.delays
                .insert(name.to_string(), Duration::from_millis(millis));
            self
        }

        fn fail(mut self, name: &str) -> Self {
            self.failing.push(name.to_string());
            self
        }
    }

    #[async_trait]
    impl ModelMetadataSource for FakeSource {
        async fn list_tags(&self) -> Result<Vec<TagEntry>, OllamaError> {
            self.tag_calls.fetch_add(1, Ordering::SeqCst);
            self.tags
                .clone()
                .ok_or_else(|| OllamaError::Network("connection refused".into()))
        }

        async fn describe(&self, name: &str) -> Result<ModelDescriptor, OllamaError> {
            self.describe_calls.fetch_add(1, Ordering::SeqCst);
            if let Some(delay) = self.delays.get(name) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing.iter().any(|f| f == name) {
                return Err(OllamaError::Protocol {
                    status: 404,
                    body: format!("model '{}' not found", name),
                });
            }
            Ok(descriptor(name))
        }
    }

    fn names(items: &[ModelItem]) -> Vec<&str> {
        items.iter().map(|i| i.name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_order_preserved_with_out_of_order_completion() {
        // "a" finishes last, "c" first
        let source = FakeSource::with_tags(&["a", "b", "c"])
            .delay("a", 60)
            .delay("b", 30)
            .delay("c", 1);
        let pipeline = ModelInfoPipeline::new(Arc::new(source)).with_concurrency(3);

        let items = pipeline.list(None).await.unwrap();
        assert_eq!(names(&items), ["a", "b", "c"]);
        assert!(items.iter().all(ModelItem::is_ok));
        assert_eq!(items[0].descriptor().unwrap().family, "a");
    }

    #[tokio::test]
    async fn test_order_preserved_with_single_fetcher() {
        let source = FakeSource::with_tags(&["z", "y", "x", "w"]).delay("z", 20);
        let items = list_model_items(Arc::new(source), None).await.unwrap();
        assert_eq!(names(&items), ["z", "y", "x", "w"]);
    }

    #[tokio::test]
    async fn test_failure_is_isolated() {
        let source = FakeSource::with_tags(&["a", "b", "c"]).fail("b");
        let pipeline = ModelInfoPipeline::new(Arc::new(source)).with_concurrency(2);

        let items = pipeline.list(None).await.unwrap();
        assert_eq!(items.len(), 3);

        assert!(items[0].descriptor().is_some());
        assert!(items[0].error().is_none());

        assert!(items[1].descriptor().is_none());
        assert!(matches!(
            items[1].error(),
            Some(OllamaError::Protocol { status: 404, .. })
        ));

        assert!(items[2].descriptor().is_some());
        assert!(items[2].error().is_none());
    }

    #[tokio::test]
    async fn test_single_target_skips_tag_listing() {
        let source = Arc::new(FakeSource::with_tags(&["a", "b"]));
        let pipeline = ModelInfoPipeline::new(source.clone());

        let items = pipeline.list(Some("phi4:latest")).await.unwrap();
        assert_eq!(names(&items), ["phi4:latest"]);
        assert_eq!(source.tag_calls.load(Ordering::SeqCst), 0);
        assert_eq!(source.describe_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_blank_target_lists_every_tag() {
        let source = Arc::new(FakeSource::with_tags(&["a", "b"]));
        let pipeline = ModelInfoPipeline::new(source.clone());

        let items = pipeline.list(Some("  ")).await.unwrap();
        assert_eq!(names(&items), ["a", "b"]);
        assert_eq!(source.tag_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_installed_models() {
        let source = FakeSource::with_tags(&[]);
        let items = list_model_items(Arc::new(source), None).await.unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_listing_failure_is_propagated() {
        let source = Arc::new(FakeSource::default());
        let pipeline = ModelInfoPipeline::new(source.clone()).with_concurrency(4);

        let err = pipeline.list(None).await.unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Listing(OllamaError::Network(_))
        ));
        assert_eq!(source.describe_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_cancellation_abandons_fetches() {
        let source = FakeSource::with_tags(&["a", "b", "c"])
            .delay("a", 30_000)
            .delay("b", 30_000)
            .delay("c", 30_000);
        let pipeline = ModelInfoPipeline::new(Arc::new(source)).with_concurrency(2);

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(5),
            pipeline.list_with_cancel(None, cancel),
        )
        .await
        .expect("pipeline should stop after cancellation");

        assert!(matches!(result, Err(PipelineError::Cancelled)));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let source = Arc::new(FakeSource::with_tags(&["a"]));
        let pipeline = ModelInfoPipeline::new(source.clone());

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = pipeline.list_with_cancel(None, cancel).await;
        assert!(matches!(result, Err(PipelineError::Cancelled)));
        assert_eq!(source.describe_calls.load(Ordering::SeqCst), 0);
    }

    /// Source whose `describe` panics for one name
    struct PanickingSource {
        panic_on: &'static str,
    }

    #[async_trait]
    impl ModelMetadataSource for PanickingSource {
        async fn list_tags(&self) -> Result<Vec<TagEntry>, OllamaError> {
            Ok(Vec::new())
        }

        async fn describe(&self, name: &str) -> Result<ModelDescriptor, OllamaError> {
            if name == self.panic_on {
                panic!("describe failed for {}", name);
            }
            Ok(descriptor(name))
        }
    }

    #[tokio::test]
    async fn test_dead_fetcher_reports_worker_error() {
        let source = PanickingSource { panic_on: "a" };
        let pipeline = ModelInfoPipeline::new(Arc::new(source));
        let names = vec!["a".to_string(), "b".to_string(), "c".to_string()];

        let result = tokio::time::timeout(
            Duration::from_secs(3),
            pipeline.fetch_all(names, CancellationToken::new()),
        )
        .await
        .expect("pipeline should return once its fetchers are gone");

        assert!(matches!(result, Err(PipelineError::Worker(_))));
    }

    #[tokio::test]
    async fn test_target_name_is_used_as_given() {
        let source = Arc::new(FakeSource::default());
        let pipeline = ModelInfoPipeline::new(source.clone());

        let items = pipeline.list(Some(" phi4 ")).await.unwrap();
        assert_eq!(names(&items), [" phi4 "]);
        assert_eq!(source.tag_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_concurrency_is_at_least_one() {
        let source = Arc::new(FakeSource::default());
        assert_eq!(ModelInfoPipeline::new(source).with_concurrency(0).concurrency(), 1);
    }
}
