//! Collector, processors and reporter wired around the work queue.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::analyzer::Analyzer;
use crate::config::{Config, PerformanceConfig};
use crate::content::ContentItem;
use crate::dedup::{DedupGate, SkipReason, Verdict};
use crate::error::Result;
use crate::inference::{Inference, InferenceClient};
use crate::novelty::NoveltyTracker;
use crate::queue::{Popped, Pushed, WorkQueue};
use crate::record::AnalysisRecord;
use crate::sink::{DatasetSink, EventLog, ModelMetadata};
use crate::source::{AssetStore, ClipboardReader, ContentSource, ScreenshotDir};

const ERROR_PAUSE: Duration = Duration::from_millis(100);
const REPORT_TIMEOUT: Duration = Duration::from_secs(1);

/// Outcome of a single collector poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Collected {
    Nothing,
    Skipped(SkipReason),
    Queued,
    /// Accepted by the gate but lost to a full queue.
    Dropped,
}

/// An analysed item on its way to the reporter.
#[derive(Debug, Clone)]
pub struct Processed {
    pub item: ContentItem,
    pub record: AnalysisRecord,
}

/// The whole capture-to-dataset pipeline.
pub struct Pipeline {
    perf: PerformanceConfig,
    source: Arc<ContentSource>,
    gate: DedupGate,
    queue: WorkQueue<ContentItem>,
    analyzer: Analyzer,
    sink: DatasetSink,
    events: EventLog,
}

impl Pipeline {
    pub fn new(
        perf: PerformanceConfig,
        source: ContentSource,
        analyzer: Analyzer,
        sink: DatasetSink,
        events: EventLog,
    ) -> Self {
        Self {
            gate: DedupGate::new(perf.min_content_length),
            queue: WorkQueue::bounded(perf.max_queue_size.max(1), "content"),
            source: Arc::new(source),
            analyzer,
            sink,
            events,
            perf,
        }
    }

    /// Assemble every stage from `config`.
    pub fn from_config(
        config: &Config,
        clipboard: Box<dyn ClipboardReader>,
        client: Arc<dyn InferenceClient>,
    ) -> Self {
        let perf = &config.performance;
        let paths = &config.paths;
        let source = ContentSource::new(
            clipboard,
            ScreenshotDir::new(&paths.screenshots_dir),
            AssetStore::new(&paths.assets_dir),
        );
        let novelty = NoveltyTracker::new(perf.history_size, perf.baseline_period)
            .with_baseline_file(paths.baseline_file());
        let inference = Inference::new(client, &config.inference, perf.max_response_chars);
        let analyzer = Analyzer::new(inference, Arc::new(novelty), perf);
        let sink = DatasetSink::new(&paths.dataset_file, ModelMetadata::from(&config.inference));
        Self::new(perf.clone(), source, analyzer, sink, EventLog::new(&paths.log_file))
    }

    pub fn queue(&self) -> &WorkQueue<ContentItem> {
        &self.queue
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    /// Capture once and push anything new onto the queue.
    pub async fn collect_once(&self) -> Result<Collected> {
        let source = Arc::clone(&self.source);
        let Some(item) = tokio::task::spawn_blocking(move || source.capture()).await?? else {
            return Ok(Collected::Nothing);
        };
        if let Verdict::Skip(reason) = self.gate.check(&item) {
            return Ok(Collected::Skipped(reason));
        }
        let hash = item.fingerprint().short();
        Ok(match self.queue.push(item) {
            Pushed::Queued => {
                debug!(%hash, "queued new content");
                Collected::Queued
            }
            Pushed::Dropped => {
                warn!(%hash, "work queue full; content dropped");
                Collected::Dropped
            }
        })
    }

    /// One item waited for, plus up to `batch_size - 1` already queued.
    pub async fn next_batch(&self) -> Vec<ContentItem> {
        let Popped::Item(first) = self.queue.pop(self.perf.poll_interval()).await else {
            return Vec::new();
        };
        let mut batch = vec![first];
        while batch.len() < self.perf.batch_size.max(1) {
            match self.queue.try_pop() {
                Popped::Item(item) => batch.push(item),
                Popped::Empty => break,
            }
        }
        batch
    }

    /// Analyse `item` and store it. Empty analyses are not stored.
    pub async fn process(&self, item: ContentItem) -> Result<Option<Processed>> {
        let record = self.analyzer.analyze(&item).await?;
        if record.is_empty() {
            warn!(hash = %item.fingerprint().short(), "no persona produced a response");
            return Ok(None);
        }
        self.sink.append(&item, &record).await?;
        Ok(Some(Processed { item, record }))
    }

    /// Log a finished item to tracing and the event log.
    pub async fn report(&self, processed: &Processed) -> Result<()> {
        let kind = processed.item.kind();
        let hash = processed.item.fingerprint().short();
        info!(content_type = %kind, queue_depth = self.queue.len(), "processed content");
        self.events
            .log("Content Processed", &format!("Type: {kind}, Hash: {hash}"))
            .await
    }

    async fn collector_loop(self: Arc<Self>) {
        let mut ticker = tokio::time::interval(self.perf.poll_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = self.collect_once().await {
                error!(error = %e, "error collecting content");
            }
        }
    }

    async fn processor_loop(self: Arc<Self>, worker: usize, results: mpsc::UnboundedSender<Processed>) {
        loop {
            for item in self.next_batch().await {
                match self.process(item).await {
                    Ok(Some(done)) => {
                        if results.send(done).is_err() {
                            debug!(worker, "reporter gone; processor exiting");
                            return;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        error!(worker, error = %e, "error processing content");
                        tokio::time::sleep(ERROR_PAUSE).await;
                    }
                }
            }
        }
    }

    /// Run until `shutdown` resolves, then abort the background tasks.
    ///
    /// Results still in flight at shutdown are dropped.
    pub async fn run<F>(self: Arc<Self>, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!(
            batch_size = self.perf.batch_size,
            poll_interval_ms = self.perf.poll_interval_ms,
            workers = self.perf.concurrent_agents,
            "starting clipboard monitor"
        );
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut tasks = JoinSet::new();
        tasks.spawn(Arc::clone(&self).collector_loop());
        for worker in 0..self.perf.concurrent_agents.max(1) {
            tasks.spawn(Arc::clone(&self).processor_loop(worker, tx.clone()));
        }
        drop(tx);

        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("shutting down");
                    break;
                }
                next = tokio::time::timeout(REPORT_TIMEOUT, rx.recv()) => match next {
                    Ok(Some(done)) => {
                        if let Err(e) = self.report(&done).await {
                            error!(error = %e, "error reporting result");
                        }
                    }
                    Ok(None) => break,
                    Err(_) => continue,
                },
            }
        }
        tasks.shutdown().await;
        info!("cleanup complete");
        Ok(())
    }
}
