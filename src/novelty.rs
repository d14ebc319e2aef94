//! Inverse-frequency novelty scoring over `key: value` vocabulary.

use chrono::{DateTime, Local};
use serde::Serialize;
use std::collections::{HashMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};
use tracing::{error, info};

use crate::error::Result;
use crate::record::AnalysisRecord;
use crate::text_util::key_value_pairs;

/// Reference statistics over the first observed responses.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BaselineMetrics {
    pub timestamp: DateTime<Local>,
    pub total_responses: usize,
    pub unique_keys: usize,
    pub unique_values: usize,
    /// Mean number of pairs per response.
    pub avg_response_length: f64,
    pub response_length_std: Option<f64>,
    pub response_length_min: Option<usize>,
    pub response_length_max: Option<usize>,
    pub key_diversity: f64,
    pub value_diversity: f64,
}

#[derive(Debug)]
struct BaselineAccumulator {
    started: DateTime<Local>,
    responses: usize,
    unique_keys: HashSet<String>,
    unique_values: HashSet<String>,
    response_lengths: Vec<usize>,
}

impl BaselineAccumulator {
    fn new() -> Self {
        Self {
            started: Local::now(),
            responses: 0,
            unique_keys: HashSet::new(),
            unique_values: HashSet::new(),
            response_lengths: Vec::new(),
        }
    }

    fn finish(&self) -> BaselineMetrics {
        let n = self.response_lengths.len();
        let mean = if n == 0 {
            0.0
        } else {
            self.response_lengths.iter().sum::<usize>() as f64 / n as f64
        };
        let spread = (n >= 2).then(|| {
            let var = self
                .response_lengths
                .iter()
                .map(|&l| (l as f64 - mean).powi(2))
                .sum::<f64>()
                / n as f64;
            var.sqrt()
        });
        let responses = self.responses.max(1) as f64;
        BaselineMetrics {
            timestamp: self.started,
            total_responses: self.responses,
            unique_keys: self.unique_keys.len(),
            unique_values: self.unique_values.len(),
            avg_response_length: mean,
            response_length_std: spread,
            response_length_min: (n >= 2)
                .then(|| self.response_lengths.iter().copied().min())
                .flatten(),
            response_length_max: (n >= 2)
                .then(|| self.response_lengths.iter().copied().max())
                .flatten(),
            key_diversity: self.unique_keys.len() as f64 / responses,
            value_diversity: self.unique_values.len() as f64 / responses,
        }
    }
}

async fn persist(path: &Path, metrics: &BaselineMetrics) -> Result<()> {
    let json = serde_json::to_string_pretty(metrics)?;
    tokio::fs::write(path, json).await?;
    Ok(())
}

#[derive(Debug)]
struct TrackerState {
    history: VecDeque<AnalysisRecord>,
    key_frequency: HashMap<String, u64>,
    value_frequency: HashMap<String, u64>,
    /// `None` once the baseline snapshot has been taken.
    baseline: Option<BaselineAccumulator>,
}

/// Shared frequency counters plus a one-shot baseline snapshot.
///
/// All counter reads and writes happen under a single lock.
#[derive(Debug)]
pub struct NoveltyTracker {
    state: Mutex<TrackerState>,
    history_size: usize,
    baseline_period: usize,
    baseline_file: Option<PathBuf>,
}

impl NoveltyTracker {
    /// Keep `history_size` records and snapshot after `baseline_period`
    /// responses. A zero period disables the snapshot.
    pub fn new(history_size: usize, baseline_period: usize) -> Self {
        Self {
            state: Mutex::new(TrackerState {
                history: VecDeque::with_capacity(history_size.min(1024)),
                key_frequency: HashMap::new(),
                value_frequency: HashMap::new(),
                baseline: (baseline_period > 0).then(BaselineAccumulator::new),
            }),
            history_size,
            baseline_period,
            baseline_file: None,
        }
    }

    /// Persist the baseline snapshot to `path` when it is taken.
    pub fn with_baseline_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.baseline_file = Some(path.into());
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Novelty of `text` in `[0, 1]`; `0.0` when it holds no pairs.
    ///
    /// ```
    /// use llama_pile::NoveltyTracker;
    ///
    /// let tracker = NoveltyTracker::new(10, 100);
    /// assert_eq!(tracker.score("topic: space"), 1.0);
    /// assert_eq!(tracker.score("no pairs"), 0.0);
    /// ```
    pub fn score(&self, text: &str) -> f64 {
        let pairs = key_value_pairs(text);
        if pairs.is_empty() {
            return 0.0;
        }
        let state = self.lock();
        let inverse = |freq: Option<&u64>| 1.0 / (1.0 + freq.copied().unwrap_or(0) as f64);
        let n = pairs.len() as f64;
        let key_mean = pairs
            .iter()
            .map(|(k, _)| inverse(state.key_frequency.get(*k)))
            .sum::<f64>()
            / n;
        let value_mean = pairs
            .iter()
            .map(|(_, v)| inverse(state.value_frequency.get(*v)))
            .sum::<f64>()
            / n;
        (key_mean + value_mean) / 2.0
    }

    /// Fold a finished record into the counters and history.
    ///
    /// Returns the baseline snapshot on the one call that completes it.
    /// Failing to persist the snapshot is logged, not returned.
    pub async fn observe(&self, record: &AnalysisRecord) -> Option<BaselineMetrics> {
        let snapshot = {
            let mut state = self.lock();
            let mut snapshot = None;
            for result in record.iter() {
                let pairs = key_value_pairs(&result.response);
                for (k, v) in &pairs {
                    *state.key_frequency.entry((*k).to_string()).or_insert(0) += 1;
                    *state.value_frequency.entry((*v).to_string()).or_insert(0) += 1;
                }
                if let Some(acc) = state.baseline.as_mut() {
                    for (k, v) in &pairs {
                        acc.unique_keys.insert((*k).to_string());
                        acc.unique_values.insert((*v).to_string());
                    }
                    acc.response_lengths.push(pairs.len());
                    acc.responses += 1;
                    if acc.responses >= self.baseline_period {
                        snapshot = Some(acc.finish());
                        state.baseline = None;
                    }
                }
            }
            if self.history_size > 0 {
                if state.history.len() == self.history_size {
                    state.history.pop_front();
                }
                state.history.push_back(record.clone());
            }
            snapshot
        };

        if let Some(metrics) = &snapshot {
            info!(
                total_responses = metrics.total_responses,
                unique_keys = metrics.unique_keys,
                unique_values = metrics.unique_values,
                avg_response_length = metrics.avg_response_length,
                "baseline metrics collected"
            );
            if let Some(path) = &self.baseline_file {
                if let Err(e) = persist(path, metrics).await {
                    error!(path = %path.display(), error = %e, "failed to write baseline metrics");
                }
            }
        }
        snapshot
    }

    pub fn key_frequency(&self, key: &str) -> u64 {
        self.lock().key_frequency.get(key).copied().unwrap_or(0)
    }

    pub fn value_frequency(&self, value: &str) -> u64 {
        self.lock().value_frequency.get(value).copied().unwrap_or(0)
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    /// True while baseline samples are still being collected.
    pub fn collecting_baseline(&self) -> bool {
        self.lock().baseline.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::ContentClass;
    use crate::record::{AgentContext, AgentResult};

    fn record(responses: &[&str]) -> AnalysisRecord {
        let mut rec = AnalysisRecord::new();
        for (i, r) in responses.iter().enumerate() {
            rec.push(AgentResult {
                persona_id: format!("p{i}"),
                response: (*r).to_string(),
                novelty_score: 0.0,
                context: AgentContext {
                    content_type: ContentClass::NaturalText,
                    previous_thoughts: String::new(),
                    role: String::new(),
                },
            });
        }
        rec
    }

    #[tokio::test]
    async fn observed_pairs_lower_the_score() {
        let tracker = NoveltyTracker::new(100, 1000);
        let fresh = tracker.score("topic: space");
        for _ in 0..5 {
            tracker.observe(&record(&["topic: space"])).await;
        }
        let stale = tracker.score("topic: space");
        assert_eq!(fresh, 1.0);
        assert!(stale < fresh);
        assert!((stale - 1.0 / 6.0).abs() < 1e-9);
    }

    #[tokio::test]
    async fn key_and_value_are_scored_separately() {
        let tracker = NoveltyTracker::new(100, 1000);
        tracker.observe(&record(&["topic: space"])).await;
        // key seen once (1/2), value unseen (1)
        assert!((tracker.score("topic: ocean") - 0.75).abs() < 1e-9);
    }

    #[tokio::test]
    async fn history_is_bounded() {
        let tracker = NoveltyTracker::new(2, 1000);
        for _ in 0..5 {
            tracker.observe(&record(&["a: b"])).await;
        }
        assert_eq!(tracker.history_len(), 2);
        assert_eq!(tracker.key_frequency("a"), 5);
    }

    #[tokio::test]
    async fn single_sample_baseline_has_no_spread() {
        let tracker = NoveltyTracker::new(10, 1);
        let metrics = tracker
            .observe(&record(&["a: b\nc: d"]))
            .await
            .unwrap();
        assert_eq!(metrics.total_responses, 1);
        assert_eq!(metrics.avg_response_length, 2.0);
        assert_eq!(metrics.response_length_std, None);
        assert_eq!(metrics.response_length_min, None);
        assert!(!tracker.collecting_baseline());
    }

    #[tokio::test]
    async fn baseline_spread_over_several_samples() {
        let tracker = NoveltyTracker::new(10, 2);
        let metrics = tracker
            .observe(&record(&["a: b", "a: b\nc: d\ne: f"]))
            .await
            .unwrap();
        assert_eq!(metrics.avg_response_length, 2.0);
        assert_eq!(metrics.response_length_std, Some(1.0));
        assert_eq!(metrics.response_length_min, Some(1));
        assert_eq!(metrics.response_length_max, Some(3));
        assert_eq!(metrics.unique_keys, 3);
        assert!((metrics.key_diversity - 1.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn unwritable_baseline_still_completes() {
        let dir = tempfile::tempdir().unwrap();
        let tracker = NoveltyTracker::new(10, 1)
            .with_baseline_file(dir.path().join("missing").join("novelty_baseline.json"));
        let metrics = tracker.observe(&record(&["a: b"])).await;
        assert_eq!(metrics.map(|m| m.total_responses), Some(1));
        assert!(!tracker.collecting_baseline());
        assert_eq!(tracker.key_frequency("a"), 1);
    }
}
