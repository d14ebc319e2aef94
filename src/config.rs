//! Runtime configuration.
//!
//! Every value has an in-process default; a TOML file may override any
//! subset of them.
//!
//! ```
//! use llama_pile::Config;
//!
//! let cfg: Config = toml::from_str("[performance]\nbatch_size = 2\n").unwrap();
//! assert_eq!(cfg.performance.batch_size, 2);
//! assert_eq!(cfg.performance.max_queue_size, 100);
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub performance: PerformanceConfig,
    pub inference: InferenceConfig,
    pub paths: PathsConfig,
}

/// Pipeline sizing and novelty settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PerformanceConfig {
    pub batch_size: usize,
    pub poll_interval_ms: u64,
    pub max_queue_size: usize,
    pub min_content_length: usize,
    /// Number of processor tasks.
    pub concurrent_agents: usize,
    pub history_size: usize,
    /// Weight of novelty against a flat base confidence, 0..=1.
    pub novelty_weight: f64,
    /// Responses collected before the baseline snapshot is written.
    pub baseline_period: usize,
    pub candidates_per_agent: usize,
    /// Character budget for content and per-persona responses.
    pub max_prompt_chars: usize,
    /// Hard ceiling on a streamed response.
    pub max_response_chars: usize,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            batch_size: 5,
            poll_interval_ms: 500,
            max_queue_size: 100,
            min_content_length: 10,
            concurrent_agents: 2,
            history_size: 1000,
            novelty_weight: 0.3,
            baseline_period: 100,
            candidates_per_agent: 3,
            max_prompt_chars: 512,
            max_response_chars: 1000,
        }
    }
}

impl PerformanceConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Sampling parameters forwarded verbatim to the inference endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingParams {
    pub strategy: String,
    pub temperature: f64,
    pub top_p: f64,
    pub top_k: u32,
    pub max_tokens: u32,
    pub repetition_penalty: f64,
}

impl Default for SamplingParams {
    fn default() -> Self {
        Self {
            strategy: "greedy".into(),
            temperature: 0.0,
            top_p: 0.95,
            top_k: 0,
            max_tokens: 512,
            repetition_penalty: 1.0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct InferenceConfig {
    pub base_url: String,
    pub provider: String,
    pub model_id: String,
    pub environment: String,
    pub system_message: String,
    pub sampling: SamplingParams,
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
    /// Printed once every retry attempt has failed.
    pub error_message: String,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5001".into(),
            provider: "meta-reference".into(),
            model_id: "meta-llama/Llama-3.2-1B-Instruct".into(),
            environment: "single-node".into(),
            system_message: "You are a poetic assistant, skilled in explaining complex \
                             programming concepts with creative flair."
                .into(),
            sampling: SamplingParams::default(),
            retry_attempts: 3,
            retry_delay_ms: 5000,
            error_message: "Inference server unavailable - ensure the server is running".into(),
        }
    }
}

impl InferenceConfig {
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub assets_dir: PathBuf,
    pub log_file: PathBuf,
    pub dataset_file: PathBuf,
    pub screenshots_dir: PathBuf,
}

fn home() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."))
}

impl Default for PathsConfig {
    fn default() -> Self {
        let pile = home().join("Desktop").join("llama-pile");
        Self {
            assets_dir: pile.join("assets"),
            log_file: pile.join("clipboard_log.txt"),
            dataset_file: pile.join("clipboard_dataset.jsonl"),
            screenshots_dir: home().join("Screenshots"),
        }
    }
}

impl PathsConfig {
    /// Baseline snapshot location, next to the dataset file.
    pub fn baseline_file(&self) -> PathBuf {
        self.dataset_file
            .parent()
            .unwrap_or_else(|| Path::new("."))
            .join("novelty_baseline.json")
    }

    /// Rooted variant used by tests and sandboxes.
    pub fn under(root: &Path) -> Self {
        Self {
            assets_dir: root.join("assets"),
            log_file: root.join("clipboard_log.txt"),
            dataset_file: root.join("clipboard_dataset.jsonl"),
            screenshots_dir: root.join("Screenshots"),
        }
    }
}

impl Config {
    /// Load a [`Config`] from a TOML file, defaulting missing keys.
    pub async fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = tokio::fs::read_to_string(path).await?;
        Ok(toml::from_str(&text)?)
    }

    /// Create every directory the pipeline writes to or scans.
    pub async fn ensure_dirs(&self) -> Result<()> {
        let p = &self.paths;
        tokio::fs::create_dir_all(&p.assets_dir).await?;
        tokio::fs::create_dir_all(&p.screenshots_dir).await?;
        for file in [&p.log_file, &p.dataset_file] {
            if let Some(dir) = file.parent() {
                tokio::fs::create_dir_all(dir).await?;
            }
        }
        Ok(())
    }
}
