//! Append-only persistence: the JSONL dataset and the plain-text event log.

use chrono::Local;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::config::{InferenceConfig, SamplingParams};
use crate::content::{ContentItem, ContentKind};
use crate::error::Result;
use crate::record::AnalysisRecord;

async fn append_line(path: &Path, line: &str) -> Result<()> {
    let mut file = tokio::fs::OpenOptions::new()
        .append(true)
        .create(true)
        .open(path)
        .await?;
    let mut buf = String::with_capacity(line.len() + 1);
    buf.push_str(line);
    buf.push('\n');
    file.write_all(buf.as_bytes()).await?;
    file.flush().await?;
    Ok(())
}

/// Which model produced the answers in a record.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub provider: String,
    pub model: String,
    pub environment: String,
    pub system_message: String,
    pub sampling: SamplingParams,
}

impl From<&InferenceConfig> for ModelMetadata {
    fn from(cfg: &InferenceConfig) -> Self {
        Self {
            provider: cfg.provider.clone(),
            model: cfg.model_id.clone(),
            environment: cfg.environment.clone(),
            system_message: cfg.system_message.clone(),
            sampling: cfg.sampling.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct AnalysisMetadata {
    agent_count: usize,
    content_type: ContentKind,
    content_length: usize,
}

#[derive(Debug, Serialize)]
struct DatasetRecord<'a> {
    id: Uuid,
    timestamp: String,
    content: &'a ContentItem,
    ai_response: &'a AnalysisRecord,
    model_metadata: &'a ModelMetadata,
    analysis_metadata: AnalysisMetadata,
}

/// JSONL dataset; one line per analysed item.
#[derive(Debug)]
pub struct DatasetSink {
    path: PathBuf,
    metadata: ModelMetadata,
    write: Mutex<()>,
}

impl DatasetSink {
    pub fn new(path: impl Into<PathBuf>, metadata: ModelMetadata) -> Self {
        Self {
            path: path.into(),
            metadata,
            write: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append one record and return its id.
    pub async fn append(&self, item: &ContentItem, analysis: &AnalysisRecord) -> Result<Uuid> {
        let record = DatasetRecord {
            id: Uuid::new_v4(),
            timestamp: Local::now().to_rfc3339(),
            content: item,
            ai_response: analysis,
            model_metadata: &self.metadata,
            analysis_metadata: AnalysisMetadata {
                agent_count: analysis.len(),
                content_type: item.kind(),
                content_length: item.content_length(),
            },
        };
        let line = serde_json::to_string(&record)?;
        let _guard = self.write.lock().await;
        append_line(&self.path, &line).await?;
        Ok(record.id)
    }
}

/// Plain-text log of `<timestamp> - <event>: <details>` lines.
#[derive(Debug)]
pub struct EventLog {
    path: PathBuf,
    write: Mutex<()>,
}

impl EventLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write: Mutex::new(()),
        }
    }

    pub async fn log(&self, event_type: &str, content: &str) -> Result<()> {
        let line = format!("{} - {event_type}: {content}", Local::now().to_rfc3339());
        let _guard = self.write.lock().await;
        append_line(&self.path, &line).await
    }
}
