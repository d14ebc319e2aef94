//! Clipboard analysis pile.
//!
//! A collector polls the clipboard and screenshot directory, a dedup gate
//! and bounded queue feed processor tasks, and each item is analysed by a
//! fixed roster of personas against a streaming chat-completion server.
//! Results are appended to a JSONL dataset.

pub mod analyzer;
pub mod classify;
pub mod config;
pub mod content;
pub mod dedup;
pub mod error;
pub mod inference;
pub mod novelty;
pub mod persona;
pub mod pipeline;
pub mod queue;
pub mod record;
pub mod sink;
pub mod source;
pub mod template;
pub mod text_util;
mod shutdown;

pub use analyzer::Analyzer;
pub use classify::{ContentClass, classify};
pub use config::Config;
pub use content::{ContentItem, ContentKind, Fingerprint, Payload};
pub use dedup::{DedupGate, Verdict};
pub use error::{PileError, Result};
pub use inference::{Inference, InferenceClient, LlamaStackClient};
pub use novelty::{BaselineMetrics, NoveltyTracker};
pub use persona::{AgentPersona, ROSTER};
pub use pipeline::{Collected, Pipeline, Processed};
pub use queue::WorkQueue;
pub use record::{AgentContext, AgentResult, AnalysisRecord};
pub use shutdown::shutdown_signal;
pub use sink::{DatasetSink, EventLog, ModelMetadata};
pub use source::{ClipboardReader, ContentSource, MemoryClipboard, SystemClipboard};
