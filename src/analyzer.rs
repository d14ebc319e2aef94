//! Sequential persona analysis with context chaining.

use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::classify::{ContentClass, classify_item};
use crate::config::PerformanceConfig;
use crate::content::{ContentItem, Payload};
use crate::error::Result;
use crate::inference::Inference;
use crate::novelty::NoveltyTracker;
use crate::persona::{AgentPersona, NO_PREVIOUS, ROSTER};
use crate::record::{AgentContext, AgentResult, AnalysisRecord};
use crate::text_util::{key_value_lines, truncate_chars};

/// Render earlier answers as one labelled block of `key: value` lines per
/// persona, or [`NO_PREVIOUS`] when nothing has been recorded yet.
///
/// ```
/// use llama_pile::analyzer::format_previous_thoughts;
/// use llama_pile::AnalysisRecord;
///
/// assert_eq!(format_previous_thoughts(&AnalysisRecord::new()), "no_previous: true");
/// ```
pub fn format_previous_thoughts(record: &AnalysisRecord) -> String {
    if record.is_empty() {
        return NO_PREVIOUS.to_string();
    }
    record
        .iter()
        .map(|r| {
            let lines: Vec<_> = key_value_lines(&r.response).collect();
            format!("{}:\n{}", r.persona_id, lines.join("\n"))
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Build the full user prompt for `persona`.
pub fn build_prompt(
    persona: &AgentPersona,
    class: ContentClass,
    previous_thoughts: &str,
    item: &ContentItem,
    max_chars: usize,
) -> Result<String> {
    let mut prompt = format!("Content type detected: {class}\n\n");
    prompt.push_str(&persona.render(previous_thoughts)?);
    match item.payload() {
        Payload::Text(text) => {
            prompt.push_str("\n\nContent to analyze:\n");
            prompt.push_str(&truncate_chars(text, max_chars));
        }
        Payload::Image(path) => {
            prompt.push_str(&format!("\n\nAnalyze this screenshot: {}", path.display()));
        }
    }
    Ok(prompt)
}

/// Runs every persona over a content item.
pub struct Analyzer {
    inference: Inference,
    novelty: Arc<NoveltyTracker>,
    candidates: usize,
    max_prompt_chars: usize,
    novelty_weight: f64,
}

impl Analyzer {
    pub fn new(inference: Inference, novelty: Arc<NoveltyTracker>, perf: &PerformanceConfig) -> Self {
        Self {
            inference,
            novelty,
            candidates: perf.candidates_per_agent.max(1),
            max_prompt_chars: perf.max_prompt_chars,
            novelty_weight: perf.novelty_weight.clamp(0.0, 1.0),
        }
    }

    fn weighted(&self, novelty: f64) -> f64 {
        (1.0 - self.novelty_weight) + self.novelty_weight * novelty
    }

    /// Ask for several completions and keep the most novel usable one.
    async fn best_candidate(&self, persona: &AgentPersona, prompt: &str) -> Option<(String, f64)> {
        let mut best: Option<(String, f64, f64)> = None;
        for n in 0..self.candidates {
            let completion = self.inference.complete(prompt).await;
            if completion.is_error() {
                debug!(persona = persona.id, candidate = n, "discarding failed candidate");
                continue;
            }
            let novelty = self.novelty.score(&completion.text);
            let score = self.weighted(novelty);
            if best.as_ref().is_none_or(|(_, s, _)| score > *s) {
                best = Some((completion.text, score, novelty));
            }
        }
        best.map(|(text, _, novelty)| (text, novelty))
    }

    /// Run the roster in order over `item`.
    ///
    /// Personas whose every candidate fails are skipped; the remaining
    /// personas still run. An empty record is a valid result.
    pub async fn analyze(&self, item: &ContentItem) -> Result<AnalysisRecord> {
        let class = classify_item(item);
        let mut record = AnalysisRecord::new();
        for persona in ROSTER.iter() {
            let previous_thoughts = format_previous_thoughts(&record);
            let prompt = build_prompt(persona, class, &previous_thoughts, item, self.max_prompt_chars)?;
            let Some((response, novelty_score)) = self.best_candidate(persona, &prompt).await else {
                warn!(persona = persona.id, hash = %item.fingerprint().short(), "no response from persona");
                continue;
            };
            let response = truncate_chars(&response, self.max_prompt_chars);
            info!(persona = persona.name, novelty = novelty_score, "{response}");
            record.push(AgentResult {
                persona_id: persona.id.to_string(),
                response,
                novelty_score,
                context: AgentContext {
                    content_type: class,
                    previous_thoughts,
                    role: persona.role.to_string(),
                },
            });
        }
        self.novelty.observe(&record).await;
        Ok(record)
    }
}
