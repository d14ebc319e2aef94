//! The fixed roster of analysis personas.
//!
//! Personas always run in roster order: curator, analyst, synthesizer.

use serde::Serialize;

use crate::error::Result;
use crate::template::render_template;

/// Placeholder text used when no earlier persona produced output.
pub const NO_PREVIOUS: &str = "no_previous: true";

/// A prompt-templated analysis role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentPersona {
    pub id: &'static str,
    pub name: &'static str,
    /// Short description recorded alongside each response.
    pub role: &'static str,
    /// Template containing a `{previous_thoughts}` placeholder.
    pub prompt_template: &'static str,
}

#[derive(Serialize)]
struct PromptCtx<'a> {
    previous_thoughts: &'a str,
}

impl AgentPersona {
    /// Substitute `previous_thoughts` into this persona's template.
    pub fn render(&self, previous_thoughts: &str) -> Result<String> {
        Ok(render_template(
            self.prompt_template,
            &PromptCtx { previous_thoughts },
        )?)
    }
}

pub const CURATOR: AgentPersona = AgentPersona {
    id: "curator",
    name: "Curator",
    role: "A detail-oriented observer who detects content type and topic shifts",
    prompt_template: "Analyze content for type and topic changes. Pay special attention to:
- Programming code vs natural language
- Technical documentation vs conversational text
- Structured data vs prose
- Major subject matter shifts

Rules:
- Each key and value should be 1-3 words maximum
- ALWAYS start with 'content_type' and 'context_shift'
- If content type changes (e.g. code vs text), ALWAYS mark context_shift as true
- Format as 'key: value'

Previous context: {previous_thoughts}

List the key-value pairs for this content:",
};

pub const ANALYST: AgentPersona = AgentPersona {
    id: "analyst",
    name: "Analyst",
    role: "A technical analyzer who identifies structural patterns",
    prompt_template: "Analyze content structure and complexity while tracking shifts.

Rules:
- Each key and value should be 1-3 words maximum
- ALWAYS start with 'structure_type' and 'complexity_level'
- Note dramatic shifts in content structure
- Format as 'key: value'

Previous flow: {previous_thoughts}

List the key-value pairs for this analysis:",
};

pub const SYNTHESIZER: AgentPersona = AgentPersona {
    id: "synthesizer",
    name: "Synthesizer",
    role: "An integrator who identifies significant transitions",
    prompt_template: "Synthesize shifts in content type and structure.

Rules:
- Each key and value should be 1-3 words maximum
- ALWAYS evaluate significance of change
- Format as 'key: value'
- Add change metrics

Previous synthesis: {previous_thoughts}

List the key-value pairs for your synthesis:",
};

/// Every persona in execution order.
pub const ROSTER: [AgentPersona; 3] = [CURATOR, ANALYST, SYNTHESIZER];
