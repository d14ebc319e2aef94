use serde::Serialize;
use serde::ser::SerializeMap;

use crate::classify::ContentClass;

/// What a persona saw when it answered.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentContext {
    pub content_type: ContentClass,
    /// Formatted output of earlier personas, or the no-context sentinel.
    pub previous_thoughts: String,
    pub role: String,
}

/// One persona's answer for one content item.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentResult {
    #[serde(skip)]
    pub persona_id: String,
    pub response: String,
    pub novelty_score: f64,
    pub context: AgentContext,
}

/// All persona answers for one content item, in persona order.
///
/// Serializes as a JSON object keyed by persona id, preserving order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AnalysisRecord {
    results: Vec<AgentResult>,
}

impl AnalysisRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: AgentResult) {
        self.results.push(result);
    }

    pub fn get(&self, persona_id: &str) -> Option<&AgentResult> {
        self.results.iter().find(|r| r.persona_id == persona_id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &AgentResult> {
        self.results.iter()
    }

    pub fn persona_ids(&self) -> impl Iterator<Item = &str> {
        self.results.iter().map(|r| r.persona_id.as_str())
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

impl Serialize for AnalysisRecord {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.results.len()))?;
        for r in &self.results {
            map.serialize_entry(&r.persona_id, r)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(id: &str) -> AgentResult {
        AgentResult {
            persona_id: id.into(),
            response: format!("{id}: done"),
            novelty_score: 1.0,
            context: AgentContext {
                content_type: ContentClass::NaturalText,
                previous_thoughts: "no_previous: true".into(),
                role: "tester".into(),
            },
        }
    }

    #[test]
    fn serializes_in_insertion_order() {
        let mut rec = AnalysisRecord::new();
        rec.push(result("zeta"));
        rec.push(result("alpha"));
        let s = serde_json::to_string(&rec).unwrap();
        assert!(s.find("\"zeta\"").unwrap() < s.find("\"alpha\"").unwrap());
        assert!(!s.contains("persona_id"));
    }

    #[test]
    fn lookup_by_persona() {
        let mut rec = AnalysisRecord::new();
        rec.push(result("curator"));
        assert_eq!(rec.get("curator").unwrap().response, "curator: done");
        assert!(rec.get("analyst").is_none());
    }
}
