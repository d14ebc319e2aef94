use serde::Serialize;
use std::fmt;

use crate::content::{ContentItem, ContentKind};

/// Substrings that suggest source code, with their weights.
const CODE_INDICATORS: &[(&str, usize)] = &[
    ("import ", 5),
    ("def ", 3),
    ("class ", 3),
    ("return ", 3),
    ("    ", 2),
    (");", 2),
    ("};", 2),
];

/// Substrings that suggest structured data, with their weights.
const STRUCTURED_INDICATORS: &[(&str, usize)] = &[
    ("{", 1),
    ("}", 1),
    ("[", 1),
    ("]", 1),
    ("\"key\"", 2),
    ("\"value\"", 2),
];

/// Scores strictly above this mark a class.
pub const SCORE_THRESHOLD: usize = 10;

/// Heuristic category of a captured item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentClass {
    Code,
    StructuredData,
    NaturalText,
    Image,
}

impl ContentClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentClass::Code => "code",
            ContentClass::StructuredData => "structured_data",
            ContentClass::NaturalText => "natural_text",
            ContentClass::Image => "image",
        }
    }
}

impl fmt::Display for ContentClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn weighted_score(text: &str, table: &[(&str, usize)]) -> usize {
    table
        .iter()
        .map(|(needle, weight)| text.matches(needle).count() * weight)
        .sum()
}

/// Weighted code-indicator score of `text`.
pub fn code_score(text: &str) -> usize {
    weighted_score(text, CODE_INDICATORS)
}

/// Weighted structured-data score of `text`.
pub fn structured_score(text: &str) -> usize {
    weighted_score(text, STRUCTURED_INDICATORS)
}

/// Classify a piece of text. Code wins over structured data.
///
/// ```
/// use llama_pile::{classify, ContentClass};
///
/// assert_eq!(classify(&"def ".repeat(11)), ContentClass::Code);
/// assert_eq!(classify("just a sentence"), ContentClass::NaturalText);
/// ```
pub fn classify(text: &str) -> ContentClass {
    if code_score(text) > SCORE_THRESHOLD {
        ContentClass::Code
    } else if structured_score(text) > SCORE_THRESHOLD {
        ContentClass::StructuredData
    } else {
        ContentClass::NaturalText
    }
}

/// Classify a captured item; images bypass scoring.
pub fn classify_item(item: &ContentItem) -> ContentClass {
    match (item.kind(), item.as_text()) {
        (ContentKind::Text, Some(text)) => classify(text),
        _ => ContentClass::Image,
    }
}
