use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::path::PathBuf;

/// Where a captured item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    Text,
    Image,
}

impl ContentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ContentKind::Text => "text",
            ContentKind::Image => "image",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 128-bit content digest used for duplicate detection.
///
/// Computed as the leading 16 bytes of a SHA-256 over the content bytes, so
/// identical bytes always produce identical fingerprints.
///
/// ```
/// use llama_pile::Fingerprint;
/// let a = Fingerprint::of(b"hello");
/// assert_eq!(a, Fingerprint::of(b"hello"));
/// assert_ne!(a, Fingerprint::of(b"hello!"));
/// assert_eq!(a.to_hex().len(), 32);
/// ```
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 16]);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let digest = Sha256::digest(bytes);
        let mut out = [0u8; 16];
        out.copy_from_slice(&digest[..16]);
        Self(out)
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First eight hex characters, used in log lines.
    pub fn short(&self) -> String {
        let mut hex = self.to_hex();
        hex.truncate(8);
        hex
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

/// Payload of a captured item: clipboard text or the path of a stored image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    Text(String),
    Image(PathBuf),
}

/// A single piece of captured content.
///
/// Serializes as `{"type": "text"|"image", "content": ..., "hash": ...}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ContentItem {
    #[serde(rename = "type")]
    kind: ContentKind,
    #[serde(rename = "content")]
    payload: Payload,
    #[serde(rename = "hash")]
    fingerprint: Fingerprint,
}

impl ContentItem {
    /// Build a text item, fingerprinting its UTF-8 bytes.
    pub fn text(text: impl Into<String>) -> Self {
        let text = text.into();
        let fingerprint = Fingerprint::of(text.as_bytes());
        Self {
            kind: ContentKind::Text,
            payload: Payload::Text(text),
            fingerprint,
        }
    }

    /// Build an image item from the digest of its bytes and its stored path.
    pub fn image(path: impl Into<PathBuf>, fingerprint: Fingerprint) -> Self {
        Self {
            kind: ContentKind::Image,
            payload: Payload::Image(path.into()),
            fingerprint,
        }
    }

    pub fn kind(&self) -> ContentKind {
        self.kind
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.fingerprint
    }

    /// Clipboard text, if this is a text item.
    pub fn as_text(&self) -> Option<&str> {
        match &self.payload {
            Payload::Text(t) => Some(t),
            Payload::Image(_) => None,
        }
    }

    /// Text shown to the personas: the text itself or the image path.
    pub fn textual(&self) -> String {
        match &self.payload {
            Payload::Text(t) => t.clone(),
            Payload::Image(p) => p.display().to_string(),
        }
    }

    /// Length in characters of the textual representation.
    pub fn content_length(&self) -> usize {
        self.textual().chars().count()
    }
}
