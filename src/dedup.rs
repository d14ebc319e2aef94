use std::sync::{Mutex, PoisonError};

use crate::content::{ContentItem, Fingerprint};

/// Outcome of running an item through the [`DedupGate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Accept,
    Skip(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Same fingerprint as the last accepted item.
    Duplicate,
    /// Text shorter than the configured minimum.
    TooShort,
}

/// Decide whether an item passes, without touching any state.
///
/// `text_len` is `None` for non-text content, which is never too short.
pub fn evaluate(
    new: Fingerprint,
    last: Option<Fingerprint>,
    text_len: Option<usize>,
    min_length: usize,
) -> Verdict {
    if last == Some(new) {
        return Verdict::Skip(SkipReason::Duplicate);
    }
    match text_len {
        Some(len) if len < min_length => Verdict::Skip(SkipReason::TooShort),
        _ => Verdict::Accept,
    }
}

/// Suppresses repeated and too-short content.
///
/// The compare-and-set on the last seen fingerprint happens under one lock,
/// so concurrent callers never both accept the same content.
#[derive(Debug)]
pub struct DedupGate {
    last: Mutex<Option<Fingerprint>>,
    min_length: usize,
}

impl DedupGate {
    pub fn new(min_length: usize) -> Self {
        Self {
            last: Mutex::new(None),
            min_length,
        }
    }

    /// Check `item` and, when accepted, remember its fingerprint.
    pub fn check(&self, item: &ContentItem) -> Verdict {
        let text_len = item.as_text().map(|t| t.chars().count());
        let mut last = self.last.lock().unwrap_or_else(PoisonError::into_inner);
        let verdict = evaluate(item.fingerprint(), *last, text_len, self.min_length);
        if verdict == Verdict::Accept {
            *last = Some(item.fingerprint());
        }
        verdict
    }

    pub fn last_fingerprint(&self) -> Option<Fingerprint> {
        *self.last.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn repeated_content_is_skipped_every_time() {
        let gate = DedupGate::new(10);
        let item = ContentItem::text("hello world this is a test clipboard entry");
        assert_eq!(gate.check(&item), Verdict::Accept);
        for _ in 0..5 {
            assert_eq!(gate.check(&item), Verdict::Skip(SkipReason::Duplicate));
        }
    }

    #[test]
    fn short_text_is_skipped_and_not_remembered() {
        let gate = DedupGate::new(10);
        let short = ContentItem::text("tiny");
        assert_eq!(gate.check(&short), Verdict::Skip(SkipReason::TooShort));
        assert_eq!(gate.last_fingerprint(), None);
    }

    #[test]
    fn images_ignore_min_length() {
        let gate = DedupGate::new(10_000);
        let img = ContentItem::image("/x.png", Fingerprint::of(b"png"));
        assert_eq!(gate.check(&img), Verdict::Accept);
    }

    #[test]
    fn alternating_content_is_accepted() {
        let gate = DedupGate::new(1);
        let a = ContentItem::text("first entry");
        let b = ContentItem::text("second entry");
        assert_eq!(gate.check(&a), Verdict::Accept);
        assert_eq!(gate.check(&b), Verdict::Accept);
        assert_eq!(gate.check(&a), Verdict::Accept);
    }

    #[test]
    fn concurrent_checks_accept_once() {
        let gate = Arc::new(DedupGate::new(1));
        let item = ContentItem::text("shared clipboard value");
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let gate = gate.clone();
                let item = item.clone();
                std::thread::spawn(move || gate.check(&item))
            })
            .collect();
        let accepted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|v| *v == Verdict::Accept)
            .count();
        assert_eq!(accepted, 1);
    }
}
