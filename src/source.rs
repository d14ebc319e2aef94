//! Clipboard and screenshot capture.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, trace};

use crate::content::{ContentItem, Fingerprint};
use crate::error::{PileError, Result};

/// Something that can be asked for its current text.
pub trait ClipboardReader: Send + Sync {
    /// Current text, or `None` when the clipboard holds no text.
    fn read_text(&self) -> Result<Option<String>>;
}

/// The desktop clipboard, opened fresh on every read.
#[derive(Debug, Default)]
pub struct SystemClipboard;

impl ClipboardReader for SystemClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        let mut clipboard =
            arboard::Clipboard::new().map_err(|e| PileError::Clipboard(e.to_string()))?;
        match clipboard.get_text() {
            Ok(text) => Ok(Some(text)),
            Err(arboard::Error::ContentNotAvailable) => Ok(None),
            Err(e) => Err(PileError::Clipboard(e.to_string())),
        }
    }
}

/// In-memory clipboard for tests and headless runs.
#[derive(Debug, Default)]
pub struct MemoryClipboard {
    text: Option<String>,
}

impl MemoryClipboard {
    pub fn new(text: Option<&str>) -> Self {
        Self {
            text: text.map(str::to_string),
        }
    }
}

impl ClipboardReader for MemoryClipboard {
    fn read_text(&self) -> Result<Option<String>> {
        Ok(self.text.clone())
    }
}

/// Directory scanned for the newest `*.png` screenshot.
#[derive(Debug, Clone)]
pub struct ScreenshotDir {
    dir: PathBuf,
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("png"))
}

impl ScreenshotDir {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Newest screenshot by modification time.
    ///
    /// Equal timestamps are broken by the greater file name. A missing
    /// directory yields `None`.
    pub fn latest(&self) -> Result<Option<PathBuf>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let mut newest: Option<(SystemTime, PathBuf)> = None;
        for entry in entries {
            let path = entry?.path();
            if !path.is_file() || !is_png(&path) {
                continue;
            }
            let modified = fs::metadata(&path)?.modified()?;
            let newer = match &newest {
                None => true,
                Some((t, p)) => (modified, path.file_name()) > (*t, p.file_name()),
            };
            if newer {
                newest = Some((modified, path));
            }
        }
        Ok(newest.map(|(_, p)| p))
    }
}

/// Content-addressed image store: `<assets>/<hex digest>.png`.
#[derive(Debug, Clone)]
pub struct AssetStore {
    dir: PathBuf,
}

impl AssetStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Copy `image` into the store unless an identical copy exists.
    pub fn store(&self, image: &Path) -> Result<(PathBuf, Fingerprint)> {
        let bytes = fs::read(image)?;
        let fingerprint = Fingerprint::of(&bytes);
        let dest = self.dir.join(format!("{}.png", fingerprint.to_hex()));
        if dest.exists() {
            trace!(path = %dest.display(), "asset already stored");
        } else {
            fs::create_dir_all(&self.dir)?;
            fs::write(&dest, &bytes)?;
            debug!(path = %dest.display(), "stored screenshot");
        }
        Ok((dest, fingerprint))
    }
}

/// Combined clipboard and screenshot adapter.
pub struct ContentSource {
    clipboard: Box<dyn ClipboardReader>,
    screenshots: ScreenshotDir,
    assets: AssetStore,
}

impl ContentSource {
    pub fn new(
        clipboard: Box<dyn ClipboardReader>,
        screenshots: ScreenshotDir,
        assets: AssetStore,
    ) -> Self {
        Self {
            clipboard,
            screenshots,
            assets,
        }
    }

    /// Clipboard text if there is any, else the newest screenshot.
    ///
    /// Blocking: call from a blocking-capable context.
    pub fn capture(&self) -> Result<Option<ContentItem>> {
        if let Some(text) = self.clipboard.read_text()?.filter(|t| !t.is_empty()) {
            return Ok(Some(ContentItem::text(text)));
        }
        let Some(shot) = self.screenshots.latest()? else {
            return Ok(None);
        };
        let (stored, fingerprint) = self.assets.store(&shot)?;
        Ok(Some(ContentItem::image(stored, fingerprint)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentKind;
    use tempfile::tempdir;

    fn source(root: &Path, text: Option<&str>) -> ContentSource {
        ContentSource::new(
            Box::new(MemoryClipboard::new(text)),
            ScreenshotDir::new(root.join("shots")),
            AssetStore::new(root.join("assets")),
        )
    }

    #[test]
    fn clipboard_text_wins() {
        let dir = tempdir().unwrap();
        let item = source(dir.path(), Some("copied text")).capture().unwrap().unwrap();
        assert_eq!(item.as_text(), Some("copied text"));
    }

    #[test]
    fn nothing_to_capture() {
        let dir = tempdir().unwrap();
        assert!(source(dir.path(), Some("")).capture().unwrap().is_none());
    }

    #[test]
    fn screenshot_is_stored_by_digest() {
        let dir = tempdir().unwrap();
        let shots = dir.path().join("shots");
        fs::create_dir_all(&shots).unwrap();
        fs::write(shots.join("a.png"), b"fake png bytes").unwrap();
        fs::write(shots.join("notes.txt"), b"ignored").unwrap();

        let src = source(dir.path(), None);
        let first = src.capture().unwrap().unwrap();
        let again = src.capture().unwrap().unwrap();
        assert_eq!(first.kind(), ContentKind::Image);
        assert_eq!(first, again);

        let fp = Fingerprint::of(b"fake png bytes");
        let expected = dir.path().join("assets").join(format!("{}.png", fp.to_hex()));
        assert_eq!(first.fingerprint(), fp);
        assert_eq!(fs::read(expected).unwrap(), b"fake png bytes");
    }

    #[test]
    fn missing_screenshot_dir_is_not_an_error() {
        let dir = tempdir().unwrap();
        let shots = ScreenshotDir::new(dir.path().join("absent"));
        assert!(shots.latest().unwrap().is_none());
    }
}
