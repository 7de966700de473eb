//! Directory scanning utilities for discovering eligible media files.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};
use walkdir::{DirEntry, WalkDir};

use crate::error::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MediaKind {
    Photo,
    Video,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Photo => f.write_str("Photo"),
            Self::Video => f.write_str("Video"),
        }
    }
}

/// Source format, inferred from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MediaFormat {
    Jpeg,
    Png,
    Heic,
    Mov,
}

impl MediaFormat {
    /// Map a (case-insensitive) extension to a format.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "png" => Some(Self::Png),
            "heic" => Some(Self::Heic),
            "mov" => Some(Self::Mov),
            _ => None,
        }
    }

    #[must_use]
    pub fn kind(self) -> MediaKind {
        match self {
            Self::Mov => MediaKind::Video,
            Self::Jpeg | Self::Png | Self::Heic => MediaKind::Photo,
        }
    }
}

/// One eligible media asset. Identity is the path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub format: MediaFormat,
}

impl MediaEntry {
    /// Build an entry for `path`, or `None` if its extension is not media.
    #[must_use]
    pub fn from_path(path: impl Into<PathBuf>) -> Option<Self> {
        let path = path.into();
        let format = path
            .extension()
            .and_then(|s| s.to_str())
            .and_then(MediaFormat::from_extension)?;
        Some(Self { path, format })
    }

    #[must_use]
    pub fn kind(&self) -> MediaKind {
        self.format.kind()
    }
}

/// Options controlling which files a scan accepts.
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    /// Also catalog `.mov` videos.
    pub include_videos: bool,
}

impl ScanOptions {
    fn accepts(&self, entry: &MediaEntry) -> bool {
        match entry.kind() {
            MediaKind::Photo => true,
            MediaKind::Video => self.include_videos,
        }
    }
}

/// The set of media found by one scan. Never empty, never contains duplicates.
#[derive(Debug, Clone)]
pub struct Catalog {
    entries: Vec<MediaEntry>,
}

impl Catalog {
    /// Build a catalog from arbitrary entries, dropping duplicate paths.
    ///
    /// # Errors
    /// Returns [`Error::CatalogEmpty`] if `entries` is empty.
    pub fn from_entries(
        entries: impl IntoIterator<Item = MediaEntry>,
        origin: &Path,
    ) -> Result<Self, Error> {
        let mut seen = BTreeSet::new();
        let entries: Vec<_> = entries
            .into_iter()
            .filter(|e| seen.insert(e.path.clone()))
            .collect();
        if entries.is_empty() {
            return Err(Error::CatalogEmpty(origin.display().to_string()));
        }
        Ok(Self { entries })
    }

    pub fn entries(&self) -> &[MediaEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Recursively scan `root` for eligible media.
///
/// Unreadable entries below the root are logged and skipped.
///
/// # Errors
/// Returns [`Error::BadDir`] if `root` is missing or not a directory and
/// [`Error::CatalogEmpty`] if nothing eligible was found.
pub fn scan(root: &Path, opts: &ScanOptions) -> Result<Catalog, Error> {
    if !root.is_dir() {
        return Err(Error::BadDir(root.display().to_string()));
    }

    let mut found = Vec::new();
    let mut skipped = 0usize;
    for entry in WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        // Skip hidden dot-directories *below* the root only.
        .filter_entry(|e| !should_skip_dir(e))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) if err.depth() == 0 => {
                return Err(Error::BadDir(format!("{}: {err}", root.display())));
            }
            Err(err) => {
                warn!(error = %err, "skipping unreadable entry during scan");
                skipped += 1;
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        match MediaEntry::from_path(entry.path()) {
            Some(media) if opts.accepts(&media) => found.push(media),
            Some(media) => debug!(path = %media.path.display(), "ignoring media kind excluded by policy"),
            None => {}
        }
    }

    info!(
        root = %root.display(),
        found = found.len(),
        skipped,
        "media scan complete"
    );
    Catalog::from_entries(found, root)
}

fn should_skip_dir(entry: &DirEntry) -> bool {
    // Never skip the root; tempfile roots can be dot-dirs.
    if entry.depth() == 0 {
        return false;
    }
    if !entry.file_type().is_dir() {
        return false;
    }
    entry
        .file_name()
        .to_str()
        .is_some_and(|n| n.starts_with('.'))
}
