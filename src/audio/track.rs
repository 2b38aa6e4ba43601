use serde::{Deserialize, Serialize};
use std::{
    path::{Path, PathBuf},
    time::Duration,
};
use url::Url;

/// Extension of every file in the audio cache.
pub const CACHE_EXTENSION: &str = "mp3";

/// A playable audio resource identified by its cache name.
///
/// Two tracks with the same `name` share one cached file, no matter which
/// URL they were created from.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Track {
    name: String,
    source_url: String,
    position: Duration,
}

impl Track {
    pub fn new(name: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            source_url: source_url.into(),
            position: Duration::ZERO,
        }
    }

    /// Builds a track whose name is derived from the URL.
    pub fn from_url(source_url: impl Into<String>) -> Self {
        let source_url = source_url.into();
        Self {
            name: derive_name(&source_url),
            source_url,
            position: Duration::ZERO,
        }
    }

    pub fn with_position(mut self, position: Duration) -> Self {
        self.position = position;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_url(&self) -> &str {
        &self.source_url
    }

    /// Offset playback starts from.
    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn cache_path(&self, cache_dir: &Path) -> PathBuf {
        cache_dir.join(format!("{}.{}", self.name, CACHE_EXTENSION))
    }

    pub fn is_downloaded(&self, cache_dir: &Path) -> bool {
        self.cache_path(cache_dir).is_file()
    }
}

/// Derives a cache name from a URL: the last path segment without its extension.
///
/// Query strings and fragments are ignored and trailing slashes skipped. When
/// nothing usable is left (`https://host/`) the whole input is flattened into
/// a file-safe name instead, so the result is never empty.
pub fn derive_name(url: &str) -> String {
    let path = match Url::parse(url) {
        Ok(parsed) if !parsed.cannot_be_a_base() => parsed.path().to_string(),
        _ => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let segment = path
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default();

    let stem = match segment.rfind('.') {
        Some(dot) if dot > 0 => &segment[..dot],
        _ => segment,
    };

    if !stem.is_empty() {
        return stem.to_string();
    }

    if url.is_empty() {
        return "track".to_string();
    }

    url.chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect()
}
