//! # Cache Module
//!
//! On-disk audio cache shared by every guild.
//!
//! Each track is stored once as `<cache_dir>/<name>.mp3`, where `name` is the
//! track's cache key (see [`crate::audio::track::derive_name`]). Files are
//! fetched lazily the first time a track is played and reused afterwards.
//!
//! ## Consistency
//!
//! - Downloads for the same key are serialized: the first caller fetches, the
//!   others wait on the key's lock and find the file already in place. A
//!   key's lock is dropped once no download of it is in flight.
//! - Files are written to a temporary file in the cache directory and renamed
//!   into place, so a crashed or failed download never leaves a truncated file
//!   that later looks "downloaded".

pub mod fetch;

use dashmap::DashMap;
use std::{
    io::Write,
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::{audio::track::Track, error::FetchError};

pub use fetch::{Fetcher, HttpFetcher};

pub struct TrackCache {
    dir: PathBuf,
    fetcher: Arc<dyn Fetcher>,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl TrackCache {
    pub fn new(dir: impl Into<PathBuf>, fetcher: Arc<dyn Fetcher>) -> Self {
        let dir = dir.into();
        info!("📁 Audio cache at: {}", dir.display());
        Self {
            dir,
            fetcher,
            locks: DashMap::new(),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_of(&self, track: &Track) -> PathBuf {
        track.cache_path(&self.dir)
    }

    pub fn contains(&self, track: &Track) -> bool {
        track.is_downloaded(&self.dir)
    }

    /// Makes sure the track's file is in the cache and returns its path.
    pub async fn download(&self, track: &Track) -> Result<PathBuf, FetchError> {
        let path = self.path_of(track);
        if path.is_file() {
            debug!("✅ Cache hit: {}", track.name());
            return Ok(path);
        }

        let key = track.name().to_string();
        let lock = self.locks.entry(key.clone()).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.fill(track, &path).await
        };

        // Only the map and this task still hold the lock: nobody is waiting on the key.
        self.locks.remove_if(&key, |_, held| Arc::strong_count(held) == 2);
        result.map(|()| path)
    }

    /// Fetches and stores the track while its key's lock is held.
    async fn fill(&self, track: &Track, path: &Path) -> Result<(), FetchError> {
        // Another task may have finished the same key while we waited.
        if path.is_file() {
            debug!("✅ Cache filled while waiting: {}", track.name());
            return Ok(());
        }

        info!("⬇️ Downloading {} from {}", track.name(), track.source_url());
        let bytes = self.fetcher.fetch(track.source_url()).await?;

        let dir = self.dir.clone();
        let target = path.to_path_buf();
        tokio::task::spawn_blocking(move || write_atomically(&dir, &target, &bytes)).await??;

        info!("💾 Cached {} ({} bytes)", track.name(), path.metadata().map(|m| m.len()).unwrap_or(0));
        Ok(())
    }
}

fn write_atomically(dir: &Path, target: &Path, bytes: &[u8]) -> std::io::Result<()> {
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.as_file().sync_all()?;
    file.persist(target).map_err(|e| e.error)?;
    Ok(())
}
