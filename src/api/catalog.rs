//! Read-only episode catalog.
//!
//! Episodes are bundled with the app as a JSON document; the playback session
//! only ever looks them up by id or by position.

use crate::api::models::Episode;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("invalid catalog document: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate episode id `{0}` in catalog")]
    DuplicateId(String),
}

/// Lookup surface the playback session needs for next/previous resolution.
pub trait EpisodeCatalog: Send + Sync {
    fn by_id(&self, id: &str) -> Option<Episode>;
    fn index_of(&self, episode: &Episode) -> Option<usize>;
    fn at(&self, index: usize) -> Option<Episode>;
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Episode after `current`, wrapping from the last back to the first.
    fn next_after(&self, current: &Episode) -> Option<Episode> {
        let len = self.len();
        let index = self.index_of(current)?;
        self.at((index + 1) % len)
    }

    /// Episode before `current`, wrapping from the first to the last.
    fn previous_before(&self, current: &Episode) -> Option<Episode> {
        let len = self.len();
        let index = self.index_of(current)?;
        self.at((index + len - 1) % len)
    }
}

#[derive(Debug, Clone, Default)]
pub struct StaticCatalog {
    episodes: Vec<Episode>,
}

impl StaticCatalog {
    pub fn new(episodes: Vec<Episode>) -> Result<Self, CatalogError> {
        let mut seen = HashSet::new();
        for episode in &episodes {
            if !seen.insert(episode.id.as_str()) {
                return Err(CatalogError::DuplicateId(episode.id.clone()));
            }
        }
        Ok(Self { episodes })
    }

    pub fn from_json(document: &str) -> Result<Self, CatalogError> {
        let episodes: Vec<Episode> = serde_json::from_str(document)?;
        Self::new(episodes)
    }

    pub fn episodes(&self) -> &[Episode] {
        &self.episodes
    }
}

impl EpisodeCatalog for StaticCatalog {
    fn by_id(&self, id: &str) -> Option<Episode> {
        self.episodes.iter().find(|e| e.id == id).cloned()
    }

    fn index_of(&self, episode: &Episode) -> Option<usize> {
        self.episodes.iter().position(|e| e.id == episode.id)
    }

    fn at(&self, index: usize) -> Option<Episode> {
        self.episodes.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.episodes.len()
    }
}
