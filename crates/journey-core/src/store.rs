use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{info, warn};

use crate::JourneyEntry;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed journey data: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("duplicate entry id {0}")]
    DuplicateId(i64),
}

/// Result of loading the journey at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    Loaded { entries: usize },
    Failed { cause: String },
}

/// The recorded journey, in source order. Immutable once built.
#[derive(Debug, Clone, Default)]
pub struct JourneyStore {
    entries: Vec<JourneyEntry>,
}

impl JourneyStore {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build a store from entries already in memory. Ids must be unique.
    pub fn from_entries(entries: Vec<JourneyEntry>) -> Result<Self, StoreError> {
        let mut seen = HashSet::with_capacity(entries.len());
        for entry in &entries {
            if !seen.insert(entry.id) {
                return Err(StoreError::DuplicateId(entry.id));
            }
        }
        Ok(Self { entries })
    }

    /// Decode a JSON array of entries. A single bad record fails the whole
    /// document; there is no partial store.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let entries: Vec<JourneyEntry> = serde_json::from_str(raw)?;
        Self::from_entries(entries)
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&raw)
    }

    /// Load the journey for the lifetime of the process. Failures degrade to
    /// an empty store; the outcome is logged and returned for callers that
    /// want to report it.
    pub fn load(path: impl AsRef<Path>) -> (Self, LoadOutcome) {
        let path = path.as_ref();
        match Self::open(path) {
            Ok(store) => {
                info!(event = "journey_loaded", path = %path.display(), entries = store.len());
                let outcome = LoadOutcome::Loaded {
                    entries: store.len(),
                };
                (store, outcome)
            }
            Err(err) => {
                warn!(event = "journey_load_failed", path = %path.display(), error = %err);
                (
                    Self::empty(),
                    LoadOutcome::Failed {
                        cause: err.to_string(),
                    },
                )
            }
        }
    }

    pub fn entries(&self) -> &[JourneyEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
