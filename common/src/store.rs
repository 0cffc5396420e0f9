//
// Copyright 2025 Hans W. Uhlig. All Rights Reserved.
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//

//! Durable storage for the state snapshot
//!
//! The store handles:
//! - First-run defaults when nothing has been saved yet
//! - Whole-document JSON saves through a temp file and rename
//! - Refusing to guess when stored content cannot be parsed

use crate::snapshot::StateSnapshot;
use chrono::{DateTime, Utc};
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur while loading or saving state.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Stored state exists but cannot be parsed. Not recoverable by guessing.
    #[error("State file {path:?} is corrupt: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Stored state exists but could not be read.
    #[error("Failed to read state file {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be written. The previous file, if any, is intact.
    #[error("Failed to write state file {path:?}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The snapshot could not be encoded.
    #[error("Failed to encode state: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Whole-snapshot persistence
pub trait StateStore: Send + Sync {
    /// Load the last saved snapshot, or the first-run snapshot when none exists
    fn load(&self, now: DateTime<Utc>) -> StoreResult<StateSnapshot>;

    /// Replace the stored snapshot
    fn save(&self, snapshot: &StateSnapshot) -> StoreResult<()>;
}

/// Snapshot stored as a single JSON document on disk
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn directory(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn write_error(&self, source: std::io::Error) -> StoreError {
        StoreError::Write {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    fn load(&self, now: DateTime<Utc>) -> StoreResult<StateSnapshot> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No state file at {:?}, starting fresh", self.path);
                return Ok(StateSnapshot::new(now));
            }
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        let snapshot = serde_json::from_str(&contents).map_err(|source| StoreError::Corrupt {
            path: self.path.clone(),
            source,
        })?;
        tracing::debug!("Loaded state from {:?}", self.path);
        Ok(snapshot)
    }

    fn save(&self, snapshot: &StateSnapshot) -> StoreResult<()> {
        let encoded = serde_json::to_vec_pretty(snapshot)?;
        let directory = self.directory();
        std::fs::create_dir_all(directory).map_err(|e| self.write_error(e))?;

        let mut temp = tempfile::NamedTempFile::new_in(directory).map_err(|e| self.write_error(e))?;
        temp.write_all(&encoded).map_err(|e| self.write_error(e))?;
        temp.as_file().sync_all().map_err(|e| self.write_error(e))?;
        temp.persist(&self.path).map_err(|e| self.write_error(e.error))?;

        tracing::debug!("Saved state to {:?}", self.path);
        Ok(())
    }
}
