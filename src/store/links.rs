//! Short-link table with a JSON snapshot.

use anyhow::Result;
use std::collections::HashMap;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::warn;

use super::snapshot;

/// Upper bound on short path length.
pub const MAX_PATH_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum LinkError {
    #[error("Short path can only contain alphanumeric characters, hyphens, and underscores")]
    InvalidPath,
    #[error("Short URL path '{0}' is already taken")]
    Taken(String),
}

/// Concurrent short-path → URL table.
///
/// The whole table is rewritten to a pretty-printed JSON object after every
/// successful insert. Bindings are immutable once created.
pub struct LinkStore {
    path: PathBuf,
    mappings: RwLock<HashMap<String, String>>,
}

impl LinkStore {
    /// Load the table from its JSON snapshot. A missing file starts empty;
    /// an unreadable document does the same with a warning.
    pub async fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        snapshot::ensure_parent(&path).await?;
        let mappings = match snapshot::read_to_string_opt(&path).await? {
            Some(contents) => match serde_json::from_str::<HashMap<String, String>>(&contents) {
                Ok(mappings) => mappings,
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "links snapshot unreadable, starting with empty table"
                    );
                    HashMap::new()
                }
            },
            None => HashMap::new(),
        };

        Ok(Self {
            path,
            mappings: RwLock::new(mappings),
        })
    }

    /// Bind `short_path` to `long_url`, never overwriting an existing
    /// binding.
    ///
    /// The occupancy check and the insert run under one write-lock
    /// acquisition, so two concurrent creates for the same path cannot both
    /// succeed. The table is persisted before returning; a failed write is
    /// logged and swallowed.
    pub async fn create(&self, short_path: &str, long_url: &str) -> Result<(), LinkError> {
        if !valid_short_path(short_path) {
            return Err(LinkError::InvalidPath);
        }

        let mut mappings = self.mappings.write().await;
        if mappings.contains_key(short_path) {
            return Err(LinkError::Taken(short_path.to_string()));
        }
        mappings.insert(short_path.to_string(), long_url.to_string());

        match serde_json::to_string_pretty(&*mappings) {
            Ok(doc) => {
                if let Err(err) = snapshot::write_atomic(&self.path, &doc).await {
                    warn!(path = %self.path.display(), error = %err, "failed to persist links snapshot");
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to serialize links snapshot");
            }
        }

        Ok(())
    }

    /// Destination bound to `short_path`, if any.
    pub async fn resolve(&self, short_path: &str) -> Option<String> {
        self.mappings.read().await.get(short_path).cloned()
    }

    /// Number of bindings.
    pub async fn len(&self) -> usize {
        self.mappings.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.mappings.read().await.is_empty()
    }

    /// All bindings, sorted by short path.
    pub async fn entries(&self) -> Vec<(String, String)> {
        let mappings = self.mappings.read().await;
        let mut entries: Vec<(String, String)> = mappings
            .iter()
            .map(|(short_path, url)| (short_path.clone(), url.clone()))
            .collect();
        entries.sort();
        entries
    }
}

/// Paths are 1 to 64 characters of `[A-Za-z0-9_-]`.
pub fn valid_short_path(short_path: &str) -> bool {
    !short_path.is_empty()
        && short_path.len() <= MAX_PATH_LEN
        && short_path
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}
