use crate::database::{DatabaseError, FingerprintStore};
use log::debug;
use std::collections::{BTreeMap, HashSet};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;
use tokio::task::JoinSet;

#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Unknown match field: {0}")]
    UnknownField(String),

    #[error("Query for {path} failed: {source}")]
    Query {
        path: String,
        source: DatabaseError,
    },

    #[error("Query task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Fingerprint column two files are compared on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MatchField {
    #[default]
    Hash,
    FileSize,
}

impl MatchField {
    pub fn column(self) -> &'static str {
        match self {
            MatchField::Hash => "hash",
            MatchField::FileSize => "filesize",
        }
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for MatchField {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hash" | "sha256" => Ok(MatchField::Hash),
            "filesize" => Ok(MatchField::FileSize),
            other => Err(MatchError::UnknownField(other.to_string())),
        }
    }
}

/// Primary path → secondary paths sharing its fingerprint field.
/// Primaries without matches are absent.
pub type MatchMap = BTreeMap<PathBuf, Vec<PathBuf>>;

/// Pair every primary path with the secondary paths whose stored `field`
/// equals its own.
///
/// One store query runs per primary path, all in flight at once. Every
/// query is awaited; the first failure is returned after the rest have
/// finished. Each match list keeps the order of `secondary`.
pub async fn find_matching(
    primary: &[PathBuf],
    secondary: &[PathBuf],
    store: &FingerprintStore,
    field: MatchField,
) -> Result<MatchMap, MatchError> {
    let mut result = MatchMap::new();
    if primary.is_empty() || secondary.is_empty() {
        return Ok(result);
    }

    let secondary: std::sync::Arc<[PathBuf]> = secondary.into();
    let mut queries = JoinSet::new();

    for primary_path in primary {
        let store = store.clone();
        let secondary = secondary.clone();
        let primary_path = primary_path.clone();

        queries.spawn_blocking(move || {
            // Rows are keyed by exact UTF-8 text; other paths are never stored.
            let Some(key) = primary_path.to_str() else {
                return Ok((primary_path, Vec::new()));
            };
            let found: HashSet<PathBuf> = store
                .query_matches(key, field)
                .map_err(|source| MatchError::Query {
                    path: key.to_string(),
                    source,
                })?
                .into_iter()
                .map(PathBuf::from)
                .collect();

            let matches: Vec<PathBuf> = secondary
                .iter()
                .filter(|candidate| found.contains(*candidate))
                .cloned()
                .collect();
            Ok::<_, MatchError>((primary_path, matches))
        });
    }

    let mut first_error = None;
    while let Some(joined) = queries.join_next().await {
        match joined.map_err(MatchError::from).and_then(|r| r) {
            Ok((primary_path, matches)) if !matches.is_empty() => {
                debug!(
                    "{} matches {} file(s) by {}",
                    primary_path.display(),
                    matches.len(),
                    field
                );
                result.insert(primary_path, matches);
            }
            Ok(_) => {}
            Err(e) => {
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(result),
    }
}
