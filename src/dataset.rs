//! Dialogue/summary example loading.
//!
//! Accepts either JSON Lines (one object per line) or a single JSON array.
//! Each record needs `id`, `dialogue` and `summary`; extra fields are ignored.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Deserializer, Serialize};

/// One dialogue with its human-written reference summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Example {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub dialogue: String,
    pub summary: String,
}

impl Example {
    pub fn new(
        id: impl Into<String>,
        dialogue: impl Into<String>,
        summary: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            dialogue: dialogue.into(),
            summary: summary.into(),
        }
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {other}"
        ))),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{path}:{line}: invalid record: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("{0} contains no examples")]
    Empty(PathBuf),
}

/// Load up to `limit` examples in file order.
pub fn load_examples(path: impl AsRef<Path>, limit: usize) -> Result<Vec<Example>, DatasetError> {
    let path = path.as_ref();
    let raw = std::fs::read_to_string(path).map_err(|source| DatasetError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut examples = parse_records::<Example>(path, &raw, Some(limit))?;
    examples.truncate(limit);
    if examples.is_empty() {
        return Err(DatasetError::Empty(path.to_path_buf()));
    }
    Ok(examples)
}

/// Parse a JSON array or JSON Lines body, stopping after `limit` records.
pub(crate) fn parse_records<T>(
    path: &Path,
    raw: &str,
    limit: Option<usize>,
) -> Result<Vec<T>, DatasetError>
where
    T: for<'de> Deserialize<'de>,
{
    if raw.trim_start().starts_with('[') {
        return serde_json::from_str::<Vec<T>>(raw).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            line: source.line(),
            source,
        });
    }

    let mut out = Vec::new();
    for (idx, line) in raw.lines().enumerate() {
        if limit.is_some_and(|n| out.len() >= n) {
            break;
        }
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str::<T>(line).map_err(|source| DatasetError::Parse {
            path: path.to_path_buf(),
            line: idx + 1,
            source,
        })?;
        out.push(record);
    }
    Ok(out)
}
