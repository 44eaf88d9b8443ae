//! Language code translation table
//!
//! Maps classifier output codes (ISO-639-3 + script, e.g. `fin_Latn`) to the
//! canonical partition labels used for shard directories. The table is an
//! external JSONL file, one mapping per line:
//!
//! ```text
//! {"code": "fin_Latn", "label": "fi", "script": "Latn"}
//! ```

use std::io::BufRead;
use std::path::Path;

use rustc_hash::FxHashMap;
use serde::Deserialize;

use crate::error::PipelineError;
use crate::source::open_reader;

#[derive(Debug, Deserialize)]
struct MappingRow {
    code: String,
    label: String,
    script: String,
}

/// Immutable code → partition-key table, built once at startup.
#[derive(Debug, Clone, Default)]
pub struct LangMapping {
    map: FxHashMap<String, String>,
}

impl LangMapping {
    /// Load from a JSONL mapping file (plain or compressed).
    pub fn from_jsonl(path: &Path) -> Result<Self, PipelineError> {
        Self::from_reader(open_reader(path)?).map_err(|e| {
            PipelineError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid mapping file {}: {e}", path.display()),
            ))
        })
    }

    pub fn from_reader(reader: impl BufRead) -> Result<Self, serde_json::Error> {
        let mut map = FxHashMap::default();
        for line in reader.lines() {
            let line = line.map_err(serde_json::Error::io)?;
            if line.trim().is_empty() {
                continue;
            }
            let row: MappingRow = serde_json::from_str(&line)?;
            map.insert(row.code, format!("{}_{}", row.label, row.script));
        }
        Ok(Self { map })
    }

    /// Resolve a classifier tag to its partition key.
    pub fn resolve(&self, code: &str) -> Option<&str> {
        self.map.get(code).map(String::as_str)
    }

    /// All partition keys the table can produce (for pre-creating shard
    /// directories).
    pub fn partition_keys(&self) -> impl Iterator<Item = &str> {
        self.map.values().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}
