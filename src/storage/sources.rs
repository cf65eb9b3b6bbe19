//! Source catalog
//!
//! Document-level metadata, supplied externally as a JSON array and
//! read-only from the engine's perspective. Citations resolve through
//! this catalog.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{DocragError, Result};

/// One source document's metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub url: String,
}

/// Read-only id-keyed source registry, loaded once at startup.
#[derive(Debug, Clone, Default)]
pub struct SourceCatalog {
    sources: HashMap<String, Source>,
}

impl SourceCatalog {
    /// Load the catalog from a JSON array of sources.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(DocragError::MissingArtifact(format!(
                "source catalog not found at {}",
                path.display()
            )));
        }
        let raw = std::fs::read_to_string(path)?;
        let list: Vec<Source> = serde_json::from_str(&raw)?;
        Ok(Self::from_sources(list))
    }

    pub fn from_sources(list: Vec<Source>) -> Self {
        let sources = list.into_iter().map(|s| (s.id.clone(), s)).collect();
        Self { sources }
    }

    pub fn get(&self, id: &str) -> Option<&Source> {
        self.sources.get(id)
    }

    /// Citation URL for a source, or empty string if unknown.
    pub fn url_for(&self, id: &str) -> String {
        self.get(id).map(|s| s.url.clone()).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
