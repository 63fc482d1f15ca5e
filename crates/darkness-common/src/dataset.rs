//! Dataset keys and their mapping to configured sources.

use serde::{Deserialize, Serialize};

/// Dataset loaded at startup and served by `/darkness`.
pub const DEFAULT_DATASET_KEY: &str = "2023/average";

/// Logical dataset a key routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatasetKind {
    /// Average radiance composite.
    Average,
    /// Cloud-free observation mask.
    Mask,
}

impl DatasetKind {
    /// Route a dataset key such as `"2023/average"` to its logical dataset.
    ///
    /// Matching is by substring; `"average"` wins when both words appear.
    /// Returns `None` for keys that name neither dataset.
    pub fn route(key: &str) -> Option<Self> {
        if key.contains("average") {
            Some(DatasetKind::Average)
        } else if key.contains("mask") {
            Some(DatasetKind::Mask)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            DatasetKind::Average => "average",
            DatasetKind::Mask => "mask",
        }
    }
}

impl std::fmt::Display for DatasetKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Locator strings for each logical dataset.
///
/// A locator is `classpath:<path>` (bundled resource), `file://<path>` (local
/// file) or a remote URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatasetSources {
    pub average: String,
    pub mask: String,
}

impl DatasetSources {
    pub fn new(average: impl Into<String>, mask: impl Into<String>) -> Self {
        Self {
            average: average.into(),
            mask: mask.into(),
        }
    }

    /// Locator configured for a logical dataset.
    pub fn locator(&self, kind: DatasetKind) -> &str {
        match kind {
            DatasetKind::Average => &self.average,
            DatasetKind::Mask => &self.mask,
        }
    }

    /// Resolve a dataset key straight to its locator.
    pub fn locator_for_key(&self, key: &str) -> Option<&str> {
        DatasetKind::route(key).map(|kind| self.locator(kind))
    }
}

impl Default for DatasetSources {
    fn default() -> Self {
        Self {
            average: "classpath:/viirs/2023/average.tif".to_string(),
            mask: "classpath:/viirs/2023/mask.tif".to_string(),
        }
    }
}
