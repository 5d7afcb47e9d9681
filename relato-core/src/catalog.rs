//! Static location catalog
//!
//! Reports are located against a fixed Region → Neighborhood → Street tree
//! maintained by the municipality. The catalog is loaded once from a TOML
//! file and never mutated; lookups cascade, each level keyed by the exact
//! name selected at the level above. Front ends use it to drive pickers
//! and to check that a chosen combination actually exists before
//! submitting. The core pipeline itself only ever stores the resolved leaf
//! strings.
//!
//! ```toml
//! [[regions]]
//! name = "Zona Norte"
//!
//! [[regions.neighborhoods]]
//! name = "Centro"
//! streets = ["Av. Principal", "Rua das Flores"]
//! ```

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::PathBuf;

/// One region and its neighborhoods
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Region {
    /// Region name, the key selected at the first picker level
    pub name: String,
    /// Neighborhoods within this region
    #[serde(default)]
    pub neighborhoods: Vec<Neighborhood>,
}

/// One neighborhood and its streets
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Neighborhood {
    /// Neighborhood name, keyed by the selected region
    pub name: String,
    /// Streets within this neighborhood
    #[serde(default)]
    pub streets: Vec<String>,
}

/// Read-only Region → Neighborhood → Street tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct LocationCatalog {
    #[serde(default)]
    regions: Vec<Region>,
}

impl LocationCatalog {
    /// Load the catalog from a TOML file
    pub fn load(path: &PathBuf) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read catalog file {:?}: {}", path, e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse a catalog from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::Config(format!("failed to parse catalog: {}", e)))
    }

    /// All regions, in catalog order
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Look up a region by name
    pub fn region(&self, name: &str) -> Option<&Region> {
        self.regions.iter().find(|region| region.name == name)
    }

    /// Neighborhoods of the named region; `None` for an unknown region
    pub fn neighborhoods(&self, region: &str) -> Option<&[Neighborhood]> {
        self.region(region)
            .map(|region| region.neighborhoods.as_slice())
    }

    /// Streets of the named neighborhood within the named region
    pub fn streets(&self, region: &str, neighborhood: &str) -> Option<&[String]> {
        self.neighborhoods(region)?
            .iter()
            .find(|n| n.name == neighborhood)
            .map(|n| n.streets.as_slice())
    }

    /// True when the full region/neighborhood/street path exists
    pub fn contains(&self, region: &str, neighborhood: &str, street: &str) -> bool {
        self.streets(region, neighborhood)
            .is_some_and(|streets| streets.iter().any(|s| s == street))
    }
}
