//! Cube metadata.

use serde::{Deserialize, Serialize};

use super::dimension::Dimension;
use super::measure::Measure;

/// OLAP server family a cube lives on.
///
/// The vendor tag picks the result-parser semantics and a handful of
/// MDX quirks; everything else is shared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CubeType {
    /// Generic SQL-OLAP servers (SSAS and compatible).
    #[default]
    SqlServer,
    /// Open-source multidimensional engines (Mondrian and compatible).
    Mondrian,
    /// Enterprise performance management servers (Essbase and compatible).
    Essbase,
    /// SAP-style providers.
    Sap,
}

impl CubeType {
    /// Classify a provider name reported by DISCOVER_DATASOURCES /
    /// MDSCHEMA_CUBES into a cube type.
    pub fn from_provider(provider: &str) -> Self {
        let p = provider.to_lowercase();
        if p.contains("mondrian") {
            CubeType::Mondrian
        } else if p.contains("essbase") || p.contains("hyperion") {
            CubeType::Essbase
        } else if p.contains("sap") || p.contains("bw") {
            CubeType::Sap
        } else {
            CubeType::SqlServer
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CubeType::SqlServer => "sqlserver",
            CubeType::Mondrian => "mondrian",
            CubeType::Essbase => "essbase",
            CubeType::Sap => "sap",
        }
    }
}

/// A multidimensional dataset: ordered dimensions plus measures.
///
/// Identity is by name. Callers address cubes by exact name, by caption,
/// or by a composed alias (`[name]`, `catalog.name`), so lookup accepts
/// all of them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cube {
    pub name: String,
    pub caption: String,
    /// Catalog the cube was discovered in.
    pub catalog: String,
    pub cube_type: CubeType,
    pub dimensions: Vec<Dimension>,
    pub measures: Vec<Measure>,
}

impl Cube {
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            caption: name.clone(),
            name,
            ..Default::default()
        }
    }

    /// Whether `alias` addresses this cube.
    ///
    /// Accepted spellings: the exact name, the caption, the bracketed
    /// name `[name]`, and the catalog-qualified `catalog.name`.
    pub fn matches_alias(&self, alias: &str) -> bool {
        if alias == self.name || alias == self.caption {
            return true;
        }
        if alias == format!("[{}]", self.name) {
            return true;
        }
        !self.catalog.is_empty() && alias == format!("{}.{}", self.catalog, self.name)
    }

    /// Find a dimension by its identifier (hierarchy unique name when
    /// hierarchy-scoped, dimension unique name otherwise), unique name,
    /// plain name, or caption.
    pub fn dimension(&self, name: &str) -> Option<&Dimension> {
        self.dimensions.iter().find(|d| {
            d.identifier() == name
                || d.unique_name == name
                || d.name == name
                || d.caption == name
        })
    }

    /// Find a measure by unique name, plain name, or caption.
    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measures
            .iter()
            .find(|m| m.unique_name == name || m.name == name || m.caption == name)
    }
}
