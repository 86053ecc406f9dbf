use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Body of the site-topology response.
#[derive(Debug, Clone, Deserialize)]
pub struct SiteTopology {
    #[serde(default)]
    pub sites: Vec<RawSite>,
}

/// A site as returned by the DNA Center site topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSite {
    /// The unique identifier for this site.
    pub id: String,

    /// Display name, may contain accented or special characters.
    pub name: String,

    /// Id of the parent site. Top-level sites reference a parent that is not
    /// part of the list, or none at all.
    #[serde(default)]
    pub parent_id: Option<String>,

    #[serde(default)]
    pub location_type: Option<LocationType>,

    /// Additional attributes for this site.
    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Kind of location a site represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    Area,
    Building,
    Floor,
    #[serde(other)]
    Other,
}

/// A site whose name has been turned into an inventory group name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSite {
    pub name: String,
    pub id: String,
    pub parent_id: Option<String>,
}

impl fmt::Display for NormalizedSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
