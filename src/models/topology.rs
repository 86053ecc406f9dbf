use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Body of the physical-topology response.
#[derive(Debug, Clone, Deserialize)]
pub struct PhysicalTopology {
    #[serde(default)]
    pub nodes: Vec<TopologyNode>,
}

/// A physical-topology node, keyed by the id of the device it represents.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopologyNode {
    pub id: String,

    #[serde(default)]
    pub label: Option<String>,

    #[serde(default)]
    pub additional_info: Option<NodeAdditionalInfo>,
}

/// Nested details of a topology node.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NodeAdditionalInfo {
    /// Id of the site the device is assigned to.
    #[serde(default)]
    pub siteid: Option<String>,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

impl TopologyNode {
    /// Site id the node is assigned to, if the controller reported one.
    pub fn site_id(&self) -> Option<&str> {
        self.additional_info
            .as_ref()
            .and_then(|info| info.siteid.as_deref())
            .filter(|id| !id.is_empty())
    }
}
