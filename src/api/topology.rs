use log::info;

use super::ApiEndpoint;
use crate::models::site::{NormalizedSite, RawSite, SiteTopology};
use crate::models::topology::{PhysicalTopology, TopologyNode};
use crate::normalize::normalize_site;
use crate::{DnacClient, DnacError, DnacResult};

const SITE_TOPOLOGY_ENDPOINT: &str = "/dna/intent/api/v1/topology/site-topology";
const PHYSICAL_TOPOLOGY_ENDPOINT: &str = "/dna/intent/api/v1/topology/physical-topology";

/// Provides access to the site and physical topologies.
pub struct TopologyApi<'a> {
    client: &'a DnacClient,
}

impl<'a> ApiEndpoint for TopologyApi<'a> {
    fn client(&self) -> &DnacClient {
        self.client
    }
}

impl<'a> TopologyApi<'a> {
    pub(crate) fn new(client: &'a DnacClient) -> Self {
        Self { client }
    }

    /// Retrieves the flat site list exactly as the controller reports it.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::FetchError` if the request fails.
    pub async fn raw_sites(&self) -> DnacResult<Vec<RawSite>> {
        let topology: SiteTopology = self
            .client()
            .get(SITE_TOPOLOGY_ENDPOINT, &[])
            .await
            .map_err(|e| DnacError::fetch("Getting site topology", e))?;
        Ok(topology.sites)
    }

    /// Retrieves all sites with their names normalized into group names.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::FetchError` if the request fails.
    pub async fn sites(&self) -> DnacResult<Vec<NormalizedSite>> {
        let sites: Vec<NormalizedSite> = self.raw_sites().await?.iter().map(normalize_site).collect();
        info!("Fetched {} sites", sites.len());
        Ok(sites)
    }

    /// Retrieves the physical topology nodes used to place devices in sites.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::FetchError` if the request fails.
    pub async fn nodes(&self) -> DnacResult<Vec<TopologyNode>> {
        let topology: PhysicalTopology = self
            .client()
            .get(PHYSICAL_TOPOLOGY_ENDPOINT, &[])
            .await
            .map_err(|e| DnacError::fetch("Getting physical topology", e))?;
        info!("Fetched {} topology nodes", topology.nodes.len());
        Ok(topology.nodes)
    }
}
