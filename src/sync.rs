//! End-to-end synchronisation of a controller into an inventory.

use log::info;

use crate::api::device::DEFAULT_PAGE_SIZE;
use crate::binder::{bind, BindOptions};
use crate::config::{InventoryConfig, DEFAULT_DEVICE_FAMILIES};
use crate::hierarchy::materialize;
use crate::inventory::{Inventory, InventoryModel};
use crate::models::device::DeviceFilters;
use crate::normalize::normalize_devices;
use crate::{DnacClient, DnacResult};

/// Counts describing one completed synchronisation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Devices returned by the controller.
    pub devices: usize,
    /// Hosts registered with the inventory.
    pub hosts: usize,
    pub access_points_skipped: usize,
    pub sites: usize,
    /// Ids of hosts placed in `ungrouped` for lack of a site.
    pub ungrouped: Vec<String>,
}

/// What to collect and how to shape it, independent of where it came from.
///
/// The defaults match those of an inventory source file that sets nothing
/// but the connection.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub filters: DeviceFilters,
    pub page_size: u32,
    pub toplevel: Option<String>,
    pub bind: BindOptions,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            filters: DeviceFilters {
                device_family: DEFAULT_DEVICE_FAMILIES.iter().map(|f| f.to_string()).collect(),
                ..DeviceFilters::default()
            },
            page_size: DEFAULT_PAGE_SIZE,
            toplevel: None,
            bind: BindOptions::default(),
        }
    }
}

impl From<&InventoryConfig> for SyncOptions {
    fn from(config: &InventoryConfig) -> Self {
        Self {
            filters: config.filters.clone(),
            page_size: config.page_size,
            toplevel: config.toplevel.clone(),
            bind: config.bind_options(),
        }
    }
}

/// Populates `inventory` from the controller behind `client`.
///
/// Devices, sites and the physical topology are fetched first; nothing is
/// written to `inventory` unless all three succeed. The site tree is then
/// materialized and finally every host is bound into its site group.
///
/// # Errors
///
/// Returns `DnacError::FetchError` if any collection fails,
/// `DnacError::HierarchyError` if the site tree cannot be registered and
/// `DnacError::BindError` or `DnacError::InventoryError` if a host cannot be
/// placed.
pub async fn synchronise<I: InventoryModel>(
    client: &DnacClient,
    options: &SyncOptions,
    inventory: &mut I,
) -> DnacResult<SyncReport> {
    let devices = client.devices().collect(&options.filters, options.page_size).await?;
    let sites = client.topology().sites().await?;
    let nodes = client.topology().nodes().await?;

    let hosts = normalize_devices(&devices);
    info!("Normalized {} of {} devices", hosts.len(), devices.len());

    materialize(&sites, options.toplevel.as_deref(), inventory)?;
    let bound = bind(&hosts, &nodes, &sites, inventory, &options.bind)?;

    Ok(SyncReport {
        devices: devices.len(),
        hosts: bound.bound,
        access_points_skipped: devices.len() - hosts.len(),
        sites: sites.len(),
        ungrouped: bound.ungrouped,
    })
}

/// Logs in with `config` and builds a fresh [`Inventory`].
///
/// # Errors
///
/// Returns `DnacError::AuthenticationError` if the login fails and any
/// error of [`synchronise`] otherwise.
pub async fn load_inventory(config: &InventoryConfig) -> DnacResult<(Inventory, SyncReport)> {
    let client = config.client_builder().build().await?;
    info!("Connected to {} (API {})", client.base_url(), client.api_version());

    let mut inventory = Inventory::new();
    let report = synchronise(&client, &SyncOptions::from(config), &mut inventory).await?;
    info!(
        "Synchronised {} hosts across {} sites ({} access points skipped, {} ungrouped)",
        report.hosts,
        report.sites,
        report.access_points_skipped,
        report.ungrouped.len()
    );
    Ok((inventory, report))
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn defaults_match_a_bare_source_file() {
        let yaml = "plugin: dna_center\nhost: h\ndnac_version: 2.3.5.3\nusername: u\npassword: p\n";
        let config = InventoryConfig::from_yaml(yaml, |_| None).unwrap();
        let from_file = SyncOptions::from(&config);
        let defaults = SyncOptions::default();

        assert_eq!(defaults.page_size, 500);
        assert_eq!(defaults.filters.device_family, vec!["Switches and Hubs", "Routers"]);
        assert_eq!(defaults.filters.hostname, None);
        assert_eq!(defaults.toplevel, None);
        assert!(defaults.bind.use_mgmt_interface_as_ansible_host);
        assert!(defaults.bind.ungrouped_fallback);
        assert!(defaults.bind.rules.is_empty());

        assert_eq!(defaults.filters, from_file.filters);
        assert_eq!(defaults.page_size, from_file.page_size);
        assert_eq!(defaults.toplevel, from_file.toplevel);
        assert_eq!(
            defaults.bind.use_mgmt_interface_as_ansible_host,
            from_file.bind.use_mgmt_interface_as_ansible_host
        );
        assert_eq!(defaults.bind.ungrouped_fallback, from_file.bind.ungrouped_fallback);
    }
}
