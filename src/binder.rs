//! Places every normalized host into its site group and attaches its
//! variables.

use std::collections::HashMap;

use log::{debug, info};
use serde_json::{json, Value};

use crate::hierarchy::SiteIndex;
use crate::inventory::{ConstructedRules, InventoryModel, UNGROUPED_GROUP};
use crate::models::device::NormalizedHost;
use crate::models::site::NormalizedSite;
use crate::models::topology::TopologyNode;
use crate::{DnacError, DnacResult};

/// Network operating system families that get connection hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NetworkOs {
    Ios,
    Nxos,
}

impl NetworkOs {
    /// Maps a device `os` value, case-insensitively, to its family.
    pub fn detect(os: &str) -> Option<Self> {
        match os.to_lowercase().as_str() {
            "ios" | "ios-xe" | "unified ap" => Some(NetworkOs::Ios),
            "nxos" | "nx-os" => Some(NetworkOs::Nxos),
            _ => None,
        }
    }

    /// The `ansible_network_os` value.
    pub fn network_os(self) -> &'static str {
        match self {
            NetworkOs::Ios => "ios",
            NetworkOs::Nxos => "nxos",
        }
    }

    /// Connection variables for hosts of this family.
    pub fn hints(self) -> [(&'static str, &'static str); 4] {
        [
            ("ansible_network_os", self.network_os()),
            ("ansible_connection", "network_cli"),
            ("ansible_become", "yes"),
            ("ansible_become_method", "enable"),
        ]
    }
}

/// Why a host could not be tied to a site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unresolved {
    NoTopologyNode,
    NoSiteId,
    UnknownSite(String),
}

/// Outcome of looking up a host's owning site.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SiteResolution<'a> {
    Site(&'a NormalizedSite),
    Unresolved(Unresolved),
}

impl<'a> SiteResolution<'a> {
    /// Group the host belongs in. Unresolved hosts land in `ungrouped` when
    /// `fallback` is set and nowhere otherwise.
    pub fn group_name(&self, fallback: bool) -> Option<&'a str> {
        match *self {
            SiteResolution::Site(site) => Some(site.name.as_str()),
            SiteResolution::Unresolved(_) if fallback => Some(UNGROUPED_GROUP),
            SiteResolution::Unresolved(_) => None,
        }
    }
}

/// Device id -> site id lookup over the physical topology.
#[derive(Debug)]
pub struct TopologyIndex<'a> {
    site_by_device: HashMap<&'a str, Option<&'a str>>,
}

impl<'a> TopologyIndex<'a> {
    /// Indexes `nodes`; the first node for a device id wins.
    pub fn new(nodes: &'a [TopologyNode]) -> Self {
        let mut site_by_device = HashMap::with_capacity(nodes.len());
        for node in nodes {
            site_by_device.entry(node.id.as_str()).or_insert_with(|| node.site_id());
        }
        Self { site_by_device }
    }

    /// Resolves the site owning device `host_id`.
    pub fn resolve(&self, host_id: &str, sites: &SiteIndex<'a>) -> SiteResolution<'a> {
        let Some(site_id) = self.site_by_device.get(host_id) else {
            return SiteResolution::Unresolved(Unresolved::NoTopologyNode);
        };
        let Some(site_id) = site_id else {
            return SiteResolution::Unresolved(Unresolved::NoSiteId);
        };
        match sites.get(site_id) {
            Some(site) => SiteResolution::Site(site),
            None => SiteResolution::Unresolved(Unresolved::UnknownSite(site_id.to_string())),
        }
    }
}

/// Settings that shape how hosts are bound.
#[derive(Debug, Clone)]
pub struct BindOptions {
    /// Set `ansible_host` to the management IP address.
    pub use_mgmt_interface_as_ansible_host: bool,
    /// Put hosts without a resolvable site into `ungrouped` instead of failing.
    pub ungrouped_fallback: bool,
    pub rules: ConstructedRules,
}

impl Default for BindOptions {
    fn default() -> Self {
        Self {
            use_mgmt_interface_as_ansible_host: true,
            ungrouped_fallback: true,
            rules: ConstructedRules::default(),
        }
    }
}

/// Summary of a bind pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BindReport {
    pub bound: usize,
    /// Ids of hosts that fell back to `ungrouped`.
    pub ungrouped: Vec<String>,
}

/// Registers every host under its site group and sets its variables.
///
/// Base variables and OS hints are set before the constructed rules run so
/// the rules can reference them.
///
/// # Errors
///
/// Returns `DnacError::BindError` naming the host if no group resolves or
/// the host cannot be registered, and `DnacError::InventoryError` if a
/// strict constructed rule fails.
pub fn bind<I: InventoryModel>(
    hosts: &[NormalizedHost],
    nodes: &[TopologyNode],
    sites: &[NormalizedSite],
    inventory: &mut I,
    options: &BindOptions,
) -> DnacResult<BindReport> {
    let topology = TopologyIndex::new(nodes);
    let site_index = SiteIndex::new(sites);
    let mut report = BindReport::default();

    for host in hosts {
        let resolution = topology.resolve(&host.id, &site_index);
        let site_name = resolution.group_name(options.ungrouped_fallback).ok_or_else(|| {
            DnacError::BindError {
                host_id: host.id.clone(),
                message: format!("no site group resolved ({resolution:?})"),
            }
        })?;

        if let SiteResolution::Unresolved(reason) = &resolution {
            debug!("Host {} ({}) has no site ({reason:?}), using {site_name}", host.hostname, host.id);
            report.ungrouped.push(host.id.clone());
        }

        let host_name = inventory
            .add_host(&host.hostname, Some(site_name))
            .map_err(|e| DnacError::BindError {
                host_id: host.id.clone(),
                message: format!("registering host {:?} in {site_name} failed: {e}", host.hostname),
            })?;

        for (key, value) in host_variables(host, site_name, options.use_mgmt_interface_as_ansible_host) {
            inventory.set_variable(&host_name, key, value)?;
        }

        if let Some(family) = NetworkOs::detect(&host.os) {
            for (key, value) in family.hints() {
                inventory.set_variable(&host_name, key, json!(value))?;
            }
        }

        options.rules.apply(inventory, &host_name)?;
        report.bound += 1;
    }

    info!("Bound {} hosts, {} without a site", report.bound, report.ungrouped.len());
    Ok(report)
}

/// Base variables of a host, in assignment order.
fn host_variables(
    host: &NormalizedHost,
    site_name: &str,
    use_mgmt_interface: bool,
) -> Vec<(&'static str, Value)> {
    let mut vars = Vec::with_capacity(9);
    if use_mgmt_interface {
        vars.push(("ansible_host", json!(host.management_ip_address)));
    }
    vars.extend([
        ("os", json!(host.os)),
        ("version", json!(host.version)),
        ("reachability_status", json!(host.reachability_status)),
        ("serial_number", json!(host.serial_numbers)),
        ("hw_type", json!(host.series)),
        // DNA Center APIs address managed elements by this id
        ("id", json!(host.id)),
        ("site", json!(site_name)),
        ("host_data", host.host_data.clone()),
    ]);
    vars
}

#[cfg(test)]
mod tests {
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::inventory::Inventory;

    fn host(id: &str, hostname: &str, os: &str) -> NormalizedHost {
        NormalizedHost {
            id: id.into(),
            hostname: hostname.into(),
            management_ip_address: format!("10.0.0.{}", id.len()),
            os: os.into(),
            version: "17.9.4".into(),
            reachability_status: "Reachable".into(),
            role: "ACCESS".into(),
            serial_numbers: vec!["FOC1".into()],
            series: "Cisco Catalyst 9300 Series Switches".into(),
            host_data: json!({"id": id, "hostname": hostname}),
        }
    }

    fn node(id: &str, site_id: Option<&str>) -> TopologyNode {
        serde_json::from_value(json!({
            "id": id,
            "additionalInfo": site_id.map(|s| json!({"siteid": s})).unwrap_or(json!({}))
        }))
        .unwrap()
    }

    fn sites() -> Vec<NormalizedSite> {
        vec![NormalizedSite {
            name: "bld_hq".into(),
            id: "site-1".into(),
            parent_id: None,
        }]
    }

    fn options() -> BindOptions {
        BindOptions {
            use_mgmt_interface_as_ansible_host: true,
            ungrouped_fallback: true,
            rules: ConstructedRules::default(),
        }
    }

    fn prepared_inventory() -> Inventory {
        let mut inventory = Inventory::new();
        inventory.add_group("bld_hq").unwrap();
        inventory
    }

    #[test]
    fn default_options_keep_unplaced_hosts() {
        let defaults = BindOptions::default();
        assert!(defaults.use_mgmt_interface_as_ansible_host);
        assert!(defaults.ungrouped_fallback);
        assert!(defaults.rules.is_empty());

        let mut inventory = prepared_inventory();
        let hosts = vec![host("dev-1", "sw1", "IOS")];
        let report = bind(&hosts, &[], &sites(), &mut inventory, &defaults).unwrap();

        assert_eq!(report.ungrouped, vec!["dev-1"]);
        assert_eq!(inventory.get_host("sw1").unwrap().vars["ansible_host"], json!("10.0.0.5"));
    }

    #[test]
    fn detects_os_families_case_insensitively() {
        assert_eq!(NetworkOs::detect("IOS-XE"), Some(NetworkOs::Ios));
        assert_eq!(NetworkOs::detect("ios-xe"), Some(NetworkOs::Ios));
        assert_eq!(NetworkOs::detect("IOS"), Some(NetworkOs::Ios));
        assert_eq!(NetworkOs::detect("Unified AP"), Some(NetworkOs::Ios));
        assert_eq!(NetworkOs::detect("NX-OS"), Some(NetworkOs::Nxos));
        assert_eq!(NetworkOs::detect("nxos"), Some(NetworkOs::Nxos));
        assert_eq!(NetworkOs::detect("Linux"), None);
        assert_eq!(NetworkOs::detect(""), None);
    }

    #[test]
    fn binds_host_under_its_site_with_all_variables() {
        let mut inventory = prepared_inventory();
        let hosts = vec![host("dev-1", "sw1", "IOS-XE")];
        let nodes = vec![node("dev-1", Some("site-1"))];

        let report = bind(&hosts, &nodes, &sites(), &mut inventory, &options()).unwrap();
        assert_eq!(report, BindReport { bound: 1, ungrouped: vec![] });

        assert!(inventory.group("bld_hq").unwrap().hosts.contains("sw1"));
        let vars = &inventory.get_host("sw1").unwrap().vars;
        assert_eq!(vars["ansible_host"], json!("10.0.0.5"));
        assert_eq!(vars["os"], json!("IOS-XE"));
        assert_eq!(vars["version"], json!("17.9.4"));
        assert_eq!(vars["reachability_status"], json!("Reachable"));
        assert_eq!(vars["serial_number"], json!(["FOC1"]));
        assert_eq!(vars["hw_type"], json!("Cisco Catalyst 9300 Series Switches"));
        assert_eq!(vars["id"], json!("dev-1"));
        assert_eq!(vars["site"], json!("bld_hq"));
        assert_eq!(vars["host_data"]["hostname"], json!("sw1"));
        assert_eq!(vars["ansible_network_os"], json!("ios"));
        assert_eq!(vars["ansible_connection"], json!("network_cli"));
        assert_eq!(vars["ansible_become"], json!("yes"));
        assert_eq!(vars["ansible_become_method"], json!("enable"));
    }

    #[test]
    fn nxos_and_other_os_hints() {
        let mut inventory = prepared_inventory();
        let hosts = vec![host("n1", "nexus1", "NX-OS"), host("l1", "linux1", "Linux")];
        let nodes = vec![node("n1", Some("site-1")), node("l1", Some("site-1"))];

        bind(&hosts, &nodes, &sites(), &mut inventory, &options()).unwrap();

        let nexus = &inventory.get_host("nexus1").unwrap().vars;
        assert_eq!(nexus["ansible_network_os"], json!("nxos"));
        let linux = &inventory.get_host("linux1").unwrap().vars;
        assert!(!linux.contains_key("ansible_network_os"));
        assert!(!linux.contains_key("ansible_connection"));
    }

    #[test]
    fn hosts_without_site_fall_back_to_ungrouped() {
        let mut inventory = prepared_inventory();
        let hosts = vec![
            host("no-node", "sw1", "IOS"),
            host("no-siteid", "sw2", "IOS"),
            host("bad-site", "sw3", "IOS"),
        ];
        let nodes = vec![node("no-siteid", None), node("bad-site", Some("site-404"))];

        let report = bind(&hosts, &nodes, &sites(), &mut inventory, &options()).unwrap();

        assert_eq!(report.ungrouped, vec!["no-node", "no-siteid", "bad-site"]);
        let ungrouped = &inventory.group(UNGROUPED_GROUP).unwrap().hosts;
        assert!(ungrouped.contains("sw1") && ungrouped.contains("sw2") && ungrouped.contains("sw3"));
        let vars = &inventory.get_host("sw1").unwrap().vars;
        assert_eq!(vars["site"], json!("ungrouped"));
        assert_eq!(vars["os"], json!("IOS"));
        assert_eq!(vars["ansible_network_os"], json!("ios"));
    }

    #[test]
    fn without_fallback_unresolved_hosts_fail() {
        let mut inventory = prepared_inventory();
        let hosts = vec![host("orphan-1", "sw1", "IOS")];
        let options = BindOptions {
            ungrouped_fallback: false,
            ..options()
        };

        match bind(&hosts, &[], &sites(), &mut inventory, &options) {
            Err(DnacError::BindError { host_id, .. }) => assert_eq!(host_id, "orphan-1"),
            other => panic!("Expected BindError, got {other:?}"),
        }
    }

    #[test]
    fn failures_name_their_cause() {
        let mut inventory = prepared_inventory();
        let nameless = vec![host("dev-9", "", "IOS")];
        let nodes = vec![node("dev-9", Some("site-1"))];

        match bind(&nameless, &nodes, &sites(), &mut inventory, &options()) {
            Err(err @ DnacError::BindError { .. }) => {
                let msg = err.to_string();
                assert!(msg.contains("dev-9"), "{msg}");
                assert!(msg.contains("registering host \"\" in bld_hq failed"), "{msg}");
                assert!(!msg.contains("no site group resolved"), "{msg}");
            }
            other => panic!("Expected BindError, got {other:?}"),
        }

        let strict = BindOptions {
            ungrouped_fallback: false,
            ..options()
        };
        let orphan = vec![host("dev-8", "sw8", "IOS")];
        let err = bind(&orphan, &[], &sites(), &mut inventory, &strict).unwrap_err();
        assert!(err.to_string().contains("no site group resolved"), "{err}");
    }

    #[test]
    fn management_address_is_optional() {
        let mut inventory = prepared_inventory();
        let hosts = vec![host("dev-1", "sw1", "IOS")];
        let options = BindOptions {
            use_mgmt_interface_as_ansible_host: false,
            ..options()
        };

        bind(&hosts, &[], &sites(), &mut inventory, &options).unwrap();
        assert!(!inventory.get_host("sw1").unwrap().vars.contains_key("ansible_host"));
    }

    #[test]
    fn rules_see_base_variables() {
        let mut inventory = prepared_inventory();
        let hosts = vec![host("dev-1", "sw1", "IOS-XE")];
        let nodes = vec![node("dev-1", Some("site-1"))];
        let options = BindOptions {
            rules: ConstructedRules {
                compose: IndexMap::from([("ansible_user".to_string(), "'netops'".to_string())]),
                groups: IndexMap::from([("ios_devices".to_string(), "ansible_network_os == 'ios'".to_string())]),
                strict: true,
                ..ConstructedRules::default()
            },
            ..options()
        };

        bind(&hosts, &nodes, &sites(), &mut inventory, &options).unwrap();

        assert_eq!(inventory.get_host("sw1").unwrap().vars["ansible_user"], json!("netops"));
        assert!(inventory.group("ios_devices").unwrap().hosts.contains("sw1"));
        assert!(inventory.group("bld_hq").unwrap().hosts.contains("sw1"));
    }

    #[test]
    fn rebinding_is_idempotent() {
        let hosts = vec![host("dev-1", "sw1", "IOS-XE")];
        let nodes = vec![node("dev-1", Some("site-1"))];

        let mut once = prepared_inventory();
        bind(&hosts, &nodes, &sites(), &mut once, &options()).unwrap();
        let mut twice = once.clone();
        bind(&hosts, &nodes, &sites(), &mut twice, &options()).unwrap();

        assert_eq!(once, twice);
    }
}
