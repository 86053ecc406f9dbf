//! Rebuilds the site tree from parent references and registers it as groups.

use std::collections::HashMap;

use log::{debug, info};

use crate::inventory::InventoryModel;
use crate::models::site::NormalizedSite;
use crate::{DnacError, DnacResult};

/// Where a site hangs in the group tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SiteParent<'a> {
    /// Below the site with this group name.
    Site(&'a str),
    /// Below the configured top-level group.
    TopLevel(&'a str),
    /// No explicit parent edge.
    Root,
}

impl<'a> SiteParent<'a> {
    pub fn group_name(&self) -> Option<&'a str> {
        match *self {
            SiteParent::Site(name) | SiteParent::TopLevel(name) => Some(name),
            SiteParent::Root => None,
        }
    }
}

/// Index of sites by id, built once per run.
#[derive(Debug)]
pub struct SiteIndex<'a> {
    by_id: HashMap<&'a str, &'a NormalizedSite>,
}

impl<'a> SiteIndex<'a> {
    /// Indexes `sites`; on duplicate ids the later site wins.
    pub fn new(sites: &'a [NormalizedSite]) -> Self {
        Self {
            by_id: sites.iter().map(|site| (site.id.as_str(), site)).collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<&'a NormalizedSite> {
        self.by_id.get(id).copied()
    }

    /// Resolves the parent of `site`.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::HierarchyError` for a site that names itself as its
    /// parent.
    pub fn parent_of(
        &self,
        site: &'a NormalizedSite,
        top_level: Option<&'a str>,
    ) -> DnacResult<SiteParent<'a>> {
        let parent = site.parent_id.as_deref().and_then(|id| self.get(id));

        match parent {
            Some(parent) if parent.id == site.id => Err(DnacError::HierarchyError(format!(
                "site {} ({}) is its own parent",
                site.name, site.id
            ))),
            Some(parent) => Ok(SiteParent::Site(&parent.name)),
            None => Ok(top_level.map_or(SiteParent::Root, SiteParent::TopLevel)),
        }
    }
}

/// Registers the top-level group, every site group, and every parent/child
/// edge with `inventory`.
///
/// Any rejected registration aborts the run. Groups registered before the
/// failure stay in the inventory.
///
/// # Errors
///
/// Returns `DnacError::HierarchyError` if a site is its own parent or the
/// inventory rejects a group or an edge.
pub fn materialize<I: InventoryModel>(
    sites: &[NormalizedSite],
    top_level: Option<&str>,
    inventory: &mut I,
) -> DnacResult<()> {
    if let Some(top_level) = top_level {
        inventory
            .add_group(top_level)
            .map_err(|e| DnacError::HierarchyError(format!("adding top-level group {top_level} failed: {e}")))?;
    }

    for site in sites {
        inventory
            .add_group(&site.name)
            .map_err(|e| DnacError::HierarchyError(format!("adding site {site} failed: {e}")))?;
    }

    let index = SiteIndex::new(sites);
    let mut edges = 0;
    for site in sites {
        let parent = index.parent_of(site, top_level)?;
        let Some(parent_name) = parent.group_name() else {
            debug!("Site {site} stays a root group");
            continue;
        };
        if let SiteParent::TopLevel(_) = parent {
            debug!("Site {site} has no known parent, attaching to {parent_name}");
        }

        inventory.add_child(parent_name, &site.name).map_err(|e| {
            DnacError::HierarchyError(format!(
                "adding child sites failed: {e} ({}:{parent_name})",
                site.name
            ))
        })?;
        edges += 1;
    }

    info!("Registered {} site groups with {edges} parent edges", sites.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::inventory::Inventory;

    fn site(name: &str, id: &str, parent_id: Option<&str>) -> NormalizedSite {
        NormalizedSite {
            name: name.into(),
            id: id.into(),
            parent_id: parent_id.map(str::to_string),
        }
    }

    fn children(inventory: &Inventory, group: &str) -> Vec<String> {
        inventory.group(group).unwrap().children.iter().cloned().collect()
    }

    #[test]
    fn unmatched_parents_attach_to_top_level() {
        let sites = vec![
            site("global", "1", Some("0")),
            site("emea", "2", Some("1")),
            site("orphan", "3", Some("99")),
        ];
        let mut inventory = Inventory::new();

        materialize(&sites, Some("root"), &mut inventory).unwrap();

        assert_eq!(children(&inventory, "global"), vec!["emea"]);
        assert_eq!(children(&inventory, "root"), vec!["global", "orphan"]);
        assert!(inventory.group("emea").unwrap().parents.contains("global"));
    }

    #[test]
    fn without_top_level_unmatched_sites_stay_roots() {
        let sites = vec![site("global", "1", None), site("emea", "2", Some("1"))];
        let mut inventory = Inventory::new();

        materialize(&sites, None, &mut inventory).unwrap();

        assert!(inventory.group("global").unwrap().parents.is_empty());
        assert_eq!(children(&inventory, "global"), vec!["emea"]);
    }

    #[test]
    fn materializing_twice_is_idempotent() {
        let sites = vec![site("global", "1", None), site("emea", "2", Some("1"))];
        let mut once = Inventory::new();
        materialize(&sites, Some("dnac"), &mut once).unwrap();
        let mut twice = once.clone();
        materialize(&sites, Some("dnac"), &mut twice).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn self_parent_is_rejected() {
        let sites = vec![site("loop", "7", Some("7"))];
        let mut inventory = Inventory::new();

        let err = materialize(&sites, None, &mut inventory).unwrap_err();
        match err {
            DnacError::HierarchyError(msg) => assert!(msg.contains("own parent"), "{msg}"),
            other => panic!("Expected HierarchyError, got {other:?}"),
        }
    }

    #[test]
    fn longer_cycles_are_rejected() {
        let sites = vec![site("a", "1", Some("2")), site("b", "2", Some("1"))];
        let mut inventory = Inventory::new();

        assert!(matches!(
            materialize(&sites, None, &mut inventory),
            Err(DnacError::HierarchyError(_))
        ));
    }

    #[test]
    fn invalid_group_names_are_rejected() {
        let sites = vec![site("", "1", None)];
        let mut inventory = Inventory::new();

        assert!(matches!(
            materialize(&sites, None, &mut inventory),
            Err(DnacError::HierarchyError(_))
        ));
    }
}
