//! In-memory Ansible-style inventory: groups, hosts and their variables.
//!
//! The pipeline writes through the [`InventoryModel`] trait so a different
//! target can be plugged in. [`Inventory`] is the bundled implementation and
//! can render itself the way `ansible-inventory --list` / `--graph` do.

pub mod constructed;

use indexmap::{IndexMap, IndexSet};
use serde_json::{json, Map, Value};
use thiserror::Error;

pub use constructed::{ConstructedRules, KeyedGroup};

/// Implicit group every group hangs under.
pub const ALL_GROUP: &str = "all";
/// Implicit group of hosts that belong to no other group.
pub const UNGROUPED_GROUP: &str = "ungrouped";

/// Errors raised by the inventory model.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InventoryError {
    #[error("Invalid group name: {0:?}")]
    InvalidGroupName(String),

    #[error("Could not find group {0}")]
    UnknownGroup(String),

    #[error("{0} is not a known host or group")]
    UnknownEntity(String),

    #[error("Could not find host {0}")]
    UnknownHost(String),

    #[error("Cannot add group {0} to itself")]
    SelfReference(String),

    #[error("Adding group {child} as child to {parent} creates a recursive dependency loop")]
    RecursiveLoop { parent: String, child: String },

    #[error("Undefined variable {0}")]
    UndefinedVariable(String),

    #[error("Invalid expression {expression:?}: {message}")]
    InvalidExpression { expression: String, message: String },
}

/// The registration surface the synchronisation writes to.
///
/// Every operation is idempotent: repeating a call with identical arguments
/// leaves the inventory unchanged.
pub trait InventoryModel {
    /// Registers a group; registering an existing name is a no-op.
    fn add_group(&mut self, name: &str) -> Result<String, InventoryError>;

    /// Places `child` (a group, or failing that a host) under group `parent`.
    fn add_child(&mut self, parent: &str, child: &str) -> Result<(), InventoryError>;

    /// Registers a host, optionally as a member of `group`.
    fn add_host(&mut self, hostname: &str, group: Option<&str>) -> Result<String, InventoryError>;

    /// Sets a variable on a host, or on a group if no such host exists.
    fn set_variable(&mut self, entity: &str, key: &str, value: Value) -> Result<(), InventoryError>;

    fn get_host(&self, name: &str) -> Option<&Host>;
}

/// A named container of hosts and child groups.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Group {
    pub name: String,
    pub children: IndexSet<String>,
    pub parents: IndexSet<String>,
    pub hosts: IndexSet<String>,
    pub vars: Map<String, Value>,
}

/// A managed host and its variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Host {
    pub name: String,
    pub groups: IndexSet<String>,
    pub vars: Map<String, Value>,
}

impl Host {
    pub fn get_vars(&self) -> &Map<String, Value> {
        &self.vars
    }
}

/// Insertion-ordered in-memory inventory.
#[derive(Debug, Clone, PartialEq)]
pub struct Inventory {
    groups: IndexMap<String, Group>,
    hosts: IndexMap<String, Host>,
}

impl Default for Inventory {
    fn default() -> Self {
        Self::new()
    }
}

/// Whether `name` can be used as a group name: ASCII letters, digits and
/// `_`, not starting with a digit.
pub fn is_valid_group_name(name: &str) -> bool {
    name.chars().next().is_some_and(|first| !first.is_ascii_digit())
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

impl Inventory {
    /// Creates an inventory holding only the implicit `all` and `ungrouped`
    /// groups.
    pub fn new() -> Self {
        let mut groups = IndexMap::new();
        for name in [ALL_GROUP, UNGROUPED_GROUP] {
            groups.insert(
                name.to_string(),
                Group {
                    name: name.to_string(),
                    ..Group::default()
                },
            );
        }
        Self {
            groups,
            hosts: IndexMap::new(),
        }
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.groups.values()
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.groups.get(name)
    }

    pub fn hosts(&self) -> impl Iterator<Item = &Host> {
        self.hosts.values()
    }

    /// Groups directly below `all`: every group without another parent.
    fn top_level_groups(&self) -> Vec<&str> {
        self.groups
            .values()
            .filter(|g| g.name != ALL_GROUP && g.parents.is_empty())
            .map(|g| g.name.as_str())
            .collect()
    }

    /// Whether `target` is `from` or one of its descendants.
    fn reaches(&self, from: &str, target: &str) -> bool {
        let mut stack = vec![from];
        let mut seen = IndexSet::new();
        while let Some(name) = stack.pop() {
            if name == target {
                return true;
            }
            if !seen.insert(name) {
                continue;
            }
            if let Some(group) = self.groups.get(name) {
                stack.extend(group.children.iter().map(String::as_str));
            }
        }
        false
    }

    fn add_host_to_group(&mut self, hostname: &str, group: &str) -> Result<(), InventoryError> {
        if !self.groups.contains_key(group) {
            return Err(InventoryError::UnknownGroup(group.to_string()));
        }
        let host = self
            .hosts
            .get_mut(hostname)
            .ok_or_else(|| InventoryError::UnknownHost(hostname.to_string()))?;

        if group == UNGROUPED_GROUP {
            if !host.groups.is_empty() {
                return Ok(());
            }
        } else if host.groups.shift_remove(UNGROUPED_GROUP) {
            if let Some(ungrouped) = self.groups.get_mut(UNGROUPED_GROUP) {
                ungrouped.hosts.shift_remove(hostname);
            }
        }

        host.groups.insert(group.to_string());
        if let Some(g) = self.groups.get_mut(group) {
            g.hosts.insert(hostname.to_string());
        }
        Ok(())
    }

    /// Variables of a host, as `ansible-inventory --host` prints them.
    pub fn host_vars(&self, name: &str) -> Option<&Map<String, Value>> {
        self.hosts.get(name).map(Host::get_vars)
    }

    /// Renders the inventory in the `ansible-inventory --list` JSON layout.
    pub fn to_list_json(&self) -> Value {
        let mut out = Map::new();

        let hostvars: Map<String, Value> = self
            .hosts
            .values()
            .map(|h| (h.name.clone(), Value::Object(h.vars.clone())))
            .collect();
        out.insert("_meta".into(), json!({ "hostvars": hostvars }));
        out.insert("all".into(), json!({ "children": self.top_level_groups() }));

        for group in self.groups.values().filter(|g| g.name != ALL_GROUP) {
            let mut entry = Map::new();
            if !group.children.is_empty() {
                entry.insert("children".into(), json!(group.children));
            }
            if !group.hosts.is_empty() {
                entry.insert("hosts".into(), json!(group.hosts));
            }
            if !group.vars.is_empty() {
                entry.insert("vars".into(), Value::Object(group.vars.clone()));
            }
            out.insert(group.name.clone(), Value::Object(entry));
        }

        Value::Object(out)
    }

    /// Renders the group tree in the `ansible-inventory --graph` layout,
    /// starting from `root` (defaults to `all`).
    pub fn graph(&self, root: Option<&str>) -> Result<String, InventoryError> {
        let root = root.unwrap_or(ALL_GROUP);
        if !self.groups.contains_key(root) {
            return Err(InventoryError::UnknownGroup(root.to_string()));
        }
        let mut lines = Vec::new();
        self.graph_group(root, 0, &mut lines);
        Ok(lines.join("\n"))
    }

    fn graph_group(&self, name: &str, depth: usize, lines: &mut Vec<String>) {
        lines.push(format!("{}@{name}:", graph_indent(depth)));

        let mut children: Vec<&str> = if name == ALL_GROUP {
            self.top_level_groups()
        } else {
            self.groups[name].children.iter().map(String::as_str).collect()
        };
        children.sort_unstable();
        for child in children {
            self.graph_group(child, depth + 1, lines);
        }

        let mut hosts: Vec<&String> = self.groups[name].hosts.iter().collect();
        hosts.sort_unstable();
        for host in hosts {
            lines.push(format!("{}{host}", graph_indent(depth + 1)));
        }
    }
}

fn graph_indent(depth: usize) -> String {
    if depth == 0 {
        String::new()
    } else {
        format!("{}--", "  |".repeat(depth))
    }
}

impl InventoryModel for Inventory {
    fn add_group(&mut self, name: &str) -> Result<String, InventoryError> {
        if !is_valid_group_name(name) {
            return Err(InventoryError::InvalidGroupName(name.to_string()));
        }
        self.groups.entry(name.to_string()).or_insert_with(|| Group {
            name: name.to_string(),
            ..Group::default()
        });
        Ok(name.to_string())
    }

    fn add_child(&mut self, parent: &str, child: &str) -> Result<(), InventoryError> {
        if !self.groups.contains_key(parent) {
            return Err(InventoryError::UnknownGroup(parent.to_string()));
        }

        if self.groups.contains_key(child) {
            if parent == child {
                return Err(InventoryError::SelfReference(child.to_string()));
            }
            if child == ALL_GROUP || self.reaches(child, parent) {
                return Err(InventoryError::RecursiveLoop {
                    parent: parent.to_string(),
                    child: child.to_string(),
                });
            }
            if parent == ALL_GROUP {
                return Ok(());
            }
            if let Some(p) = self.groups.get_mut(parent) {
                p.children.insert(child.to_string());
            }
            if let Some(c) = self.groups.get_mut(child) {
                c.parents.insert(parent.to_string());
            }
            Ok(())
        } else if self.hosts.contains_key(child) {
            self.add_host_to_group(child, parent)
        } else {
            Err(InventoryError::UnknownEntity(child.to_string()))
        }
    }

    fn add_host(&mut self, hostname: &str, group: Option<&str>) -> Result<String, InventoryError> {
        if hostname.is_empty() {
            return Err(InventoryError::UnknownHost(hostname.to_string()));
        }
        if let Some(group) = group {
            if !self.groups.contains_key(group) {
                return Err(InventoryError::UnknownGroup(group.to_string()));
            }
        }

        self.hosts.entry(hostname.to_string()).or_insert_with(|| Host {
            name: hostname.to_string(),
            ..Host::default()
        });
        self.add_host_to_group(hostname, group.unwrap_or(UNGROUPED_GROUP))?;
        Ok(hostname.to_string())
    }

    fn set_variable(&mut self, entity: &str, key: &str, value: Value) -> Result<(), InventoryError> {
        if let Some(host) = self.hosts.get_mut(entity) {
            host.vars.insert(key.to_string(), value);
            Ok(())
        } else if let Some(group) = self.groups.get_mut(entity) {
            group.vars.insert(key.to_string(), value);
            Ok(())
        } else {
            Err(InventoryError::UnknownEntity(entity.to_string()))
        }
    }

    fn get_host(&self, name: &str) -> Option<&Host> {
        self.hosts.get(name)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn starts_with_implicit_groups() {
        let inventory = Inventory::new();
        assert!(inventory.group(ALL_GROUP).is_some());
        assert!(inventory.group(UNGROUPED_GROUP).is_some());
        assert_eq!(inventory.hosts().count(), 0);
    }

    #[test]
    fn registration_is_idempotent() {
        let mut once = Inventory::new();
        once.add_group("site").unwrap();
        once.add_group("bld_a").unwrap();
        once.add_child("site", "bld_a").unwrap();
        once.add_host("sw1", Some("bld_a")).unwrap();
        once.set_variable("sw1", "os", json!("IOS-XE")).unwrap();

        let mut twice = once.clone();
        twice.add_group("site").unwrap();
        twice.add_group("bld_a").unwrap();
        twice.add_child("site", "bld_a").unwrap();
        twice.add_host("sw1", Some("bld_a")).unwrap();
        twice.set_variable("sw1", "os", json!("IOS-XE")).unwrap();

        assert_eq!(once, twice);
    }

    #[test]
    fn rejects_invalid_group_names() {
        let mut inventory = Inventory::new();
        assert_eq!(
            inventory.add_group("").unwrap_err(),
            InventoryError::InvalidGroupName(String::new())
        );
        assert!(matches!(
            inventory.add_group("with space"),
            Err(InventoryError::InvalidGroupName(_))
        ));
        assert!(matches!(
            inventory.add_group("1_og"),
            Err(InventoryError::InvalidGroupName(_))
        ));
        assert!(inventory.add_group("_1_og").is_ok());
        assert!(inventory.add_group("og_1").is_ok());
    }

    #[test]
    fn rejects_self_and_recursive_edges() {
        let mut inventory = Inventory::new();
        for name in ["a", "b", "c"] {
            inventory.add_group(name).unwrap();
        }
        inventory.add_child("a", "b").unwrap();
        inventory.add_child("b", "c").unwrap();

        assert_eq!(
            inventory.add_child("a", "a").unwrap_err(),
            InventoryError::SelfReference("a".into())
        );
        assert_eq!(
            inventory.add_child("c", "a").unwrap_err(),
            InventoryError::RecursiveLoop {
                parent: "c".into(),
                child: "a".into()
            }
        );
    }

    #[test]
    fn edges_require_known_entities() {
        let mut inventory = Inventory::new();
        inventory.add_group("a").unwrap();
        assert_eq!(
            inventory.add_child("missing", "a").unwrap_err(),
            InventoryError::UnknownGroup("missing".into())
        );
        assert_eq!(
            inventory.add_child("a", "nobody").unwrap_err(),
            InventoryError::UnknownEntity("nobody".into())
        );
        assert_eq!(
            inventory.add_host("sw1", Some("missing")).unwrap_err(),
            InventoryError::UnknownGroup("missing".into())
        );
    }

    #[test]
    fn hosts_leave_ungrouped_when_placed() {
        let mut inventory = Inventory::new();
        inventory.add_group("site").unwrap();
        inventory.add_host("sw1", None).unwrap();
        assert!(inventory.group(UNGROUPED_GROUP).unwrap().hosts.contains("sw1"));

        inventory.add_child("site", "sw1").unwrap();
        assert!(!inventory.group(UNGROUPED_GROUP).unwrap().hosts.contains("sw1"));
        assert_eq!(
            inventory.get_host("sw1").unwrap().groups.iter().collect::<Vec<_>>(),
            vec!["site"]
        );

        inventory.add_host("sw1", Some(UNGROUPED_GROUP)).unwrap();
        assert!(!inventory.group(UNGROUPED_GROUP).unwrap().hosts.contains("sw1"));
    }

    #[test]
    fn renders_list_and_graph() {
        let mut inventory = Inventory::new();
        inventory.add_group("emea").unwrap();
        inventory.add_group("bld_hq").unwrap();
        inventory.add_child("emea", "bld_hq").unwrap();
        inventory.add_host("sw1", Some("bld_hq")).unwrap();
        inventory.add_host("rt1", Some(UNGROUPED_GROUP)).unwrap();
        inventory.set_variable("sw1", "os", json!("IOS-XE")).unwrap();

        let list = inventory.to_list_json();
        assert_eq!(list["all"]["children"], json!(["ungrouped", "emea"]));
        assert_eq!(list["emea"]["children"], json!(["bld_hq"]));
        assert_eq!(list["bld_hq"]["hosts"], json!(["sw1"]));
        assert_eq!(list["ungrouped"]["hosts"], json!(["rt1"]));
        assert_eq!(list["_meta"]["hostvars"]["sw1"]["os"], "IOS-XE");

        let graph = inventory.graph(None).unwrap();
        assert_eq!(
            graph,
            "@all:\n  |--@emea:\n  |  |--@bld_hq:\n  |  |  |--sw1\n  |--@ungrouped:\n  |  |--rt1"
        );
    }
}
