//! # dnac-inventory
//!
//! Builds an Ansible-style inventory from a Cisco DNA Center controller.
//!
//! The crate logs in to the controller, collects the filtered device
//! inventory page by page together with the site and physical topologies,
//! and turns them into a group tree: one group per site, nested the way the
//! sites are nested, with every device registered under the site it sits in.
//!
//! ## Features
//!
//! - Token based session against the DNA Center intent API
//! - Paginated, filtered device collection
//! - Site hierarchy rebuilt into inventory groups with ASCII-safe names
//! - Connection hints for IOS and NX-OS devices
//! - `compose`, `groups` and `keyed_groups` rules over host variables
//!
//! ## Example
//!
//! ```rust,no_run
//! use dnac_inventory::{synchronise, DnacClient, Inventory, SyncOptions};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DnacClient::builder()
//!         .host("dnac.example.net")
//!         .username("admin")
//!         .password("secret")
//!         .api_version("2.3.5.3")
//!         .build()
//!         .await?;
//!
//!     let options = SyncOptions {
//!         toplevel: Some("dnac".into()),
//!         ..Default::default()
//!     };
//!
//!     let mut inventory = Inventory::new();
//!     let report = synchronise(&client, &options, &mut inventory).await?;
//!     println!("{} hosts in {} sites", report.hosts, report.sites);
//!     println!("{}", inventory.graph(None)?);
//!
//!     Ok(())
//! }
//! ```

mod api;
pub mod binder;
mod client;
pub mod config;
mod error;
pub mod hierarchy;
pub mod inventory;
pub mod models;
pub mod normalize;
mod sync;

pub use api::device::{page_count, page_offset, DeviceApi, DEFAULT_PAGE_SIZE};
pub use api::topology::TopologyApi;
pub use binder::{bind, BindOptions, BindReport, NetworkOs, SiteResolution, Unresolved};
pub use client::{DnacClient, DnacClientBuilder};
pub use config::{verify_file, InventoryConfig};
pub use error::{DnacError, DnacResult};
pub use hierarchy::materialize;
pub use inventory::{
    ConstructedRules, Group, Host, Inventory, InventoryError, InventoryModel, KeyedGroup,
};
pub use models::device::{DeviceFilters, NormalizedHost, RawDevice};
pub use models::site::{LocationType, NormalizedSite, RawSite};
pub use models::topology::TopologyNode;
pub use normalize::{normalize_devices, normalize_site_name};
pub use sync::{load_inventory, synchronise, SyncOptions, SyncReport};
