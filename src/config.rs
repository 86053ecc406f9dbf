//! Inventory source configuration.
//!
//! The configuration is a YAML file whose name ends in `dna_center.yml` (or
//! `.yaml`), in the layout of an Ansible inventory plugin source:
//!
//! ```yaml
//! plugin: dna_center
//! host: dnac.example.net
//! dnac_version: 2.3.5.3
//! username: admin
//! validate_certs: false
//! toplevel: dnac
//! api_record_limit: 500
//! device_family:
//!   - Switches and Hubs
//!   - Routers
//! compose:
//!   ansible_user: "'netops'"
//! keyed_groups:
//!   - key: os
//!     prefix: os
//! ```
//!
//! `host`, `username` and `password` may instead come from `DNAC_HOST`,
//! `DNAC_USERNAME` and `DNAC_PASSWORD`.

use std::fmt;
use std::path::Path;

use log::{debug, info};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Deserializer};

use crate::api::device::DEFAULT_PAGE_SIZE;
use crate::binder::BindOptions;
use crate::client::DnacClientBuilder;
use crate::inventory::ConstructedRules;
use crate::models::device::DeviceFilters;
use crate::{DnacError, DnacResult};

/// Value of the `plugin` key this source answers to.
pub const PLUGIN_NAME: &str = "dna_center";

const CONFIG_SUFFIXES: [&str; 2] = ["dna_center.yml", "dna_center.yaml"];

const ENV_HOST: &str = "DNAC_HOST";
const ENV_USERNAME: &str = "DNAC_USERNAME";
const ENV_PASSWORD: &str = "DNAC_PASSWORD";

/// Families collected when `device_family` is not configured.
pub const DEFAULT_DEVICE_FAMILIES: [&str; 2] = ["Switches and Hubs", "Routers"];

/// Whether `path` names a configuration file this source can consume.
pub fn verify_file(path: &Path) -> bool {
    let name_matches = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| CONFIG_SUFFIXES.iter().any(|suffix| name.ends_with(suffix)));
    name_matches && path.is_file()
}

#[derive(Deserialize)]
struct ConfigFile {
    plugin: String,
    #[serde(default)]
    host: Option<String>,
    #[serde(default, deserialize_with = "string_or_number")]
    dnac_version: Option<String>,
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
    #[serde(default = "default_true")]
    validate_certs: bool,
    #[serde(default = "default_true")]
    use_dnac_mgmt_int: bool,
    #[serde(default)]
    toplevel: Option<String>,
    #[serde(default = "default_page_size")]
    api_record_limit: u32,
    #[serde(default)]
    hostname_filter: Option<String>,
    #[serde(default = "default_device_family")]
    device_family: Vec<String>,
    #[serde(default)]
    location_name: Option<String>,
    #[serde(default = "default_true")]
    ungrouped_fallback: bool,
    #[serde(flatten)]
    rules: ConstructedRules,
}

/// Accepts `2.3.5.3` as well as `2.3` or `2`, which YAML reads as numbers.
fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Version {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(Option::<Version>::deserialize(deserializer)?.map(|version| match version {
        Version::Text(text) => text,
        Version::Int(n) => n.to_string(),
        Version::Float(f) => f.to_string(),
    }))
}

fn default_true() -> bool {
    true
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

fn default_device_family() -> Vec<String> {
    DEFAULT_DEVICE_FAMILIES.iter().map(|f| f.to_string()).collect()
}

/// Fully resolved settings for one synchronisation run.
pub struct InventoryConfig {
    pub host: String,
    pub api_version: String,
    pub username: String,
    pub password: SecretString,
    pub validate_certs: bool,
    /// Use the management IP address as `ansible_host`.
    pub use_dnac_mgmt_int: bool,
    pub toplevel: Option<String>,
    pub page_size: u32,
    pub filters: DeviceFilters,
    pub ungrouped_fallback: bool,
    pub rules: ConstructedRules,
}

impl fmt::Debug for InventoryConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InventoryConfig")
            .field("host", &self.host)
            .field("api_version", &self.api_version)
            .field("username", &self.username)
            .field("validate_certs", &self.validate_certs)
            .field("use_dnac_mgmt_int", &self.use_dnac_mgmt_int)
            .field("toplevel", &self.toplevel)
            .field("page_size", &self.page_size)
            .field("filters", &self.filters)
            .field("ungrouped_fallback", &self.ungrouped_fallback)
            .field("rules", &self.rules)
            .finish_non_exhaustive()
    }
}

impl InventoryConfig {
    /// Loads the configuration file at `path`, falling back to the process
    /// environment for connection settings.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::ConfigurationError` if the file is not a
    /// `dna_center.yml` source, cannot be read or parsed, or lacks a
    /// required setting.
    pub fn load(path: &Path) -> DnacResult<Self> {
        if !verify_file(path) {
            return Err(DnacError::ConfigurationError(format!(
                "{} is not a readable {PLUGIN_NAME} inventory source (expected a file ending in {})",
                path.display(),
                CONFIG_SUFFIXES.join(" or ")
            )));
        }
        info!("Loading inventory source {}", path.display());

        let contents = std::fs::read_to_string(path).map_err(|e| {
            DnacError::ConfigurationError(format!("Failed to read {}: {e}", path.display()))
        })?;

        Self::from_yaml(&contents, |key| std::env::var(key).ok())
    }

    /// Parses a configuration document; `env` supplies fallback values for
    /// `DNAC_HOST`, `DNAC_USERNAME` and `DNAC_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns `DnacError::ConfigurationError` on malformed YAML, a foreign
    /// `plugin` value, a zero page size or missing required settings.
    pub fn from_yaml(contents: &str, env: impl Fn(&str) -> Option<String>) -> DnacResult<Self> {
        let file: ConfigFile = serde_yaml::from_str(contents)
            .map_err(|e| DnacError::ConfigurationError(format!("getting options failed: {e}")))?;

        if file.plugin != PLUGIN_NAME {
            return Err(DnacError::ConfigurationError(format!(
                "plugin must be {PLUGIN_NAME}, got {}",
                file.plugin
            )));
        }

        if file.api_record_limit == 0 {
            return Err(DnacError::ConfigurationError(
                "api_record_limit must be greater than zero".into(),
            ));
        }

        let required = |value: Option<String>, key: &str, env_key: Option<&str>| {
            value
                .filter(|v| !v.trim().is_empty())
                .or_else(|| {
                    env_key.and_then(|k| {
                        debug!("{key} not set in file, reading {k}");
                        env(k)
                    })
                })
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| DnacError::ConfigurationError(format!("{key} is required")))
        };

        let host = required(file.host, "host", Some(ENV_HOST))?;
        let api_version = required(file.dnac_version, "dnac_version", None)?;
        let username = required(file.username, "username", Some(ENV_USERNAME))?;
        let password = required(file.password, "password", Some(ENV_PASSWORD))?;

        let non_empty = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        Ok(Self {
            host,
            api_version,
            username,
            password: SecretString::from(password),
            validate_certs: file.validate_certs,
            use_dnac_mgmt_int: file.use_dnac_mgmt_int,
            toplevel: non_empty(file.toplevel),
            page_size: file.api_record_limit,
            filters: DeviceFilters {
                hostname: non_empty(file.hostname_filter),
                device_family: file.device_family,
                location_name: non_empty(file.location_name),
            },
            ungrouped_fallback: file.ungrouped_fallback,
            rules: file.rules,
        })
    }

    /// A client builder for the configured controller.
    pub fn client_builder(&self) -> DnacClientBuilder {
        DnacClientBuilder::default()
            .host(&self.host)
            .username(&self.username)
            .password_secret(SecretString::from(self.password.expose_secret().to_string()))
            .api_version(&self.api_version)
            .validate_certs(self.validate_certs)
    }

    /// Host binding settings derived from this configuration.
    pub fn bind_options(&self) -> BindOptions {
        BindOptions {
            use_mgmt_interface_as_ansible_host: self.use_dnac_mgmt_int,
            ungrouped_fallback: self.ungrouped_fallback,
            rules: self.rules.clone(),
        }
    }
}
