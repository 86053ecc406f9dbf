use std::fmt;

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

/// A network device as returned by the DNA Center device list.
///
/// Only the fields the inventory needs are typed. The record itself is kept
/// untouched in `record`, nulls included, and is handed through to the host
/// as `host_data`. Serializing a `RawDevice` writes that record back out.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDevice {
    /// The unique identifier of the device.
    pub id: String,
    pub hostname: Option<String>,
    pub management_ip_address: Option<String>,
    /// Device family, e.g. "Switches and Hubs" or "Unified AP".
    pub family: Option<String>,
    /// Software type, e.g. "IOS-XE" or "NX-OS".
    pub software_type: Option<String>,
    pub software_version: Option<String>,
    pub reachability_status: Option<String>,
    pub role: Option<String>,
    /// Serial number(s), comma-separated for stacked devices.
    pub serial_number: Option<String>,
    pub series: Option<String>,
    /// The device record exactly as the controller sent it.
    pub record: Value,
}

/// Typed view over a device record.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct DeviceFields {
    id: String,
    #[serde(default)]
    hostname: Option<String>,
    #[serde(default)]
    management_ip_address: Option<String>,
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    software_type: Option<String>,
    #[serde(default)]
    software_version: Option<String>,
    #[serde(default)]
    reachability_status: Option<String>,
    #[serde(default)]
    role: Option<String>,
    #[serde(default)]
    serial_number: Option<String>,
    #[serde(default)]
    series: Option<String>,
}

impl<'de> Deserialize<'de> for RawDevice {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = Value::deserialize(deserializer)?;
        let fields = DeviceFields::deserialize(&record).map_err(<D::Error as de::Error>::custom)?;

        Ok(RawDevice {
            id: fields.id,
            hostname: fields.hostname,
            management_ip_address: fields.management_ip_address,
            family: fields.family,
            software_type: fields.software_type,
            software_version: fields.software_version,
            reachability_status: fields.reachability_status,
            role: fields.role,
            serial_number: fields.serial_number,
            series: fields.series,
            record,
        })
    }
}

impl Serialize for RawDevice {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.record.serialize(serializer)
    }
}

impl RawDevice {
    /// Whether this device is a wireless access point.
    pub fn is_access_point(&self) -> bool {
        self.family
            .as_deref()
            .is_some_and(|family| family.contains(ACCESS_POINT_FAMILY))
    }
}

impl fmt::Display for RawDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.hostname.as_deref().unwrap_or_default(), self.id)
    }
}

/// Family marker of wireless access points.
pub const ACCESS_POINT_FAMILY: &str = "Unified AP";

/// Server-side filters applied to every device list page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceFilters {
    pub hostname: Option<String>,
    pub device_family: Vec<String>,
    pub location_name: Option<String>,
}

impl DeviceFilters {
    /// Query pairs for the filters that are set; families repeat the key.
    pub(crate) fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(hostname) = &self.hostname {
            pairs.push(("hostname", hostname.clone()));
        }
        for family in &self.device_family {
            pairs.push(("family", family.clone()));
        }
        if let Some(location) = &self.location_name {
            pairs.push(("locationName", location.clone()));
        }
        pairs
    }
}

/// Canonical host record derived from a [`RawDevice`].
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedHost {
    pub id: String,
    pub hostname: String,
    pub management_ip_address: String,
    pub os: String,
    pub version: String,
    pub reachability_status: String,
    pub role: String,
    pub serial_numbers: Vec<String>,
    pub series: String,
    /// The untouched controller record.
    pub host_data: Value,
}
