//! Projection of controller records into inventory-ready records.
//!
//! Devices become [`NormalizedHost`]s (access points are dropped) and site
//! display names become group names that the inventory accepts.

use log::debug;

use crate::models::device::{NormalizedHost, RawDevice};
use crate::models::site::{LocationType, NormalizedSite, RawSite};

/// Separator between serial numbers of stacked devices.
const SERIAL_SEPARATOR: &str = ", ";

/// Prefix of group names derived from building sites.
pub const BUILDING_PREFIX: &str = "bld_";

/// Characters DNA Center emits in site names that fold to ASCII digraphs.
const TRANSLITERATIONS: &[(char, &str)] = &[
    ('ä', "ae"),
    ('ö', "oe"),
    ('ü', "ue"),
    ('Ä', "Ae"),
    ('Ö', "Oe"),
    ('Ü', "Ue"),
    ('ß', "ss"),
];

/// Projects every non access point device into a [`NormalizedHost`],
/// preserving input order.
pub fn normalize_devices(devices: &[RawDevice]) -> Vec<NormalizedHost> {
    devices
        .iter()
        .filter(|device| {
            let skip = device.is_access_point();
            if skip {
                debug!("Skipping access point {device}");
            }
            !skip
        })
        .map(normalize_device)
        .collect()
}

/// Projects a single device. Missing fields become empty strings.
pub fn normalize_device(device: &RawDevice) -> NormalizedHost {
    let text = |field: &Option<String>| field.clone().unwrap_or_default();

    let os = if device.is_access_point() {
        text(&device.family)
    } else {
        text(&device.software_type)
    };

    NormalizedHost {
        id: device.id.clone(),
        hostname: text(&device.hostname),
        management_ip_address: text(&device.management_ip_address),
        os,
        version: text(&device.software_version),
        reachability_status: text(&device.reachability_status),
        role: text(&device.role),
        serial_numbers: split_serial_numbers(device.serial_number.as_deref().unwrap_or_default()),
        series: text(&device.series),
        host_data: device.record.clone(),
    }
}

/// Splits the controller's comma-separated serial number field.
///
/// An empty field yields an empty list rather than a single empty serial.
pub fn split_serial_numbers(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split(SERIAL_SEPARATOR).map(str::to_string).collect()
}

/// Normalizes a site, carrying its ids through unchanged.
pub fn normalize_site(site: &RawSite) -> NormalizedSite {
    NormalizedSite {
        name: normalize_site_name(&site.name, site.location_type),
        id: site.id.clone(),
        parent_id: site.parent_id.clone(),
    }
}

/// Turns a site display name into a group name.
///
/// Umlauts and ß fold to ASCII digraphs first, then every character that is
/// not an ASCII letter, digit or underscore becomes `_`. Runs of `_` collapse
/// and are trimmed from both ends before lowercasing. Buildings get the
/// [`BUILDING_PREFIX`]; any other name starting with a digit gets a leading
/// `_`.
pub fn normalize_site_name(name: &str, location_type: Option<LocationType>) -> String {
    let mut folded = String::with_capacity(name.len());
    for c in name.chars() {
        match TRANSLITERATIONS.iter().find(|(from, _)| *from == c) {
            Some((_, to)) => folded.push_str(to),
            None if c.is_ascii_alphanumeric() => folded.push(c),
            None => folded.push('_'),
        }
    }

    let normalized = folded
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
        .to_lowercase();

    if location_type == Some(LocationType::Building) {
        format!("{BUILDING_PREFIX}{normalized}")
    } else if normalized.starts_with(|c: char| c.is_ascii_digit()) {
        format!("_{normalized}")
    } else {
        normalized
    }
}
