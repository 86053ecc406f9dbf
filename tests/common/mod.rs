#![allow(dead_code)]

use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dnac_inventory::DnacClient;

pub const TEST_TOKEN: &str = "test-token";

pub const LOGIN_PATH: &str = "/dna/system/api/v1/auth/token";
pub const DEVICE_COUNT_PATH: &str = "/dna/intent/api/v1/network-device/count";
pub const DEVICE_LIST_PATH: &str = "/dna/intent/api/v1/network-device";
pub const SITE_TOPOLOGY_PATH: &str = "/dna/intent/api/v1/topology/site-topology";
pub const PHYSICAL_TOPOLOGY_PATH: &str = "/dna/intent/api/v1/topology/physical-topology";

/// `Basic` credentials of test-user:test-password.
const BASIC_AUTH: &str = "Basic dGVzdC11c2VyOnRlc3QtcGFzc3dvcmQ=";

/// Wraps `body` in the controller's response envelope.
pub fn envelope(body: Value) -> Value {
    json!({ "response": body, "version": "1.0" })
}

/// Mounts a successful token login for the test credentials.
pub async fn setup_login(mock_server: &MockServer) {
    Mock::given(method("POST"))
        .and(path(LOGIN_PATH))
        .and(header("authorization", BASIC_AUTH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "Token": TEST_TOKEN })))
        .expect(1)
        .mount(mock_server)
        .await;
}

/// Mounts an authenticated GET on `endpoint` answering with `body` in the
/// response envelope.
pub async fn mount_get(mock_server: &MockServer, endpoint: &str, body: Value) {
    Mock::given(method("GET"))
        .and(path(endpoint))
        .and(header("x-auth-token", TEST_TOKEN))
        .respond_with(ResponseTemplate::new(200).set_body_json(envelope(body)))
        .mount(mock_server)
        .await;
}

/// Builds a logged-in client against the mock server.
pub async fn setup_test_client(mock_server_uri: &str) -> DnacClient {
    DnacClient::builder()
        .host(mock_server_uri)
        .username("test-user")
        .password("test-password")
        .api_version("2.3.5.3")
        .build()
        .await
        .expect("Failed to build DnacClient")
}

/// A device record; ids end in a number that becomes the last octet of the
/// management address.
pub fn device(id: &str, hostname: &str, family: &str, software_type: &str) -> Value {
    json!({
        "id": id,
        "hostname": hostname,
        "managementIpAddress": format!("192.0.2.{}", id.trim_start_matches(|c: char| !c.is_ascii_digit())),
        "family": family,
        "softwareType": software_type,
        "softwareVersion": "17.9.4",
        "reachabilityStatus": "Reachable",
        "role": "ACCESS",
        "serialNumber": format!("SN-{id}"),
        "series": "Cisco Catalyst 9300 Series Switches",
        "platformId": "C9300-48P"
    })
}

pub fn site(id: &str, name: &str, parent_id: &str, location_type: &str) -> Value {
    json!({
        "id": id,
        "name": name,
        "parentId": parent_id,
        "locationType": location_type,
        "groupNameHierarchy": format!("Global/{name}")
    })
}

pub fn node(id: &str, site_id: Option<&str>) -> Value {
    match site_id {
        Some(site_id) => json!({
            "id": id,
            "label": id,
            "additionalInfo": { "siteid": site_id, "macAddress": "00:11:22:33:44:55" }
        }),
        None => json!({ "id": id, "label": id }),
    }
}
