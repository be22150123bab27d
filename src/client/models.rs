//! Wire types for the ONOS REST API.
//!
//! Field names follow the controller's JSON. Everything the controller may
//! omit is an `Option` so that absence survives into the state model as
//! null; numeric fields keep their native width and are widened by the
//! state mappers.

use serde::{Deserialize, Serialize};

/// `GET /flows` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct FlowsResponse {
    /// All flow rules known to the controller.
    pub flows: Vec<Flow>,
}

/// A flow rule installed on a device.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flow {
    pub id: Option<String>,
    pub app_id: Option<String>,
    pub device_id: Option<String>,
    pub bytes: Option<u64>,
    pub packets: Option<u64>,
    pub priority: Option<i32>,
    pub table_id: Option<i32>,
    pub table_name: Option<String>,
    pub group_id: Option<i32>,
    pub timeout: Option<i32>,
    pub life: Option<u64>,
    pub last_seen: Option<u64>,
    pub live_type: Option<String>,
    pub is_permanent: Option<bool>,
    pub state: Option<String>,
    #[serde(default)]
    pub selector: Selector,
    #[serde(default)]
    pub treatment: Treatment,
}

/// Match criteria of a flow rule.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Selector {
    #[serde(default)]
    pub criteria: Vec<Criterion>,
}

/// One match criterion. Which fields are set depends on `type`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Criterion {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub eth_type: Option<String>,
    pub mac: Option<String>,
    pub port: Option<u64>,
}

/// Actions applied to matching packets.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Treatment {
    pub clear_deferred: Option<bool>,
    #[serde(default)]
    pub instructions: Vec<Instruction>,
    #[serde(default)]
    pub deferred: Vec<Instruction>,
}

/// A single treatment instruction.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Instruction {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub port: Option<String>,
}

/// `GET /hosts` response envelope.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HostsResponse {
    /// All end-stations discovered by the controller.
    pub hosts: Vec<Host>,
}

/// An end-station attached to the network.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub id: Option<String>,
    pub mac: Option<String>,
    pub vlan: Option<String>,
    #[serde(alias = "innervlan")]
    pub inner_vlan: Option<String>,
    #[serde(alias = "outertpid")]
    pub outer_tpid: Option<String>,
    pub configured: Option<bool>,
    pub suspended: Option<bool>,
    #[serde(default, alias = "ipaddresses")]
    pub ip_addresses: Vec<String>,
    #[serde(default)]
    pub locations: Vec<HostLocation>,
}

/// Where a host attaches: a device and one of its ports.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HostLocation {
    #[serde(alias = "elementid")]
    pub element_id: Option<String>,
    pub port: Option<String>,
}

/// A host-to-host intent, as submitted to and returned by `/intents`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(rename = "appId", alias = "appid")]
    pub app_id: String,
    pub key: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub one: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub two: Option<String>,
    #[serde(default, skip_serializing)]
    pub state: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_flow_without_selector_or_treatment() {
        let flow: Flow = serde_json::from_value(json!({"id": "1", "bytes": 10})).unwrap();
        assert!(flow.selector.criteria.is_empty());
        assert!(flow.treatment.instructions.is_empty());
        assert!(flow.treatment.deferred.is_empty());
        assert_eq!(flow.treatment.clear_deferred, None);
        assert_eq!(flow.bytes, Some(10));
    }

    #[test]
    fn test_flow_field_names() {
        let flow: Flow = serde_json::from_value(json!({
            "appId": "org.onosproject.core",
            "deviceId": "of:0000000000000001",
            "isPermanent": true,
            "lastSeen": 1700000000000u64,
            "liveType": "UNKNOWN",
            "tableId": 0,
            "selector": {"criteria": [{"type": "ETH_TYPE", "ethType": "0x88cc"}]},
            "treatment": {
                "clearDeferred": true,
                "instructions": [{"type": "OUTPUT", "port": "CONTROLLER"}]
            }
        }))
        .unwrap();

        assert_eq!(flow.app_id.as_deref(), Some("org.onosproject.core"));
        assert_eq!(flow.is_permanent, Some(true));
        assert_eq!(flow.selector.criteria[0].eth_type.as_deref(), Some("0x88cc"));
        assert_eq!(flow.treatment.instructions[0].port.as_deref(), Some("CONTROLLER"));
    }

    #[test]
    fn test_negative_counter_is_a_decode_error() {
        let result = serde_json::from_value::<Flow>(json!({"bytes": -1}));
        assert!(result.is_err());
    }

    #[test]
    fn test_negative_group_id_decodes() {
        let flow: Flow =
            serde_json::from_value(json!({"id": "1", "groupId": -1, "tableId": -2})).unwrap();
        assert_eq!(flow.group_id, Some(-1));
        assert_eq!(flow.table_id, Some(-2));
    }

    #[test]
    fn test_envelope_without_collection_is_a_decode_error() {
        assert!(serde_json::from_value::<FlowsResponse>(json!({"error": "proxy"})).is_err());
        assert!(serde_json::from_value::<HostsResponse>(json!({"error": "proxy"})).is_err());
    }

    #[test]
    fn test_host_accepts_both_spellings() {
        let camel: Host = serde_json::from_value(json!({
            "innerVlan": "None",
            "ipAddresses": ["10.0.0.3"],
            "locations": [{"elementId": "of:0000000000000003", "port": "1"}]
        }))
        .unwrap();
        let lower: Host = serde_json::from_value(json!({
            "innervlan": "None",
            "ipaddresses": ["10.0.0.3"],
            "locations": [{"elementid": "of:0000000000000003", "port": "1"}]
        }))
        .unwrap();

        assert_eq!(camel.inner_vlan, lower.inner_vlan);
        assert_eq!(camel.ip_addresses, lower.ip_addresses);
        assert_eq!(camel.locations[0].element_id, lower.locations[0].element_id);
    }

    #[test]
    fn test_intent_submission_body() {
        let intent = Intent {
            kind: "HostToHostIntent".to_string(),
            app_id: "org.onosproject.cli".to_string(),
            key: "0x99999".to_string(),
            id: None,
            priority: Some(100),
            one: Some("00:00:00:00:00:99/None".to_string()),
            two: Some("00:00:00:00:00:00/None".to_string()),
            state: Some("INSTALLED".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&intent).unwrap(),
            json!({
                "type": "HostToHostIntent",
                "appId": "org.onosproject.cli",
                "key": "0x99999",
                "priority": 100,
                "one": "00:00:00:00:00:99/None",
                "two": "00:00:00:00:00:00/None"
            })
        );
    }
}
