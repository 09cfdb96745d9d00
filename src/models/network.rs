//! Neutron (network) resource records

use serde::{Deserialize, Serialize};

/// Virtual network interface attachment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Port {
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Id of the server (or router, dhcp agent, ...) the port is bound to
    #[serde(default)]
    pub device_id: Option<String>,
    #[serde(default)]
    pub network_id: Option<String>,
    #[serde(default)]
    pub mac_address: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Port {
    /// Whether the port is attached to the given device
    pub fn is_bound_to(&self, device_id: &str) -> bool {
        self.device_id.as_deref() == Some(device_id)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Network {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(rename = "provider:physical_network", default)]
    pub physical_network: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_port_binding() {
        let port: Port = serde_json::from_value(json!({
            "id": "p1",
            "device_id": "vm-1",
            "network_id": "net-1",
            "mac_address": "fa:16:3e:00:00:01",
            "status": "ACTIVE"
        }))
        .unwrap();
        assert!(port.is_bound_to("vm-1"));
        assert!(!port.is_bound_to("vm-2"));

        let unbound: Port = serde_json::from_value(json!({"id": "p2", "device_id": ""})).unwrap();
        assert!(!unbound.is_bound_to("vm-1"));
    }

    #[test]
    fn test_network_provider_attribute() {
        let net: Network = serde_json::from_value(json!({
            "id": "net-1",
            "name": "sriov-a",
            "status": "ACTIVE",
            "provider:physical_network": "physnet1"
        }))
        .unwrap();
        assert_eq!(net.physical_network.as_deref(), Some("physnet1"));

        let net: Network = serde_json::from_value(json!({"id": "net-2"})).unwrap();
        assert!(net.physical_network.is_none());
    }
}
