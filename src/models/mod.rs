//! OpenStack Resource Records
//!
//! Flat records deserialized verbatim from the Nova and Neutron list APIs.
//! Only the fields the correlator and reporter read are modelled; everything
//! else in the payload is ignored.

pub mod compute;
pub mod network;

pub use compute::{
    AvailabilityZone, ComputeHost, Flavor, FlavorRef, HostService, Hypervisor, HypervisorId,
    Server, ServerStatus, ZoneState, NOVA_COMPUTE,
};
pub use network::{Network, Port};

use serde::{Deserialize, Serialize};

/// A pagination or self link attached to a collection response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    pub href: String,
    pub rel: String,
}

/// Find the `rel="next"` link of a collection page
pub fn next_link(links: &[Link]) -> Option<&str> {
    links
        .iter()
        .find(|l| l.rel == "next")
        .map(|l| l.href.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_link() {
        let links: Vec<Link> = serde_json::from_value(serde_json::json!([
            {"href": "http://nova/v2.1/servers/detail?marker=a", "rel": "next"},
            {"href": "http://nova/v2.1/servers", "rel": "self"}
        ]))
        .unwrap();

        assert_eq!(
            next_link(&links),
            Some("http://nova/v2.1/servers/detail?marker=a")
        );
        assert_eq!(next_link(&links[1..]), None);
    }
}
