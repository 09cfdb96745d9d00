//! Console Reporter
//!
//! Renders correlation results and raw listings as plain text. Every
//! renderer returns a `String`; the binary decides where it goes.

use std::fmt::Display;

use crate::correlate::Correlation;
use crate::identity::Access;
use crate::models::{
    AvailabilityZone, ComputeHost, Flavor, Hypervisor, Network, Port, Server, NOVA_COMPUTE,
};

fn opt<T: Display>(value: &Option<T>) -> String {
    value
        .as_ref()
        .map(|v| v.to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() > max {
        let head: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", head)
    } else {
        s.to_string()
    }
}

fn section(out: &mut String, title: &str) {
    out.push('\n');
    out.push_str(title);
    out.push('\n');
}

fn line(out: &mut String, text: String) {
    out.push_str("  ");
    out.push_str(&text);
    out.push('\n');
}

fn table_header(out: &mut String, header: String) {
    let width = header.len();
    out.push_str(&header);
    out.push('\n');
    out.push_str(&"-".repeat(width));
    out.push('\n');
}

fn describe_zone(az: &AvailabilityZone) -> String {
    let hosts: Vec<&str> = az.host_names().collect();
    format!(
        "{} available={} hosts=[{}]",
        az.name,
        az.is_available(),
        hosts.join(", ")
    )
}

fn describe_hypervisor(hv: &Hypervisor) -> String {
    format!(
        "id={} free_ram_mb={} disk_available_least={} free_disk_gb={} vcpus={} vcpus_used={} state={}",
        hv.id,
        opt(&hv.free_ram_mb),
        opt(&hv.disk_available_least),
        opt(&hv.free_disk_gb),
        opt(&hv.vcpus),
        opt(&hv.vcpus_used),
        opt(&hv.state)
    )
}

fn describe_server(vm: &Server) -> String {
    format!(
        "{} ({}) {} flavor={}",
        vm.id,
        vm.name,
        vm.status,
        vm.flavor_id().unwrap_or("-")
    )
}

fn describe_port(port: &Port) -> String {
    format!(
        "{} network={} device={} mac={}",
        port.id,
        opt(&port.network_id),
        opt(&port.device_id),
        opt(&port.mac_address)
    )
}

fn describe_network(net: &Network) -> String {
    format!(
        "{} ({}) physical_network={} status={}",
        net.id,
        net.name,
        opt(&net.physical_network),
        opt(&net.status)
    )
}

/// Full pipeline report, in the order the steps run
pub fn render_report(correlation: &Correlation, regions: &[String]) -> String {
    let mut out = String::new();
    out.push_str(&format!("Configured regions [{}]\n", regions.join(", ")));

    let zones: Vec<&str> = correlation.filter.zone_names.iter().map(String::as_str).collect();
    section(
        &mut out,
        &format!("Availability zones in state 'available' (names: {})", zones.join(", ")),
    );
    for az in &correlation.active_zones {
        line(&mut out, format!("az # {}", describe_zone(az)));
    }

    section(
        &mut out,
        &format!(
            "Active compute hosts for availability zones (having '{}' host service)",
            NOVA_COMPUTE
        ),
    );
    for host in &correlation.active_hosts {
        line(&mut out, format!("compute host # {}", host));
    }

    section(&mut out, "Nova compute hosts");
    for host in &correlation.compute_hosts {
        line(&mut out, format!("host # {} zone={}", host.host_name, opt(&host.zone)));
    }

    section(&mut out, "Hypervisors on active compute hosts");
    for (host, hv) in &correlation.hypervisors {
        line(&mut out, format!("hyperv # {} {}", host, describe_hypervisor(hv)));
    }

    section(&mut out, "Active VMs");
    for (host, vms) in &correlation.servers_by_host {
        let rendered: Vec<String> = vms.iter().map(describe_server).collect();
        line(&mut out, format!("compute {} # [{}]", host, rendered.join("; ")));
    }

    section(&mut out, "All flavors");
    for flavor in &correlation.flavors {
        line(
            &mut out,
            format!(
                "# {} ({}) vcpus={} ram={} disk={}",
                flavor.id, flavor.name, flavor.vcpus, flavor.ram, flavor.disk
            ),
        );
    }

    section(
        &mut out,
        &format!(
            "Compute host resources filled with vCPUs info (free disk >= {} GB, free RAM >= {} MB)",
            correlation.filter.min_disk_gb, correlation.filter.min_ram_mb
        ),
    );
    for (host, res) in &correlation.resources {
        line(
            &mut out,
            format!(
                "compute {} # free_disk_gb={} free_ram_mb={} used_vcpus={}",
                host,
                opt(&res.free_disk_gb),
                opt(&res.free_ram_mb),
                opt(&res.used_vcpus)
            ),
        );
    }

    section(&mut out, "Ports per compute host (by active VMs only)");
    for (host, ports) in &correlation.ports_by_host {
        let rendered: Vec<String> = ports.iter().map(describe_port).collect();
        line(&mut out, format!("compute {} # [{}]", host, rendered.join("; ")));
    }

    section(&mut out, "All networks");
    for net in &correlation.networks {
        line(&mut out, format!("# {}", describe_network(net)));
    }

    section(&mut out, "Networks per compute host");
    for (host, nets) in &correlation.networks_by_host {
        let rendered: Vec<String> = nets
            .iter()
            .map(|n| format!("{} ({})", n.id, opt(&n.physical_network)))
            .collect();
        line(&mut out, format!("compute {} # [{}]", host, rendered.join(", ")));
    }

    out
}

/// Token and catalog summary; the token id only when asked for
pub fn render_access(access: &Access, show_token: bool) -> String {
    let mut out = String::new();
    out.push_str(&format!("Identity API {}\n", access.version));
    out.push_str(&format!("Token expires {}\n", opt(&access.expires_at)));
    if show_token {
        out.push_str(&format!("Token {}\n", access.token));
    }
    out.push_str(&format!("Configured regions [{}]\n\n", access.catalog.regions().join(", ")));

    table_header(
        &mut out,
        format!("{:<12} {:<14} {:<12} {:<10} {:<50}", "TYPE", "NAME", "REGION", "INTERFACE", "URL"),
    );
    for service in &access.catalog.services {
        for endpoint in &service.endpoints {
            out.push_str(&format!(
                "{:<12} {:<14} {:<12} {:<10} {:<50}\n",
                truncate(&service.service_type, 12),
                truncate(&service.name, 14),
                truncate(endpoint.region.as_deref().unwrap_or("-"), 12),
                endpoint.interface,
                endpoint.url
            ));
        }
    }
    out
}

pub fn render_zones(zones: &[AvailabilityZone]) -> String {
    let mut out = String::new();
    table_header(
        &mut out,
        format!("{:<20} {:<10} {:<8} {:<8}", "ZONE", "AVAILABLE", "HOSTS", "COMPUTE"),
    );
    for az in zones {
        let hosts = az.host_names().count();
        let compute = az
            .host_names()
            .filter(|h| az.host_service_active(h, NOVA_COMPUTE))
            .count();
        out.push_str(&format!(
            "{:<20} {:<10} {:<8} {:<8}\n",
            truncate(&az.name, 20),
            az.is_available(),
            hosts,
            compute
        ));
    }
    out
}

pub fn render_hosts(hosts: &[ComputeHost]) -> String {
    let mut out = String::new();
    table_header(&mut out, format!("{:<40} {:<14} {:<20}", "HOST", "SERVICE", "ZONE"));
    for host in hosts {
        out.push_str(&format!(
            "{:<40} {:<14} {:<20}\n",
            truncate(&host.host_name, 40),
            truncate(&host.service, 14),
            opt(&host.zone)
        ));
    }
    out
}

pub fn render_hypervisors(hypervisors: &[Hypervisor]) -> String {
    let mut out = String::new();
    table_header(
        &mut out,
        format!(
            "{:<38} {:<30} {:>10} {:>10} {:>10} {:>6}",
            "ID", "HOSTNAME", "FREE_RAM", "DISK_LEAST", "FREE_DISK", "VCPUS"
        ),
    );
    for hv in hypervisors {
        out.push_str(&format!(
            "{:<38} {:<30} {:>10} {:>10} {:>10} {:>6}\n",
            hv.id.to_string(),
            truncate(hv.hypervisor_hostname.as_deref().unwrap_or("-"), 30),
            opt(&hv.free_ram_mb),
            opt(&hv.disk_available_least),
            opt(&hv.free_disk_gb),
            format!("{}/{}", opt(&hv.vcpus_used), opt(&hv.vcpus))
        ));
    }
    out
}

pub fn render_servers(servers: &[Server]) -> String {
    let mut out = String::new();
    table_header(
        &mut out,
        format!("{:<36} {:<24} {:<14} {:<24} {:<36}", "ID", "NAME", "STATUS", "HOST", "FLAVOR"),
    );
    for vm in servers {
        out.push_str(&format!(
            "{:<36} {:<24} {:<14} {:<24} {:<36}\n",
            vm.id,
            truncate(&vm.name, 24),
            vm.status.to_string(),
            truncate(vm.host.as_deref().unwrap_or("-"), 24),
            vm.flavor_id().unwrap_or("-")
        ));
    }
    out
}

pub fn render_flavors(flavors: &[Flavor]) -> String {
    let mut out = String::new();
    table_header(
        &mut out,
        format!("{:<36} {:<24} {:>6} {:>8} {:>6}", "ID", "NAME", "VCPUS", "RAM_MB", "DISK"),
    );
    for flavor in flavors {
        out.push_str(&format!(
            "{:<36} {:<24} {:>6} {:>8} {:>6}\n",
            flavor.id,
            truncate(&flavor.name, 24),
            flavor.vcpus,
            flavor.ram,
            flavor.disk
        ));
    }
    out
}

pub fn render_ports(ports: &[Port]) -> String {
    let mut out = String::new();
    table_header(
        &mut out,
        format!("{:<36} {:<36} {:<36} {:<10}", "ID", "DEVICE", "NETWORK", "STATUS"),
    );
    for port in ports {
        out.push_str(&format!(
            "{:<36} {:<36} {:<36} {:<10}\n",
            port.id,
            opt(&port.device_id),
            opt(&port.network_id),
            opt(&port.status)
        ));
    }
    out
}

pub fn render_networks(networks: &[Network]) -> String {
    let mut out = String::new();
    table_header(
        &mut out,
        format!("{:<36} {:<24} {:<20} {:<10}", "ID", "NAME", "PHYSICAL_NETWORK", "STATUS"),
    );
    for net in networks {
        out.push_str(&format!(
            "{:<36} {:<24} {:<20} {:<10}\n",
            net.id,
            truncate(&net.name, 24),
            opt(&net.physical_network),
            opt(&net.status)
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FilterConfig;
    use crate::correlate::correlate;
    use crate::identity::{CatalogEndpoint, CatalogService, IdentityVersion, ServiceCatalog};
    use crate::inventory::Inventory;
    use serde_json::json;

    fn inventory() -> Inventory {
        Inventory {
            zones: serde_json::from_value(json!([{
                "zoneName": "nova",
                "zoneState": {"available": true},
                "hosts": {"c1": {"nova-compute": {"available": true, "active": true}}}
            }]))
            .unwrap(),
            hosts: vec![],
            hypervisors: serde_json::from_value(json!([{
                "id": 1,
                "hypervisor_hostname": "c1",
                "free_ram_mb": 4096,
                "disk_available_least": 80
            }]))
            .unwrap(),
            servers: serde_json::from_value(json!([{
                "id": "vm-1",
                "name": "web",
                "status": "ACTIVE",
                "flavor": {"id": "m1"},
                "OS-EXT-SRV-ATTR:host": "c1"
            }]))
            .unwrap(),
            flavors: serde_json::from_value(json!([
                {"id": "m1", "name": "m1.small", "vcpus": 2, "ram": 2048, "disk": 20}
            ]))
            .unwrap(),
            ports: serde_json::from_value(json!([
                {"id": "p1", "device_id": "vm-1", "network_id": "n1"}
            ]))
            .unwrap(),
            networks: serde_json::from_value(json!([
                {"id": "n1", "name": "sriov", "provider:physical_network": "physnet1"}
            ]))
            .unwrap(),
        }
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a-very-long-hostname", 10), "a-very-...");
    }

    #[test]
    fn test_render_report_sections() {
        let correlation = correlate(&inventory(), &FilterConfig::default());
        let text = render_report(&correlation, &["RegionOne".to_string()]);

        assert!(text.starts_with("Configured regions [RegionOne]"));
        assert!(text.contains("compute host # c1"));
        assert!(text.contains("compute c1 # free_disk_gb=80 free_ram_mb=4096 used_vcpus=2"));
        assert!(text.contains("compute c1 # [vm-1 (web) ACTIVE flavor=m1]"));
        assert!(text.contains("compute c1 # [n1 (physnet1)]"));
    }

    #[test]
    fn test_render_access_hides_token() {
        let access = Access {
            token: "gAAAAAB-secret".to_string(),
            version: IdentityVersion::V3,
            expires_at: None,
            catalog: ServiceCatalog {
                services: vec![CatalogService {
                    service_type: "compute".to_string(),
                    name: "nova".to_string(),
                    endpoints: vec![CatalogEndpoint {
                        region: Some("RegionOne".to_string()),
                        interface: "public".to_string(),
                        url: "http://nova:8774/v2.1".to_string(),
                    }],
                }],
            },
        };

        let hidden = render_access(&access, false);
        assert!(!hidden.contains("gAAAAAB-secret"));
        assert!(hidden.contains("http://nova:8774/v2.1"));
        assert!(hidden.contains("Identity API v3"));

        assert!(render_access(&access, true).contains("gAAAAAB-secret"));
    }

    #[test]
    fn test_listing_tables() {
        let inv = inventory();
        let zones = render_zones(&inv.zones);
        assert!(zones.lines().nth(2).unwrap().starts_with("nova"));

        let servers = render_servers(&inv.servers);
        assert_eq!(servers.lines().count(), 3);
        assert!(servers.contains("ACTIVE"));

        assert!(render_networks(&inv.networks).contains("physnet1"));
        assert!(render_ports(&inv.ports).contains("vm-1"));
        assert!(render_flavors(&inv.flavors).contains("m1.small"));
        assert!(render_hypervisors(&inv.hypervisors).contains("c1"));
    }
}
