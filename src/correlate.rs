//! Capacity / Workload Correlation
//!
//! Pure, in-memory joins over one [`Inventory`] snapshot:
//!
//! 1. availability zones → active compute hosts
//! 2. hosts → hypervisors → free disk/RAM, filtered by static thresholds
//! 3. hosts → active servers → flavor vCPUs
//! 4. servers → ports → networks
//!
//! A record whose join key is missing, or whose lookup finds nothing, is
//! skipped. Nothing in here returns an error.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::Serialize;
use tracing::debug;

use crate::config::FilterConfig;
use crate::inventory::Inventory;
use crate::models::{
    AvailabilityZone, ComputeHost, Flavor, Hypervisor, Network, Port, Server, NOVA_COMPUTE,
};

/// Minimum free capacity a compute host must offer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Thresholds {
    pub min_disk_gb: i64,
    pub min_ram_mb: i64,
}

impl From<&FilterConfig> for Thresholds {
    fn from(filter: &FilterConfig) -> Self {
        Self {
            min_disk_gb: filter.min_disk_gb,
            min_ram_mb: filter.min_ram_mb,
        }
    }
}

/// Free capacity and current vCPU usage of one compute host
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ComputeResource {
    pub free_disk_gb: Option<i64>,
    pub free_ram_mb: Option<i64>,
    /// Filled in once active servers have been matched to flavors
    pub used_vcpus: Option<u32>,
}

impl ComputeResource {
    fn satisfies(&self, thresholds: Thresholds) -> bool {
        match (self.free_disk_gb, self.free_ram_mb) {
            (Some(disk), Some(ram)) => {
                disk >= thresholds.min_disk_gb && ram >= thresholds.min_ram_mb
            }
            _ => false,
        }
    }
}

/// Every intermediate and final collection of one correlation run
#[derive(Debug, Clone, Serialize)]
pub struct Correlation {
    pub filter: FilterConfig,
    pub active_zones: Vec<AvailabilityZone>,
    pub active_hosts: BTreeSet<String>,
    /// `os-hosts` rows for the compute service
    pub compute_hosts: Vec<ComputeHost>,
    pub hypervisors: BTreeMap<String, Hypervisor>,
    /// Hosts that pass the thresholds, with vCPU usage applied
    pub resources: BTreeMap<String, ComputeResource>,
    pub servers_by_host: BTreeMap<String, Vec<Server>>,
    pub flavors: Vec<Flavor>,
    pub vcpus_by_host: BTreeMap<String, u32>,
    pub ports_by_host: BTreeMap<String, Vec<Port>>,
    pub networks: Vec<Network>,
    pub networks_by_host: BTreeMap<String, Vec<Network>>,
}

/// Zones named in the allow-list whose state is available
pub fn active_zones<'a>(
    zones: &'a [AvailabilityZone],
    names: &BTreeSet<String>,
) -> Vec<&'a AvailabilityZone> {
    zones
        .iter()
        .filter(|az| names.contains(&az.name))
        .filter(|az| az.is_available())
        .collect()
}

/// Hosts running an active `nova-compute` service in any of the zones
pub fn active_compute_hosts<'a, I>(zones: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = &'a AvailabilityZone>,
{
    zones
        .into_iter()
        .flat_map(|az| {
            az.host_names()
                .filter(move |host| az.host_service_active(host, NOVA_COMPUTE))
        })
        .map(str::to_string)
        .collect()
}

/// Hypervisors whose hostname is in `hosts`, keyed by that hostname.
///
/// When two hypervisors report the same hostname the first one wins.
pub fn hypervisors_on_hosts<'a>(
    hypervisors: &'a [Hypervisor],
    hosts: &BTreeSet<String>,
) -> BTreeMap<String, &'a Hypervisor> {
    let mut by_host = BTreeMap::new();
    for hv in hypervisors {
        let Some(name) = hv.hypervisor_hostname.as_deref() else {
            continue;
        };
        if hosts.contains(name) {
            by_host.entry(name.to_string()).or_insert(hv);
        }
    }
    by_host
}

/// Free disk and RAM per host; vCPU usage is left unset
pub fn compute_resources(
    hypervisors: &BTreeMap<String, &Hypervisor>,
) -> BTreeMap<String, ComputeResource> {
    hypervisors
        .iter()
        .map(|(host, hv)| {
            (
                host.clone(),
                ComputeResource {
                    free_disk_gb: hv.free_disk(),
                    free_ram_mb: hv.free_ram_mb,
                    used_vcpus: None,
                },
            )
        })
        .collect()
}

/// Keep hosts with at least the minimum free disk and RAM
pub fn filter_by_thresholds(
    resources: BTreeMap<String, ComputeResource>,
    thresholds: Thresholds,
) -> BTreeMap<String, ComputeResource> {
    resources
        .into_iter()
        .filter(|(_, res)| res.satisfies(thresholds))
        .collect()
}

/// Active (ACTIVE/BUILD) servers on the given hosts, grouped by host
pub fn group_active_servers<'a, K>(
    servers: &'a [Server],
    hosts: &BTreeMap<String, K>,
) -> BTreeMap<String, Vec<&'a Server>> {
    let mut grouped: BTreeMap<String, Vec<&Server>> = BTreeMap::new();
    for server in servers.iter().filter(|s| s.status.is_active()) {
        let Some(host) = server.host.as_deref() else {
            continue;
        };
        if hosts.contains_key(host) {
            grouped.entry(host.to_string()).or_default().push(server);
        }
    }
    grouped
}

/// Sum of flavor vCPUs per host; servers with an unknown flavor add nothing
pub fn vcpus_per_host(
    grouped: &BTreeMap<String, Vec<&Server>>,
    flavors: &[Flavor],
) -> BTreeMap<String, u32> {
    let mut vcpus_by_flavor: HashMap<&str, u32> = HashMap::new();
    for flavor in flavors {
        vcpus_by_flavor.entry(flavor.id.as_str()).or_insert(flavor.vcpus);
    }

    grouped
        .iter()
        .map(|(host, servers)| {
            let used: u32 = servers
                .iter()
                .filter_map(|vm| vm.flavor_id())
                .filter_map(|id| vcpus_by_flavor.get(id))
                .sum();
            (host.clone(), used)
        })
        .collect()
}

/// Record vCPU usage on hosts that are already in the resource map
pub fn apply_vcpus(
    resources: &mut BTreeMap<String, ComputeResource>,
    vcpus: &BTreeMap<String, u32>,
) {
    for (host, used) in vcpus {
        if let Some(res) = resources.get_mut(host) {
            res.used_vcpus = Some(*used);
        }
    }
}

/// First port bound to each server, collected per host
pub fn ports_per_host<'a>(
    grouped: &BTreeMap<String, Vec<&Server>>,
    ports: &'a [Port],
) -> BTreeMap<String, Vec<&'a Port>> {
    grouped
        .iter()
        .map(|(host, servers)| {
            let host_ports: Vec<&Port> = servers
                .iter()
                .filter_map(|vm| ports.iter().find(|p| p.is_bound_to(&vm.id)))
                .collect();
            (host.clone(), host_ports)
        })
        .collect()
}

/// Distinct networks reached by each host's ports, in port order
pub fn networks_per_host<'a>(
    ports_by_host: &BTreeMap<String, Vec<&Port>>,
    networks: &'a [Network],
) -> BTreeMap<String, Vec<&'a Network>> {
    let by_id: HashMap<&str, &Network> = networks.iter().map(|n| (n.id.as_str(), n)).collect();

    ports_by_host
        .iter()
        .map(|(host, ports)| {
            let mut seen: BTreeSet<&str> = BTreeSet::new();
            let host_networks: Vec<&Network> = ports
                .iter()
                .filter_map(|p| p.network_id.as_deref())
                .filter_map(|id| by_id.get(id).copied())
                .filter(|n| seen.insert(n.id.as_str()))
                .collect();
            (host.clone(), host_networks)
        })
        .collect()
}

fn owned<T: Clone>(map: BTreeMap<String, Vec<&T>>) -> BTreeMap<String, Vec<T>> {
    map.into_iter()
        .map(|(k, v)| (k, v.into_iter().cloned().collect()))
        .collect()
}

/// Run every correlation step over one inventory snapshot
pub fn correlate(inventory: &Inventory, filter: &FilterConfig) -> Correlation {
    let zones = active_zones(&inventory.zones, &filter.zone_names);
    let active_hosts = active_compute_hosts(zones.iter().copied());
    debug!(zones = zones.len(), hosts = active_hosts.len(), "Active compute hosts resolved");

    let hypervisors = hypervisors_on_hosts(&inventory.hypervisors, &active_hosts);
    let all_resources = compute_resources(&hypervisors);
    let mut resources = filter_by_thresholds(all_resources, Thresholds::from(filter));
    debug!(
        hypervisors = hypervisors.len(),
        passing = resources.len(),
        min_disk_gb = filter.min_disk_gb,
        min_ram_mb = filter.min_ram_mb,
        "Applied capacity thresholds"
    );

    let servers_by_host = group_active_servers(&inventory.servers, &resources);
    let vcpus_by_host = vcpus_per_host(&servers_by_host, &inventory.flavors);
    apply_vcpus(&mut resources, &vcpus_by_host);

    let ports_by_host = ports_per_host(&servers_by_host, &inventory.ports);
    let networks_by_host = networks_per_host(&ports_by_host, &inventory.networks);

    Correlation {
        filter: filter.clone(),
        active_zones: zones.into_iter().cloned().collect(),
        active_hosts,
        compute_hosts: inventory
            .hosts
            .iter()
            .filter(|h| h.is_compute())
            .cloned()
            .collect(),
        hypervisors: hypervisors
            .into_iter()
            .map(|(k, v)| (k, v.clone()))
            .collect(),
        resources,
        servers_by_host: owned(servers_by_host),
        flavors: inventory.flavors.clone(),
        vcpus_by_host,
        ports_by_host: owned(ports_by_host),
        networks: inventory.networks.clone(),
        networks_by_host: owned(networks_by_host),
    }
}
