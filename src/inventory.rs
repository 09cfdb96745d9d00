//! Inventory Fetcher
//!
//! Trait-based abstraction over the seven read-only list calls, plus the
//! fixed sequence that pulls a full [`Inventory`] snapshot.

use async_trait::async_trait;
use serde::Serialize;
use tracing::info;

use crate::error::Result;
use crate::models::{AvailabilityZone, ComputeHost, Flavor, Hypervisor, Network, Port, Server};

/// Anything that can list OpenStack compute and network resources
#[async_trait]
pub trait InventorySource: Send + Sync {
    /// Availability zones with their host/service maps
    async fn availability_zones(&self) -> Result<Vec<AvailabilityZone>>;

    /// Hosts known to Nova, with the service each one runs
    async fn compute_hosts(&self) -> Result<Vec<ComputeHost>>;

    /// Hypervisor resource records for every compute node
    async fn hypervisors(&self) -> Result<Vec<Hypervisor>>;

    /// Server instances, all pages
    async fn servers(&self) -> Result<Vec<Server>>;

    /// Flavors, all pages
    async fn flavors(&self) -> Result<Vec<Flavor>>;

    async fn ports(&self) -> Result<Vec<Port>>;

    async fn networks(&self) -> Result<Vec<Network>>;
}

/// One snapshot of every collection the correlator needs
#[derive(Debug, Clone, Default, Serialize)]
pub struct Inventory {
    pub zones: Vec<AvailabilityZone>,
    pub hosts: Vec<ComputeHost>,
    pub hypervisors: Vec<Hypervisor>,
    pub servers: Vec<Server>,
    pub flavors: Vec<Flavor>,
    pub ports: Vec<Port>,
    pub networks: Vec<Network>,
}

impl Inventory {
    /// Fetch all collections, one call after another.
    ///
    /// The first failing call aborts the fetch.
    pub async fn fetch<S: InventorySource + ?Sized>(source: &S) -> Result<Self> {
        info!("Fetching compute inventory");
        let zones = source.availability_zones().await?;
        let hosts = source.compute_hosts().await?;
        let hypervisors = source.hypervisors().await?;
        let servers = source.servers().await?;
        let flavors = source.flavors().await?;

        info!("Fetching network inventory");
        let ports = source.ports().await?;
        let networks = source.networks().await?;

        info!(
            zones = zones.len(),
            hosts = hosts.len(),
            hypervisors = hypervisors.len(),
            servers = servers.len(),
            flavors = flavors.len(),
            ports = ports.len(),
            networks = networks.len(),
            "Inventory fetched"
        );

        Ok(Self {
            zones,
            hosts,
            hypervisors,
            servers,
            flavors,
            ports,
            networks,
        })
    }
}
