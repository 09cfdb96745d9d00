//! Nova (compute) resource records

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Service name that marks a host as a compute node inside an availability zone
pub const NOVA_COMPUTE: &str = "nova-compute";

/// Availability zone with its per-host service map
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AvailabilityZone {
    #[serde(rename = "zoneName")]
    pub name: String,
    #[serde(rename = "zoneState")]
    pub state: ZoneState,
    /// host name -> service name -> service state; `null` for zones without hosts
    #[serde(default)]
    pub hosts: Option<BTreeMap<String, BTreeMap<String, HostService>>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ZoneState {
    pub available: bool,
}

/// State of one service (e.g. `nova-compute`) on one host
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HostService {
    #[serde(default)]
    pub available: bool,
    #[serde(default)]
    pub active: bool,
    #[serde(default)]
    pub updated_at: Option<String>,
}

impl AvailabilityZone {
    pub fn is_available(&self) -> bool {
        self.state.available
    }

    /// Whether `host` runs the given service and that service is active
    pub fn host_service_active(&self, host: &str, service: &str) -> bool {
        self.hosts
            .as_ref()
            .and_then(|hosts| hosts.get(host))
            .and_then(|services| services.get(service))
            .map(|s| s.active)
            .unwrap_or(false)
    }

    /// Host names listed in this zone
    pub fn host_names(&self) -> impl Iterator<Item = &str> {
        self.hosts
            .iter()
            .flat_map(|hosts| hosts.keys())
            .map(String::as_str)
    }
}

/// Row of the `os-hosts` listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComputeHost {
    pub host_name: String,
    pub service: String,
    #[serde(default)]
    pub zone: Option<String>,
}

impl ComputeHost {
    pub fn is_compute(&self) -> bool {
        self.service == "compute"
    }
}

/// Hypervisor ids are integers before compute microversion 2.53 and UUIDs after
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HypervisorId {
    Number(u64),
    Uuid(String),
}

impl fmt::Display for HypervisorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HypervisorId::Number(n) => write!(f, "{}", n),
            HypervisorId::Uuid(s) => write!(f, "{}", s),
        }
    }
}

/// Compute node resource record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypervisor {
    pub id: HypervisorId,
    #[serde(default)]
    pub hypervisor_hostname: Option<String>,
    #[serde(default)]
    pub free_ram_mb: Option<i64>,
    /// Least disk available for new instances, accounting for overcommit
    #[serde(default)]
    pub disk_available_least: Option<i64>,
    #[serde(default)]
    pub free_disk_gb: Option<i64>,
    #[serde(default)]
    pub vcpus: Option<i64>,
    #[serde(default)]
    pub vcpus_used: Option<i64>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

impl Hypervisor {
    /// Free disk in GB, preferring `disk_available_least` over `free_disk_gb`
    pub fn free_disk(&self) -> Option<i64> {
        self.disk_available_least.or(self.free_disk_gb)
    }
}

/// Nova server lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ServerStatus {
    Active,
    Build,
    Rebuild,
    Reboot,
    HardReboot,
    Password,
    Resize,
    VerifyResize,
    RevertResize,
    Migrating,
    Paused,
    Suspended,
    Rescue,
    Shutoff,
    Stopped,
    Shelved,
    ShelvedOffloaded,
    SoftDeleted,
    Deleted,
    Error,
    #[serde(other)]
    Unknown,
}

impl ServerStatus {
    /// Statuses that count as a running or soon-to-be-running workload
    pub fn is_active(self) -> bool {
        matches!(self, ServerStatus::Active | ServerStatus::Build)
    }
}

impl fmt::Display for ServerStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // serde already knows the wire spelling
        match serde_json::to_value(self) {
            Ok(serde_json::Value::String(s)) => f.write_str(&s),
            _ => f.write_str("UNKNOWN"),
        }
    }
}

/// Flavor reference embedded in a server record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlavorRef {
    #[serde(default)]
    pub id: Option<String>,
}

/// Virtual machine instance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub status: ServerStatus,
    #[serde(default)]
    pub flavor: FlavorRef,
    /// Compute host the instance is scheduled on (admin-only extended attribute)
    #[serde(rename = "OS-EXT-SRV-ATTR:host", default)]
    pub host: Option<String>,
}

impl Server {
    pub fn flavor_id(&self) -> Option<&str> {
        self.flavor.id.as_deref()
    }
}

/// VM sizing template
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub vcpus: u32,
    /// RAM in MB
    #[serde(default)]
    pub ram: i64,
    /// Root disk in GB
    #[serde(default)]
    pub disk: i64,
}
