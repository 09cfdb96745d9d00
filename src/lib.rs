//! OpenStack Inventory Library
//!
//! Authenticates against Keystone, lists compute and network resources from
//! Nova and Neutron, and correlates free compute capacity with the active
//! workloads running on each host.
//!
//! ## Pipeline
//!
//! 1. [`config`]: load credentials and filter thresholds
//! 2. [`identity`]: exchange credentials for a token and service catalog
//! 3. [`client`] / [`inventory`]: fetch every collection, one call at a time
//! 4. [`correlate`]: join hosts, hypervisors, servers, flavors, ports and networks
//! 5. [`report`]: render the results for the console

pub mod client;
pub mod config;
pub mod correlate;
pub mod error;
pub mod identity;
pub mod inventory;
pub mod models;
pub mod report;

pub use client::OpenStackClient;
pub use config::{Credentials, EndpointSelection, FilterConfig};
pub use correlate::{correlate, Correlation};
pub use error::{InventoryError, Result};
pub use identity::{Access, IdentityVersion};
pub use inventory::{Inventory, InventorySource};
