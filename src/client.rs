//! OpenStack REST Client
//!
//! Thin read-only client over the Nova and Neutron list endpoints. One
//! `reqwest::Client` carries the Keystone token on every request; calls are
//! issued one at a time with no retries.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, trace};

use crate::config::{Credentials, EndpointSelection};
use crate::error::{InventoryError, Result};
use crate::identity::{self, Access, IdentityVersion};
use crate::inventory::InventorySource;
use crate::models::{
    next_link, AvailabilityZone, ComputeHost, Flavor, Hypervisor, Link, Network, Port, Server,
};

const USER_AGENT: &str = concat!("openstack-inventory/", env!("CARGO_PKG_VERSION"));
const AUTH_TOKEN_HEADER: &str = "X-Auth-Token";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const NETWORK_API_VERSION: &str = "v2.0";

// ============================================================
// API Response Types
// ============================================================

#[derive(Debug, Deserialize)]
struct AvailabilityZoneList {
    #[serde(rename = "availabilityZoneInfo")]
    zones: Vec<AvailabilityZone>,
}

#[derive(Debug, Deserialize)]
struct HostList {
    hosts: Vec<ComputeHost>,
}

#[derive(Debug, Deserialize)]
struct HypervisorList {
    hypervisors: Vec<Hypervisor>,
}

#[derive(Debug, Deserialize)]
struct ServerPage {
    servers: Vec<Server>,
    #[serde(default)]
    servers_links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct FlavorPage {
    flavors: Vec<Flavor>,
    #[serde(default)]
    flavors_links: Vec<Link>,
}

#[derive(Debug, Deserialize)]
struct PortList {
    ports: Vec<Port>,
}

#[derive(Debug, Deserialize)]
struct NetworkList {
    networks: Vec<Network>,
}

/// A collection page that may point at a following page
trait Page: DeserializeOwned {
    type Item;
    fn into_parts(self) -> (Vec<Self::Item>, Option<String>);
}

impl Page for ServerPage {
    type Item = Server;
    fn into_parts(self) -> (Vec<Server>, Option<String>) {
        let next = next_link(&self.servers_links).map(str::to_string);
        (self.servers, next)
    }
}

impl Page for FlavorPage {
    type Item = Flavor;
    fn into_parts(self) -> (Vec<Flavor>, Option<String>) {
        let next = next_link(&self.flavors_links).map(str::to_string);
        (self.flavors, next)
    }
}

// ============================================================
// Client Implementation
// ============================================================

/// Authenticated client bound to one compute and one network endpoint
pub struct OpenStackClient {
    http: Client,
    token: String,
    compute_url: String,
    network_url: String,
}

/// Build the shared HTTP client
pub fn http_client() -> Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

    Ok(Client::builder()
        .user_agent(USER_AGENT)
        .default_headers(headers)
        .timeout(REQUEST_TIMEOUT)
        .build()?)
}

/// Append the Neutron API version unless the catalog URL already carries it
fn network_base(url: &str) -> String {
    let base = url.trim_end_matches('/');
    if base.ends_with(NETWORK_API_VERSION) {
        base.to_string()
    } else {
        format!("{}/{}", base, NETWORK_API_VERSION)
    }
}

impl OpenStackClient {
    /// Create a client from explicit endpoint URLs and a token
    pub fn new(
        http: Client,
        token: impl Into<String>,
        compute_url: &str,
        network_url: &str,
    ) -> Self {
        Self {
            http,
            token: token.into(),
            compute_url: compute_url.trim_end_matches('/').to_string(),
            network_url: network_base(network_url),
        }
    }

    /// Create a client for the endpoints the catalog offers under `selection`.
    ///
    /// Without an explicit region, the network endpoint is taken from the
    /// region of the first matching compute endpoint.
    pub fn from_access(
        http: Client,
        access: &Access,
        selection: &EndpointSelection,
    ) -> Result<Self> {
        let interface = selection.interface.as_str();
        let compute = access
            .catalog
            .endpoint("compute", selection.region.as_deref(), interface)?;
        let region = selection.region.as_deref().or(compute.region.as_deref());
        let network = access.catalog.endpoint("network", region, interface)?;

        debug!(
            region = region.unwrap_or("<any>"),
            compute = %compute.url,
            network = %network.url,
            "Resolved service endpoints"
        );

        Ok(Self::new(http, access.token.clone(), &compute.url, &network.url))
    }

    /// Authenticate and bind to the selected endpoints in one step
    pub async fn connect(
        creds: &Credentials,
        version: IdentityVersion,
        selection: &EndpointSelection,
    ) -> Result<(Self, Access)> {
        let http = http_client()?;
        let access = identity::authenticate(&http, creds, version).await?;
        let client = Self::from_access(http, &access, selection)?;
        Ok((client, access))
    }

    pub fn compute_url(&self) -> &str {
        &self.compute_url
    }

    pub fn network_url(&self) -> &str {
        &self.network_url
    }

    /// GET a URL and decode its JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(method = "GET", url = %url, "Outgoing request");

        let response = self
            .http
            .get(url)
            .header(AUTH_TOKEN_HEADER, &self.token)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        debug!(status = status.as_u16(), url = %url, bytes = body.len(), "Incoming response");
        trace!(body = %body, "Response body");

        if !status.is_success() {
            return Err(InventoryError::Http {
                url: url.to_string(),
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|source| InventoryError::Decode {
            url: url.to_string(),
            source,
        })
    }

    /// Follow `rel="next"` links until the collection is exhausted
    async fn get_all_pages<P: Page>(&self, first_url: String) -> Result<Vec<P::Item>> {
        let mut items = Vec::new();
        let mut next = Some(first_url);
        let mut pages = 0usize;

        while let Some(url) = next.take() {
            let page: P = self.get_json(&url).await?;
            let (mut batch, following) = page.into_parts();
            items.append(&mut batch);
            pages += 1;
            next = following;
        }

        debug!(pages, items = items.len(), "Collected paginated listing");
        Ok(items)
    }
}

#[async_trait]
impl InventorySource for OpenStackClient {
    async fn availability_zones(&self) -> Result<Vec<AvailabilityZone>> {
        let url = format!("{}/os-availability-zone/detail", self.compute_url);
        let list: AvailabilityZoneList = self.get_json(&url).await?;
        Ok(list.zones)
    }

    async fn compute_hosts(&self) -> Result<Vec<ComputeHost>> {
        let url = format!("{}/os-hosts", self.compute_url);
        let list: HostList = self.get_json(&url).await?;
        Ok(list.hosts)
    }

    async fn hypervisors(&self) -> Result<Vec<Hypervisor>> {
        let url = format!("{}/os-hypervisors/detail", self.compute_url);
        let list: HypervisorList = self.get_json(&url).await?;
        Ok(list.hypervisors)
    }

    async fn servers(&self) -> Result<Vec<Server>> {
        let url = format!("{}/servers/detail", self.compute_url);
        self.get_all_pages::<ServerPage>(url).await
    }

    async fn flavors(&self) -> Result<Vec<Flavor>> {
        let url = format!("{}/flavors/detail", self.compute_url);
        self.get_all_pages::<FlavorPage>(url).await
    }

    async fn ports(&self) -> Result<Vec<Port>> {
        let url = format!("{}/ports", self.network_url);
        let list: PortList = self.get_json(&url).await?;
        Ok(list.ports)
    }

    async fn networks(&self) -> Result<Vec<Network>> {
        let url = format!("{}/networks", self.network_url);
        let list: NetworkList = self.get_json(&url).await?;
        Ok(list.networks)
    }
}
