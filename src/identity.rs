//! Keystone Authentication
//!
//! Exchanges password credentials for a tenant-scoped token and the service
//! catalog that comes with it. Identity v2.0 (`/tokens`) and v3
//! (`/auth/tokens`) responses are normalised into one [`ServiceCatalog`].

use std::fmt;

use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, trace};

use crate::config::{Credentials, EndpointSelection};
use crate::error::{InventoryError, Result};

/// Header carrying the token in v3 authentication responses
const SUBJECT_TOKEN_HEADER: &str = "X-Subject-Token";
const DEFAULT_DOMAIN: &str = "Default";

/// Keystone API version used for authentication
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentityVersion {
    V2,
    V3,
}

impl IdentityVersion {
    /// Guess the version from the auth URL path (`.../v3` means v3)
    pub fn detect(auth_url: &str) -> Self {
        let path = auth_url.trim_end_matches('/');
        if path.ends_with("/v3") || path.contains("/v3/") {
            IdentityVersion::V3
        } else {
            IdentityVersion::V2
        }
    }
}

impl fmt::Display for IdentityVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityVersion::V2 => write!(f, "v2.0"),
            IdentityVersion::V3 => write!(f, "v3"),
        }
    }
}

/// One endpoint of a catalog service
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEndpoint {
    pub region: Option<String>,
    /// `public`, `internal` or `admin`
    pub interface: String,
    pub url: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct CatalogService {
    pub service_type: String,
    pub name: String,
    pub endpoints: Vec<CatalogEndpoint>,
}

/// Services reachable with the issued token
#[derive(Debug, Clone, Default, Serialize)]
pub struct ServiceCatalog {
    pub services: Vec<CatalogService>,
}

impl ServiceCatalog {
    /// First endpoint matching service type, interface and (optional) region
    pub fn endpoint(
        &self,
        service_type: &str,
        region: Option<&str>,
        interface: &str,
    ) -> Result<&CatalogEndpoint> {
        self.services
            .iter()
            .filter(|s| s.service_type == service_type)
            .flat_map(|s| s.endpoints.iter())
            .find(|e| {
                e.interface == interface
                    && region.map_or(true, |r| e.region.as_deref() == Some(r))
            })
            .ok_or_else(|| InventoryError::EndpointNotFound {
                service_type: service_type.to_string(),
                region: region.map(str::to_string),
                interface: interface.to_string(),
            })
    }

    /// URL of the first endpoint matching service type, interface and (optional) region
    pub fn endpoint_url(
        &self,
        service_type: &str,
        region: Option<&str>,
        interface: &str,
    ) -> Result<&str> {
        self.endpoint(service_type, region, interface)
            .map(|e| e.url.as_str())
    }

    /// Same as [`endpoint_url`](Self::endpoint_url) driven by an [`EndpointSelection`]
    pub fn select(&self, service_type: &str, selection: &EndpointSelection) -> Result<&str> {
        self.endpoint_url(
            service_type,
            selection.region.as_deref(),
            &selection.interface,
        )
    }

    /// Distinct regions named by any endpoint, in catalog order
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = Vec::new();
        for region in self
            .services
            .iter()
            .flat_map(|s| s.endpoints.iter())
            .filter_map(|e| e.region.as_ref())
        {
            if !regions.contains(region) {
                regions.push(region.clone());
            }
        }
        regions
    }
}

/// An issued token plus its catalog
#[derive(Clone, Serialize)]
pub struct Access {
    #[serde(skip)]
    pub token: String,
    pub version: IdentityVersion,
    pub expires_at: Option<DateTime<Utc>>,
    pub catalog: ServiceCatalog,
}

impl fmt::Debug for Access {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Access")
            .field("token", &"***")
            .field("version", &self.version)
            .field("expires_at", &self.expires_at)
            .field("catalog", &self.catalog)
            .finish()
    }
}

// ============================================================
// Identity v2.0 wire types
// ============================================================

#[derive(Debug, Deserialize)]
struct V2Response {
    access: V2Access,
}

#[derive(Debug, Deserialize)]
struct V2Access {
    token: V2Token,
    #[serde(rename = "serviceCatalog", default)]
    service_catalog: Vec<V2Service>,
}

#[derive(Debug, Deserialize)]
struct V2Token {
    id: String,
    #[serde(default)]
    expires: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize)]
struct V2Service {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    endpoints: Vec<V2Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V2Endpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(rename = "publicURL", default)]
    public_url: Option<String>,
    #[serde(rename = "internalURL", default)]
    internal_url: Option<String>,
    #[serde(rename = "adminURL", default)]
    admin_url: Option<String>,
}

impl From<V2Service> for CatalogService {
    fn from(service: V2Service) -> Self {
        let endpoints = service
            .endpoints
            .into_iter()
            .flat_map(|e| {
                let region = e.region;
                [
                    ("public", e.public_url),
                    ("internal", e.internal_url),
                    ("admin", e.admin_url),
                ]
                .into_iter()
                .filter_map(move |(interface, url)| {
                    url.map(|url| CatalogEndpoint {
                        region: region.clone(),
                        interface: interface.to_string(),
                        url,
                    })
                })
            })
            .collect();

        Self {
            service_type: service.service_type,
            name: service.name,
            endpoints,
        }
    }
}

// ============================================================
// Identity v3 wire types
// ============================================================

#[derive(Debug, Deserialize)]
struct V3Response {
    token: V3Token,
}

#[derive(Debug, Deserialize)]
struct V3Token {
    #[serde(default)]
    expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    catalog: Vec<V3Service>,
}

#[derive(Debug, Deserialize)]
struct V3Service {
    #[serde(rename = "type")]
    service_type: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    endpoints: Vec<V3Endpoint>,
}

#[derive(Debug, Deserialize)]
struct V3Endpoint {
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    region_id: Option<String>,
    interface: String,
    url: String,
}

impl From<V3Service> for CatalogService {
    fn from(service: V3Service) -> Self {
        Self {
            service_type: service.service_type,
            name: service.name,
            endpoints: service
                .endpoints
                .into_iter()
                .map(|e| CatalogEndpoint {
                    region: e.region.or(e.region_id),
                    interface: e.interface,
                    url: e.url,
                })
                .collect(),
        }
    }
}

// ============================================================
// Authentication
// ============================================================

/// Token endpoint for the given identity version
pub fn token_url(auth_url: &str, version: IdentityVersion) -> String {
    let base = auth_url.trim_end_matches('/');
    match version {
        IdentityVersion::V2 => format!("{}/tokens", base),
        IdentityVersion::V3 => format!("{}/auth/tokens", base),
    }
}

/// Password authentication request body
pub fn auth_request(creds: &Credentials, version: IdentityVersion) -> Value {
    match version {
        IdentityVersion::V2 => json!({
            "auth": {
                "passwordCredentials": {
                    "username": creds.username,
                    "password": creds.password,
                },
                "tenantName": creds.tenant,
            }
        }),
        IdentityVersion::V3 => json!({
            "auth": {
                "identity": {
                    "methods": ["password"],
                    "password": {
                        "user": {
                            "name": creds.username,
                            "domain": { "name": DEFAULT_DOMAIN },
                            "password": creds.password,
                        }
                    }
                },
                "scope": {
                    "project": {
                        "name": creds.tenant,
                        "domain": { "name": DEFAULT_DOMAIN },
                    }
                }
            }
        }),
    }
}

/// Copy of a JSON body with every `password` value and `token.id` masked
pub fn redact(value: &Value) -> Value {
    let masked = || Value::String("***".to_string());
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = match (k.as_str(), v) {
                        ("password", Value::String(_)) => masked(),
                        ("token", Value::Object(token))
                            if token.get("id").map_or(false, Value::is_string) =>
                        {
                            let mut token = redact(v);
                            token["id"] = masked();
                            token
                        }
                        _ => redact(v),
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}

/// Authenticate against Keystone and return the scoped token and catalog
pub async fn authenticate(
    http: &Client,
    creds: &Credentials,
    version: IdentityVersion,
) -> Result<Access> {
    let url = token_url(&creds.auth_url, version);
    let body = auth_request(creds, version);

    debug!(method = "POST", url = %url, identity = %version, "Outgoing request");
    trace!(body = %redact(&body), "Request body");

    let response = http.post(&url).json(&body).send().await?;
    let status = response.status();
    let subject_token = response
        .headers()
        .get(SUBJECT_TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = response.text().await?;

    debug!(status = status.as_u16(), url = %url, "Incoming response");
    if let Ok(value) = serde_json::from_str::<Value>(&text) {
        trace!(body = %redact(&value), "Response body");
    }

    if !status.is_success() {
        return Err(InventoryError::Authentication {
            status: status.as_u16(),
            body: text,
        });
    }

    let decode = |source| InventoryError::Decode {
        url: url.clone(),
        source,
    };

    let access = match version {
        IdentityVersion::V2 => {
            let parsed: V2Response = serde_json::from_str(&text).map_err(decode)?;
            Access {
                token: parsed.access.token.id,
                version,
                expires_at: parsed.access.token.expires,
                catalog: ServiceCatalog {
                    services: parsed
                        .access
                        .service_catalog
                        .into_iter()
                        .map(CatalogService::from)
                        .collect(),
                },
            }
        }
        IdentityVersion::V3 => {
            let parsed: V3Response = serde_json::from_str(&text).map_err(decode)?;
            let token = subject_token.ok_or_else(|| InventoryError::Authentication {
                status: status.as_u16(),
                body: format!("response is missing the {} header", SUBJECT_TOKEN_HEADER),
            })?;
            Access {
                token,
                version,
                expires_at: parsed.token.expires_at,
                catalog: ServiceCatalog {
                    services: parsed
                        .token
                        .catalog
                        .into_iter()
                        .map(CatalogService::from)
                        .collect(),
                },
            }
        }
    };

    info!(
        user = %creds.username,
        tenant = %creds.tenant,
        services = access.catalog.services.len(),
        "Authenticated against Keystone"
    );

    Ok(access)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials {
            auth_url: "http://controller:5000/v2.0/".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            tenant: "demo".to_string(),
        }
    }

    fn catalog() -> ServiceCatalog {
        let v2: Vec<V2Service> = serde_json::from_value(json!([
            {
                "type": "compute",
                "name": "nova",
                "endpoints": [
                    {
                        "region": "RegionOne",
                        "publicURL": "http://nova-r1:8774/v2.1",
                        "internalURL": "http://nova-r1.internal:8774/v2.1"
                    },
                    {
                        "region": "RegionTwo",
                        "publicURL": "http://nova-r2:8774/v2.1"
                    }
                ]
            },
            {
                "type": "network",
                "name": "neutron",
                "endpoints": [
                    {"region": "RegionOne", "publicURL": "http://neutron:9696"}
                ]
            }
        ]))
        .unwrap();
        ServiceCatalog {
            services: v2.into_iter().map(CatalogService::from).collect(),
        }
    }

    #[test]
    fn test_detect_version() {
        assert_eq!(IdentityVersion::detect("http://ks:5000/v3"), IdentityVersion::V3);
        assert_eq!(IdentityVersion::detect("http://ks:5000/v3/"), IdentityVersion::V3);
        assert_eq!(IdentityVersion::detect("http://ks:5000/v2.0"), IdentityVersion::V2);
        assert_eq!(IdentityVersion::detect("http://ks:5000"), IdentityVersion::V2);
    }

    #[test]
    fn test_token_url() {
        assert_eq!(
            token_url("http://controller:5000/v2.0/", IdentityVersion::V2),
            "http://controller:5000/v2.0/tokens"
        );
        assert_eq!(
            token_url("http://controller:5000/v3", IdentityVersion::V3),
            "http://controller:5000/v3/auth/tokens"
        );
    }

    #[test]
    fn test_endpoint_lookup() {
        let catalog = catalog();

        assert_eq!(
            catalog.endpoint_url("compute", None, "public").unwrap(),
            "http://nova-r1:8774/v2.1"
        );
        assert_eq!(
            catalog.endpoint_url("compute", Some("RegionTwo"), "public").unwrap(),
            "http://nova-r2:8774/v2.1"
        );
        assert_eq!(
            catalog.endpoint_url("compute", None, "internal").unwrap(),
            "http://nova-r1.internal:8774/v2.1"
        );
        assert!(matches!(
            catalog.endpoint_url("network", Some("RegionTwo"), "public"),
            Err(InventoryError::EndpointNotFound { .. })
        ));
        assert!(catalog.endpoint_url("image", None, "public").is_err());
    }

    #[test]
    fn test_regions_are_distinct() {
        assert_eq!(catalog().regions(), vec!["RegionOne", "RegionTwo"]);
    }

    #[test]
    fn test_auth_request_bodies() {
        let v2 = auth_request(&creds(), IdentityVersion::V2);
        assert_eq!(v2["auth"]["tenantName"], "demo");
        assert_eq!(v2["auth"]["passwordCredentials"]["username"], "admin");

        let v3 = auth_request(&creds(), IdentityVersion::V3);
        assert_eq!(v3["auth"]["identity"]["methods"][0], "password");
        assert_eq!(v3["auth"]["scope"]["project"]["name"], "demo");
    }

    #[test]
    fn test_redact_masks_passwords() {
        for version in [IdentityVersion::V2, IdentityVersion::V3] {
            let redacted = redact(&auth_request(&creds(), version)).to_string();
            assert!(!redacted.contains("hunter2"));
            assert!(redacted.contains("***"));
            assert!(redacted.contains("admin"));
        }
    }

    #[test]
    fn test_redact_masks_token_id() {
        let body = json!({
            "access": {
                "token": {"id": "gAAAA-secret", "expires": "2026-01-01T00:00:00Z"},
                "user": {"id": "u-1", "name": "admin"}
            }
        });

        let redacted = redact(&body);
        assert_eq!(redacted["access"]["token"]["id"], json!("***"));
        assert_eq!(redacted["access"]["token"]["expires"], json!("2026-01-01T00:00:00Z"));
        assert_eq!(redacted["access"]["user"]["id"], json!("u-1"));
    }
}
