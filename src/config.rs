//! Credentials and Filter Configuration
//!
//! Static connection settings (Keystone URL, user, password, tenant) loaded
//! from a `.properties` file and/or overrides, plus the thresholds used by
//! the correlator.

use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use serde::Serialize;
use tracing::debug;

use crate::error::{InventoryError, Result};

pub const KEY_AUTH_URL: &str = "keystone.url";
pub const KEY_USERNAME: &str = "username";
pub const KEY_PASSWORD: &str = "password";
pub const KEY_TENANT: &str = "tenant";

/// Availability zone names considered when no `--zone` is given
pub const DEFAULT_ZONE: &str = "nova";
pub const DEFAULT_MIN_DISK_GB: i64 = 10;
pub const DEFAULT_MIN_RAM_MB: i64 = 1024;

/// Keystone credentials for a password-authenticated, tenant-scoped token
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub auth_url: String,
    pub username: String,
    pub password: String,
    pub tenant: String,
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_url", &self.auth_url)
            .field("username", &self.username)
            .field("password", &"***")
            .field("tenant", &self.tenant)
            .finish()
    }
}

/// Per-field values that take precedence over the properties file
#[derive(Debug, Clone, Default)]
pub struct CredentialOverrides {
    pub auth_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub tenant: Option<String>,
}

impl Credentials {
    /// Load credentials from a `.properties` file
    pub fn from_properties(path: impl AsRef<Path>) -> Result<Self> {
        Self::resolve(Some(path.as_ref()), CredentialOverrides::default())
    }

    /// Build credentials from an optional properties file and overrides.
    ///
    /// Non-empty overrides win over file values; every key must end up set.
    pub fn resolve(path: Option<&Path>, overrides: CredentialOverrides) -> Result<Self> {
        let mut props = match path {
            Some(path) => {
                debug!(path = %path.display(), "Reading credentials file");
                let text = std::fs::read_to_string(path)?;
                parse_properties(&text)
            }
            None => HashMap::new(),
        };

        let mut take = |key: &str, over: Option<String>| -> Result<String> {
            over.filter(|v| !v.is_empty())
                .or_else(|| props.remove(key))
                .filter(|v| !v.is_empty())
                .ok_or_else(|| InventoryError::config(format!("missing credential '{}'", key)))
        };

        Ok(Self {
            auth_url: take(KEY_AUTH_URL, overrides.auth_url)?,
            username: take(KEY_USERNAME, overrides.username)?,
            password: take(KEY_PASSWORD, overrides.password)?,
            tenant: take(KEY_TENANT, overrides.tenant)?,
        })
    }
}

/// Parse Java-style properties text (`key=value` or `key: value`).
///
/// Lines starting with `#` or `!` are comments. Later keys replace earlier ones.
pub fn parse_properties(text: &str) -> HashMap<String, String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('!'))
        .filter_map(|line| {
            let split = line.find(&['=', ':'][..])?;
            let (key, value) = line.split_at(split);
            Some((key.trim().to_string(), value[1..].trim().to_string()))
        })
        .collect()
}

/// Static thresholds and allow-lists applied by the correlator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FilterConfig {
    /// Availability zone names to consider
    pub zone_names: BTreeSet<String>,
    /// Minimum free disk per compute host, in GB
    pub min_disk_gb: i64,
    /// Minimum free RAM per compute host, in MB
    pub min_ram_mb: i64,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            zone_names: BTreeSet::from([DEFAULT_ZONE.to_string()]),
            min_disk_gb: DEFAULT_MIN_DISK_GB,
            min_ram_mb: DEFAULT_MIN_RAM_MB,
        }
    }
}

impl FilterConfig {
    /// Replace the zone allow-list; an empty list keeps the default
    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let zones: BTreeSet<String> = zones.into_iter().map(Into::into).collect();
        if !zones.is_empty() {
            self.zone_names = zones;
        }
        self
    }

    pub fn with_thresholds(mut self, min_disk_gb: i64, min_ram_mb: i64) -> Self {
        self.min_disk_gb = min_disk_gb;
        self.min_ram_mb = min_ram_mb;
        self
    }
}

/// Which catalog endpoints the client should talk to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointSelection {
    /// Region to match; `None` follows the region of the first compute endpoint
    pub region: Option<String>,
    /// Endpoint interface (`public`, `internal`, `admin`)
    pub interface: String,
}

impl Default for EndpointSelection {
    fn default() -> Self {
        Self {
            region: None,
            interface: "public".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
# cloud access
keystone.url=http://controller:5000/v2.0
username = admin
password: s3cr=t
! legacy comment
tenant=demo
";

    #[test]
    fn test_parse_properties() {
        let props = parse_properties(SAMPLE);
        assert_eq!(props.len(), 4);
        assert_eq!(props["keystone.url"], "http://controller:5000/v2.0");
        assert_eq!(props["username"], "admin");
        // only the first separator splits
        assert_eq!(props["password"], "s3cr=t");
        assert_eq!(props["tenant"], "demo");
    }

    #[test]
    fn test_from_properties_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let creds = Credentials::from_properties(file.path()).unwrap();
        assert_eq!(creds.auth_url, "http://controller:5000/v2.0");
        assert_eq!(creds.tenant, "demo");
    }

    #[test]
    fn test_overrides_win() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let overrides = CredentialOverrides {
            tenant: Some("ops".to_string()),
            ..Default::default()
        };
        let creds = Credentials::resolve(Some(file.path()), overrides).unwrap();
        assert_eq!(creds.tenant, "ops");
        assert_eq!(creds.username, "admin");
    }

    #[test]
    fn test_empty_override_falls_back_to_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let overrides = CredentialOverrides {
            password: Some(String::new()),
            ..Default::default()
        };
        let creds = Credentials::resolve(Some(file.path()), overrides).unwrap();
        assert_eq!(creds.password, "s3cr=t");
    }

    #[test]
    fn test_missing_key_is_config_error() {
        let overrides = CredentialOverrides {
            auth_url: Some("http://controller:5000/v3".to_string()),
            username: Some("admin".to_string()),
            password: Some("pw".to_string()),
            tenant: None,
        };
        let err = Credentials::resolve(None, overrides).unwrap_err();
        assert!(matches!(err, InventoryError::Config(ref m) if m.contains("tenant")));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials {
            auth_url: "http://controller:5000/v3".to_string(),
            username: "admin".to_string(),
            password: "hunter2".to_string(),
            tenant: "demo".to_string(),
        };
        let rendered = format!("{:?}", creds);
        assert!(!rendered.contains("hunter2"));
        assert!(rendered.contains("***"));
    }

    #[test]
    fn test_filter_config_defaults() {
        let filter = FilterConfig::default();
        assert!(filter.zone_names.contains("nova"));
        assert_eq!(filter.min_disk_gb, 10);
        assert_eq!(filter.min_ram_mb, 1024);

        let filter = FilterConfig::default()
            .with_zones(Vec::<String>::new())
            .with_thresholds(20, 4096);
        assert_eq!(filter.zone_names.len(), 1);
        assert_eq!(filter.min_ram_mb, 4096);

        let filter = FilterConfig::default().with_zones(["az1", "az2"]);
        assert!(!filter.zone_names.contains("nova"));
    }
}
