//! OpenStack Inventory CLI
//!
//! Authenticates against Keystone and reports which compute hosts have free
//! capacity, what is running on them, and which networks those workloads use.
//!
//! # Usage
//! ```bash
//! # Full correlation report from a properties file
//! openstack-inventory --credentials credentials.properties report
//!
//! # Same, with custom thresholds and JSON output
//! openstack-inventory report --zone nova --min-disk-gb 20 --min-ram-mb 4096 --output json
//!
//! # Raw listings and token/catalog info (credentials from OS_* env vars)
//! openstack-inventory list hypervisors
//! openstack-inventory token
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use tracing::{info, Level};
use tracing_subscriber::EnvFilter;

use openstack_inventory::config::{
    CredentialOverrides, DEFAULT_MIN_DISK_GB, DEFAULT_MIN_RAM_MB,
};
use openstack_inventory::{
    client, correlate, identity, report, Credentials, EndpointSelection, FilterConfig,
    IdentityVersion, Inventory, InventorySource, OpenStackClient,
};

// ============================================================
// CLI Definition
// ============================================================

#[derive(Parser)]
#[command(name = "openstack-inventory")]
#[command(about = "Read-only OpenStack capacity and workload inventory", long_about = None)]
#[command(version)]
struct Cli {
    /// Properties file with keystone.url, username, password and tenant
    #[arg(long, short = 'c', env = "OS_CREDENTIALS_FILE")]
    credentials: Option<PathBuf>,

    /// Keystone URL (e.g. http://controller:5000/v2.0)
    #[arg(long, env = "OS_AUTH_URL")]
    auth_url: Option<String>,

    #[arg(long, env = "OS_USERNAME")]
    username: Option<String>,

    #[arg(long, env = "OS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Tenant (project) to scope the token to
    #[arg(long, env = "OS_TENANT_NAME")]
    tenant: Option<String>,

    /// Identity API version (detected from the auth URL by default)
    #[arg(long, value_enum)]
    identity_version: Option<IdentityVersionArg>,

    /// Region to pick catalog endpoints from (default: first listed)
    #[arg(long, env = "OS_REGION_NAME")]
    region: Option<String>,

    /// Catalog endpoint interface
    #[arg(long, env = "OS_INTERFACE", default_value = "public")]
    interface: String,

    /// Enable verbose logging (request/response lines)
    #[arg(short, long)]
    verbose: bool,

    /// Log line format
    #[arg(long, value_enum, default_value = "text")]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch the inventory and print the capacity/workload correlation
    Report {
        /// Availability zone to consider (repeatable)
        #[arg(long = "zone")]
        zones: Vec<String>,

        /// Minimum free disk per compute host, in GB
        #[arg(long, default_value_t = DEFAULT_MIN_DISK_GB)]
        min_disk_gb: i64,

        /// Minimum free RAM per compute host, in MB
        #[arg(long, default_value_t = DEFAULT_MIN_RAM_MB)]
        min_ram_mb: i64,

        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },

    /// Authenticate and print the token expiry and service catalog
    Token {
        /// Also print the token id
        #[arg(long)]
        show_token: bool,
    },

    /// Print one raw resource collection
    List {
        #[arg(value_enum)]
        resource: Resource,

        #[arg(long, value_enum, default_value = "text")]
        output: OutputFormat,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum IdentityVersionArg {
    V2,
    V3,
}

impl From<IdentityVersionArg> for IdentityVersion {
    fn from(arg: IdentityVersionArg) -> Self {
        match arg {
            IdentityVersionArg::V2 => IdentityVersion::V2,
            IdentityVersionArg::V3 => IdentityVersion::V3,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Clone, Copy, ValueEnum)]
enum Resource {
    Zones,
    Hosts,
    Hypervisors,
    Servers,
    Flavors,
    Ports,
    Networks,
}

// ============================================================
// Main Entry Point
// ============================================================

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.log_format);

    let overrides = CredentialOverrides {
        auth_url: cli.auth_url.clone(),
        username: cli.username.clone(),
        password: cli.password.clone(),
        tenant: cli.tenant.clone(),
    };
    let creds = Credentials::resolve(cli.credentials.as_deref(), overrides)
        .context("Failed to load credentials")?;

    let version = cli
        .identity_version
        .map(IdentityVersion::from)
        .unwrap_or_else(|| IdentityVersion::detect(&creds.auth_url));

    let selection = EndpointSelection {
        region: cli.region.clone(),
        interface: cli.interface.clone(),
    };

    info!(
        auth_url = %creds.auth_url,
        user = %creds.username,
        tenant = %creds.tenant,
        identity = %version,
        "🔐 Authenticating"
    );

    match cli.command {
        Commands::Token { show_token } => {
            let http = client::http_client()?;
            let access = identity::authenticate(&http, &creds, version)
                .await
                .context("Keystone authentication failed")?;

            print!("{}", report::render_access(&access, show_token));
        }

        Commands::Report {
            zones,
            min_disk_gb,
            min_ram_mb,
            output,
        } => {
            let (os, access) = OpenStackClient::connect(&creds, version, &selection)
                .await
                .context("Failed to connect to OpenStack")?;

            let inventory = Inventory::fetch(&os)
                .await
                .context("Failed to fetch inventory")?;

            let filter = FilterConfig::default()
                .with_zones(zones)
                .with_thresholds(min_disk_gb, min_ram_mb);
            let correlation = correlate(&inventory, &filter);

            match output {
                OutputFormat::Text => {
                    let regions = access.catalog.regions();
                    print!("{}", report::render_report(&correlation, &regions))
                }
                OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&correlation)?),
            }

            info!(
                candidate_hosts = correlation.resources.len(),
                active_vms = correlation.servers_by_host.values().map(Vec::len).sum::<usize>(),
                "✅ Report complete"
            );
        }

        Commands::List { resource, output } => {
            let (os, _access) = OpenStackClient::connect(&creds, version, &selection)
                .await
                .context("Failed to connect to OpenStack")?;

            list_resource(&os, resource, output).await?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool, format: LogFormat) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    match format {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

fn emit<T: Serialize>(items: &[T], output: OutputFormat, render: fn(&[T]) -> String) -> Result<()> {
    match output {
        OutputFormat::Text => print!("{}", render(items)),
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(items)?),
    }
    info!("📋 Listed {} records", items.len());
    Ok(())
}

async fn list_resource<S: InventorySource>(
    source: &S,
    resource: Resource,
    output: OutputFormat,
) -> Result<()> {
    match resource {
        Resource::Zones => {
            let zones = source
                .availability_zones()
                .await
                .context("Failed to list availability zones")?;
            emit(&zones, output, report::render_zones)
        }
        Resource::Hosts => {
            let hosts = source
                .compute_hosts()
                .await
                .context("Failed to list compute hosts")?;
            emit(&hosts, output, report::render_hosts)
        }
        Resource::Hypervisors => {
            let hypervisors = source
                .hypervisors()
                .await
                .context("Failed to list hypervisors")?;
            emit(&hypervisors, output, report::render_hypervisors)
        }
        Resource::Servers => {
            let servers = source
                .servers()
                .await
                .context("Failed to list servers")?;
            emit(&servers, output, report::render_servers)
        }
        Resource::Flavors => {
            let flavors = source
                .flavors()
                .await
                .context("Failed to list flavors")?;
            emit(&flavors, output, report::render_flavors)
        }
        Resource::Ports => {
            let ports = source
                .ports()
                .await
                .context("Failed to list ports")?;
            emit(&ports, output, report::render_ports)
        }
        Resource::Networks => {
            let networks = source
                .networks()
                .await
                .context("Failed to list networks")?;
            emit(&networks, output, report::render_networks)
        }
    }
}
