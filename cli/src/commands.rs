pub mod discover;
pub mod ip;
pub mod shell;

use std::net::IpAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};

use lanscope_common::config::Config;
use lanscope_common::vendors::VendorRepository;
use lanscope_core::discovery::SystemArpTable;
use lanscope_core::vendors::MacOuiRepo;
use lanscope_core::{
    CacheStore, ClientResolver, DnsHostnameResolver, Enrichment, HostnameResolver, LocalIpInfo,
    OverrideTable, SessionController, SessionOptions,
};

#[derive(Parser)]
#[command(name = "lanscope")]
#[command(about = "Find clients on the local network and keep a cache of IP information.")]
#[command(version)]
pub struct CommandLine {
    /// Increase log detail (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Configuration file (defaults to ~/.lanscope/config.toml)
    #[arg(long, value_name = "PATH", global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Identify the clients on the local network
    #[command(alias = "d")]
    Discover(DiscoverArgs),
    /// Look up an IP, or list and clear the IP information cache
    #[command(alias = "i")]
    Ip(IpArgs),
}

#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Write resolved clients to FILE as ip|hostname|mac|vendor lines
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Use ARP broadcast instead of the ARP cache (slower, more thorough, needs root)
    #[arg(short, long)]
    pub broadcast: bool,

    /// Do not store the resolved clients in the IP information cache
    #[arg(long)]
    pub no_cache: bool,

    /// Interface to broadcast on
    #[arg(long, value_name = "NAME")]
    pub interface: Option<String>,
}

#[derive(Args, Debug)]
pub struct IpArgs {
    /// Clear IP, or the whole cache when no IP is given
    #[arg(short, long, conflicts_with = "list")]
    pub clear: bool,

    /// List IP, or every cached IP when no IP is given
    #[arg(short, long)]
    pub list: bool,

    pub ip: Option<IpAddr>,
}

impl CommandLine {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Loads the cache and wires the lookup services shared by every command.
pub fn open_session(cfg: &Config, options: SessionOptions) -> Result<(SessionController, Enrichment)> {
    let cache = CacheStore::open(&cfg.cache.path).context("IP information cache is unreadable")?;

    let vendors: Arc<dyn VendorRepository> = Arc::new(MacOuiRepo);
    let overrides = Arc::new(OverrideTable::load(&cfg.discovery.overrides_path));
    let hostnames: Arc<dyn HostnameResolver> =
        Arc::new(DnsHostnameResolver::new(cfg.discovery.lookup_timeout()));

    let resolver = ClientResolver::new(hostnames.clone(), vendors.clone(), overrides.clone());
    let ip_info = LocalIpInfo::new(
        hostnames,
        vendors.clone(),
        overrides.clone(),
        Arc::new(SystemArpTable::new()),
    );

    let session = SessionController::new(cache, Arc::new(resolver), Arc::new(ip_info), options);
    Ok((session, Enrichment::new(vendors, overrides)))
}
