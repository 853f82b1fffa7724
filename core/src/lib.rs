//! Discovery, resolution and caching engine behind the `lanscope` CLI.
//!
//! The pieces are wired together by [`session::SessionController`]; each one
//! sits behind a trait so tests can substitute fakes for the network.

pub mod cache;
pub mod discovery;
pub mod ipinfo;
pub mod overrides;
pub mod queue;
pub mod report;
pub mod resolver;
pub mod session;
pub mod vendors;

pub use cache::{CacheRecord, CacheStore};
pub use discovery::{DiscoveryProvider, Enrichment, Strategy};
pub use ipinfo::{IpInfoSource, LocalIpInfo};
pub use overrides::OverrideTable;
pub use resolver::{ClientResolver, DnsHostnameResolver, HostnameResolver};
pub use session::{DiscoveryReport, SessionController, SessionOptions, SessionState};
