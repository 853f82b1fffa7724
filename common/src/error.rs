use std::path::PathBuf;

use thiserror::Error;

/// Failures of the persistent IP information cache.
#[derive(Error, Debug)]
pub enum CacheError {
    #[error("unable to read cache file {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to write cache file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("unable to serialize cache: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Reasons a discovery source could not produce a snapshot.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("address resolution table unavailable: {0}")]
    SourceUnavailable(String),

    #[error("broadcast discovery requires root privileges")]
    Privileges,

    #[error("no usable network interface: {0}")]
    NoInterface(String),

    #[error("datalink channel error: {0}")]
    Channel(#[from] std::io::Error),

    #[error("unsupported datalink channel type on {0}")]
    UnsupportedChannel(String),
}

/// Problems with a line typed into the interactive loop.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum InputError {
    #[error("{0} does not appear to be valid")]
    InvalidAddress(String),

    #[error("missing search criteria")]
    MissingSearch,
}
