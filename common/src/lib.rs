//! Shared building blocks for `lanscope`.
//!
//! Everything in here is free of I/O orchestration: the client model, the
//! cancellation flag shared by workers, configuration, error types and the
//! small network helpers used by both the discovery providers and the CLI.

pub mod cancel;
pub mod config;
pub mod error;
pub mod network;
pub mod vendors;

pub use cancel::CancelFlag;
pub use network::client::{LanClient, ResolvedClient, UNKNOWN};
