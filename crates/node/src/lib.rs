// node/src/lib.rs
pub mod config;
pub mod runtime;

pub use config::{resolve_account, NodeConfig};
pub use runtime::{unix_timestamp, Node};
