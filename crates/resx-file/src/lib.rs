//! File producer/store for the resx pipeline.
//!
//! A file reference is `(node, path, optional source reference)`. Every
//! operation passes the access matrix on both the calling and the
//! owning node, and routes over the pluggable RPC transport when the
//! nodes differ. A file that carries a source doubles as a cache:
//! missing content is restored from the source through the facade's
//! recovery path.

pub mod access;
pub mod cluster;
pub mod config;
pub mod node;
pub mod testkit;

mod attrs;
mod producer;
mod repo;

pub use access::{allowed, AccessRule, NodeMatch};
pub use config::FileConfig;
pub use node::{NodeId, LOCAL_NODE};
pub use producer::{FileProducer, ADAPTER};
