//! The in-process node registry: the default RPC transport.
//!
//! Deployments with a real transport configure an `rpc` callback; the
//! registry is what "the ambient runtime" means in this process. Each
//! registered node owns its own facade handle and file configuration,
//! so every dispatch crosses a real configuration boundary. It doubles
//! as the test network.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::RwLock;

use resx::error::{Error, Result};
use resx::term::Term;
use resx::Resx;

use crate::node::NodeId;
use crate::producer::FileProducer;

struct Entry {
    rt: Resx,
    producer: Arc<FileProducer>,
}

static REGISTRY: OnceLock<RwLock<HashMap<NodeId, Entry>>> = OnceLock::new();

fn registry() -> &'static RwLock<HashMap<NodeId, Entry>> {
    REGISTRY.get_or_init(|| RwLock::new(HashMap::new()))
}

/// Make a node reachable. Re-registering a name replaces the previous
/// entry.
pub fn register(node: NodeId, rt: Resx, producer: Arc<FileProducer>) {
    tracing::debug!(%node, "registering cluster node");
    registry().write().insert(node, Entry { rt, producer });
}

/// Remove a node from the registry.
pub fn unregister(node: &NodeId) {
    registry().write().remove(node);
}

/// Route one operation to a registered node. The receiving node serves
/// it under its own configuration. Custom transports can wrap this to
/// observe or reroute traffic.
pub async fn dispatch(node: &NodeId, op: &str, args: Vec<Term>) -> Result<Term> {
    let entry = {
        let registry = registry().read();
        registry
            .get(node)
            .map(|entry| (entry.rt.clone(), entry.producer.clone()))
    };
    let Some((rt, producer)) = entry else {
        return Err(Error::Internal(format!("node {node} is unreachable")));
    };
    tracing::debug!(%node, op, "dispatching file operation");
    producer.serve(&rt, op, args).await
}
