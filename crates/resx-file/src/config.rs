use resx::callback::Callback;

use crate::access::AccessRule;
use crate::node::NodeId;

/// File producer configuration.
///
/// Read on every operation, never cached: reconfiguring the matrix or
/// the transport is observed by the very next call.
#[derive(Debug, Clone, Default)]
pub struct FileConfig {
    /// This process's node identity. File URIs without an authority
    /// resolve to it.
    pub node: NodeId,
    /// The access matrix. Empty denies everything.
    pub access: Vec<AccessRule>,
    /// The RPC transport `(node, op, args) -> result`. Defaults to the
    /// in-process cluster registry.
    pub rpc: Option<Callback>,
}
