//! The access-control matrix.
//!
//! A reference passes the matrix iff any entry matches its `(node,
//! path)` pair. The matrix is evaluated on both sides of a dispatch:
//! the calling node checks before routing, and the owning node applies
//! its own matrix on arrival. An empty matrix denies everything.

use regex::Regex;
use resx::callback::{Callback, Requirement};
use resx::error::{Error, Result};
use resx::pattern::PathPattern;
use resx::term::Term;

use crate::node::NodeId;

/// How a scoped entry matches the node of a reference.
#[derive(Debug, Clone)]
pub enum NodeMatch {
    /// A literal node identifier.
    Id(NodeId),
    /// A callback over the node name, returning a boolean.
    Callback(Callback),
}

/// One entry of the matrix.
#[derive(Debug, Clone)]
pub enum AccessRule {
    /// A literal string, extended glob, or regex over the path.
    Pattern(PathPattern),
    /// A callback over the path, returning a boolean.
    Callback(Callback),
    /// A node-scoped pattern: both halves must match.
    Scoped {
        node: NodeMatch,
        pattern: PathPattern,
    },
}

impl AccessRule {
    pub fn glob(pattern: &str) -> Result<Self> {
        Ok(AccessRule::Pattern(PathPattern::glob(pattern)?))
    }

    pub fn regex(re: Regex) -> Self {
        AccessRule::Pattern(PathPattern::regex(re))
    }

    pub fn callback(cb: Callback) -> Self {
        AccessRule::Callback(cb)
    }

    pub fn scoped(node: NodeMatch, pattern: PathPattern) -> Self {
        AccessRule::Scoped { node, pattern }
    }

    async fn matches(&self, node: &NodeId, path: &str) -> Result<bool> {
        match self {
            AccessRule::Pattern(pattern) => Ok(pattern.matches(path)),
            AccessRule::Callback(cb) => {
                expect_bool(
                    cb.call(
                        vec![Term::Text(path.to_string())],
                        Requirement::Required,
                    )
                    .await?,
                )
            }
            AccessRule::Scoped {
                node: node_match,
                pattern,
            } => {
                let node_ok = match node_match {
                    NodeMatch::Id(id) => id == node,
                    NodeMatch::Callback(cb) => expect_bool(
                        cb.call(
                            vec![Term::Text(node.as_str().to_string())],
                            Requirement::Required,
                        )
                        .await?,
                    )?,
                };
                Ok(node_ok && pattern.matches(path))
            }
        }
    }
}

fn expect_bool(term: Term) -> Result<bool> {
    term.as_bool()
        .ok_or_else(|| Error::internal("access callback returned a non-boolean"))
}

/// Whether any entry grants the `(node, path)` pair.
pub async fn allowed(rules: &[AccessRule], node: &NodeId, path: &str) -> Result<bool> {
    for rule in rules {
        if rule.matches(node, path).await? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// The denial every blocked operation surfaces.
pub(crate) fn protected() -> Error {
    Error::InvalidReference("protected file".to_string())
}
