use std::fmt;

use serde::{Deserialize, Serialize};

use crate::integrity::Integrity;
use crate::term::Term;

/// Names the producer responsible for interpreting a reference's
/// repository value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AdapterId(String);

impl AdapterId {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AdapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AdapterId {
    fn from(name: &str) -> Self {
        Self(name.to_string())
    }
}

/// The identity record of a resource: which adapter owns it, that
/// adapter's private repository state, and the integrity stamp.
///
/// References are plain values: freely cloneable, serialisable, and
/// portable across process boundaries. The repository is opaque to
/// everyone but the owning adapter; producers decode it through their own
/// typed repository structs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    adapter: AdapterId,
    repo: Term,
    integrity: Integrity,
}

impl Reference {
    pub fn new(adapter: AdapterId, repo: Term, integrity: Integrity) -> Self {
        Self {
            adapter,
            repo,
            integrity,
        }
    }

    pub fn adapter(&self) -> &AdapterId {
        &self.adapter
    }

    pub fn repo(&self) -> &Term {
        &self.repo
    }

    pub fn integrity(&self) -> &Integrity {
        &self.integrity
    }

    /// A copy of this reference with a different integrity stamp. The
    /// adapter and repository are untouched, so identity is preserved.
    pub fn with_integrity(&self, integrity: Integrity) -> Self {
        Self {
            adapter: self.adapter.clone(),
            repo: self.repo.clone(),
            integrity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serialises_and_roundtrips() {
        let r = Reference::new(
            AdapterId::new("data"),
            Term::Text("payload".to_string()),
            Integrity::now(),
        );
        let bytes = crate::codec::encode(&r).unwrap();
        let back: Reference = crate::codec::decode(&bytes).unwrap();
        assert_eq!(r, back);
    }

    #[test]
    fn with_integrity_preserves_identity() {
        let r = Reference::new(AdapterId::new("file"), Term::Null, Integrity::now());
        let stamped = r.with_integrity(Integrity::now());
        assert_eq!(r.adapter(), stamped.adapter());
        assert_eq!(r.repo(), stamped.repo());
    }
}
