use std::cmp::Ordering;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};

/// A named digest over a resource's content. Meta is never part of the
/// digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checksum {
    pub algorithm: String,
    #[serde(with = "serde_bytes")]
    pub digest: Vec<u8>,
}

impl Checksum {
    pub fn new(algorithm: impl Into<String>, digest: Vec<u8>) -> Self {
        Self {
            algorithm: algorithm.into(),
            digest,
        }
    }

    pub fn hex(&self) -> String {
        hex::encode(&self.digest)
    }
}

/// The integrity stamp carried by every reference: an optional checksum
/// and the wall-clock instant the reference was minted.
///
/// Absence of a checksum means "not finalised yet"; it is never the same
/// thing as a zero digest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Integrity {
    pub checksum: Option<Checksum>,
    pub timestamp: SystemTime,
}

impl Integrity {
    pub fn new(checksum: Option<Checksum>, timestamp: SystemTime) -> Self {
        Self {
            checksum,
            timestamp,
        }
    }

    /// A fresh stamp with no checksum, dated now.
    pub fn now() -> Self {
        Self {
            checksum: None,
            timestamp: SystemTime::now(),
        }
    }

    pub fn at(timestamp: SystemTime) -> Self {
        Self {
            checksum: None,
            timestamp,
        }
    }

    pub fn with_checksum(mut self, checksum: Checksum) -> Self {
        self.checksum = Some(checksum);
        self
    }

    /// Compare two stamps: checksum equality and timestamp order.
    ///
    /// Checksum equality is `Some(true)` when both sides carry the same
    /// algorithm and digest, `Some(false)` when the algorithm matches but
    /// the digest differs, and `None` otherwise (either side missing, or
    /// the algorithms are not comparable).
    pub fn compare(a: &Integrity, b: &Integrity) -> (Option<bool>, Ordering) {
        let equality = match (&a.checksum, &b.checksum) {
            (Some(ca), Some(cb)) if ca.algorithm == cb.algorithm => Some(ca.digest == cb.digest),
            _ => None,
        };
        (equality, a.timestamp.cmp(&b.timestamp))
    }
}
