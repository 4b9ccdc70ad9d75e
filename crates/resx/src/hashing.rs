//! Checksum computation over content.
//!
//! An algorithm is either a built-in name, a whole-buffer callback pair,
//! or an incremental callback triple driven chunk by chunk through the
//! binary content reducer.

use bytes::Bytes;
use sha2::{Digest, Sha256, Sha512};

use crate::callback::{Callback, Requirement};
use crate::content::{Content, ReducerKind};
use crate::error::{Error, Result};
use crate::integrity::Checksum;
use crate::term::Term;
use crate::Resx;

pub const DEFAULT_ALGORITHM: &str = "sha256";

/// How to digest content.
#[derive(Debug, Clone)]
pub enum HashSpec {
    /// A built-in algorithm by name (`sha256`, `sha512`).
    Named(String),
    /// A whole-buffer hasher: materialise, then one call.
    Whole { name: String, hasher: Callback },
    /// An incremental hasher driven over stream chunks.
    Incremental {
        name: String,
        init: Callback,
        update: Callback,
        finish: Callback,
    },
}

impl HashSpec {
    pub fn named(name: impl Into<String>) -> Self {
        HashSpec::Named(name.into())
    }

    pub fn name(&self) -> &str {
        match self {
            HashSpec::Named(name) => name,
            HashSpec::Whole { name, .. } => name,
            HashSpec::Incremental { name, .. } => name,
        }
    }
}

impl Default for HashSpec {
    fn default() -> Self {
        HashSpec::Named(DEFAULT_ALGORITHM.to_string())
    }
}

enum Builtin {
    Sha256(Sha256),
    Sha512(Sha512),
}

impl Builtin {
    fn new(name: &str) -> Result<Self> {
        match name {
            "sha256" => Ok(Builtin::Sha256(Sha256::new())),
            "sha512" => Ok(Builtin::Sha512(Sha512::new())),
            other => Err(Error::Internal(format!("unknown hash algorithm: {other}"))),
        }
    }

    fn update(&mut self, data: &[u8]) {
        match self {
            Builtin::Sha256(h) => h.update(data),
            Builtin::Sha512(h) => h.update(data),
        }
    }

    fn finish(self) -> Vec<u8> {
        match self {
            Builtin::Sha256(h) => h.finalize().to_vec(),
            Builtin::Sha512(h) => h.finalize().to_vec(),
        }
    }
}

/// Digest a payload under the given spec.
pub async fn digest(rt: &Resx, content: &Content, spec: &HashSpec) -> Result<Checksum> {
    match spec {
        HashSpec::Named(name) => {
            let hasher = Builtin::new(name)?;
            let hasher = content
                .reduce(rt, ReducerKind::Binary, hasher, |mut h, chunk: Bytes| {
                    h.update(&chunk);
                    Ok(h)
                })
                .await?;
            Ok(Checksum::new(name.clone(), hasher.finish()))
        }
        HashSpec::Whole { name, hasher } => {
            let data = content.bytes(rt).await?;
            let out = hasher
                .call(vec![Term::Bytes(data.to_vec())], Requirement::Required)
                .await?;
            Ok(Checksum::new(name.clone(), expect_digest(out)?))
        }
        HashSpec::Incremental {
            name,
            init,
            update,
            finish,
        } => {
            // The reducer step is synchronous; gather the binary chunks
            // first, then fold the async update chain over them.
            let chunks = content
                .reduce(rt, ReducerKind::Binary, Vec::new(), |mut acc, chunk: Bytes| {
                    acc.push(chunk);
                    Ok(acc)
                })
                .await?;
            let mut state = init.call(Vec::new(), Requirement::Optional).await?;
            for chunk in chunks {
                state = update
                    .call(
                        vec![state, Term::Bytes(chunk.to_vec())],
                        Requirement::Required,
                    )
                    .await?;
            }
            let out = finish.call(vec![state], Requirement::Required).await?;
            Ok(Checksum::new(name.clone(), expect_digest(out)?))
        }
    }
}

fn expect_digest(term: Term) -> Result<Vec<u8>> {
    match term {
        Term::Bytes(digest) => Ok(digest),
        other => Err(Error::Internal(format!(
            "hasher returned a non-binary digest: {other:?}"
        ))),
    }
}
