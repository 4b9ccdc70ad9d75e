use async_trait::async_trait;

use crate::error::Result;
use crate::producer::Options;
use crate::reference::Reference;
use crate::resource::Resource;
use crate::Resx;

/// Whether the facade may restore a missing resource from its source by
/// storing through this adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceCompatibility {
    /// No fallback: a miss is a miss.
    Incompatible,
    /// Source-backed restoration applies.
    Compatible(Fallback),
}

/// Who runs the restoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Fallback {
    /// The facade resolves the source, re-stores, and re-opens.
    Default,
    /// The adapter handles restoration inside its own open path.
    Internal,
}

/// A storer materialises resources to a destination, with optional
/// reversal.
#[async_trait]
pub trait Storer: Send + Sync {
    /// Persist a resource. The returned resource's content may be
    /// deferred: writing happens as the caller drives the stream.
    async fn store(&self, rt: &Resx, resource: Resource, opts: &Options) -> Result<Resource>;

    /// Remove a stored resource.
    async fn discard(&self, rt: &Resx, r: &Reference, opts: &Options) -> Result<()>;

    /// Derive the store options that would re-materialise the given
    /// reference in place. The facade uses this on the cache-miss
    /// recovery path.
    fn prepare_store(&self, r: &Reference) -> Result<Options>;

    /// Storers that are also producers default to facade-driven
    /// restoration.
    fn source_compatibility(&self) -> SourceCompatibility {
        SourceCompatibility::Compatible(Fallback::Default)
    }
}
