use std::collections::BTreeMap;

use async_trait::async_trait;

use crate::error::{Error, Result};
use crate::reference::Reference;
use crate::resource::Resource;
use crate::storer::Storer;
use crate::term::Term;
use crate::Resx;

/// Free-form options passed through open/stream/store/discard calls.
pub type Options = BTreeMap<String, Term>;

/// A producer interprets references for one or more URI schemes.
///
/// References are adapter-exclusive: a producer only ever sees
/// references carrying its own adapter id, and nothing else may look
/// inside its repository values. Producers receive the facade handle so
/// chained references (transformations, source-backed files) can resolve
/// through whatever adapter owns the inner layer.
#[async_trait]
pub trait Producer: Send + Sync {
    /// The adapter id stamped on every reference this producer mints.
    fn adapter_id(&self) -> &'static str;

    /// The URI schemes this producer handles. Never empty.
    fn schemes(&self) -> &'static [&'static str];

    /// Parse a URI of one of this producer's schemes into a reference.
    /// The producer receives the raw URI text; scheme grammars differ
    /// too much for a shared parser.
    fn parse(&self, rt: &Resx, uri: &str) -> Result<Reference>;

    /// Re-emit the canonical URI for a reference.
    fn uri(&self, rt: &Resx, r: &Reference) -> Result<String>;

    /// Open a reference into a resource with eager content.
    async fn open(&self, rt: &Resx, r: &Reference, opts: &Options) -> Result<Resource>;

    /// Open a reference into a resource with streaming content.
    async fn stream(&self, rt: &Resx, r: &Reference, opts: &Options) -> Result<Resource>;

    /// Whether the referenced resource exists.
    async fn exists(&self, rt: &Resx, r: &Reference) -> Result<bool>;

    /// Whether two references name the same resource identity. No error
    /// channel: anything unanswerable is `false`.
    fn alike(&self, rt: &Resx, a: &Reference, b: &Reference) -> bool;

    /// The immediately-underlying reference, if this one has a source.
    fn source(&self, r: &Reference) -> Result<Option<Reference>>;

    /// All attributes of the referenced resource.
    async fn attributes(&self, rt: &Resx, r: &Reference) -> Result<BTreeMap<String, Term>>;

    /// One attribute by key; `UnknownKey` when the producer does not
    /// expose it.
    async fn attribute(&self, rt: &Resx, r: &Reference, key: &str) -> Result<Term> {
        self.attributes(rt, r)
            .await?
            .remove(key)
            .ok_or_else(|| Error::UnknownKey(key.to_string()))
    }

    /// The attribute keys the producer exposes for this reference.
    async fn attribute_keys(&self, rt: &Resx, r: &Reference) -> Result<Vec<String>> {
        Ok(self.attributes(rt, r).await?.into_keys().collect())
    }

    /// The storer facet, for producers that can persist resources.
    fn as_storer(&self) -> Option<&dyn Storer> {
        None
    }
}
