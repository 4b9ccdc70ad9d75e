//! A referenceable resource pipeline: one API over heterogeneous data
//! sources (inline data URIs, files on any node, chained
//! transformations, side-effecting stores) that preserves a verifiable
//! lineage (a provenance chain plus an integrity stamp) across process
//! boundaries.
//!
//! The [`Resx`] facade is the entry point: it resolves URIs to
//! references through the scheme dispatch table, routes every operation
//! to the owning producer, and implements the cross-cutting engines
//! (source-backed restoration, comparison, finalisation, hashing).

pub mod callback;
pub mod codec;
pub mod compare;
pub mod config;
pub mod content;
pub mod error;
pub mod hashing;
pub mod integrity;
pub mod mime_map;
pub mod pattern;
pub mod producer;
pub mod producers;
pub mod reference;
pub mod resource;
pub mod scheme;
pub mod storer;
pub mod term;
pub mod testkit;
pub mod transformer;

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use parking_lot::RwLock;

use crate::callback::Callback;
use crate::compare::{CompareOptions, Comparison};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hashing::HashSpec;
use crate::integrity::{Checksum, Integrity};
use crate::producer::{Options, Producer};
use crate::reference::{AdapterId, Reference};
use crate::resource::Resource;
use crate::scheme::{ProducerEntry, SchemeMap};
use crate::storer::{Fallback, SourceCompatibility};
use crate::transformer::Transformer;

pub mod prelude {
    pub use crate::compare::{CompareOptions, Comparison};
    pub use crate::content::{Chunk, Content, ContentStream};
    pub use crate::error::{Error, Result};
    pub use crate::integrity::{Checksum, Integrity};
    pub use crate::reference::{AdapterId, Reference};
    pub use crate::resource::{Meta, Resource};
    pub use crate::term::Term;
    pub use crate::{FinaliseOptions, Resx};
}

/// Finalisation controls.
#[derive(Debug, Clone, Default)]
pub struct FinaliseOptions {
    /// Skip content materialisation.
    pub skip_content: bool,
    /// Checksum policy.
    pub hash: HashChoice,
}

/// Which algorithm finalisation stamps with.
#[derive(Debug, Clone, Default)]
pub enum HashChoice {
    /// The configured default.
    #[default]
    Default,
    /// Leave the checksum as it is.
    Off,
    /// A specific algorithm.
    Custom(HashSpec),
}

struct Inner {
    config: RwLock<Config>,
    defaults: RwLock<Vec<ProducerEntry>>,
    transformers: RwLock<BTreeMap<String, Arc<dyn Transformer>>>,
}

/// The resource facade. Cheap to clone; all clones share configuration
/// and registries.
#[derive(Clone)]
pub struct Resx {
    inner: Arc<Inner>,
}

impl Default for Resx {
    fn default() -> Self {
        Self::new()
    }
}

impl Resx {
    /// A facade with the built-in producers (data, transform) and
    /// default configuration.
    pub fn new() -> Self {
        let rt = Self {
            inner: Arc::new(Inner {
                config: RwLock::new(Config::default()),
                defaults: RwLock::new(Vec::new()),
                transformers: RwLock::new(BTreeMap::new()),
            }),
        };
        rt.register_producer(Arc::new(producers::data::DataProducer));
        rt.register_producer(Arc::new(producers::transform::TransformProducer));
        rt
    }

    /// Add a producer to the default dispatch set.
    pub fn register_producer(&self, producer: Arc<dyn Producer>) {
        self.inner
            .defaults
            .write()
            .push(ProducerEntry::producer(producer));
    }

    /// Register a transformer under its name. Later registrations win.
    pub fn register_transformer(&self, transformer: Arc<dyn Transformer>) {
        self.inner
            .transformers
            .write()
            .insert(transformer.name().to_string(), transformer);
    }

    /// Mutate the configuration in place. Observed by the next call.
    pub fn configure<F: FnOnce(&mut Config)>(&self, f: F) {
        f(&mut self.inner.config.write());
    }

    pub(crate) fn content_combiner(&self) -> Option<Callback> {
        self.inner.config.read().content_combiner.clone()
    }

    pub(crate) fn content_reducer(&self) -> Option<Callback> {
        self.inner.config.read().content_reducer.clone()
    }

    fn default_hash(&self) -> HashSpec {
        self.inner.config.read().hash.clone()
    }

    /// Look up a registered transformer.
    pub fn transformer(&self, name: &str) -> Result<Arc<dyn Transformer>> {
        self.inner
            .transformers
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| {
                Error::InvalidReference(format!("transformation ({name}) does not exist"))
            })
    }

    /// The merged scheme dispatch table, rebuilt from configuration.
    fn scheme_map(&self) -> SchemeMap {
        let defaults = self.inner.defaults.read();
        let config = self.inner.config.read();
        SchemeMap::build(&defaults, &config.producers)
    }

    /// The producer owning a reference's adapter.
    pub fn producer_for(&self, r: &Reference) -> Result<Arc<dyn Producer>> {
        self.scheme_map().for_adapter(r.adapter()).ok_or_else(|| {
            Error::InvalidReference(format!("no producer for adapter {}", r.adapter()))
        })
    }

    /// The producer registered for a URI's scheme.
    pub fn producer_of(&self, uri: &str) -> Result<Arc<dyn Producer>> {
        let scheme = uri
            .split_once(':')
            .map(|(scheme, _)| scheme.to_ascii_lowercase())
            .filter(|scheme| !scheme.is_empty())
            .ok_or_else(|| Error::InvalidReference(format!("URI has no scheme: {uri}")))?;
        self.scheme_map()
            .for_scheme(&scheme)
            .ok_or_else(|| Error::InvalidReference(format!("no producer for URI {uri}")))
    }

    /// Parse a URI into a reference through its scheme's producer.
    pub fn resolve(&self, uri: &str) -> Result<Reference> {
        self.producer_of(uri)?.parse(self, uri)
    }

    /// Re-emit the canonical URI of a reference.
    pub fn uri(&self, r: &Reference) -> Result<String> {
        self.producer_for(r)?.uri(self, r)
    }

    /// Open a reference into an eager resource.
    pub async fn open(&self, r: &Reference, opts: &Options) -> Result<Resource> {
        let producer = self.producer_for(r)?;
        match producer.open(self, r, opts).await {
            Err(Error::UnknownResource(detail)) => {
                self.restore(producer.as_ref(), r, opts, detail, true).await
            }
            other => other,
        }
    }

    /// Open a URI into an eager resource.
    pub async fn open_uri(&self, uri: &str) -> Result<Resource> {
        self.open(&self.resolve(uri)?, &Options::new()).await
    }

    /// Open a reference into a streaming resource.
    pub async fn stream(&self, r: &Reference, opts: &Options) -> Result<Resource> {
        let producer = self.producer_for(r)?;
        match producer.stream(self, r, opts).await {
            Err(Error::UnknownResource(detail)) => {
                self.restore(producer.as_ref(), r, opts, detail, false)
                    .await
            }
            other => other,
        }
    }

    /// Open a URI into a streaming resource.
    pub async fn stream_uri(&self, uri: &str) -> Result<Resource> {
        self.stream(&self.resolve(uri)?, &Options::new()).await
    }

    /// The cache-miss recovery path: restore a missing resource from its
    /// source through the owning adapter's storer, then reopen.
    async fn restore(
        &self,
        producer: &dyn Producer,
        r: &Reference,
        opts: &Options,
        detail: String,
        eager: bool,
    ) -> Result<Resource> {
        let miss = || Err(Error::UnknownResource(detail.clone()));
        let Some(storer) = producer.as_storer() else {
            return miss();
        };
        if storer.source_compatibility() != SourceCompatibility::Compatible(Fallback::Default) {
            return miss();
        }
        let Some(source) = producer.source(r)? else {
            return miss();
        };
        tracing::debug!(
            adapter = producer.adapter_id(),
            "restoring missing resource from its source"
        );
        let restored = self.open_boxed(&source, opts).await?;
        let store_opts = storer.prepare_store(r)?;
        let stored = storer.store(self, restored, &store_opts).await?;
        // Drive the deferred write to completion before reopening.
        stored.content.into_eager(self).await?;
        if eager {
            producer.open(self, r, opts).await
        } else {
            producer.stream(self, r, opts).await
        }
    }

    /// `open` behind a boxed future, for recursive resolution.
    pub fn open_boxed<'a>(
        &'a self,
        r: &'a Reference,
        opts: &'a Options,
    ) -> BoxFuture<'a, Result<Resource>> {
        Box::pin(self.open(r, opts))
    }

    /// Whether the referenced resource exists.
    pub async fn exists(&self, r: &Reference) -> Result<bool> {
        self.producer_for(r)?.exists(self, r).await
    }

    /// Whether two references name the same resource identity.
    pub fn alike(&self, a: &Reference, b: &Reference) -> bool {
        if a.adapter() != b.adapter() {
            return false;
        }
        match self.producer_for(a) {
            Ok(producer) => producer.alike(self, a, b),
            Err(_) => false,
        }
    }

    /// The immediately-underlying reference, if any.
    pub fn source(&self, r: &Reference) -> Result<Option<Reference>> {
        self.producer_for(r)?.source(r)
    }

    /// One attribute of the referenced resource.
    pub async fn attribute(&self, r: &Reference, key: &str) -> Result<crate::term::Term> {
        self.producer_for(r)?.attribute(self, r, key).await
    }

    /// All attributes of the referenced resource.
    pub async fn attributes(&self, r: &Reference) -> Result<BTreeMap<String, crate::term::Term>> {
        self.producer_for(r)?.attributes(self, r).await
    }

    /// The attribute keys the producer exposes.
    pub async fn attribute_keys(&self, r: &Reference) -> Result<Vec<String>> {
        self.producer_for(r)?.attribute_keys(self, r).await
    }

    /// Apply a registered transformation to a resource, wrapping its
    /// reference with one more lineage layer.
    pub async fn transform(
        &self,
        resource: &Resource,
        name: &str,
        options: crate::term::Term,
    ) -> Result<Resource> {
        let transformer = self.transformer(name)?;
        let transformed = transformer
            .transform(self, resource.clone(), &options)
            .await?;
        let reference =
            producers::transform::wrap_reference(name, options, resource.reference.clone())?;
        Ok(Resource::new(
            reference,
            transformed.content,
            transformed.meta,
        ))
    }

    /// Persist a resource through the named adapter's storer.
    pub async fn store(
        &self,
        adapter: impl Into<AdapterId>,
        resource: Resource,
        opts: &Options,
    ) -> Result<Resource> {
        let adapter = adapter.into();
        let producer = self
            .scheme_map()
            .for_adapter(&adapter)
            .ok_or_else(|| Error::InvalidReference(format!("no producer for adapter {adapter}")))?;
        let storer = producer
            .as_storer()
            .ok_or_else(|| Error::InvalidReference(format!("adapter {adapter} cannot store")))?;
        storer.store(self, resource, opts).await
    }

    /// Remove a stored resource.
    pub async fn discard(&self, r: &Reference, opts: &Options) -> Result<()> {
        let producer = self.producer_for(r)?;
        let storer = producer.as_storer().ok_or_else(|| {
            Error::InvalidReference(format!("adapter {} cannot discard", r.adapter()))
        })?;
        storer.discard(self, r, opts).await
    }

    /// Order two resources along their shared lineage. `None` when the
    /// references do not name the same resource identity.
    pub async fn compare(
        &self,
        a: &Resource,
        b: &Resource,
        opts: &CompareOptions,
    ) -> Result<Option<Comparison>> {
        compare::run(self, a, b, opts).await
    }

    /// The younger of two compared resources, when answerable.
    pub async fn newest<'a>(
        &self,
        a: &'a Resource,
        b: &'a Resource,
        opts: &CompareOptions,
    ) -> Result<Option<&'a Resource>> {
        Ok(match self.compare(a, b, opts).await? {
            Some(Comparison::Lt) => Some(b),
            Some(Comparison::Gt) => Some(a),
            _ => None,
        })
    }

    /// The older of two compared resources, when answerable.
    pub async fn oldest<'a>(
        &self,
        a: &'a Resource,
        b: &'a Resource,
        opts: &CompareOptions,
    ) -> Result<Option<&'a Resource>> {
        Ok(match self.compare(a, b, opts).await? {
            Some(Comparison::Lt) => Some(a),
            Some(Comparison::Gt) => Some(b),
            _ => None,
        })
    }

    /// Materialise a resource and stamp its checksum: the point at which
    /// a streaming reference gains a stable identity.
    pub async fn finalise(&self, resource: Resource, opts: &FinaliseOptions) -> Result<Resource> {
        let Resource {
            reference,
            content,
            meta,
        } = resource;
        let content = if opts.skip_content {
            content
        } else {
            content.into_eager(self).await?
        };
        let checksum = match &opts.hash {
            HashChoice::Off => reference.integrity().checksum.clone(),
            HashChoice::Default => {
                let spec = self.default_hash();
                Some(hashing::digest(self, &content, &spec).await?)
            }
            HashChoice::Custom(spec) => Some(hashing::digest(self, &content, spec).await?),
        };
        let integrity = Integrity::new(checksum, reference.integrity().timestamp);
        Ok(Resource::new(
            reference.with_integrity(integrity),
            content,
            meta,
        ))
    }

    /// Digest a resource's content. Short-circuits when the reference
    /// already carries a checksum under the same algorithm. Meta is
    /// never part of the digest.
    pub async fn hash(&self, resource: &Resource, spec: Option<&HashSpec>) -> Result<Checksum> {
        let default;
        let spec = match spec {
            Some(spec) => spec,
            None => {
                default = self.default_hash();
                &default
            }
        };
        if let Some(existing) = &resource.reference.integrity().checksum {
            if existing.algorithm == spec.name() {
                return Ok(existing.clone());
            }
        }
        hashing::digest(self, &resource.content, spec).await
    }
}

// Re-export the workhorse types at the crate root, the way callers
// actually spell them.
pub use crate::content::{Chunk, ContentStream};
pub use crate::error::{Error as ResxError, Result as ResxResult};
pub use crate::resource::Meta;
