//! The transformation producer: encodes an arbitrary chain of named
//! transformations over any inner reference into a single reversible
//! URI.
//!
//! ```text
//! resx-transform:T_n[:B64(opts_n)],…,T_1[:B64(opts_1)],B64(inner_uri)
//! ```
//!
//! The first listed transformation is the outermost layer. References
//! build left-deep: the innermost layer is the decoded inner URI, and
//! each wrapper records `(transformer, options, inner reference)`.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::error::{Error, Result};
use crate::integrity::Integrity;
use crate::producer::{Options, Producer};
use crate::reference::{AdapterId, Reference};
use crate::resource::Resource;
use crate::term::Term;
use crate::Resx;

pub const ADAPTER: &str = "transform";
pub const SCHEME: &str = "resx-transform";

/// Adapter-private repository: one lineage layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct TransformRepo {
    name: String,
    options: Term,
    inner: Reference,
}

/// Wrap a reference with one more transformation layer. Fresh
/// timestamp, no checksum: the stamp describes the apply, not the
/// source.
pub(crate) fn wrap_reference(name: &str, options: Term, inner: Reference) -> Result<Reference> {
    let repo = codec::to_term(&TransformRepo {
        name: name.to_string(),
        options,
        inner,
    })?;
    Ok(Reference::new(
        AdapterId::new(ADAPTER),
        repo,
        Integrity::now(),
    ))
}

pub struct TransformProducer;

impl TransformProducer {
    fn repo(r: &Reference) -> Result<TransformRepo> {
        Ok(codec::from_term(r.repo())?)
    }
}

fn parse_segment(rt: &Resx, segment: &str) -> Result<(String, Term)> {
    let (name, options) = match segment.split_once(':') {
        Some((name, encoded)) => {
            let bytes = STANDARD
                .decode(encoded)
                .map_err(|_| Error::invalid("transformation options are not base64"))?;
            let options: Term = codec::decode(&bytes)
                .map_err(|_| Error::invalid("transformation options do not decode"))?;
            if options.as_map().is_none() {
                return Err(Error::invalid("transformation options are not a map"));
            }
            (name, options)
        }
        None => (segment, Term::empty_map()),
    };
    if name.is_empty() {
        return Err(Error::invalid("transformation name is empty"));
    }
    // Resolution is checked at parse time so a bad chain never makes it
    // into a reference.
    rt.transformer(name)?;
    Ok((name.to_string(), options))
}

#[async_trait]
impl Producer for TransformProducer {
    fn adapter_id(&self) -> &'static str {
        ADAPTER
    }

    fn schemes(&self) -> &'static [&'static str] {
        &[SCHEME]
    }

    fn parse(&self, rt: &Resx, uri: &str) -> Result<Reference> {
        let path = crate::scheme::strip_scheme(uri, SCHEME)?;
        let segments: Vec<&str> = path.split(',').collect();
        if segments.len() < 2 {
            return Err(Error::invalid("transformation chain is empty"));
        }
        let encoded_inner = segments[segments.len() - 1];
        let inner_uri = STANDARD
            .decode(encoded_inner)
            .ok()
            .and_then(|bytes| String::from_utf8(bytes).ok())
            .ok_or_else(|| Error::invalid("data is not base64"))?;
        let mut reference = rt.resolve(&inner_uri)?;
        for segment in segments[..segments.len() - 1].iter().rev() {
            let (name, options) = parse_segment(rt, segment)?;
            reference = wrap_reference(&name, options, reference)?;
        }
        Ok(reference)
    }

    fn uri(&self, rt: &Resx, r: &Reference) -> Result<String> {
        let mut segments = Vec::new();
        let mut cursor = r.clone();
        while cursor.adapter().as_str() == ADAPTER {
            let repo = Self::repo(&cursor)?;
            let segment = match &repo.options {
                Term::Map(map) if map.is_empty() => repo.name.clone(),
                options => format!("{}:{}", repo.name, STANDARD.encode(codec::encode(options)?)),
            };
            segments.push(segment);
            cursor = repo.inner;
        }
        let inner_uri = rt.uri(&cursor)?;
        segments.push(STANDARD.encode(inner_uri.as_bytes()));
        Ok(format!("{SCHEME}:{}", segments.join(",")))
    }

    async fn open(&self, rt: &Resx, r: &Reference, opts: &Options) -> Result<Resource> {
        let repo = Self::repo(r)?;
        let inner = rt.open(&repo.inner, opts).await?;
        let transformer = rt.transformer(&repo.name)?;
        tracing::debug!(transformer = %repo.name, "applying transformation");
        let transformed = transformer.transform(rt, inner, &repo.options).await?;
        Ok(Resource::new(
            r.with_integrity(Integrity::now()),
            transformed.content,
            transformed.meta,
        ))
    }

    async fn stream(&self, rt: &Resx, r: &Reference, opts: &Options) -> Result<Resource> {
        let repo = Self::repo(r)?;
        let inner = rt.stream(&repo.inner, opts).await?;
        let transformer = rt.transformer(&repo.name)?;
        let transformed = transformer.transform(rt, inner, &repo.options).await?;
        Ok(Resource::new(
            r.with_integrity(Integrity::now()),
            transformed.content,
            transformed.meta,
        ))
    }

    async fn exists(&self, rt: &Resx, r: &Reference) -> Result<bool> {
        let repo = Self::repo(r)?;
        rt.exists(&repo.inner).await
    }

    fn alike(&self, rt: &Resx, a: &Reference, b: &Reference) -> bool {
        let (Ok(ra), Ok(rb)) = (Self::repo(a), Self::repo(b)) else {
            return false;
        };
        ra.name == rb.name && ra.options == rb.options && rt.alike(&ra.inner, &rb.inner)
    }

    fn source(&self, r: &Reference) -> Result<Option<Reference>> {
        Ok(Some(Self::repo(r)?.inner))
    }

    async fn attributes(&self, rt: &Resx, r: &Reference) -> Result<BTreeMap<String, Term>> {
        let repo = Self::repo(r)?;
        rt.attributes(&repo.inner).await
    }

    async fn attribute(&self, rt: &Resx, r: &Reference, key: &str) -> Result<Term> {
        let repo = Self::repo(r)?;
        rt.attribute(&repo.inner, key).await
    }

    async fn attribute_keys(&self, rt: &Resx, r: &Reference) -> Result<Vec<String>> {
        let repo = Self::repo(r)?;
        rt.attribute_keys(&repo.inner).await
    }
}
