//! The `data:` producer (RFC 2397): the whole resource lives inside the
//! reference.

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use mime::Mime;
use percent_encoding::percent_decode_str;
use serde::{Deserialize, Serialize};

use crate::codec;
use crate::content::{Content, ContentStream};
use crate::error::{Error, Result};
use crate::integrity::Integrity;
use crate::producer::{Options, Producer};
use crate::reference::{AdapterId, Reference};
use crate::resource::{Meta, Resource};
use crate::term::Term;
use crate::Resx;

pub const ADAPTER: &str = "data";

const DEFAULT_KIND: &str = "text/plain";
const DEFAULT_CHARSET: &str = "US-ASCII";

/// Adapter-private repository: the parsed mediatype, its attributes, and
/// the decoded payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct DataRepo {
    kind: String,
    attrs: BTreeMap<String, String>,
    #[serde(with = "serde_bytes")]
    data: Vec<u8>,
}

pub struct DataProducer;

impl DataProducer {
    fn repo(r: &Reference) -> Result<DataRepo> {
        Ok(codec::from_term(r.repo())?)
    }

    fn kind_of(repo: &DataRepo) -> Result<Mime> {
        repo.kind
            .parse::<Mime>()
            .map_err(|_| Error::InvalidReference(format!("bad mediatype: {}", repo.kind)))
    }
}

#[async_trait]
impl Producer for DataProducer {
    fn adapter_id(&self) -> &'static str {
        ADAPTER
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["data"]
    }

    fn parse(&self, _rt: &Resx, uri: &str) -> Result<Reference> {
        let raw = crate::scheme::strip_scheme(uri, "data")?;
        let (header, payload) = raw
            .split_once(',')
            .ok_or_else(|| Error::invalid("data reference has no payload separator"))?;

        let mut parts = header.split(';');
        let mediatype = parts.next().unwrap_or_default();
        let mut attrs = BTreeMap::new();
        let mut is_base64 = false;
        for token in parts {
            if token.eq_ignore_ascii_case("base64") {
                is_base64 = true;
            } else if let Some((key, value)) = token.split_once('=') {
                attrs.insert(key.to_string(), value.to_string());
            } else if !token.is_empty() {
                return Err(Error::InvalidReference(format!(
                    "bad data attribute: {token}"
                )));
            }
        }

        let kind = if mediatype.is_empty() {
            attrs
                .entry("charset".to_string())
                .or_insert_with(|| DEFAULT_CHARSET.to_string());
            DEFAULT_KIND.to_string()
        } else {
            mediatype.to_string()
        };
        kind.parse::<Mime>()
            .map_err(|_| Error::InvalidReference(format!("bad mediatype: {kind}")))?;

        let decoded: Vec<u8> = percent_decode_str(payload).collect();
        let data = if is_base64 {
            STANDARD
                .decode(&decoded)
                .map_err(|_| Error::invalid("data is not base64"))?
        } else {
            decoded
        };

        let repo = codec::to_term(&DataRepo { kind, attrs, data })?;
        Ok(Reference::new(
            AdapterId::new(ADAPTER),
            repo,
            Integrity::now(),
        ))
    }

    fn uri(&self, _rt: &Resx, r: &Reference) -> Result<String> {
        let repo = Self::repo(r)?;
        let mut out = format!("data:{}", repo.kind);
        for (key, value) in &repo.attrs {
            out.push(';');
            out.push_str(key);
            out.push('=');
            out.push_str(value);
        }
        out.push_str(";base64,");
        out.push_str(&STANDARD.encode(&repo.data));
        Ok(out)
    }

    async fn open(&self, _rt: &Resx, r: &Reference, _opts: &Options) -> Result<Resource> {
        let repo = Self::repo(r)?;
        let kind = Self::kind_of(&repo)?;
        Ok(Resource::new(
            r.clone(),
            Content::eager(vec![kind], repo.data),
            Meta::new(),
        ))
    }

    async fn stream(&self, _rt: &Resx, r: &Reference, _opts: &Options) -> Result<Resource> {
        let repo = Self::repo(r)?;
        let kind = Self::kind_of(&repo)?;
        Ok(Resource::new(
            r.clone(),
            Content::stream(vec![kind], ContentStream::from_bytes(repo.data)),
            Meta::new(),
        ))
    }

    async fn exists(&self, _rt: &Resx, _r: &Reference) -> Result<bool> {
        Ok(true)
    }

    fn alike(&self, _rt: &Resx, a: &Reference, b: &Reference) -> bool {
        a.repo() == b.repo()
    }

    fn source(&self, _r: &Reference) -> Result<Option<Reference>> {
        Ok(None)
    }

    async fn attributes(&self, _rt: &Resx, r: &Reference) -> Result<BTreeMap<String, Term>> {
        let repo = Self::repo(r)?;
        Ok(repo
            .attrs
            .into_iter()
            .map(|(key, value)| (key, Term::Text(value)))
            .collect())
    }
}
