//! File reference grammar:
//!
//! ```text
//! file://[user@host][/absolute/path][?source=B64(inner_uri)]
//! ```
//!
//! No authority (or `localhost`) resolves to the calling node. The
//! `source` query parameter carries the reference the file acts as a
//! cache for, base64-encoded (url-safe alphabet, unpadded).

use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine as _;
use percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, CONTROLS};
use serde::{Deserialize, Serialize};

use resx::error::{Error, Result};
use resx::reference::Reference;
use resx::scheme::strip_scheme;
use resx::Resx;

use crate::node::NodeId;

/// Bytes escaped when a path is emitted back into a URI.
const PATH_ESCAPES: &AsciiSet = &CONTROLS.add(b' ').add(b'?').add(b'#').add(b'%');

/// Adapter-private repository for file references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub(crate) struct FileRepo {
    pub node: NodeId,
    pub path: String,
    pub source: Option<Reference>,
}

impl FileRepo {
    /// The basename of the path.
    pub fn name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    /// The sibling sidecar path.
    pub fn meta_path(&self) -> String {
        format!("{}.meta", self.path)
    }
}

pub(crate) fn parse_uri(rt: &Resx, uri: &str, local: &NodeId) -> Result<FileRepo> {
    let rest = strip_scheme(uri, "file")?;
    let rest = rest
        .strip_prefix("//")
        .ok_or_else(|| Error::InvalidReference(format!("file URI has no authority: {uri}")))?;

    let (main, query) = match rest.split_once('?') {
        Some((main, query)) => (main, Some(query)),
        None => (rest, None),
    };

    let (authority, raw_path) = match main.find('/') {
        Some(at) => (&main[..at], &main[at..]),
        None => (main, ""),
    };

    let node = if authority.is_empty() || authority == "localhost" {
        local.clone()
    } else {
        NodeId::new(authority)
    };

    if raw_path.is_empty() {
        return Err(Error::InvalidReference(format!(
            "file URI has no path: {uri}"
        )));
    }
    let path = percent_decode_str(raw_path)
        .decode_utf8()
        .map_err(|_| Error::InvalidReference(format!("file path is not UTF-8: {uri}")))?
        .into_owned();

    let source = match query.and_then(find_source) {
        Some(encoded) => Some(decode_source(rt, encoded)?),
        None => None,
    };

    Ok(FileRepo { node, path, source })
}

pub(crate) fn emit_uri(rt: &Resx, repo: &FileRepo) -> Result<String> {
    let path = utf8_percent_encode(&repo.path, PATH_ESCAPES);
    let mut out = format!("file://{}{}", repo.node, path);
    if let Some(source) = &repo.source {
        let inner = rt.uri(source)?;
        out.push_str("?source=");
        out.push_str(&URL_SAFE_NO_PAD.encode(inner.as_bytes()));
    }
    Ok(out)
}

fn find_source(query: &str) -> Option<&str> {
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == "source").then_some(value)
    })
}

fn decode_source(rt: &Resx, encoded: &str) -> Result<Reference> {
    let bytes = URL_SAFE_NO_PAD
        .decode(encoded)
        .or_else(|_| STANDARD.decode(encoded))
        .map_err(|_| Error::invalid("source parameter is not base64"))?;
    let inner = String::from_utf8(bytes)
        .map_err(|_| Error::invalid("source parameter is not a UTF-8 URI"))?;
    rt.resolve(&inner)
}
