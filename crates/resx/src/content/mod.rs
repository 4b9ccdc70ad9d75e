//! Typed payloads: an eager byte payload or a lazy chunk sequence, each
//! tagged with a nonempty MIME list (head = outermost type).
//!
//! Materialising, hashing, and storing all funnel through the same
//! reducer, so a custom media type can inject its own serialisation once
//! (via the configured content reducer) instead of at every consumer.

mod stream;

pub use stream::{Chunk, ChunkSource, ChunkStream, ContentStream};

use bytes::Bytes;
use mime::Mime;

use crate::callback::Requirement;
use crate::error::{Error, Result};
use crate::term::Term;
use crate::Resx;

/// The reducer kinds a consumer can request. `Binary` is the only
/// built-in; the configured content reducer may remap others per media
/// type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReducerKind {
    Binary,
}

impl ReducerKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReducerKind::Binary => "binary",
        }
    }
}

/// A resource's payload.
#[derive(Debug, Clone)]
pub enum Content {
    Eager { kind: Vec<Mime>, data: Bytes },
    Stream { kind: Vec<Mime>, stream: ContentStream },
}

impl Content {
    pub fn eager(kind: Vec<Mime>, data: impl Into<Bytes>) -> Self {
        Content::Eager {
            kind: nonempty(kind),
            data: data.into(),
        }
    }

    pub fn stream(kind: Vec<Mime>, stream: ContentStream) -> Self {
        Content::Stream {
            kind: nonempty(kind),
            stream,
        }
    }

    /// The MIME list; the head is the outermost type.
    pub fn kind(&self) -> &[Mime] {
        match self {
            Content::Eager { kind, .. } => kind,
            Content::Stream { kind, .. } => kind,
        }
    }

    pub fn is_eager(&self) -> bool {
        matches!(self, Content::Eager { .. })
    }

    /// Materialise the payload into a single combined value.
    ///
    /// The configured content combiner gets the chunk list and decides;
    /// the default concatenates when every chunk is binary and collects
    /// into a list otherwise.
    pub async fn data(&self, rt: &Resx) -> Result<Chunk> {
        match self {
            Content::Eager { data, .. } => Ok(Chunk::Bytes(data.clone())),
            Content::Stream { stream, .. } => {
                let chunks = stream.collect().await?;
                combine(rt, chunks).await
            }
        }
    }

    /// The combined payload as bytes; an error if the combined value is
    /// not binary.
    pub async fn bytes(&self, rt: &Resx) -> Result<Bytes> {
        match self.data(rt).await? {
            Chunk::Bytes(b) => Ok(b),
            Chunk::Term(_) => Err(Error::Internal(
                "combined content is not binary".to_string(),
            )),
        }
    }

    /// Promote a stream to eager content by materialising it; identity
    /// on eager content. A combined non-binary payload is carried in its
    /// canonical encoding.
    pub async fn into_eager(self, rt: &Resx) -> Result<Content> {
        match self {
            eager @ Content::Eager { .. } => Ok(eager),
            Content::Stream { kind, stream } => {
                let data = match combine(rt, stream.collect().await?).await? {
                    Chunk::Bytes(b) => b,
                    Chunk::Term(term) => Bytes::from(crate::codec::encode(&term)?),
                };
                Ok(Content::Eager { kind, data })
            }
        }
    }

    /// Drive one reduction of the requested kind over the payload.
    ///
    /// With a configured content reducer the chunk list is remapped
    /// first (the callback receives the outermost media type, the
    /// reducer kind, and the chunk list). The built-in binary reducer
    /// requires every chunk to be binary.
    pub async fn reduce<A, F>(&self, rt: &Resx, kind: ReducerKind, init: A, mut step: F) -> Result<A>
    where
        F: FnMut(A, Bytes) -> Result<A>,
    {
        let chunks = match self {
            Content::Eager { data, .. } => vec![Chunk::Bytes(data.clone())],
            Content::Stream { stream, .. } => stream.collect().await?,
        };
        let chunks = match rt.content_reducer() {
            Some(cb) => {
                let inputs = vec![
                    Term::Text(self.kind()[0].to_string()),
                    Term::Text(kind.as_str().to_string()),
                    Term::List(chunks.into_iter().map(Chunk::into_term).collect()),
                ];
                match cb.call(inputs, Requirement::Required).await? {
                    Term::List(items) => items.into_iter().map(Chunk::from_term).collect(),
                    other => vec![Chunk::from_term(other)],
                }
            }
            None => chunks,
        };
        let mut acc = init;
        for chunk in chunks {
            match chunk {
                Chunk::Bytes(b) => acc = step(acc, b)?,
                Chunk::Term(_) => {
                    return Err(Error::Internal(
                        "content chunk is not binary; configure a content reducer".to_string(),
                    ))
                }
            }
        }
        Ok(acc)
    }
}

async fn combine(rt: &Resx, chunks: Vec<Chunk>) -> Result<Chunk> {
    if let Some(cb) = rt.content_combiner() {
        let input = Term::List(chunks.into_iter().map(Chunk::into_term).collect());
        let combined = cb.call(vec![input], Requirement::Required).await?;
        return Ok(Chunk::from_term(combined));
    }
    if chunks.iter().all(|c| matches!(c, Chunk::Bytes(_))) {
        let mut data = Vec::new();
        for chunk in chunks {
            if let Chunk::Bytes(b) = chunk {
                data.extend_from_slice(&b);
            }
        }
        Ok(Chunk::Bytes(Bytes::from(data)))
    } else {
        Ok(Chunk::Term(Term::List(
            chunks.into_iter().map(Chunk::into_term).collect(),
        )))
    }
}

fn nonempty(kind: Vec<Mime>) -> Vec<Mime> {
    if kind.is_empty() {
        vec![mime::APPLICATION_OCTET_STREAM]
    } else {
        kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Resx;

    #[tokio::test]
    async fn eager_data_is_identity() {
        let rt = Resx::new();
        let content = Content::eager(vec![mime::TEXT_PLAIN], "hello");
        assert_eq!(
            content.data(&rt).await.unwrap(),
            Chunk::Bytes(Bytes::from("hello"))
        );
    }

    #[tokio::test]
    async fn default_combiner_concatenates_bytes() {
        let rt = Resx::new();
        let stream = ContentStream::from_chunks(vec![Chunk::bytes("foo"), Chunk::bytes("bar")]);
        let content = Content::stream(vec![mime::TEXT_PLAIN], stream);
        assert_eq!(
            content.bytes(&rt).await.unwrap(),
            Bytes::from("foobar")
        );
    }

    #[tokio::test]
    async fn default_combiner_collects_mixed_chunks() {
        let rt = Resx::new();
        let stream = ContentStream::from_chunks(vec![
            Chunk::bytes("foo"),
            Chunk::Term(Term::Int(7)),
        ]);
        let content = Content::stream(vec![mime::TEXT_PLAIN], stream);
        match content.data(&rt).await.unwrap() {
            Chunk::Term(Term::List(items)) => assert_eq!(items.len(), 2),
            other => panic!("expected a list, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn configured_combiner_wins() {
        let rt = Resx::new();
        rt.configure(|config| {
            config.content_combiner = Some(crate::callback::Callback::sync(1, |args| {
                let count = args[0].as_list().map(|l| l.len() as i64).unwrap_or(0);
                Ok(Term::Int(count))
            }));
        });
        let stream = ContentStream::from_chunks(vec![Chunk::bytes("a"), Chunk::bytes("b")]);
        let content = Content::stream(vec![mime::TEXT_PLAIN], stream);
        assert_eq!(content.data(&rt).await.unwrap(), Chunk::Term(Term::Int(2)));
    }

    #[tokio::test]
    async fn into_eager_is_identity_on_eager() {
        let rt = Resx::new();
        let content = Content::eager(vec![mime::TEXT_PLAIN], "x");
        let promoted = content.into_eager(&rt).await.unwrap();
        assert!(promoted.is_eager());
    }

    #[tokio::test]
    async fn binary_reduce_rejects_terms() {
        let rt = Resx::new();
        let stream = ContentStream::from_chunks(vec![Chunk::Term(Term::Int(1))]);
        let content = Content::stream(vec![mime::TEXT_PLAIN], stream);
        let out = content
            .reduce(&rt, ReducerKind::Binary, (), |_, _| Ok(()))
            .await;
        assert!(matches!(out, Err(Error::Internal(_))));
    }
}
