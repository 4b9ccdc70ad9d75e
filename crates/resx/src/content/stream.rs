//! Lazy chunk sequences.
//!
//! A [`ContentStream`] owns a chunk *source*, not a live handle: every
//! reduction re-acquires the underlying sequence from the source, so a
//! stream that has already been consumed once is driven again from the
//! start rather than silently running dry.

use std::sync::Arc;

use bytes::Bytes;
use futures::stream::BoxStream;
use futures::StreamExt;

use crate::error::Result;
use crate::term::Term;

/// One element of a content stream: raw bytes, or an opaque term for
/// media types that carry structure.
#[derive(Debug, Clone, PartialEq)]
pub enum Chunk {
    Bytes(Bytes),
    Term(Term),
}

impl Chunk {
    pub fn bytes(data: impl Into<Bytes>) -> Self {
        Chunk::Bytes(data.into())
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            Chunk::Bytes(b) => Some(b),
            Chunk::Term(_) => None,
        }
    }

    pub fn into_term(self) -> Term {
        match self {
            Chunk::Bytes(b) => Term::Bytes(b.to_vec()),
            Chunk::Term(t) => t,
        }
    }

    pub fn from_term(term: Term) -> Self {
        match term {
            Term::Bytes(b) => Chunk::Bytes(Bytes::from(b)),
            other => Chunk::Term(other),
        }
    }
}

pub type ChunkStream = BoxStream<'static, Result<Chunk>>;

/// A re-invocable producer of chunk sequences. Implementations carry
/// whatever they need to re-acquire the data (a path and node tag, an
/// in-memory buffer) but never an open handle.
pub trait ChunkSource: Send + Sync {
    fn acquire(&self) -> ChunkStream;
}

/// In-memory source: a fixed chunk list.
struct StaticSource {
    chunks: Vec<Chunk>,
}

impl ChunkSource for StaticSource {
    fn acquire(&self) -> ChunkStream {
        futures::stream::iter(self.chunks.clone().into_iter().map(Ok)).boxed()
    }
}

/// A lazy chunk sequence with a single `reduce` entry point.
///
/// The sequence is single-writer: one reduction at a time per acquired
/// stream. Distinct reductions of the same `ContentStream` are
/// independent acquisitions.
#[derive(Clone)]
pub struct ContentStream {
    source: Arc<dyn ChunkSource>,
}

impl ContentStream {
    pub fn new(source: Arc<dyn ChunkSource>) -> Self {
        Self { source }
    }

    /// A stream over a fixed set of chunks.
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        Self::new(Arc::new(StaticSource { chunks }))
    }

    /// A stream over a single byte payload.
    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        Self::from_chunks(vec![Chunk::Bytes(data.into())])
    }

    /// Acquire a fresh chunk sequence from the source.
    pub fn acquire(&self) -> ChunkStream {
        self.source.acquire()
    }

    /// Drive one full reduction over a freshly acquired sequence.
    pub async fn reduce<A, F>(&self, init: A, mut step: F) -> Result<A>
    where
        F: FnMut(A, Chunk) -> Result<A>,
    {
        let mut stream = self.acquire();
        let mut acc = init;
        while let Some(chunk) = stream.next().await {
            acc = step(acc, chunk?)?;
        }
        Ok(acc)
    }

    /// Collect a freshly acquired sequence into a chunk list.
    pub async fn collect(&self) -> Result<Vec<Chunk>> {
        self.reduce(Vec::new(), |mut acc, chunk| {
            acc.push(chunk);
            Ok(acc)
        })
        .await
    }
}

impl std::fmt::Debug for ContentStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("ContentStream")
    }
}
