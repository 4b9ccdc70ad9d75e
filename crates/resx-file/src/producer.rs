//! The file producer/store.
//!
//! Every operation re-reads configuration, evaluates the access matrix
//! on the calling side, and routes through `call_node`: the local node
//! short-circuits to `serve`, any other node goes through the configured
//! RPC transport (default: the in-process cluster registry), where the
//! receiving node applies its own matrix before touching the
//! filesystem.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, UNIX_EPOCH};

use async_trait::async_trait;
use bytes::Bytes;
use futures::StreamExt;
use parking_lot::RwLock;
use tokio::io::AsyncWriteExt;

use resx::callback::Requirement;
use resx::codec;
use resx::content::{Chunk, ChunkSource, ChunkStream, Content, ContentStream};
use resx::error::{Error, Result};
use resx::integrity::Integrity;
use resx::mime_map;
use resx::producer::{Options, Producer};
use resx::reference::{AdapterId, Reference};
use resx::resource::{Meta, Resource};
use resx::storer::Storer;
use resx::term::Term;
use resx::Resx;

use crate::access::{allowed, protected};
use crate::cluster;
use crate::config::FileConfig;
use crate::node::NodeId;
use crate::repo::{emit_uri, parse_uri, FileRepo};

pub const ADAPTER: &str = "file";

const DEFAULT_CHUNK: usize = 64 * 1024;

pub struct FileProducer {
    pub(crate) config: Arc<RwLock<FileConfig>>,
}

impl Default for FileProducer {
    fn default() -> Self {
        Self::new()
    }
}

impl FileProducer {
    pub fn new() -> Self {
        Self::with_config(FileConfig::default())
    }

    pub fn with_config(config: FileConfig) -> Self {
        Self {
            config: Arc::new(RwLock::new(config)),
        }
    }

    pub(crate) fn from_handle(config: Arc<RwLock<FileConfig>>) -> Self {
        Self { config }
    }

    /// Mutate the configuration in place. Observed by the next call.
    pub fn configure<F: FnOnce(&mut FileConfig)>(&self, f: F) {
        f(&mut self.config.write());
    }

    /// This process's node identity.
    pub fn node(&self) -> NodeId {
        self.config.read().node.clone()
    }

    fn snapshot(&self) -> FileConfig {
        self.config.read().clone()
    }

    fn repo(r: &Reference) -> Result<FileRepo> {
        Ok(codec::from_term(r.repo())?)
    }

    /// Calling-side matrix check against the reference's `(node, path)`.
    async fn check_access(&self, node: &NodeId, path: &str) -> Result<()> {
        let config = self.snapshot();
        if allowed(&config.access, node, path).await? {
            Ok(())
        } else {
            Err(protected())
        }
    }

    /// Route one operation to the node owning the path.
    pub(crate) async fn call_node(
        &self,
        rt: &Resx,
        node: &NodeId,
        op: &str,
        args: Vec<Term>,
    ) -> Result<Term> {
        let config = self.snapshot();
        if *node == config.node {
            return self.serve(rt, op, args).await;
        }
        match &config.rpc {
            Some(rpc) => {
                tracing::debug!(%node, op, "dispatching file operation over configured transport");
                rpc.call(
                    vec![
                        Term::Text(node.to_string()),
                        Term::Text(op.to_string()),
                        Term::List(args),
                    ],
                    Requirement::Required,
                )
                .await
            }
            None => cluster::dispatch(node, op, args).await,
        }
    }

    /// Serve one operation on the receiving side, under this node's own
    /// matrix.
    pub async fn serve(&self, _rt: &Resx, op: &str, args: Vec<Term>) -> Result<Term> {
        let config = self.snapshot();
        let path = text_arg(&args, 0)?;
        if !allowed(&config.access, &config.node, &path).await? {
            return Err(protected());
        }
        match op {
            "open" => serve_open(&path).await,
            "read" => serve_read(&path).await,
            "meta" => serve_meta(&path).await,
            "exists" => serve_exists(&path).await,
            "attributes" => serve_attributes(&path).await,
            "store" => {
                let data = bytes_arg(&args, 1)?;
                let meta = bytes_arg(&args, 2)?;
                let modes = text_list_arg(&args, 3)?;
                serve_store(&path, &data, &meta, &modes).await
            }
            "discard" => {
                let content = bool_arg(&args, 1)?;
                let meta = bool_arg(&args, 2)?;
                serve_discard(&path, content, meta).await
            }
            other => Err(Error::Internal(format!("unknown file operation: {other}"))),
        }
    }
}

// ---------------------------------------------------------------------
// Receiving-side operations
// ---------------------------------------------------------------------

async fn serve_open(path: &str) -> Result<Term> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| Error::from_io(e, path))?;
    let meta = read_sidecar(path).await?;
    let stat = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::from_io(e, path))?;
    let mut reply = Term::map();
    reply.insert("data".to_string(), Term::Bytes(data));
    reply.insert("meta".to_string(), meta);
    reply.insert("mtime".to_string(), Term::Int(mtime_secs(&stat)));
    Ok(Term::Map(reply))
}

async fn serve_read(path: &str) -> Result<Term> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| Error::from_io(e, path))?;
    Ok(Term::Bytes(data))
}

async fn serve_meta(path: &str) -> Result<Term> {
    read_sidecar(path).await
}

async fn serve_exists(path: &str) -> Result<Term> {
    let exists = tokio::fs::try_exists(path)
        .await
        .map_err(|e| Error::from_io(e, path))?;
    Ok(Term::Bool(exists))
}

async fn serve_attributes(path: &str) -> Result<Term> {
    let stat = tokio::fs::metadata(path)
        .await
        .map_err(|e| Error::from_io(e, path))?;
    let name = path.rsplit('/').next().unwrap_or(path);
    Ok(Term::Map(crate::attrs::stat_terms(&stat, name)))
}

async fn serve_store(path: &str, data: &[u8], meta: &[u8], modes: &[String]) -> Result<Term> {
    prepare_parent(path).await?;
    tokio::fs::write(sidecar_path(path), meta)
        .await
        .map_err(|e| Error::from_io(e, path))?;
    if modes.iter().any(|m| m == "append") {
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| Error::from_io(e, path))?;
        file.write_all(data)
            .await
            .map_err(|e| Error::from_io(e, path))?;
        file.flush().await.map_err(|e| Error::from_io(e, path))?;
    } else {
        tokio::fs::write(path, data)
            .await
            .map_err(|e| Error::from_io(e, path))?;
    }
    Ok(Term::Null)
}

async fn serve_discard(path: &str, content: bool, meta: bool) -> Result<Term> {
    if content {
        tokio::fs::remove_file(path)
            .await
            .map_err(|e| Error::from_io(e, path))?;
    }
    if meta {
        match tokio::fs::remove_file(sidecar_path(path)).await {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(Error::from_io(e, path)),
        }
    }
    Ok(Term::Null)
}

async fn read_sidecar(path: &str) -> Result<Term> {
    match tokio::fs::read(sidecar_path(path)).await {
        Ok(bytes) => Ok(Term::Bytes(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Term::Null),
        Err(e) => Err(Error::from_io(e, path)),
    }
}

fn sidecar_path(path: &str) -> String {
    format!("{path}.meta")
}

async fn prepare_parent(path: &str) -> Result<()> {
    if let Some(parent) = Path::new(path).parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| Error::from_io(e, path))?;
    }
    Ok(())
}

fn mtime_secs(stat: &std::fs::Metadata) -> i64 {
    use std::os::unix::fs::MetadataExt;
    stat.mtime()
}

// ---------------------------------------------------------------------
// Reply and argument plumbing
// ---------------------------------------------------------------------

fn text_arg(args: &[Term], at: usize) -> Result<String> {
    args.get(at)
        .and_then(Term::as_text)
        .map(str::to_string)
        .ok_or_else(|| Error::internal("malformed file operation arguments"))
}

fn bytes_arg(args: &[Term], at: usize) -> Result<Vec<u8>> {
    args.get(at)
        .and_then(Term::as_bytes)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| Error::internal("malformed file operation arguments"))
}

fn bool_arg(args: &[Term], at: usize) -> Result<bool> {
    args.get(at)
        .and_then(Term::as_bool)
        .ok_or_else(|| Error::internal("malformed file operation arguments"))
}

fn text_list_arg(args: &[Term], at: usize) -> Result<Vec<String>> {
    let list = args
        .get(at)
        .and_then(Term::as_list)
        .ok_or_else(|| Error::internal("malformed file operation arguments"))?;
    Ok(list
        .iter()
        .filter_map(Term::as_text)
        .map(str::to_string)
        .collect())
}

fn decode_meta(term: &Term, path: &str, has_source: bool) -> Result<Meta> {
    match term {
        Term::Null => {
            if has_source {
                // Content without the sidecar is a cache miss for a
                // source-backed reference.
                Err(Error::UnknownResource(path.to_string()))
            } else {
                Ok(Meta::new())
            }
        }
        Term::Bytes(bytes) => {
            codec::decode(bytes).map_err(|e| Error::Internal(format!("bad meta sidecar: {e}")))
        }
        _ => Err(Error::internal("malformed meta reply")),
    }
}

fn split_chunks(data: Bytes, size: usize) -> Vec<Chunk> {
    let size = size.max(1);
    let mut out = Vec::new();
    let mut rest = data;
    while rest.len() > size {
        out.push(Chunk::Bytes(rest.split_to(size)));
    }
    if !rest.is_empty() {
        out.push(Chunk::Bytes(rest));
    }
    out
}

// ---------------------------------------------------------------------
// Streaming sources
// ---------------------------------------------------------------------

/// Read-side source: carries `(node, path)`, never a handle; each
/// reduction re-invokes the (possibly remote) enumeration.
struct FileChunkSource {
    rt: Resx,
    config: Arc<RwLock<FileConfig>>,
    node: NodeId,
    path: String,
}

impl ChunkSource for FileChunkSource {
    fn acquire(&self) -> ChunkStream {
        let rt = self.rt.clone();
        let producer = FileProducer::from_handle(self.config.clone());
        let node = self.node.clone();
        let path = self.path.clone();
        futures::stream::once(async move {
            let chunks: Vec<Result<Chunk>> = match producer
                .call_node(&rt, &node, "read", vec![Term::Text(path)])
                .await
            {
                Ok(Term::Bytes(data)) => split_chunks(Bytes::from(data), DEFAULT_CHUNK)
                    .into_iter()
                    .map(Ok)
                    .collect(),
                Ok(_) => vec![Err(Error::internal("malformed read reply"))],
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(chunks)
        })
        .flatten()
        .boxed()
    }
}

/// Write-side source: deferred persistence. Driving the stream writes
/// the sidecar first, then writes each content chunk through to the
/// file while re-emitting it downstream.
struct StoreChunkSource {
    rt: Resx,
    config: Arc<RwLock<FileConfig>>,
    repo: FileRepo,
    inner: Content,
    meta: Vec<u8>,
    modes: Vec<String>,
    chunk: usize,
}

enum WriteState {
    Start,
    Running {
        chunks: ChunkStream,
        file: tokio::fs::File,
    },
}

impl StoreChunkSource {
    fn local_stream(&self) -> ChunkStream {
        let path = self.repo.path.clone();
        let meta = self.meta.clone();
        let modes = self.modes.clone();
        let inner = self.inner.clone();
        futures::stream::try_unfold(WriteState::Start, move |state| {
            let path = path.clone();
            let meta = meta.clone();
            let modes = modes.clone();
            let inner = inner.clone();
            async move {
                match state {
                    WriteState::Start => {
                        prepare_parent(&path).await?;
                        // Sidecar lands before any chunk is emitted
                        // downstream.
                        tokio::fs::write(sidecar_path(&path), &meta)
                            .await
                            .map_err(|e| Error::from_io(e, &path))?;
                        let mut options = tokio::fs::OpenOptions::new();
                        if modes.iter().any(|m| m == "append") {
                            options.create(true).append(true);
                        } else {
                            options.create(true).write(true).truncate(true);
                        }
                        let mut file = options
                            .open(&path)
                            .await
                            .map_err(|e| Error::from_io(e, &path))?;
                        let mut chunks = content_chunks(&inner);
                        match chunks.next().await {
                            None => {
                                file.flush().await.map_err(|e| Error::from_io(e, &path))?;
                                Ok(None)
                            }
                            Some(chunk) => {
                                let chunk = chunk?;
                                write_chunk(&mut file, &chunk, &path).await?;
                                Ok(Some((chunk, WriteState::Running { chunks, file })))
                            }
                        }
                    }
                    WriteState::Running {
                        mut chunks,
                        mut file,
                    } => match chunks.next().await {
                        None => {
                            file.flush().await.map_err(|e| Error::from_io(e, &path))?;
                            Ok(None)
                        }
                        Some(chunk) => {
                            let chunk = chunk?;
                            write_chunk(&mut file, &chunk, &path).await?;
                            Ok(Some((chunk, WriteState::Running { chunks, file })))
                        }
                    },
                }
            }
        })
        .boxed()
    }

    fn remote_stream(&self) -> ChunkStream {
        let rt = self.rt.clone();
        let producer = FileProducer::from_handle(self.config.clone());
        let repo = self.repo.clone();
        let meta = self.meta.clone();
        let modes = self.modes.clone();
        let inner = self.inner.clone();
        let chunk = self.chunk;
        futures::stream::once(async move {
            let chunks: Vec<Result<Chunk>> = match remote_store(
                &rt, &producer, &repo, &inner, meta, modes,
            )
            .await
            {
                Ok(data) => split_chunks(data, chunk).into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(chunks)
        })
        .flatten()
        .boxed()
    }
}

async fn remote_store(
    rt: &Resx,
    producer: &FileProducer,
    repo: &FileRepo,
    inner: &Content,
    meta: Vec<u8>,
    modes: Vec<String>,
) -> Result<Bytes> {
    let data = inner.bytes(rt).await?;
    producer
        .call_node(
            rt,
            &repo.node,
            "store",
            vec![
                Term::Text(repo.path.clone()),
                Term::Bytes(data.to_vec()),
                Term::Bytes(meta),
                Term::List(modes.into_iter().map(Term::Text).collect()),
            ],
        )
        .await?;
    Ok(data)
}

impl ChunkSource for StoreChunkSource {
    fn acquire(&self) -> ChunkStream {
        let local = self.config.read().node.clone();
        if self.repo.node == local {
            self.local_stream()
        } else {
            self.remote_stream()
        }
    }
}

fn content_chunks(content: &Content) -> ChunkStream {
    match content {
        Content::Eager { data, .. } => {
            futures::stream::iter(vec![Ok(Chunk::Bytes(data.clone()))]).boxed()
        }
        Content::Stream { stream, .. } => stream.acquire(),
    }
}

async fn write_chunk(file: &mut tokio::fs::File, chunk: &Chunk, path: &str) -> Result<()> {
    let bytes = chunk
        .as_bytes()
        .ok_or_else(|| Error::internal("store content chunk is not binary"))?;
    file.write_all(bytes)
        .await
        .map_err(|e| Error::from_io(e, path))
}

// ---------------------------------------------------------------------
// Producer + Storer
// ---------------------------------------------------------------------

#[async_trait]
impl Producer for FileProducer {
    fn adapter_id(&self) -> &'static str {
        ADAPTER
    }

    fn schemes(&self) -> &'static [&'static str] {
        &["file"]
    }

    fn parse(&self, rt: &Resx, uri: &str) -> Result<Reference> {
        let repo = parse_uri(rt, uri, &self.node())?;
        Ok(Reference::new(
            AdapterId::new(ADAPTER),
            codec::to_term(&repo)?,
            Integrity::now(),
        ))
    }

    fn uri(&self, rt: &Resx, r: &Reference) -> Result<String> {
        emit_uri(rt, &Self::repo(r)?)
    }

    async fn open(&self, rt: &Resx, r: &Reference, _opts: &Options) -> Result<Resource> {
        let repo = Self::repo(r)?;
        self.check_access(&repo.node, &repo.path).await?;
        let reply = self
            .call_node(rt, &repo.node, "open", vec![Term::Text(repo.path.clone())])
            .await?;
        let data = reply
            .get("data")
            .and_then(Term::as_bytes)
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::internal("malformed open reply"))?;
        let meta = decode_meta(
            reply.get("meta").unwrap_or(&Term::Null),
            &repo.path,
            repo.source.is_some(),
        )?;
        let mtime = reply.get("mtime").and_then(Term::as_int).unwrap_or(0);
        let timestamp = UNIX_EPOCH + Duration::from_secs(mtime.max(0) as u64);
        let kind = mime_map::derive(repo.name());
        Ok(Resource::new(
            r.with_integrity(Integrity::at(timestamp)),
            Content::eager(kind, data),
            meta,
        ))
    }

    async fn stream(&self, rt: &Resx, r: &Reference, _opts: &Options) -> Result<Resource> {
        let repo = Self::repo(r)?;
        self.check_access(&repo.node, &repo.path).await?;
        let exists = self
            .call_node(
                rt,
                &repo.node,
                "exists",
                vec![Term::Text(repo.path.clone())],
            )
            .await?
            .as_bool()
            .ok_or_else(|| Error::internal("malformed exists reply"))?;
        if !exists {
            return Err(Error::UnknownResource(repo.path.clone()));
        }
        let meta_term = self
            .call_node(rt, &repo.node, "meta", vec![Term::Text(repo.path.clone())])
            .await?;
        let meta = decode_meta(&meta_term, &repo.path, repo.source.is_some())?;
        let kind = mime_map::derive(repo.name());
        let stream = ContentStream::new(Arc::new(FileChunkSource {
            rt: rt.clone(),
            config: self.config.clone(),
            node: repo.node.clone(),
            path: repo.path.clone(),
        }));
        Ok(Resource::new(
            r.with_integrity(Integrity::now()),
            Content::stream(kind, stream),
            meta,
        ))
    }

    async fn exists(&self, rt: &Resx, r: &Reference) -> Result<bool> {
        let repo = Self::repo(r)?;
        self.check_access(&repo.node, &repo.path).await?;
        self.call_node(
            rt,
            &repo.node,
            "exists",
            vec![Term::Text(repo.path.clone())],
        )
        .await?
        .as_bool()
        .ok_or_else(|| Error::internal("malformed exists reply"))
    }

    fn alike(&self, _rt: &Resx, a: &Reference, b: &Reference) -> bool {
        match (Self::repo(a), Self::repo(b)) {
            (Ok(ra), Ok(rb)) => ra.node == rb.node && ra.path == rb.path,
            _ => false,
        }
    }

    fn source(&self, r: &Reference) -> Result<Option<Reference>> {
        Ok(Self::repo(r)?.source)
    }

    async fn attributes(&self, rt: &Resx, r: &Reference) -> Result<BTreeMap<String, Term>> {
        let repo = Self::repo(r)?;
        self.check_access(&repo.node, &repo.path).await?;
        let reply = self
            .call_node(
                rt,
                &repo.node,
                "attributes",
                vec![Term::Text(repo.path.clone())],
            )
            .await;
        match reply {
            Ok(Term::Map(map)) => Ok(map),
            Ok(_) => Err(Error::internal("malformed attributes reply")),
            // An absent file with a source backup answers with the
            // source's attributes.
            Err(Error::UnknownResource(detail)) => match repo.source.clone() {
                Some(inner) => rt.attributes(&inner).await,
                None => Err(Error::UnknownResource(detail)),
            },
            Err(e) => Err(e),
        }
    }

    fn as_storer(&self) -> Option<&dyn Storer> {
        Some(self)
    }
}

#[async_trait]
impl Storer for FileProducer {
    async fn store(&self, rt: &Resx, resource: Resource, opts: &Options) -> Result<Resource> {
        let path = opts
            .get("path")
            .and_then(Term::as_text)
            .ok_or_else(|| Error::invalid("store requires a path"))?
            .to_string();
        if !path.starts_with('/') {
            return Err(Error::invalid("store path is not absolute"));
        }
        let node = opts
            .get("node")
            .and_then(Term::as_text)
            .map(NodeId::new)
            .unwrap_or_else(|| self.node());
        let modes = opts
            .get("modes")
            .and_then(Term::as_list)
            .map(|list| {
                list.iter()
                    .filter_map(Term::as_text)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let chunk = opts
            .get("bytes")
            .and_then(Term::as_int)
            .map(|n| n.max(1) as usize)
            .unwrap_or(DEFAULT_CHUNK);

        self.check_access(&node, &path).await?;

        let repo = FileRepo {
            node,
            path,
            source: Some(resource.reference.clone()),
        };
        let kind = mime_map::derive(repo.name());
        let meta_bytes = codec::encode(&resource.meta)?;
        let reference = Reference::new(
            AdapterId::new(ADAPTER),
            codec::to_term(&repo)?,
            Integrity::now(),
        );
        let stream = ContentStream::new(Arc::new(StoreChunkSource {
            rt: rt.clone(),
            config: self.config.clone(),
            repo,
            inner: resource.content.clone(),
            meta: meta_bytes,
            modes,
            chunk,
        }));
        Ok(Resource::new(
            reference,
            Content::stream(kind, stream),
            resource.meta,
        ))
    }

    async fn discard(&self, rt: &Resx, r: &Reference, opts: &Options) -> Result<()> {
        let repo = Self::repo(r)?;
        self.check_access(&repo.node, &repo.path).await?;
        let content = opts
            .get("content")
            .and_then(Term::as_bool)
            .unwrap_or(true);
        let meta = opts.get("meta").and_then(Term::as_bool).unwrap_or(true);
        self.call_node(
            rt,
            &repo.node,
            "discard",
            vec![
                Term::Text(repo.path.clone()),
                Term::Bool(content),
                Term::Bool(meta),
            ],
        )
        .await?;
        Ok(())
    }

    fn prepare_store(&self, r: &Reference) -> Result<Options> {
        let repo = Self::repo(r)?;
        let mut opts = Options::new();
        opts.insert("path".to_string(), Term::Text(repo.path));
        opts.insert("node".to_string(), Term::Text(repo.node.to_string()));
        Ok(opts)
    }
}
