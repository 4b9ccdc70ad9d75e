//! Deferred stores and streaming reads on a single node.

mod common;

use resx::producer::Options;
use resx::term::Term;

fn store_opts(path: &str) -> Options {
    let mut opts = Options::new();
    opts.insert("path".to_string(), Term::Text(path.to_string()));
    opts
}

#[tokio::test]
async fn store_is_deferred_until_the_stream_is_driven() {
    let node = common::open_node("store-defer");
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("late.txt").to_string_lossy().into_owned();

    let payload = node.rt.open_uri("data:,deferred").await.unwrap();
    let stored = node
        .rt
        .store("file", payload, &store_opts(&path))
        .await
        .unwrap();

    // Nothing has touched the disk yet.
    assert!(!std::path::Path::new(&path).exists());
    assert!(!std::path::Path::new(&format!("{path}.meta")).exists());

    // Driving the stream writes the sidecar, writes the content, and
    // re-emits the chunks downstream.
    let emitted = stored.content.bytes(&node.rt).await.unwrap();
    assert_eq!(emitted.as_ref(), b"deferred");
    assert_eq!(std::fs::read(&path).unwrap(), b"deferred");
    assert!(std::path::Path::new(&format!("{path}.meta")).exists());
}

#[tokio::test]
async fn store_preserves_meta_in_the_sidecar() {
    let node = common::open_node("store-meta");
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("tagged.txt").to_string_lossy().into_owned();

    let mut payload = node.rt.open_uri("data:,tagged").await.unwrap();
    payload
        .meta
        .insert("origin".to_string(), Term::Text("ingest".to_string()));
    payload.meta.insert("revision".to_string(), Term::Int(3));

    let stored = node
        .rt
        .store("file", payload, &store_opts(&path))
        .await
        .unwrap();
    stored.content.bytes(&node.rt).await.unwrap();

    let reopened = node
        .rt
        .open_uri(&node.rt.uri(&stored.reference).unwrap())
        .await
        .unwrap();
    assert_eq!(
        reopened.meta.get("origin"),
        Some(&Term::Text("ingest".to_string()))
    );
    assert_eq!(reopened.meta.get("revision"), Some(&Term::Int(3)));
}

#[tokio::test]
async fn append_mode_accumulates() {
    let node = common::open_node("store-append");
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("log.txt").to_string_lossy().into_owned();

    for part in ["one:", "two"] {
        let payload = node
            .rt
            .open_uri(&format!("data:,{part}"))
            .await
            .unwrap();
        let mut opts = store_opts(&path);
        opts.insert(
            "modes".to_string(),
            Term::List(vec![Term::Text("append".to_string())]),
        );
        let stored = node.rt.store("file", payload, &opts).await.unwrap();
        stored.content.bytes(&node.rt).await.unwrap();
    }
    assert_eq!(std::fs::read(&path).unwrap(), b"one:two");
}

#[tokio::test]
async fn store_requires_an_absolute_path() {
    let node = common::open_node("store-relpath");
    let payload = node.rt.open_uri("data:,x").await.unwrap();

    let err = node
        .rt
        .store("file", payload.clone(), &store_opts("relative.txt"))
        .await
        .unwrap_err();
    assert!(matches!(err, resx::error::Error::InvalidReference(_)));

    let err = node
        .rt
        .store("file", payload, &Options::new())
        .await
        .unwrap_err();
    assert!(matches!(err, resx::error::Error::InvalidReference(_)));
}

#[tokio::test]
async fn streamed_reads_chunk_large_files() {
    let node = common::open_node("stream-large");
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("big.bin").to_string_lossy().into_owned();

    // Three chunks' worth of data at the default chunk size.
    let data = vec![7u8; 3 * 64 * 1024 + 17];
    std::fs::write(&path, &data).unwrap();

    let resource = node
        .rt
        .stream_uri(&common::file_uri(&node, &path))
        .await
        .unwrap();
    let chunks = match &resource.content {
        resx::content::Content::Stream { stream, .. } => stream.collect().await.unwrap(),
        other => panic!("expected a stream, got {other:?}"),
    };
    assert!(chunks.len() >= 4, "got {} chunks", chunks.len());

    let bytes = resource.content.bytes(&node.rt).await.unwrap();
    assert_eq!(bytes.len(), data.len());
    assert_eq!(bytes.as_ref(), &data[..]);
}

#[tokio::test]
async fn mime_derives_from_the_filename() {
    let node = common::open_node("store-mime");
    let dir = tempfile::TempDir::new().unwrap();

    let cases = [
        ("plain.txt", "text/plain"),
        ("photo.jpg.txt", "text/plain"),
        ("unknown", "application/octet-stream"),
    ];
    for (name, outermost) in cases {
        let path = dir.path().join(name).to_string_lossy().into_owned();
        std::fs::write(&path, b"x").unwrap();
        let resource = node
            .rt
            .open_uri(&common::file_uri(&node, &path))
            .await
            .unwrap();
        assert_eq!(
            resource.content.kind()[0].essence_str(),
            outermost,
            "for {name}"
        );
    }

    // Multi-suffix names carry the full list, outermost first.
    let path = dir.path().join("photo.jpg.txt").to_string_lossy().into_owned();
    std::fs::write(&path, b"x").unwrap();
    let resource = node
        .rt
        .open_uri(&common::file_uri(&node, &path))
        .await
        .unwrap();
    assert_eq!(resource.content.kind().len(), 2);
    assert_eq!(resource.content.kind()[1].essence_str(), "image/jpeg");
}

#[tokio::test]
async fn attributes_expose_posix_stat_fields() {
    let node = common::open_node("attrs-stat");
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("stat.txt").to_string_lossy().into_owned();
    std::fs::write(&path, b"12345").unwrap();

    let r = node.rt.resolve(&common::file_uri(&node, &path)).unwrap();
    let attrs = node.rt.attributes(&r).await.unwrap();
    assert_eq!(attrs.get("size"), Some(&Term::Int(5)));
    assert_eq!(attrs.get("type"), Some(&Term::Text("regular".to_string())));
    assert_eq!(
        attrs.get("name"),
        Some(&Term::Text("stat.txt".to_string()))
    );
    for key in [
        "access",
        "modification",
        "ctime",
        "mode",
        "links",
        "uid",
        "gid",
        "device",
        "inode",
    ] {
        assert!(attrs.contains_key(key), "missing {key}");
    }

    let keys = node.rt.attribute_keys(&r).await.unwrap();
    assert!(keys.contains(&"size".to_string()));
    let err = node.rt.attribute(&r, "nope").await.unwrap_err();
    assert_eq!(err, resx::error::Error::UnknownKey("nope".to_string()));
}
