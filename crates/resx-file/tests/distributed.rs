//! Operations that cross a node boundary: both matrices apply, and the
//! transport is pluggable.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use resx::callback::Callback;
use resx::error::Error;
use resx::producer::Options;
use resx::term::Term;
use resx_file::access::NodeMatch;
use resx_file::{cluster, AccessRule, NodeId};

fn seed_file(dir: &tempfile::TempDir, name: &str, data: &[u8]) -> String {
    let path = dir.path().join(name);
    std::fs::write(&path, data).unwrap();
    path.to_string_lossy().into_owned()
}

#[tokio::test]
async fn open_passes_when_both_matrices_allow() {
    let caller = common::open_node("dist-a1");
    let owner = common::closed_node("dist-a2");

    let dir = tempfile::TempDir::new().unwrap();
    let path = seed_file(&dir, "p.txt", b"remote payload");

    // The owner grants the path to itself only.
    {
        let path = path.clone();
        let name = owner.name.clone();
        owner.files.configure(move |c| {
            c.access = vec![AccessRule::scoped(
                NodeMatch::Id(name),
                resx::pattern::PathPattern::glob(&path).unwrap(),
            )]
        });
    }

    let resource = caller
        .rt
        .open_uri(&common::file_uri(&owner, &path))
        .await
        .unwrap();
    assert_eq!(
        resource.content.bytes(&caller.rt).await.unwrap().as_ref(),
        b"remote payload"
    );
}

#[tokio::test]
async fn open_fails_when_the_owner_denies() {
    let caller = common::open_node("dist-b1");
    let owner = common::closed_node("dist-b2");

    let dir = tempfile::TempDir::new().unwrap();
    let path = seed_file(&dir, "p.txt", b"remote payload");

    // The owner's matrix names a different node, so the receiving-side
    // check refuses.
    {
        let path = path.clone();
        owner.files.configure(move |c| {
            c.access = vec![AccessRule::scoped(
                NodeMatch::Id(NodeId::new("somebody-else")),
                resx::pattern::PathPattern::glob(&path).unwrap(),
            )]
        });
    }

    let err = caller
        .rt
        .open_uri(&common::file_uri(&owner, &path))
        .await
        .unwrap_err();
    assert_eq!(err, Error::InvalidReference("protected file".to_string()));
}

#[tokio::test]
async fn open_fails_when_the_caller_denies() {
    let caller = common::closed_node("dist-c1");
    let owner = common::open_node("dist-c2");

    let dir = tempfile::TempDir::new().unwrap();
    let path = seed_file(&dir, "p.txt", b"remote payload");

    // The calling node checks its own matrix before dispatching.
    let err = caller
        .rt
        .open_uri(&common::file_uri(&owner, &path))
        .await
        .unwrap_err();
    assert_eq!(err, Error::InvalidReference("protected file".to_string()));
}

#[tokio::test]
async fn streams_reacquire_the_remote_file_per_reduction() {
    let caller = common::open_node("dist-d1");
    let owner = common::open_node("dist-d2");

    let dir = tempfile::TempDir::new().unwrap();
    let path = seed_file(&dir, "p.txt", b"first");

    let resource = caller
        .rt
        .stream_uri(&common::file_uri(&owner, &path))
        .await
        .unwrap();
    assert_eq!(
        resource.content.bytes(&caller.rt).await.unwrap().as_ref(),
        b"first"
    );

    // The stream holds no handle: a second reduction observes the
    // rewritten file.
    std::fs::write(&path, b"second").unwrap();
    assert_eq!(
        resource.content.bytes(&caller.rt).await.unwrap().as_ref(),
        b"second"
    );
}

#[tokio::test]
async fn store_routes_to_the_owning_node() {
    let caller = common::open_node("dist-e1");
    let owner = common::open_node("dist-e2");

    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("out.txt").to_string_lossy().into_owned();

    let payload = caller.rt.open_uri("data:,spread").await.unwrap();
    let mut opts = Options::new();
    opts.insert("path".to_string(), Term::Text(path.clone()));
    opts.insert("node".to_string(), Term::Text(owner.name.to_string()));
    let stored = caller.rt.store("file", payload, &opts).await.unwrap();

    // Driving the deferred stream performs the remote write.
    assert_eq!(
        stored.content.bytes(&caller.rt).await.unwrap().as_ref(),
        b"spread"
    );
    assert_eq!(std::fs::read(&path).unwrap(), b"spread");

    // The owner reads it back locally.
    let local = owner
        .rt
        .open_uri(&common::file_uri(&owner, &path))
        .await
        .unwrap();
    assert_eq!(
        local.content.bytes(&owner.rt).await.unwrap().as_ref(),
        b"spread"
    );
}

#[tokio::test]
async fn unknown_nodes_are_internal_errors() {
    let caller = common::open_node("dist-f1");
    let err = caller
        .rt
        .open_uri("file://nowhere-to-be-found/p.txt")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Internal(_)), "got {err:?}");
}

#[tokio::test]
async fn a_configured_transport_carries_the_traffic() {
    let caller = common::open_node("dist-g1");
    let owner = common::open_node("dist-g2");

    let dir = tempfile::TempDir::new().unwrap();
    let path = seed_file(&dir, "p.txt", b"via hook");

    let hops = Arc::new(AtomicUsize::new(0));
    {
        let hops = hops.clone();
        caller.files.configure(move |c| {
            let hops = hops.clone();
            c.rpc = Some(Callback::new(3, move |args| {
                let hops = hops.clone();
                Box::pin(async move {
                    hops.fetch_add(1, Ordering::SeqCst);
                    let node = NodeId::new(args[0].as_text().unwrap_or_default());
                    let op = args[1].as_text().unwrap_or_default().to_string();
                    let call_args = args[2].as_list().unwrap_or_default().to_vec();
                    cluster::dispatch(&node, &op, call_args).await
                })
            }));
        });
    }

    let resource = caller
        .rt
        .open_uri(&common::file_uri(&owner, &path))
        .await
        .unwrap();
    assert_eq!(
        resource.content.bytes(&caller.rt).await.unwrap().as_ref(),
        b"via hook"
    );
    assert!(hops.load(Ordering::SeqCst) > 0);
}
