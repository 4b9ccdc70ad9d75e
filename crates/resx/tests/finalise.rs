//! Finalisation, hashing, and lineage comparison.

mod common;

use std::time::Duration;

use resx::compare::{CompareOptions, Comparison};
use resx::content::Content;
use resx::hashing::{self, HashSpec};
use resx::integrity::Integrity;
use resx::resource::Resource;
use resx::FinaliseOptions;

async fn finalised(rt: &resx::Resx, uri: &str) -> Resource {
    let resource = rt.open_uri(uri).await.unwrap();
    rt.finalise(resource, &FinaliseOptions::default())
        .await
        .unwrap()
}

/// A copy of the resource with its checksum stripped, timestamp intact.
fn without_checksum(resource: &Resource) -> Resource {
    let stamp = Integrity::at(resource.reference.integrity().timestamp);
    Resource::new(
        resource.reference.with_integrity(stamp),
        resource.content.clone(),
        resource.meta.clone(),
    )
}

/// A copy with different content behind the same reference.
fn with_content(resource: &Resource, data: &str) -> Resource {
    Resource::new(
        resource.reference.clone(),
        Content::eager(resource.content.kind().to_vec(), data.to_string()),
        resource.meta.clone(),
    )
}

#[tokio::test]
async fn finalise_stamps_the_content_digest() {
    let rt = common::runtime();
    let resource = finalised(&rt, "data:,hello").await;

    let checksum = resource
        .reference
        .integrity()
        .checksum
        .clone()
        .expect("finalised resources carry a checksum");
    assert_eq!(checksum.algorithm, "sha256");

    let direct = hashing::digest(&rt, &resource.content, &HashSpec::named("sha256"))
        .await
        .unwrap();
    assert_eq!(checksum, direct);

    // Hashing short-circuits on the embedded checksum.
    let again = rt.hash(&resource, None).await.unwrap();
    assert_eq!(again, checksum);
}

#[tokio::test]
async fn hash_is_pure() {
    let rt = common::runtime();
    let resource = rt.open_uri("data:,payload").await.unwrap();
    let one = rt.hash(&resource, None).await.unwrap();
    let two = rt.hash(&resource, None).await.unwrap();
    assert_eq!(one, two);
}

#[tokio::test]
async fn compare_orders_by_timestamp_when_digests_agree() {
    let rt = common::runtime();
    let a = finalised(&rt, "data:,hello").await;
    // Force distinguishable reference timestamps.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let b = finalised(&rt, "data:,hello").await;

    let opts = CompareOptions::default();
    assert_eq!(rt.compare(&a, &b, &opts).await.unwrap(), Some(Comparison::Lt));
    assert_eq!(rt.compare(&b, &a, &opts).await.unwrap(), Some(Comparison::Gt));
    assert_eq!(rt.compare(&a, &a, &opts).await.unwrap(), Some(Comparison::Eq));

    assert!(std::ptr::eq(
        rt.newest(&a, &b, &opts).await.unwrap().unwrap(),
        &b
    ));
    assert!(std::ptr::eq(
        rt.oldest(&a, &b, &opts).await.unwrap().unwrap(),
        &a
    ));
}

#[tokio::test]
async fn compare_without_checksums_is_unsure() {
    let rt = common::runtime();
    let a = finalised(&rt, "data:,hello").await;
    let stripped = without_checksum(&a);

    let opts = CompareOptions::default();
    assert_eq!(
        rt.compare(&a, &stripped, &opts).await.unwrap(),
        Some(Comparison::Na)
    );

    // Content comparison resolves the uncertainty.
    let content_opts = CompareOptions::default().content(true);
    assert_eq!(
        rt.compare(&a, &stripped, &content_opts).await.unwrap(),
        Some(Comparison::Eq)
    );

    // And `unsure` remaps what stays unanswerable.
    let mapped = CompareOptions::default().unsure(Comparison::Eq);
    assert_eq!(
        rt.compare(&a, &stripped, &mapped).await.unwrap(),
        Some(Comparison::Eq)
    );
}

#[tokio::test]
async fn compare_detects_content_divergence() {
    let rt = common::runtime();
    let a = finalised(&rt, "data:,hello").await;
    let modified = with_content(&a, "test");

    let opts = CompareOptions::default().content(true);
    assert_eq!(
        rt.compare(&a, &modified, &opts).await.unwrap(),
        Some(Comparison::Ne)
    );
}

#[tokio::test]
async fn compare_refuses_unrelated_resources() {
    let rt = common::runtime();
    let a = finalised(&rt, "data:,hello").await;
    let b = finalised(&rt, "data:,other").await;
    assert_eq!(
        rt.compare(&a, &b, &CompareOptions::default()).await.unwrap(),
        None
    );
}

#[tokio::test]
async fn transformed_lineage_compares_link_by_link() {
    let rt = common::runtime();

    let base = rt.open_uri("data:,test").await.unwrap();
    let a = rt
        .transform(&base, "prefix", resx::term::Term::empty_map())
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;
    let b = rt
        .transform(&base, "prefix", resx::term::Term::empty_map())
        .await
        .unwrap();

    // Transform layers carry no checksum, so the outermost link decides
    // by timestamp.
    assert_eq!(
        rt.compare(&a, &b, &CompareOptions::default()).await.unwrap(),
        Some(Comparison::Lt)
    );
}
