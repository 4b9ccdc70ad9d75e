//! Shared fixtures for the file producer integration tests.
#![allow(dead_code)]

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use resx_file::testkit::TestNode;
use resx_file::AccessRule;

/// A node with a wide-open access matrix.
pub fn open_node(name: &str) -> TestNode {
    init_tracing();
    let node = TestNode::new(name);
    allow_all(&node);
    node
}

/// A node with an empty (deny-everything) matrix.
pub fn closed_node(name: &str) -> TestNode {
    init_tracing();
    TestNode::new(name)
}

pub fn allow_all(node: &TestNode) {
    node.files
        .configure(|config| config.access = vec![AccessRule::glob("**").unwrap()]);
}

/// A `file://` URI on the given node.
pub fn file_uri(node: &TestNode, path: &str) -> String {
    format!("file://{}{}", node.name, path)
}

/// A `file://` URI carrying a source backup.
pub fn cached_uri(node: &TestNode, path: &str, source: &str) -> String {
    format!(
        "file://{}{}?source={}",
        node.name,
        path,
        URL_SAFE_NO_PAD.encode(source.as_bytes())
    )
}

pub fn init_tracing() {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let _ = tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_test_writer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}
