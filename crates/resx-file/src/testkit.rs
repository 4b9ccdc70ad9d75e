//! Test fixtures: named nodes wired into the in-process cluster.

use std::sync::Arc;

use resx::Resx;

use crate::cluster;
use crate::node::NodeId;
use crate::producer::FileProducer;

/// One named node: its own facade, file producer, and configuration,
/// registered in the cluster for the fixture's lifetime.
pub struct TestNode {
    pub name: NodeId,
    pub rt: Resx,
    pub files: Arc<FileProducer>,
}

impl TestNode {
    pub fn new(name: &str) -> Self {
        let name = NodeId::new(name);
        let rt = Resx::new();
        let files = Arc::new(FileProducer::new());
        {
            let node = name.clone();
            files.configure(move |config| config.node = node);
        }
        rt.register_producer(files.clone());
        cluster::register(name.clone(), rt.clone(), files.clone());
        Self { name, rt, files }
    }
}

impl Drop for TestNode {
    fn drop(&mut self) {
        cluster::unregister(&self.name);
    }
}
