//! Scheme-to-producer dispatch.
//!
//! The dispatch table is rebuilt from configuration on every lookup:
//! default entries first, configured entries merged over them, so a
//! reconfiguration is observed by the very next call.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::producer::Producer;
use crate::reference::AdapterId;

/// Strip `scheme:` (case-insensitively) off a raw URI.
pub fn strip_scheme<'a>(uri: &'a str, scheme: &str) -> Result<&'a str> {
    match uri.split_once(':') {
        Some((head, rest)) if head.eq_ignore_ascii_case(scheme) => Ok(rest),
        _ => Err(Error::InvalidReference(format!(
            "URI does not carry the {scheme} scheme: {uri}"
        ))),
    }
}

/// One configuration entry: a producer contributing all of its declared
/// schemes, or an explicit single-scheme binding.
#[derive(Clone)]
pub enum ProducerEntry {
    Producer(Arc<dyn Producer>),
    Scheme(String, Arc<dyn Producer>),
}

impl ProducerEntry {
    pub fn producer(p: Arc<dyn Producer>) -> Self {
        ProducerEntry::Producer(p)
    }

    pub fn scheme(scheme: impl Into<String>, p: Arc<dyn Producer>) -> Self {
        ProducerEntry::Scheme(scheme.into(), p)
    }
}

impl std::fmt::Debug for ProducerEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProducerEntry::Producer(p) => write!(f, "Producer({})", p.adapter_id()),
            ProducerEntry::Scheme(scheme, p) => {
                write!(f, "Scheme({scheme} -> {})", p.adapter_id())
            }
        }
    }
}

/// The merged dispatch table.
pub struct SchemeMap {
    by_scheme: BTreeMap<String, Arc<dyn Producer>>,
    by_adapter: BTreeMap<AdapterId, Arc<dyn Producer>>,
}

impl SchemeMap {
    /// Merge configured entries over the defaults.
    pub fn build(defaults: &[ProducerEntry], configured: &[ProducerEntry]) -> Self {
        let mut by_scheme = BTreeMap::new();
        let mut by_adapter = BTreeMap::new();
        for entry in defaults.iter().chain(configured) {
            match entry {
                ProducerEntry::Producer(p) => {
                    for scheme in p.schemes() {
                        by_scheme.insert(scheme.to_string(), p.clone());
                    }
                    by_adapter.insert(AdapterId::new(p.adapter_id()), p.clone());
                }
                ProducerEntry::Scheme(scheme, p) => {
                    by_scheme.insert(scheme.clone(), p.clone());
                    by_adapter.insert(AdapterId::new(p.adapter_id()), p.clone());
                }
            }
        }
        Self {
            by_scheme,
            by_adapter,
        }
    }

    pub fn for_scheme(&self, scheme: &str) -> Option<Arc<dyn Producer>> {
        self.by_scheme.get(scheme).cloned()
    }

    pub fn for_adapter(&self, adapter: &AdapterId) -> Option<Arc<dyn Producer>> {
        self.by_adapter.get(adapter).cloned()
    }
}
