use crate::callback::Callback;
use crate::hashing::HashSpec;
use crate::scheme::ProducerEntry;

/// Process-wide pipeline configuration.
///
/// Configuration is read on every operation, never cached, so a
/// reconfiguration is observed by the very next call.
#[derive(Default)]
pub struct Config {
    /// The default hashing algorithm for finalisation.
    pub hash: HashSpec,
    /// Scheme bindings merged over the default producers.
    pub producers: Vec<ProducerEntry>,
    /// Stream materialisation hook; the default concatenates binary
    /// chunks and collects anything else into a list.
    pub content_combiner: Option<Callback>,
    /// Per-media-type reducer remapping hook.
    pub content_reducer: Option<Callback>,
}
