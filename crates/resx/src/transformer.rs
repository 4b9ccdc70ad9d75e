use async_trait::async_trait;

use crate::error::Result;
use crate::resource::Resource;
use crate::term::Term;
use crate::Resx;

/// A named, parametric content transformation.
///
/// A transformer may replace the resource's content (eager or streaming)
/// and meta, but must never rewrite its reference; the transform
/// producer wraps the reference on its behalf.
#[async_trait]
pub trait Transformer: Send + Sync {
    /// The name the transformation is registered and addressed under.
    fn name(&self) -> &'static str;

    async fn transform(&self, rt: &Resx, resource: Resource, options: &Term) -> Result<Resource>;
}
