use std::collections::BTreeMap;

use crate::content::Content;
use crate::reference::Reference;
use crate::term::Term;

/// Side-channel key/value pairs persisted alongside stored resources.
/// Meta travels with the resource but is never part of its digest.
pub type Meta = BTreeMap<String, Term>;

/// A realised resource: its identity, its payload, and its meta.
///
/// Resources are immutable values; every operation that "changes" one
/// constructs a new value.
#[derive(Debug, Clone)]
pub struct Resource {
    pub reference: Reference,
    pub content: Content,
    pub meta: Meta,
}

impl Resource {
    pub fn new(reference: Reference, content: Content, meta: Meta) -> Self {
        Self {
            reference,
            content,
            meta,
        }
    }

    pub fn reference(&self) -> &Reference {
        &self.reference
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    pub fn meta(&self) -> &Meta {
        &self.meta
    }
}
