//! Test fixtures: small content transformers used across the unit and
//! integration suites.

use async_trait::async_trait;

use crate::content::Content;
use crate::error::Result;
use crate::resource::Resource;
use crate::term::Term;
use crate::transformer::Transformer;
use crate::Resx;

/// Register the fixture transformers (`prefix`, `suffix`, `replace`).
pub fn register_transformers(rt: &Resx) {
    rt.register_transformer(std::sync::Arc::new(Prefix));
    rt.register_transformer(std::sync::Arc::new(Suffix));
    rt.register_transformer(std::sync::Arc::new(Replace));
}

fn text_option<'a>(options: &'a Term, key: &str, default: &'a str) -> &'a str {
    options
        .get(key)
        .and_then(Term::as_text)
        .unwrap_or(default)
}

/// Prepends `text` (default `foo`).
pub struct Prefix;

#[async_trait]
impl Transformer for Prefix {
    fn name(&self) -> &'static str {
        "prefix"
    }

    async fn transform(&self, rt: &Resx, resource: Resource, options: &Term) -> Result<Resource> {
        let text = text_option(options, "text", "foo");
        let data = resource.content.bytes(rt).await?;
        let mut out = text.as_bytes().to_vec();
        out.extend_from_slice(&data);
        Ok(Resource::new(
            resource.reference,
            Content::eager(resource.content.kind().to_vec(), out),
            resource.meta,
        ))
    }
}

/// Appends `text` (default `bar`).
pub struct Suffix;

#[async_trait]
impl Transformer for Suffix {
    fn name(&self) -> &'static str {
        "suffix"
    }

    async fn transform(&self, rt: &Resx, resource: Resource, options: &Term) -> Result<Resource> {
        let text = text_option(options, "text", "bar");
        let mut out = resource.content.bytes(rt).await?.to_vec();
        out.extend_from_slice(text.as_bytes());
        Ok(Resource::new(
            resource.reference,
            Content::eager(resource.content.kind().to_vec(), out),
            resource.meta,
        ))
    }
}

/// Replaces every occurrence of `pattern` with `replacement`.
pub struct Replace;

#[async_trait]
impl Transformer for Replace {
    fn name(&self) -> &'static str {
        "replace"
    }

    async fn transform(&self, rt: &Resx, resource: Resource, options: &Term) -> Result<Resource> {
        let pattern = text_option(options, "pattern", "");
        let replacement = text_option(options, "replacement", "");
        let data = resource.content.bytes(rt).await?;
        let text = String::from_utf8_lossy(&data);
        let out = if pattern.is_empty() {
            text.into_owned()
        } else {
            text.replace(pattern, replacement)
        };
        Ok(Resource::new(
            resource.reference,
            Content::eager(resource.content.kind().to_vec(), out),
            resource.meta,
        ))
    }
}
