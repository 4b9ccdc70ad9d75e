use std::io::ErrorKind;

/// The error envelope for every fallible pipeline operation.
///
/// The four kinds are disjoint by contract:
/// - `InvalidReference`: the reference is syntactically or semantically
///   unusable (bad URI, unknown transformation, blocked by access policy).
/// - `UnknownResource`: the reference is fine but the thing it points at
///   does not exist. This is the only kind the facade will try to recover
///   from (source-backed restoration).
/// - `UnknownKey`: an attribute key the producer does not expose.
/// - `Internal`: everything else (I/O, transport, serialization).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("internal error: {0}")]
    Internal(String),
    #[error("invalid reference: {0}")]
    InvalidReference(String),
    #[error("unknown resource: {0}")]
    UnknownResource(String),
    #[error("unknown key: {0}")]
    UnknownKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub fn internal(detail: impl std::fmt::Display) -> Self {
        Error::Internal(detail.to_string())
    }

    pub fn invalid(detail: impl std::fmt::Display) -> Self {
        Error::InvalidReference(detail.to_string())
    }

    /// Normalise an I/O error against the path it occurred on.
    ///
    /// A missing entry becomes `UnknownResource` (so the facade can attempt
    /// source-backed restoration); anything else is `Internal`.
    pub fn from_io(err: std::io::Error, path: &str) -> Self {
        match err.kind() {
            ErrorKind::NotFound => Error::UnknownResource(path.to_string()),
            kind => Error::Internal(format!("{kind}: {path}")),
        }
    }
}

impl From<crate::codec::CodecError> for Error {
    fn from(err: crate::codec::CodecError) -> Self {
        Error::Internal(err.to_string())
    }
}
