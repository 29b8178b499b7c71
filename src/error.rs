use std::sync::Arc;

/// Represents a result type for operations in this crate.
///
/// Only construction and hydration can fail. Evaluation itself never returns an error: malformed
/// configuration degrades to `false` or `unknown` results instead (see the crate documentation).
pub type Result<T> = std::result::Result<T, Error>;

/// Enum representing possible errors that can occur in this crate.
#[derive(thiserror::Error, Debug, Clone)]
#[non_exhaustive]
pub enum Error {
    /// A strategy was registered with an empty name. Strategies are looked up by name during
    /// evaluation, so a nameless strategy could never be matched.
    #[error("strategy registered without a name")]
    InvalidStrategy,

    /// The client features document could not be parsed at all.
    ///
    /// Individual malformed entries inside an otherwise valid document do not produce this error;
    /// they are dropped during snapshot construction.
    #[error("invalid client features document")]
    // serde_json::Error is not clonable, so we're wrapping it in an Arc.
    InvalidFeaturesDocument(#[source] Arc<serde_json::Error>),
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        Error::InvalidFeaturesDocument(Arc::new(value))
    }
}
