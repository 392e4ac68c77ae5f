//! Unified error types.

use http::Method;

/// Boxed error accepted from handlers and collaborators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A route could not be registered.
///
/// Raised at registration time only. A rejected route is never partially
/// inserted: the tree is left exactly as it was before the call.
#[non_exhaustive]
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
pub enum RouteError {
    /// The pattern was empty after trimming whitespace.
    #[error("empty route pattern")]
    EmptyPattern,

    /// A `:` or `*` segment without a name.
    #[error("unnamed path variable in `{pattern}`")]
    UnnamedVariable { pattern: String },

    /// A `*name` segment that is not the last segment of the pattern.
    #[error("wildcard must be the last segment of `{pattern}`")]
    MisplacedWildcard { pattern: String },

    /// The pattern collides with one already registered for the method.
    #[error("ambiguous mapping: {method} /{pattern}")]
    Ambiguous { method: Method, pattern: String },

    /// Two patterns capture the same position under different names.
    #[error("variable `{requested}` in `{pattern}` conflicts with existing `{existing}`")]
    VariableConflict {
        pattern: String,
        existing: String,
        requested: String,
    },
}

/// Failures reported by the transactional-session collaborator.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// `begin` was called while a transaction was already open.
    #[error("transaction is not committed yet")]
    AlreadyInTransaction,

    /// No connection pool is available to open a session on.
    #[error("no connection pool available")]
    NoPool,

    /// The storage backend rejected the operation.
    #[error("session backend: {0}")]
    Backend(String),
}

/// The error type flowing through dispatch and the server.
///
/// Routing misses are not errors: they become `404` responses. Everything
/// that reaches the dispatch boundary as an `Error` is rendered as a generic
/// `500` after any open transaction has been rolled back.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Route(#[from] RouteError),

    /// A handler, interceptor or resolver failed.
    #[error("{0}")]
    Handler(BoxError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error("serialization: {0}")]
    Serialize(#[from] serde_json::Error),

    /// The request body could not be read or decoded.
    #[error("request body: {0}")]
    Body(String),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps any failure raised by application code.
    pub fn handler(err: impl Into<BoxError>) -> Self {
        Self::Handler(err.into())
    }
}
