//! Handler output before it becomes a wire response.
//!
//! Handlers do not build responses directly (although they may). They return
//! anything implementing [`IntoReply`]; the resulting [`Reply`] is offered to
//! the registered resolvers and, failing that, rendered by the default
//! resolver:
//!
//! | Reply | Default rendering |
//! |---|---|
//! | `Empty` | `200`, no body |
//! | `Text` | `200`, `text/plain` |
//! | `Json` | `200`, `application/json` |
//! | `Failure` | `500` error page carrying the message |
//! | `Response` | sent as-is |

use serde::Serialize;

use crate::error::{BoxError, Error};
use crate::response::Response;

/// A handler's (or a blocking interceptor's) value.
#[derive(Debug)]
pub enum Reply {
    Empty,
    Text(String),
    Json(serde_json::Value),
    /// A failure *value*. Unlike an `Err` from the handler, this is a
    /// normal outcome: the transaction still commits.
    Failure(String),
    Response(Response),
}

impl Reply {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text(body.into())
    }

    pub fn failure(message: impl std::fmt::Display) -> Self {
        Self::Failure(message.to_string())
    }

    /// Serializes `value` into a structured reply.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, Error> {
        Ok(Self::Json(serde_json::to_value(value)?))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

/// Conversion from a handler's return value into a [`Reply`].
///
/// `Err` means the handler failed: dispatch rolls back any open transaction
/// and answers `500`.
pub trait IntoReply {
    fn into_reply(self) -> Result<Reply, Error>;
}

impl IntoReply for Reply {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(self)
    }
}

impl IntoReply for () {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Empty)
    }
}

impl IntoReply for String {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Text(self))
    }
}

impl IntoReply for &'static str {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Text(self.to_owned()))
    }
}

impl IntoReply for serde_json::Value {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Json(self))
    }
}

impl IntoReply for Response {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Response(self))
    }
}

/// Return a bare status from a handler: `return StatusCode::NO_CONTENT`.
impl IntoReply for http::StatusCode {
    fn into_reply(self) -> Result<Reply, Error> {
        Ok(Reply::Response(Response::status(self)))
    }
}

impl<T: IntoReply> IntoReply for Option<T> {
    fn into_reply(self) -> Result<Reply, Error> {
        self.map_or(Ok(Reply::Empty), IntoReply::into_reply)
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    fn into_reply(self) -> Result<Reply, Error> {
        self.map_err(Error::handler)?.into_reply()
    }
}

/// Serializes `T` with serde_json.
///
/// ```rust,no_run
/// use serde::Serialize;
/// use trellis::{Json, RequestContext};
///
/// #[derive(Serialize)]
/// struct User { id: u64 }
///
/// async fn get_user(_ctx: RequestContext) -> Json<User> {
///     Json(User { id: 1 })
/// }
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<T: Serialize> IntoReply for Json<T> {
    fn into_reply(self) -> Result<Reply, Error> {
        Reply::json(&self.0)
    }
}
