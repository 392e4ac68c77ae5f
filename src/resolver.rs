//! Turning replies into responses.
//!
//! Custom resolvers are offered every reply before the built-in rendering.
//! The most recently registered resolver is asked first; the first one that
//! returns `Some(response)` claims the reply and its response is sent as-is.

use std::collections::VecDeque;

use http::StatusCode;
use tracing::error;

use crate::error::Error;
use crate::reply::Reply;
use crate::response::Response;

/// A custom response serializer.
pub trait Resolver: Send + Sync + 'static {
    /// `Ok(None)` declines the reply and passes it on down the chain.
    fn resolve(&self, reply: &Reply) -> Result<Option<Response>, Error>;
}

/// Builds a [`Resolver`] from a closure.
///
/// ```rust
/// use trellis::resolver;
/// use trellis::{Reply, Response};
///
/// // wrap every JSON reply in an envelope
/// let envelope = resolver::from_fn(|reply| match reply {
///     Reply::Json(v) => {
///         let body = serde_json::to_vec(&serde_json::json!({ "data": v }))?;
///         Ok(Some(Response::json(body)))
///     }
///     _ => Ok(None),
/// });
/// ```
pub fn from_fn<F>(f: F) -> FnResolver<F>
where
    F: Fn(&Reply) -> Result<Option<Response>, Error> + Send + Sync + 'static,
{
    FnResolver(f)
}

/// See [`from_fn`].
pub struct FnResolver<F>(F);

impl<F> Resolver for FnResolver<F>
where
    F: Fn(&Reply) -> Result<Option<Response>, Error> + Send + Sync + 'static,
{
    fn resolve(&self, reply: &Reply) -> Result<Option<Response>, Error> {
        (self.0)(reply)
    }
}

/// Resolvers in precedence order, newest first.
#[derive(Default)]
pub struct ResolverChain {
    resolvers: VecDeque<Box<dyn Resolver>>,
}

impl ResolverChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a resolver ahead of every existing one.
    pub fn add(&mut self, resolver: impl Resolver) {
        self.resolvers.push_front(Box::new(resolver));
    }

    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Offers `reply` to each resolver in turn. `Ok(None)` if none claimed it.
    pub fn resolve(&self, reply: &Reply) -> Result<Option<Response>, Error> {
        for resolver in &self.resolvers {
            if let Some(response) = resolver.resolve(reply)? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }
}

/// Built-in rendering for replies no resolver claimed.
pub fn render(reply: Reply) -> Response {
    match reply {
        Reply::Empty => Response::status(StatusCode::OK),
        Reply::Text(body) => Response::text(body),
        Reply::Failure(message) => {
            Response::error_page(StatusCode::INTERNAL_SERVER_ERROR, &message, None)
        }
        Reply::Json(value) => match serde_json::to_vec(&value) {
            Ok(body) => Response::json(body),
            Err(e) => {
                error!("reply serialization failed: {e}");
                Response::error_page(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string(), None)
            }
        },
        Reply::Response(response) => response,
    }
}
