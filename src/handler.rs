//! Handler trait and type erasure.
//!
//! # How async handlers are stored
//!
//! Each route tree holds handlers of *different* concrete types, so they are
//! erased behind a trait object:
//!
//! ```text
//! async fn show(ctx: RequestContext) -> Json<User> { … }   ← user writes this
//!        ↓ router.get("/users/:id", show)
//! show.into_boxed_handler()                               ← Handler blanket impl
//!        ↓
//! Arc::new(FnHandler(show))                               ← stored in the tree
//!        ↓
//! handler.call(ctx)                                       ← at request time
//!        ↓
//! Box::pin(async { show(ctx).await.into_reply() })        ← BoxFuture
//! ```
//!
//! The per-request cost is one `Arc` clone and one virtual call.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::RequestContext;
use crate::error::Error;
use crate::reply::{IntoReply, Reply};

/// A heap-allocated, type-erased `Send` future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, Result<Reply, Error>>;
}

/// A type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

/// Implemented for every valid route handler.
///
/// Satisfied automatically by any function of the shape
///
/// ```text
/// async fn name(ctx: RequestContext) -> impl IntoReply
/// ```
///
/// The trait is sealed; only the blanket impl below implements it.
pub trait Handler: private::Sealed + Send + Sync + 'static {
    #[doc(hidden)]
    fn into_boxed_handler(self) -> BoxedHandler;
}

mod private {
    pub trait Sealed {}
}

impl<F, Fut, R> private::Sealed for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
}

impl<F, Fut, R> Handler for F
where
    F: Fn(RequestContext) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn into_boxed_handler(self) -> BoxedHandler {
        Arc::new(FnHandler(self))
    }
}

/// Bridges a concrete handler `F` to [`ErasedHandler`].
struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(RequestContext) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoReply + Send + 'static,
{
    fn call(&self, ctx: RequestContext) -> BoxFuture<'static, Result<Reply, Error>> {
        let fut = (self.0)(ctx);
        Box::pin(async move { fut.await.into_reply() })
    }
}
