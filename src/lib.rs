//! # trellis
//!
//! Prefix-tree HTTP routing with a small, predictable request pipeline.
//!
//! ## The pipeline
//!
//! For every request:
//!
//! 1. **Match** method + path against a per-method prefix tree. Literal
//!    segments beat `:variables`, a trailing `*wildcard` swallows the rest.
//!    No match is a plain `404`.
//! 2. **Intercept**: priority-ordered gates may let the request through,
//!    block it with their own reply, or skip straight to the response.
//! 3. **Handle**: the handler turns a [`RequestContext`] into a [`Reply`].
//! 4. **Resolve**: custom [`Resolver`]s get first pick of the reply, then the
//!    built-in rendering (text, JSON, failure page) takes over.
//! 5. **Settle**: the request's transactional session, if any, is committed
//!    on success and rolled back on every other exit.
//!
//! What trellis leaves to others: TLS, rate limiting, body-size limits (a
//! reverse proxy's job) and the storage layer behind [`Session`].
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use trellis::interceptor::{self, Disposition};
//! use trellis::{Json, Metadata, Reply, RequestContext, Router, Server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let app = Router::new()
//!         .get("/users/:id", get_user)
//!         .get("/static/*path", asset)
//!         .on_with(trellis::Method::DELETE, "/users/:id", delete_user,
//!                  Metadata::new().with("admin", true))
//!         .interceptor(interceptor::from_fn(0, |ctx, meta| {
//!             if meta.get_bool("admin") == Some(true) && ctx.header("x-admin").is_none() {
//!                 return Disposition::Block(Reply::failure("No Permission"));
//!             }
//!             Disposition::Continue
//!         }));
//!
//!     Server::bind("0.0.0.0:3000").serve(app).await.unwrap();
//! }
//!
//! async fn get_user(ctx: RequestContext) -> Json<serde_json::Value> {
//!     Json(serde_json::json!({ "id": ctx.param("id") }))
//! }
//!
//! async fn asset(ctx: RequestContext) -> String {
//!     format!("would serve {}", ctx.param("path").unwrap_or_default())
//! }
//!
//! async fn delete_user(_ctx: RequestContext) -> trellis::StatusCode {
//!     trellis::StatusCode::NO_CONTENT
//! }
//! ```

mod config;
mod context;
mod dispatch;
mod error;
mod handler;
mod metadata;
mod reply;
mod response;
mod router;
mod server;

pub mod balancer;
pub mod interceptor;
pub mod pattern;
pub mod resolver;
pub mod session;
pub mod tree;

pub use config::Config;
pub use context::RequestContext;
pub use error::{BoxError, Error, RouteError, SessionError};
pub use handler::{BoxFuture, Handler};
pub use http::{Method, StatusCode};
pub use interceptor::{Disposition, Interceptor};
pub use metadata::Metadata;
pub use reply::{IntoReply, Json, Reply};
pub use resolver::Resolver;
pub use response::{ContentType, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
pub use session::{Session, SessionHandle, SessionSource, TxOptions};
