//! Per-request pipeline.
//!
//! ```text
//! match ──miss──► 404
//!   │
//! context (+ session)
//!   │
//! interceptors ──Block(v)──► v ─┐
//!   │          ──Skip──────► ∅ ─┤
//! handler ─────────────────► v ─┤
//!                               ▼
//!               resolvers ──claimed──► commit ──► response
//!                   │
//!                 commit ──► default rendering
//! ```
//!
//! The session commits once the resolvers are done, whether one of them
//! claimed the reply or the default rendering takes over.
//!
//! Any `Err` from context creation onwards lands in one place: the open
//! session is rolled back and a `500` page is sent. Nothing is retried.

use std::backtrace::Backtrace;

use bytes::Bytes;
use http::StatusCode;
use tracing::{debug, error};

use crate::context::RequestContext;
use crate::error::Error;
use crate::handler::BoxedHandler;
use crate::interceptor::Disposition;
use crate::metadata::Metadata;
use crate::reply::Reply;
use crate::resolver;
use crate::response::Response;
use crate::router::Router;
use crate::session::{SessionGuard, SessionHandle};
use crate::tree::normalize_path;

impl Router {
    /// Routes one request and produces one response.
    ///
    /// Never fails: misses become `404`, failures become `500`.
    pub async fn dispatch(&self, req: http::Request<Bytes>) -> Response {
        let method = req.method().clone();
        let path = req.uri().path().to_owned();

        let Some(matched) = self.routes.get(&method).and_then(|tree| tree.at(&path)) else {
            debug!(%method, path = %normalize_path(&path), "no route");
            return Response::not_found();
        };
        let handler = matched.value;
        let metadata = matched.metadata;

        let session = match self.open_session() {
            Ok(session) => session,
            Err(e) => return self.failure(&method, &path, &e),
        };
        let mut guard = SessionGuard::new(session.clone());
        let ctx = RequestContext::new(req, matched.params, session);

        match self.run(ctx, handler, metadata, &mut guard).await {
            Ok(response) => response,
            Err(e) => {
                guard.rollback().await;
                self.failure(&method, &path, &e)
            }
        }
    }

    fn open_session(&self) -> Result<Option<SessionHandle>, Error> {
        let Some(source) = &self.sessions else { return Ok(None) };
        let session = source.open(self.session_timeout)?;
        Ok(Some(SessionHandle::new(session)))
    }

    async fn run(
        &self,
        mut ctx: RequestContext,
        handler: &BoxedHandler,
        metadata: &Metadata,
        guard: &mut SessionGuard,
    ) -> Result<Response, Error> {
        let reply = match self.interceptors.run(&mut ctx, metadata)? {
            Disposition::Continue => handler.call(ctx).await?,
            Disposition::Block(reply) => reply,
            Disposition::Skip => Reply::Empty,
        };

        let claimed = self.resolvers.resolve(&reply)?;
        guard.commit().await?;

        Ok(claimed.unwrap_or_else(|| resolver::render(reply)))
    }

    fn failure(&self, method: &http::Method, path: &str, err: &Error) -> Response {
        error!(%method, path, "request failed: {err}");

        if self.expose_backtrace {
            let trace = Backtrace::force_capture().to_string();
            Response::error_page(StatusCode::INTERNAL_SERVER_ERROR, &err.to_string(), Some(&trace))
        } else {
            Response::error_page(StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error", None)
        }
    }
}
