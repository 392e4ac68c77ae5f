//! Route registration.
//!
//! One prefix tree per HTTP method. The router also owns the interceptor
//! chain, the resolver chain and the optional session source, so everything
//! a request needs lives in one value built at startup and shared read-only
//! afterwards. Every builder method takes `self`, which means nothing can be
//! registered once the router has been handed to [`Server::serve`].
//!
//! [`Server::serve`]: crate::Server::serve

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use http::Method;
use tracing::{error, info};

use crate::config::Config;
use crate::error::RouteError;
use crate::handler::{BoxedHandler, Handler};
use crate::interceptor::{Interceptor, InterceptorChain};
use crate::metadata::Metadata;
use crate::pattern::Pattern;
use crate::resolver::{Resolver, ResolverChain};
use crate::session::SessionSource;
use crate::tree::RouteTree;

/// The application router and dispatcher.
///
/// ```rust,no_run
/// # use trellis::{RequestContext, Router, Metadata};
/// # async fn show(_: RequestContext) -> &'static str { "" }
/// # async fn create(_: RequestContext) -> &'static str { "" }
/// # async fn purge(_: RequestContext) -> &'static str { "" }
/// Router::new()
///     .get("/users/:id", show)
///     .post("/users", create)
///     .on_with(http::Method::DELETE, "/cache/*key", purge, Metadata::new().with("auth", true));
/// ```
pub struct Router {
    pub(crate) routes: HashMap<Method, RouteTree<BoxedHandler>>,
    pub(crate) interceptors: InterceptorChain,
    pub(crate) resolvers: ResolverChain,
    pub(crate) sessions: Option<Arc<dyn SessionSource>>,
    pub(crate) session_timeout: Option<Duration>,
    pub(crate) expose_backtrace: bool,
}

impl Router {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            interceptors: InterceptorChain::new(),
            resolvers: ResolverChain::new(),
            sessions: None,
            session_timeout: None,
            expose_backtrace: false,
        }
    }

    /// Applies the dispatch-related parts of `config`.
    pub fn with_config(mut self, config: &Config) -> Self {
        self.expose_backtrace = config.expose_backtrace;
        self.session_timeout = config.session_timeout();
        self
    }

    pub fn get(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::GET, pattern, handler)
    }

    pub fn post(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::POST, pattern, handler)
    }

    pub fn put(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::PUT, pattern, handler)
    }

    pub fn delete(self, pattern: &str, handler: impl Handler) -> Self {
        self.on(Method::DELETE, pattern, handler)
    }

    /// Registers a handler for a method + pattern pair.
    ///
    /// An invalid or ambiguous pattern is logged and skipped; use
    /// [`try_route`](Router::try_route) to fail instead.
    pub fn on(self, method: Method, pattern: &str, handler: impl Handler) -> Self {
        self.on_with(method, pattern, handler, Metadata::new())
    }

    /// Like [`on`](Router::on), attaching `metadata` for interceptors.
    pub fn on_with(
        mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
        metadata: Metadata,
    ) -> Self {
        if let Err(e) = self.try_route(method.clone(), pattern, handler, metadata) {
            error!(%method, pattern, "route not registered: {e}");
        }
        self
    }

    /// Registers a route, reporting why it was rejected.
    pub fn try_route(
        &mut self,
        method: Method,
        pattern: &str,
        handler: impl Handler,
        metadata: Metadata,
    ) -> Result<(), RouteError> {
        let compiled = Pattern::parse(pattern)?;
        self.routes
            .entry(method.clone())
            .or_insert_with(|| RouteTree::new(method.clone()))
            .insert(&compiled, handler.into_boxed_handler(), metadata)?;

        info!(%method, pattern = %compiled, "route mapped");
        Ok(())
    }

    /// Adds an interceptor to the chain.
    pub fn interceptor(mut self, interceptor: impl Interceptor) -> Self {
        self.interceptors.add(interceptor);
        self
    }

    /// Adds a resolver ahead of every resolver registered so far.
    pub fn resolver(mut self, resolver: impl Resolver) -> Self {
        self.resolvers.add(resolver);
        self
    }

    /// Opens one session per matched request from `source`.
    pub fn sessions(mut self, source: impl SessionSource) -> Self {
        self.sessions = Some(Arc::new(source));
        self
    }

    /// Whether a handler is registered for `method` at exactly `path`.
    pub fn has_route(&self, method: &Method, path: &str) -> bool {
        self.routes.get(method).is_some_and(|t| t.at(path).is_some())
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContext;

    async fn noop(_: RequestContext) {}

    #[test]
    fn try_route_reports_duplicates() {
        let mut router = Router::new();
        router.try_route(Method::GET, "/a/:id", noop, Metadata::new()).unwrap();
        let err = router.try_route(Method::GET, "/a/:id", noop, Metadata::new()).unwrap_err();
        assert!(matches!(err, RouteError::Ambiguous { .. }));
        // same pattern, other method
        router.try_route(Method::PUT, "/a/:id", noop, Metadata::new()).unwrap();
    }

    #[test]
    fn invalid_patterns_are_skipped() {
        let router = Router::new()
            .get("/files/*rest/x", noop)
            .get("", noop)
            .get("/ok", noop);
        assert!(router.has_route(&Method::GET, "/ok"));
        assert!(!router.has_route(&Method::GET, "/files/a/x"));
        assert!(!router.has_route(&Method::POST, "/ok"));
    }

    #[test]
    fn root_pattern() {
        let router = Router::new().get("/", noop);
        assert!(router.has_route(&Method::GET, "/"));
        assert!(router.has_route(&Method::GET, "//"));
    }
}
