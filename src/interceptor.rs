//! Pre-handler gates.
//!
//! Every matched request passes through the chain before its handler runs.
//! Interceptors are evaluated in ascending [`priority`](Interceptor::priority)
//! order; interceptors with equal priority keep their registration order.
//!
//! Each one answers with a [`Disposition`]:
//!
//! ```text
//! Continue ──► next interceptor ──► … ──► handler
//! Block(v) ──► v is the reply; remaining interceptors and the handler never run
//! Skip     ──► empty reply;    remaining interceptors and the handler never run
//! ```
//!
//! ```rust
//! use trellis::interceptor::{self, Disposition};
//! use trellis::{Reply, Router};
//!
//! let auth = interceptor::from_fn(10, |ctx, meta| {
//!     if meta.get_bool("auth") == Some(true) && ctx.header("authorization").is_none() {
//!         return Disposition::Block(Reply::text("No Permission"));
//!     }
//!     Disposition::Continue
//! });
//!
//! let app = Router::new().interceptor(auth);
//! ```

use tracing::debug;

use crate::context::RequestContext;
use crate::error::Error;
use crate::metadata::Metadata;
use crate::reply::Reply;

/// What an interceptor wants done with the request.
///
/// Only `Block` carries a value.
#[derive(Debug)]
pub enum Disposition {
    Continue,
    Block(Reply),
    Skip,
}

/// A pre-handler gate.
pub trait Interceptor: Send + Sync + 'static {
    /// Lower values run first.
    fn priority(&self) -> i32;

    /// Inspects (and may annotate) the request. An `Err` fails the request
    /// exactly like a failing handler.
    fn intercept(
        &self,
        ctx: &mut RequestContext,
        metadata: &Metadata,
    ) -> Result<Disposition, Error>;
}

/// Builds an [`Interceptor`] from a closure.
pub fn from_fn<F>(priority: i32, f: F) -> FnInterceptor<F>
where
    F: Fn(&mut RequestContext, &Metadata) -> Disposition + Send + Sync + 'static,
{
    FnInterceptor { priority, f }
}

/// See [`from_fn`].
pub struct FnInterceptor<F> {
    priority: i32,
    f: F,
}

impl<F> Interceptor for FnInterceptor<F>
where
    F: Fn(&mut RequestContext, &Metadata) -> Disposition + Send + Sync + 'static,
{
    fn priority(&self) -> i32 {
        self.priority
    }

    fn intercept(
        &self,
        ctx: &mut RequestContext,
        metadata: &Metadata,
    ) -> Result<Disposition, Error> {
        Ok((self.f)(ctx, metadata))
    }
}

/// Priority-sorted interceptors.
///
/// Mutation needs `&mut self`, so once the owning router is shared with the
/// server the chain is frozen and dispatch reads it without locking.
#[derive(Default)]
pub struct InterceptorChain {
    interceptors: Vec<Box<dyn Interceptor>>,
}

impl InterceptorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an interceptor and re-sorts the chain. The sort is stable.
    pub fn add(&mut self, interceptor: impl Interceptor) {
        self.interceptors.push(Box::new(interceptor));
        self.interceptors.sort_by_key(|i| i.priority());
    }

    pub fn len(&self) -> usize {
        self.interceptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.interceptors.is_empty()
    }

    /// Runs the chain. `Continue` means every interceptor let the request
    /// through and the handler should run.
    pub fn run(
        &self,
        ctx: &mut RequestContext,
        metadata: &Metadata,
    ) -> Result<Disposition, Error> {
        for interceptor in &self.interceptors {
            match interceptor.intercept(ctx, metadata)? {
                Disposition::Continue => continue,
                Disposition::Block(reply) => {
                    debug!(priority = interceptor.priority(), path = ctx.path(), "request blocked");
                    return Ok(Disposition::Block(reply));
                }
                Disposition::Skip => {
                    debug!(priority = interceptor.priority(), path = ctx.path(), "handler skipped");
                    return Ok(Disposition::Skip);
                }
            }
        }
        Ok(Disposition::Continue)
    }
}
