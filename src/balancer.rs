//! Choosing among several connection pools.
//!
//! [`Pools`] is a [`SessionSource`] over a list of pools; a [`Balancer`]
//! picks which pool each new session is opened on. Failures to open are
//! reported back so a strategy can route around a failing pool.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::error::SessionError;
use crate::session::{Session, SessionSource};

/// Pool-selection strategy.
pub trait Balancer: Send + Sync + 'static {
    /// Index of the pool to use among `pools`, or `None` if none is usable.
    fn select(&self, pools: usize) -> Option<usize>;

    /// Called when opening a session on `pool` failed.
    fn report_error(&self, _pool: usize, _err: &SessionError) {}
}

/// Always the first pool. The single-database setup.
#[derive(Debug, Default, Clone, Copy)]
pub struct First;

impl Balancer for First {
    fn select(&self, pools: usize) -> Option<usize> {
        (pools > 0).then_some(0)
    }
}

/// Rotates through pools, benching a pool for `cooldown` after it fails.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicUsize,
    cooldown: Duration,
    benched: Mutex<HashMap<usize, Instant>>,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cooldown(cooldown: Duration) -> Self {
        Self { cooldown, ..Self::default() }
    }
}

impl Balancer for RoundRobin {
    fn select(&self, pools: usize) -> Option<usize> {
        if pools == 0 {
            return None;
        }

        let start = self.counter.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let mut benched = self.benched.lock().unwrap_or_else(PoisonError::into_inner);
        benched.retain(|_, until| *until > now);

        (0..pools)
            .map(|i| (start + i) % pools)
            .find(|idx| !benched.contains_key(idx))
    }

    fn report_error(&self, pool: usize, err: &SessionError) {
        if self.cooldown.is_zero() {
            return;
        }
        warn!(pool, cooldown = ?self.cooldown, "benching pool: {err}");
        self.benched
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(pool, Instant::now() + self.cooldown);
    }
}

/// Several pools behind one [`SessionSource`].
pub struct Pools<B = First> {
    pools: Vec<Arc<dyn SessionSource>>,
    balancer: B,
}

impl<B: Balancer> Pools<B> {
    pub fn new(balancer: B) -> Self {
        Self { pools: Vec::new(), balancer }
    }

    /// Appends a pool. Returns `self` for chaining.
    pub fn pool(mut self, source: impl SessionSource) -> Self {
        self.pools.push(Arc::new(source));
        self
    }

    pub fn len(&self) -> usize {
        self.pools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pools.is_empty()
    }
}

impl<B: Balancer> SessionSource for Pools<B> {
    fn open(&self, timeout: Option<Duration>) -> Result<Box<dyn Session>, SessionError> {
        let idx = self.balancer.select(self.pools.len()).ok_or(SessionError::NoPool)?;
        let pool = self.pools.get(idx).ok_or(SessionError::NoPool)?;
        debug!(pool = idx, "opening session");

        pool.open(timeout).inspect_err(|e| self.balancer.report_error(idx, e))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::session::testing::{Counters, Recording};

    struct Fixed {
        id: usize,
        fail: bool,
        opened: Arc<Mutex<Vec<usize>>>,
    }

    impl SessionSource for Fixed {
        fn open(&self, _: Option<Duration>) -> Result<Box<dyn Session>, SessionError> {
            self.opened.lock().unwrap().push(self.id);
            if self.fail {
                return Err(SessionError::Backend("down".into()));
            }
            Ok(Box::new(Recording {
                counters: Arc::new(Counters::default()),
                open: false,
                fail_commit: false,
            }))
        }
    }

    fn pools<B: Balancer>(balancer: B, failing: &[usize], opened: &Arc<Mutex<Vec<usize>>>) -> Pools<B> {
        (0..3).fold(Pools::new(balancer), |p, id| {
            p.pool(Fixed { id, fail: failing.contains(&id), opened: Arc::clone(opened) })
        })
    }

    #[test]
    fn first_always_picks_pool_zero() {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let p = pools(First, &[], &opened);
        for _ in 0..3 {
            p.open(None).unwrap();
        }
        assert_eq!(*opened.lock().unwrap(), vec![0, 0, 0]);
    }

    #[test]
    fn round_robin_rotates() {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let p = pools(RoundRobin::new(), &[], &opened);
        for _ in 0..4 {
            p.open(None).unwrap();
        }
        assert_eq!(*opened.lock().unwrap(), vec![0, 1, 2, 0]);
    }

    #[test]
    fn failing_pool_is_benched() {
        let opened = Arc::new(Mutex::new(Vec::new()));
        let p = pools(RoundRobin::with_cooldown(Duration::from_secs(60)), &[1], &opened);
        p.open(None).unwrap();
        assert!(p.open(None).is_err());
        for _ in 0..4 {
            p.open(None).unwrap();
        }
        assert_eq!(*opened.lock().unwrap(), vec![0, 1, 2, 0, 2, 2]);
    }

    #[test]
    fn no_pools_is_an_error() {
        let p: Pools = Pools::new(First);
        assert!(matches!(p.open(None), Err(SessionError::NoPool)));
    }
}
