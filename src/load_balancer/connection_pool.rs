//! Per-engine connection pool.
//!
//! # Responsibilities
//! - Own every connection to one detection engine
//! - Lend connections out behind a RAII guard and take them back on drop
//! - Enforce `max_cap` open connections and `max_idle` idle connections
//! - Prune idle connections older than `idle_timeout`
//!
//! # Design Decisions
//! - One mutex over idle list and counters; never held across `.await`
//! - Acquire never waits for capacity: a full pool is `PoolError::Exhausted`
//! - A guard dropped by a detached task still returns its connection
//! - Idle list is LIFO so the warmest connection is reused first

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::engine::{
    BackendAddress, Connector, DetectionResult, EngineConnection, EngineError, InspectRequest,
};

/// Sizing parameters shared by every pool in an engine pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    /// Connections opened when the pool is warmed.
    pub initial_cap: usize,
    /// Maximum idle connections kept for reuse.
    pub max_idle: usize,
    /// Maximum open connections (idle + borrowed).
    pub max_cap: usize,
    /// Idle connections older than this are closed.
    pub idle_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            initial_cap: 1,
            max_idle: 16,
            max_cap: 32,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Errors raised when borrowing a connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PoolError {
    #[error("connection pool for {0} is exhausted")]
    Exhausted(BackendAddress),

    #[error("connection pool for {0} is closed")]
    Closed(BackendAddress),

    #[error("failed to connect to {addr}: {reason}")]
    Connect { addr: BackendAddress, reason: String },
}

/// Point-in-time view of a pool's accounting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
    pub idle: usize,
    pub open: usize,
    pub in_use: usize,
}

#[derive(Debug)]
struct IdleConnection {
    conn: Box<dyn EngineConnection>,
    idle_since: Instant,
}

#[derive(Debug, Default)]
struct PoolState {
    /// Oldest at the front, most recently returned at the back.
    idle: VecDeque<IdleConnection>,
    /// Idle plus borrowed plus connections being established.
    open: usize,
    closed: bool,
}

/// Bounded set of connections to one engine.
#[derive(Debug)]
pub struct ConnectionPool {
    addr: BackendAddress,
    config: PoolConfig,
    connector: Arc<dyn Connector>,
    state: Mutex<PoolState>,
}

impl ConnectionPool {
    pub fn new(addr: BackendAddress, config: PoolConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            addr,
            config,
            connector,
            state: Mutex::new(PoolState::default()),
        }
    }

    pub fn addr(&self) -> BackendAddress {
        self.addr
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, PoolState> {
        // State stays consistent across a panicking holder: every mutation
        // is a single counter or list operation.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Borrow a connection, reusing an idle one or opening a new one.
    pub async fn acquire(self: &Arc<Self>) -> Result<PooledConnection, PoolError> {
        {
            let mut state = self.lock();
            if state.closed {
                return Err(PoolError::Closed(self.addr));
            }

            Self::prune_expired(&mut state, self.config.idle_timeout);

            while let Some(idle) = state.idle.pop_back() {
                if idle.conn.is_healthy() {
                    return Ok(PooledConnection::new(self.clone(), idle.conn));
                }
                state.open -= 1;
            }

            if state.open >= self.config.max_cap {
                return Err(PoolError::Exhausted(self.addr));
            }
            // Reserve the slot before connecting so concurrent callers
            // cannot overshoot max_cap.
            state.open += 1;
        }

        let reservation = Reservation { pool: self.as_ref() };
        let conn = self
            .connector
            .connect(&self.addr)
            .await
            .map_err(|e| PoolError::Connect {
                addr: self.addr,
                reason: e.to_string(),
            })?;
        reservation.fulfil();
        Ok(PooledConnection::new(self.clone(), conn))
    }

    fn release(&self, conn: Box<dyn EngineConnection>, reusable: bool) {
        let mut state = self.lock();
        if reusable
            && !state.closed
            && conn.is_healthy()
            && state.idle.len() < self.config.max_idle
        {
            state.idle.push_back(IdleConnection {
                conn,
                idle_since: Instant::now(),
            });
            return;
        }
        state.open = state.open.saturating_sub(1);
        drop(state);
        drop(conn);
    }

    fn prune_expired(state: &mut PoolState, idle_timeout: Duration) -> usize {
        let mut pruned = 0;
        while state
            .idle
            .front()
            .is_some_and(|c| c.idle_since.elapsed() >= idle_timeout)
        {
            state.idle.pop_front();
            state.open -= 1;
            pruned += 1;
        }
        pruned
    }

    /// Close idle connections past `idle_timeout`. Returns how many were closed.
    pub fn prune_idle(&self) -> usize {
        let pruned = Self::prune_expired(&mut self.lock(), self.config.idle_timeout);
        if pruned > 0 {
            tracing::debug!(engine = %self.addr, pruned, "Pruned idle engine connections");
        }
        pruned
    }

    /// Open up to `min(count, max_idle, max_cap)` connections and park them idle.
    ///
    /// Connect failures stop the warm-up early; the pool still grows on demand.
    pub async fn warm(self: &Arc<Self>, count: usize) -> usize {
        let target = count.min(self.config.max_idle).min(self.config.max_cap);
        let mut borrowed = Vec::with_capacity(target);
        for _ in 0..target {
            match self.acquire().await {
                Ok(conn) => borrowed.push(conn),
                Err(e) => {
                    tracing::warn!(
                        engine = %self.addr,
                        error = %e,
                        "Engine pool warm-up incomplete"
                    );
                    break;
                }
            }
        }
        borrowed.len()
    }

    /// Drain idle connections and refuse all further borrows. Idempotent.
    ///
    /// Connections still borrowed are closed when their guard drops.
    pub fn close(&self) {
        let mut state = self.lock();
        if state.closed {
            return;
        }
        state.closed = true;
        let drained: Vec<IdleConnection> = state.idle.drain(..).collect();
        state.open -= drained.len();
        let in_use = state.open;
        drop(state);
        drop(drained);

        tracing::info!(engine = %self.addr, in_use, "Engine connection pool closed");
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    pub fn stats(&self) -> PoolStats {
        let state = self.lock();
        PoolStats {
            idle: state.idle.len(),
            open: state.open,
            in_use: state.open - state.idle.len(),
        }
    }
}

/// A capacity slot held while a connection is being established.
///
/// Gives the slot back on drop, so a failed or cancelled connect never leaks it.
struct Reservation<'a> {
    pool: &'a ConnectionPool,
}

impl Reservation<'_> {
    /// The slot now belongs to a live connection.
    fn fulfil(self) {
        std::mem::forget(self);
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut state = self.pool.lock();
        state.open = state.open.saturating_sub(1);
    }
}

/// A borrowed connection. Returned to its pool on drop.
#[derive(Debug)]
pub struct PooledConnection {
    pool: Arc<ConnectionPool>,
    conn: Option<Box<dyn EngineConnection>>,
    reusable: bool,
}

impl PooledConnection {
    fn new(pool: Arc<ConnectionPool>, conn: Box<dyn EngineConnection>) -> Self {
        Self {
            pool,
            conn: Some(conn),
            reusable: true,
        }
    }

    pub fn addr(&self) -> BackendAddress {
        self.pool.addr
    }

    /// Run one detection call. A failed or abandoned call discards the connection.
    pub async fn detect(
        &mut self,
        request: &InspectRequest,
    ) -> Result<DetectionResult, EngineError> {
        let conn = self
            .conn
            .as_mut()
            .ok_or_else(|| EngineError::Transport("connection already released".into()))?;
        self.reusable = false;
        let result = conn.detect(request).await;
        self.reusable = result.is_ok();
        result
    }

    /// Close the connection instead of returning it to the idle set.
    pub fn discard(mut self) {
        self.reusable = false;
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            self.pool.release(conn, self.reusable);
        }
    }
}
