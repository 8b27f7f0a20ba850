//! Deadline-bounded detection calls.
//!
//! # Responsibilities
//! - Run the borrow + detect sequence as its own task
//! - Race the task against the per-request deadline
//! - Report which of result / error / timeout was observed first
//!
//! # Design Decisions
//! - The deadline covers connection borrow as well as the call itself
//! - A timed-out task is detached, not aborted: it finishes on its own and
//!   its connection guard returns the connection to the pool
//! - Late results are dropped with the detached task

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use crate::engine::{DetectionResult, EngineError, InspectRequest};
use crate::load_balancer::{ConnectionPool, PoolError};

/// Why a detection call produced no verdict.
#[derive(Debug, Error)]
pub enum DetectFailure {
    #[error(transparent)]
    Pool(#[from] PoolError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("detection task aborted: {0}")]
    Aborted(String),
}

impl DetectFailure {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            DetectFailure::Pool(PoolError::Exhausted(_)) => "pool_exhausted",
            DetectFailure::Pool(PoolError::Closed(_)) => "pool_closed",
            DetectFailure::Pool(PoolError::Connect { .. }) => "connect",
            DetectFailure::Engine(EngineError::Transport(_)) => "transport",
            DetectFailure::Engine(EngineError::Protocol(_)) => "protocol",
            DetectFailure::Aborted(_) => "aborted",
        }
    }
}

/// First observed outcome of a detection call.
#[derive(Debug)]
pub enum DetectOutcome {
    Verdict(DetectionResult),
    Failed(DetectFailure),
    TimedOut,
}

impl DetectOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            DetectOutcome::Verdict(r) if r.blocked => "blocked",
            DetectOutcome::Verdict(_) => "allowed",
            DetectOutcome::Failed(_) => "error",
            DetectOutcome::TimedOut => "timeout",
        }
    }
}

/// Borrow a connection from `pool` and run one detection, bounded by `deadline`.
pub async fn detect_with_deadline(
    pool: Arc<ConnectionPool>,
    request: InspectRequest,
    deadline: Duration,
) -> DetectOutcome {
    let task = tokio::spawn(async move {
        let mut conn = pool.acquire().await?;
        let result = conn.detect(&request).await?;
        Ok::<_, DetectFailure>(result)
    });

    // Dropping the JoinHandle on timeout detaches the task.
    match tokio::time::timeout(deadline, task).await {
        Ok(Ok(Ok(result))) => DetectOutcome::Verdict(result),
        Ok(Ok(Err(failure))) => DetectOutcome::Failed(failure),
        Ok(Err(join_error)) => {
            DetectOutcome::Failed(DetectFailure::Aborted(join_error.to_string()))
        }
        Err(_) => DetectOutcome::TimedOut,
    }
}
