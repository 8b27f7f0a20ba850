//! Per-request inspection control flow.

use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;

use crate::engine::{DetectionResult, InspectRequest};
use crate::load_balancer::{EnginePool, SelectionPolicy};
use crate::observability::metrics;
use crate::resilience::timeouts::{detect_with_deadline, DetectOutcome};

/// Hard request-handling failures. Not a verdict, never failed open.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error("no detection engine available")]
    NoBackendAvailable,
}

/// Why a request was let through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForwardReason {
    /// Engine returned an allow verdict.
    Allowed,
    /// Borrow or detection call failed.
    EngineError,
    /// Deadline elapsed before the engine answered.
    Timeout,
}

/// Decision for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Forward(ForwardReason),
    Block(DetectionResult),
}

/// Routes each request to one engine and turns the outcome into a verdict.
#[derive(Debug, Clone)]
pub struct Dispatcher {
    engines: Arc<EnginePool>,
    policy: Arc<SelectionPolicy>,
    timeout: Duration,
    max_body_bytes: usize,
}

impl Dispatcher {
    pub fn new(
        engines: Arc<EnginePool>,
        policy: Arc<SelectionPolicy>,
        timeout: Duration,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            engines,
            policy,
            timeout,
            max_body_bytes,
        }
    }

    pub fn engines(&self) -> &Arc<EnginePool> {
        &self.engines
    }

    pub fn policy(&self) -> &SelectionPolicy {
        &self.policy
    }

    /// Largest request body buffered for inspection.
    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Inspect one request. One attempt, no retries.
    pub async fn inspect(&self, request: InspectRequest) -> Result<Verdict, DispatchError> {
        let Some(pool) = self.engines.select(&self.policy) else {
            metrics::record_no_backend();
            tracing::error!(
                method = %request.method,
                path = %request.path,
                engines = self.engines.len(),
                "No detection engine available"
            );
            return Err(DispatchError::NoBackendAvailable);
        };

        let engine = pool.addr();
        let method = request.method.clone();
        let path = request.path.clone();
        let start = Instant::now();

        let outcome = detect_with_deadline(pool, request, self.timeout).await;
        metrics::record_detection(outcome.label(), &engine.to_string(), start);

        match outcome {
            DetectOutcome::Verdict(result) if result.blocked => {
                tracing::warn!(
                    engine = %engine,
                    method = %method,
                    path = %path,
                    event_id = %result.event_id,
                    "Request blocked by detection engine"
                );
                Ok(Verdict::Block(result))
            }
            DetectOutcome::Verdict(_) => {
                tracing::trace!(
                    engine = %engine,
                    method = %method,
                    path = %path,
                    "Request allowed"
                );
                Ok(Verdict::Forward(ForwardReason::Allowed))
            }
            DetectOutcome::Failed(failure) => {
                tracing::error!(
                    engine = %engine,
                    method = %method,
                    path = %path,
                    kind = failure.kind(),
                    error = %failure,
                    "Detection failed, forwarding request"
                );
                Ok(Verdict::Forward(ForwardReason::EngineError))
            }
            DetectOutcome::TimedOut => {
                tracing::error!(
                    engine = %engine,
                    method = %method,
                    path = %path,
                    kind = "timeout",
                    timeout_ms = self.timeout.as_millis() as u64,
                    "Detection timed out, forwarding request"
                );
                Ok(Verdict::Forward(ForwardReason::Timeout))
            }
        }
    }
}
