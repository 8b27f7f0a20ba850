//! In-process engine double for unit tests.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::engine::{
    BackendAddress, Connector, DetectionResult, EngineConnection, EngineError, InspectRequest,
};

#[derive(Debug, Clone)]
pub(crate) struct MockConnector {
    verdict: DetectionResult,
    delay: Duration,
    connect_delay: Duration,
    fail_detect: bool,
    refuse_connect: bool,
    connects: Arc<AtomicUsize>,
    detects: Arc<AtomicUsize>,
}

impl MockConnector {
    pub(crate) fn allowing() -> Self {
        Self {
            verdict: DetectionResult::allowed(),
            delay: Duration::ZERO,
            connect_delay: Duration::ZERO,
            fail_detect: false,
            refuse_connect: false,
            connects: Arc::new(AtomicUsize::new(0)),
            detects: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn blocking(event_id: &str) -> Self {
        Self {
            verdict: DetectionResult::blocked(event_id),
            ..Self::allowing()
        }
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub(crate) fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    pub(crate) fn failing(mut self) -> Self {
        self.fail_detect = true;
        self
    }

    pub(crate) fn refusing(mut self) -> Self {
        self.refuse_connect = true;
        self
    }

    pub(crate) fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }

    pub(crate) fn detects(&self) -> usize {
        self.detects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        _addr: &BackendAddress,
    ) -> Result<Box<dyn EngineConnection>, EngineError> {
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if self.refuse_connect {
            return Err(EngineError::Transport("connection refused".into()));
        }
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(MockConnection {
            verdict: self.verdict.clone(),
            delay: self.delay,
            fail_detect: self.fail_detect,
            detects: self.detects.clone(),
            healthy: true,
        }))
    }
}

#[derive(Debug)]
pub(crate) struct MockConnection {
    verdict: DetectionResult,
    delay: Duration,
    fail_detect: bool,
    detects: Arc<AtomicUsize>,
    healthy: bool,
}

#[async_trait]
impl EngineConnection for MockConnection {
    async fn detect(&mut self, _request: &InspectRequest) -> Result<DetectionResult, EngineError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.detects.fetch_add(1, Ordering::SeqCst);
        if self.fail_detect {
            self.healthy = false;
            return Err(EngineError::Transport("connection reset by peer".into()));
        }
        Ok(self.verdict.clone())
    }

    fn is_healthy(&self) -> bool {
        self.healthy
    }
}
