use crate::domain::model::Tier;
use crate::domain::ports::{Clock, Scheduler, SessionRecovery};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Retry delays backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn sleep(&self, delay: Duration) {
        tokio::time::sleep(delay).await;
    }
}

/// Default recovery hook: only logs, the embedding application is expected
/// to plug in its own re-authentication flow.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingRecovery;

impl SessionRecovery for LoggingRecovery {
    fn on_auth_failure(&self, tier: Tier, message: &str) {
        tracing::warn!("🔒 {} lookup needs re-authentication: {}", tier, message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_tokio_scheduler_waits_for_delay() {
        let start = tokio::time::Instant::now();
        TokioScheduler.sleep(Duration::from_secs(2)).await;
        assert!(start.elapsed() >= Duration::from_secs(2));
    }
}
