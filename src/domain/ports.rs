use crate::domain::model::{LookupError, LookupItem, NoticeKind, Tier};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

pub type LookupResult = std::result::Result<Vec<LookupItem>, LookupError>;

/// External source of the three option tiers.
#[async_trait]
pub trait LookupService: Send + Sync {
    async fn fetch_industries(&self) -> LookupResult;
    async fn fetch_categories(&self, industry_id: &str) -> LookupResult;
    async fn fetch_subcategories(&self, category_id: &str) -> LookupResult;
}

/// User-visible message channel.
pub trait Notifier: Send + Sync {
    fn notify(&self, kind: NoticeKind, message: &str);
}

/// Receives authentication failures; the loader never retries those itself.
pub trait SessionRecovery: Send + Sync {
    fn on_auth_failure(&self, tier: Tier, message: &str);
}

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Waits out a retry delay.
#[async_trait]
pub trait Scheduler: Send + Sync {
    async fn sleep(&self, delay: Duration);
}
