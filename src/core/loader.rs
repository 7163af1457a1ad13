use crate::adapters::runtime::{LoggingRecovery, SystemClock, TokioScheduler};
use crate::domain::model::{FailureKind, GuardEntry, LoadState, LookupItem, NoticeKind, Tier, TierEntry};
use crate::domain::ports::{Clock, LookupResult, LookupService, Notifier, Scheduler, SessionRecovery};
use crate::utils::error::{IntakeError, Result};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Cache key inside a tier; `None` is the root (industry list).
type ParentKey = Option<String>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub industry_ceiling: u32,
    pub category_ceiling: u32,
    pub subcategory_ceiling: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            industry_ceiling: 3,
            category_ceiling: 2,
            subcategory_ceiling: 2,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Total fetch attempts allowed for one load cycle of `tier`.
    pub fn ceiling(&self, tier: Tier) -> u32 {
        match tier {
            Tier::Industry => self.industry_ceiling,
            Tier::Category => self.category_ceiling,
            Tier::Subcategory => self.subcategory_ceiling,
        }
    }

    /// Delay before retry `attempt` (0-indexed): `base * 2^attempt`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }
}

#[derive(Default)]
struct LoaderState {
    caches: HashMap<Tier, HashMap<ParentKey, TierEntry>>,
    guards: HashMap<Tier, HashMap<ParentKey, GuardEntry>>,
}

impl LoaderState {
    fn entry(&mut self, tier: Tier, key: &ParentKey) -> &mut TierEntry {
        self.caches
            .entry(tier)
            .or_default()
            .entry(key.clone())
            .or_default()
    }

    fn guard(&mut self, tier: Tier, key: &ParentKey) -> &mut GuardEntry {
        self.guards
            .entry(tier)
            .or_default()
            .entry(key.clone())
            .or_default()
    }

    fn peek_entry(&self, tier: Tier, key: &ParentKey) -> Option<&TierEntry> {
        self.caches.get(&tier).and_then(|entries| entries.get(key))
    }

    fn peek_guard(&self, tier: Tier, key: &ParentKey) -> Option<&GuardEntry> {
        self.guards.get(&tier).and_then(|guards| guards.get(key))
    }
}

/// 失敗後的下一步
enum NextStep {
    Retry(Duration),
    GiveUp,
}

/// Fetches and caches the three dependent option tiers.
///
/// At most one fetch is in flight per (tier, parent key). Empty results and
/// transient failures are retried with exponential backoff up to the tier's
/// ceiling, after which the key settles in [`LoadState::Empty`] and an error
/// notice is emitted. Authentication failures are handed to the
/// [`SessionRecovery`] collaborator and never retried.
pub struct CascadingLoader {
    lookup: Arc<dyn LookupService>,
    notifier: Arc<dyn Notifier>,
    recovery: Arc<dyn SessionRecovery>,
    clock: Arc<dyn Clock>,
    scheduler: Arc<dyn Scheduler>,
    policy: RetryPolicy,
    state: Mutex<LoaderState>,
    alive: AtomicBool,
}

impl CascadingLoader {
    pub fn new(lookup: Arc<dyn LookupService>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            lookup,
            notifier,
            recovery: Arc::new(LoggingRecovery),
            clock: Arc::new(SystemClock),
            scheduler: Arc::new(TokioScheduler),
            policy: RetryPolicy::default(),
            state: Mutex::new(LoaderState::default()),
            alive: AtomicBool::new(true),
        }
    }

    pub fn with_recovery(mut self, recovery: Arc<dyn SessionRecovery>) -> Self {
        self.recovery = recovery;
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Marks the owning session as gone. Late fetch results and pending
    /// retries are dropped without touching the caches.
    pub fn close(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, LoaderState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn resolve_key(tier: Tier, parent_key: Option<&str>) -> Result<ParentKey> {
        if !tier.requires_parent() {
            return Ok(None);
        }
        match parent_key {
            Some(key) if !key.is_empty() => Ok(Some(key.to_string())),
            _ => Err(IntakeError::MissingParentKey {
                tier: tier.to_string(),
            }),
        }
    }

    /// Loads the option list of `tier` under `parent_key` unless it is already
    /// cached or being fetched, and returns the resulting state.
    pub async fn ensure_loaded(&self, tier: Tier, parent_key: Option<&str>) -> Result<LoadState> {
        let key = Self::resolve_key(tier, parent_key)?;

        loop {
            if !self.is_alive() {
                tracing::debug!("{} {:?}: session closed, skipping load", tier, key);
                return Ok(self.snapshot_state(tier, &key));
            }

            // 每一輪都當作全新的呼叫重新檢查 guard
            {
                let mut state = self.lock();
                if state.guard(tier, &key).in_flight {
                    tracing::debug!("{} {:?}: fetch already in flight", tier, key);
                    return Ok(state.entry(tier, &key).state.clone());
                }
                if !state.entry(tier, &key).items.is_empty() {
                    return Ok(LoadState::Loaded);
                }
                let now = self.clock.now();
                let guard = state.guard(tier, &key);
                guard.in_flight = true;
                guard.last_attempt_at = Some(now);
                state.entry(tier, &key).state = LoadState::Loading;
            }

            tracing::debug!("📡 Fetching {} options for {:?}", tier, key);
            let result = self.fetch(tier, key.as_deref()).await;

            if !self.is_alive() {
                tracing::debug!("{} {:?}: session closed, discarding fetch result", tier, key);
                return Ok(self.snapshot_state(tier, &key));
            }

            let failure = match result {
                Ok(items) if !items.is_empty() => {
                    tracing::info!("✅ Loaded {} {} options for {:?}", items.len(), tier, key);
                    let mut state = self.lock();
                    let guard = state.guard(tier, &key);
                    guard.in_flight = false;
                    guard.attempt = 0;
                    let entry = state.entry(tier, &key);
                    entry.items = items;
                    entry.state = LoadState::Loaded;
                    return Ok(LoadState::Loaded);
                }
                Ok(_) => "empty result".to_string(),
                Err(err) if err.kind() == FailureKind::Auth => {
                    tracing::warn!("🔒 {} lookup rejected by auth: {}", tier, err);
                    {
                        let mut state = self.lock();
                        let guard = state.guard(tier, &key);
                        guard.in_flight = false;
                        guard.attempt = 0;
                        state.entry(tier, &key).state = LoadState::Idle;
                    }
                    self.recovery.on_auth_failure(tier, &err.message);
                    return Ok(LoadState::Idle);
                }
                Err(err) => err.message,
            };

            match self.settle_failure(tier, &key) {
                NextStep::Retry(delay) => {
                    tracing::debug!(
                        "{} {:?}: {}, retrying in {:?}",
                        tier,
                        key,
                        failure,
                        delay
                    );
                    self.scheduler.sleep(delay).await;
                }
                NextStep::GiveUp => {
                    tracing::warn!("❌ Giving up on {} options for {:?}: {}", tier, key, failure);
                    self.notifier.notify(
                        NoticeKind::Error,
                        &format!("No {} options could be loaded, please try again later", tier),
                    );
                    return Ok(LoadState::Empty);
                }
            }
        }
    }

    /// Books a failed or empty attempt and decides whether to retry.
    fn settle_failure(&self, tier: Tier, key: &ParentKey) -> NextStep {
        let ceiling = self.policy.ceiling(tier);
        let now = self.clock.now();
        let mut state = self.lock();

        let guard = state.guard(tier, key);
        guard.in_flight = false;

        if guard.attempt + 1 < ceiling {
            let delay = self.policy.delay(guard.attempt);
            guard.attempt += 1;
            let retry_at = now
                + chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::zero());
            state.entry(tier, key).state = LoadState::RetryPending { retry_at };
            NextStep::Retry(delay)
        } else {
            // 下一次使用者重新選取時重新計數
            guard.attempt = 0;
            let entry = state.entry(tier, key);
            entry.items.clear();
            entry.state = LoadState::Empty;
            NextStep::GiveUp
        }
    }

    async fn fetch(&self, tier: Tier, key: Option<&str>) -> LookupResult {
        match (tier, key) {
            (Tier::Industry, _) => self.lookup.fetch_industries().await,
            (Tier::Category, Some(industry_id)) => self.lookup.fetch_categories(industry_id).await,
            (Tier::Subcategory, Some(category_id)) => {
                self.lookup.fetch_subcategories(category_id).await
            }
            // resolve_key 已擋下缺少 parent key 的呼叫
            (_, None) => Err(crate::domain::model::LookupError::new(format!(
                "{} lookup needs a parent key",
                tier
            ))),
        }
    }

    fn snapshot_state(&self, tier: Tier, key: &ParentKey) -> LoadState {
        self.lock()
            .peek_entry(tier, key)
            .map(|entry| entry.state.clone())
            .unwrap_or(LoadState::Idle)
    }

    pub fn items(&self, tier: Tier, parent_key: Option<&str>) -> Vec<LookupItem> {
        let key = parent_key.filter(|_| tier.requires_parent()).map(str::to_string);
        self.lock()
            .peek_entry(tier, &key)
            .map(|entry| entry.items.clone())
            .unwrap_or_default()
    }

    pub fn state(&self, tier: Tier, parent_key: Option<&str>) -> LoadState {
        let key = parent_key.filter(|_| tier.requires_parent()).map(str::to_string);
        self.snapshot_state(tier, &key)
    }

    pub fn guard(&self, tier: Tier, parent_key: Option<&str>) -> GuardEntry {
        let key = parent_key.filter(|_| tier.requires_parent()).map(str::to_string);
        self.lock().peek_guard(tier, &key).cloned().unwrap_or_default()
    }

    /// Spinner state: a fetch is running or a retry is queued.
    pub fn is_loading(&self, tier: Tier, parent_key: Option<&str>) -> bool {
        matches!(
            self.state(tier, parent_key),
            LoadState::Loading | LoadState::RetryPending { .. }
        )
    }
}
