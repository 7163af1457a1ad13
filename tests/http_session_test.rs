use async_trait::async_trait;
use httpmock::prelude::*;
use listing_intake::adapters::{ChannelNotifier, MemoryNotifier};
use listing_intake::domain::model::{LoadState, LookupItem, NoticeKind, Tier};
use listing_intake::domain::ports::{Scheduler, SessionRecovery};
use listing_intake::{CascadingLoader, HttpLookupService, IntakeConfig, ListingSession};
use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::NamedTempFile;

#[derive(Default)]
struct InstantScheduler {
    delays: Mutex<Vec<Duration>>,
}

#[async_trait]
impl Scheduler for InstantScheduler {
    async fn sleep(&self, delay: Duration) {
        self.delays.lock().unwrap().push(delay);
    }
}

#[derive(Default)]
struct CountingRecovery {
    calls: Mutex<Vec<Tier>>,
}

impl SessionRecovery for CountingRecovery {
    fn on_auth_failure(&self, tier: Tier, _message: &str) {
        self.calls.lock().unwrap().push(tier);
    }
}

fn config_for(server: &MockServer) -> IntakeConfig {
    IntakeConfig::from_toml_str(&format!(
        r#"
[lookup]
base_url = "{}"
timeout_seconds = 5
"#,
        server.base_url()
    ))
    .unwrap()
}

#[tokio::test]
async fn test_concurrent_starts_hit_industries_once() {
    let server = MockServer::start();
    let industries = server.mock(|when, then| {
        when.method(GET).path("/industries");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!([
                {"id": "ind-1", "name": "Retail"},
                {"id": "ind-2", "name": "Hospitality"}
            ]));
    });

    let config = config_for(&server);
    let lookup = Arc::new(HttpLookupService::from_config(&config.lookup).unwrap());
    let session = ListingSession::from_config(&config, lookup, Arc::new(MemoryNotifier::default()));

    let first = session.start();
    let second = session.start();
    first.await.unwrap().unwrap();
    second.await.unwrap().unwrap();

    industries.assert_hits(1);
    assert_eq!(session.loader().items(Tier::Industry, None).len(), 2);

    // 已快取，不再呼叫
    session.start().await.unwrap().unwrap();
    industries.assert_hits(1);
}

#[tokio::test]
async fn test_empty_categories_retry_then_notify() {
    let server = MockServer::start();
    let categories = server.mock(|when, then| {
        when.method(GET).path("/industries/ind-1/categories");
        then.status(200)
            .header("Content-Type", "application/json")
            .json_body(serde_json::json!({"data": []}));
    });

    let config = config_for(&server);
    let scheduler = Arc::new(InstantScheduler::default());
    let (notifier, mut notices) = ChannelNotifier::new();
    let notifier = Arc::new(notifier);
    let lookup = Arc::new(HttpLookupService::from_config(&config.lookup).unwrap());
    let loader = CascadingLoader::new(lookup, notifier.clone())
        .with_policy(config.retry_policy())
        .with_scheduler(scheduler.clone());
    let mut session = ListingSession::new(
        Arc::new(loader),
        notifier,
        config.image_rules(),
        config.asset_limits(),
    );

    let index = session.add_classification().unwrap();
    let state = session
        .select_industry(index, Some(LookupItem::new("ind-1", "Retail")))
        .unwrap()
        .unwrap()
        .await
        .unwrap()
        .unwrap();

    assert_eq!(state, LoadState::Empty);
    categories.assert_hits(2);
    assert_eq!(*scheduler.delays.lock().unwrap(), vec![Duration::from_secs(1)]);

    let notice = notices.recv().await.unwrap();
    assert_eq!(notice.kind, NoticeKind::Error);
    assert!(notice.message.contains("category"));
}

#[tokio::test]
async fn test_unauthorized_goes_to_recovery_without_retry() {
    let server = MockServer::start();
    let subcategories = server.mock(|when, then| {
        when.method(GET).path("/categories/cat-1/subcategories");
        then.status(401);
    });

    let config = config_for(&server);
    let scheduler = Arc::new(InstantScheduler::default());
    let recovery = Arc::new(CountingRecovery::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let lookup = Arc::new(HttpLookupService::from_config(&config.lookup).unwrap());
    let loader = CascadingLoader::new(lookup, notifier.clone())
        .with_scheduler(scheduler.clone())
        .with_recovery(recovery.clone());

    let state = loader
        .ensure_loaded(Tier::Subcategory, Some("cat-1"))
        .await
        .unwrap();

    assert_eq!(state, LoadState::Idle);
    subcategories.assert_hits(1);
    assert!(scheduler.delays.lock().unwrap().is_empty());
    assert_eq!(*recovery.calls.lock().unwrap(), vec![Tier::Subcategory]);
    assert!(notifier.notices().is_empty());
}

#[tokio::test]
async fn test_server_error_recovers_on_retry() {
    let server = MockServer::start();
    let mut failing = server.mock(|when, then| {
        when.method(GET).path("/industries");
        then.status(503);
    });

    let config = config_for(&server);
    let lookup = Arc::new(HttpLookupService::from_config(&config.lookup).unwrap());
    let loader = Arc::new(
        CascadingLoader::new(lookup, Arc::new(MemoryNotifier::default()))
            .with_scheduler(Arc::new(SwapScheduler::default())),
    );

    // 第一次失敗後換成正常回應
    let state = {
        let task_loader = loader.clone();
        let handle =
            tokio::spawn(async move { task_loader.ensure_loaded(Tier::Industry, None).await });
        while !matches!(
            loader.state(Tier::Industry, None),
            LoadState::RetryPending { .. }
        ) {
            tokio::task::yield_now().await;
        }
        failing.assert_hits(1);
        failing.delete();
        server.mock(|when, then| {
            when.method(GET).path("/industries");
            then.status(200)
                .json_body(serde_json::json!([{"id": "ind-1", "name": "Retail"}]));
        });
        SWAP_GATE.notify_one();
        handle.await.unwrap().unwrap()
    };

    assert_eq!(state, LoadState::Loaded);
    assert_eq!(loader.items(Tier::Industry, None)[0].name, "Retail");
}

static SWAP_GATE: tokio::sync::Notify = tokio::sync::Notify::const_new();

/// Holds the retry until the test has swapped the mock.
#[derive(Default)]
struct SwapScheduler;

#[async_trait]
impl Scheduler for SwapScheduler {
    async fn sleep(&self, _delay: Duration) {
        SWAP_GATE.notified().await;
    }
}

#[tokio::test]
async fn test_session_from_config_file() {
    let server = MockServer::start();
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
[lookup]
base_url = "{}"

[retry]
industry_ceiling = 1

[images]
max_assets = 4
"#,
        server.base_url()
    )
    .unwrap();

    let config = IntakeConfig::from_file(file.path()).unwrap();
    let lookup = Arc::new(HttpLookupService::from_config(&config.lookup).unwrap());
    let session = ListingSession::from_config(&config, lookup, Arc::new(MemoryNotifier::default()));

    assert_eq!(session.loader().policy().industry_ceiling, 1);
    assert!(session.is_active());
    session.close();
    assert!(!session.is_active());
}
