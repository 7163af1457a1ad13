use crate::config::IntakeConfig;
use crate::core::assets::{AssetAdd, AssetCollection, AssetLimits};
use crate::core::classification::{ClassificationForm, ToggleOutcome, MAX_CLASSIFICATIONS, MAX_SUB_CATEGORIES};
use crate::core::intake::{ImageCandidate, ImageRules, ImageValidator};
use crate::core::loader::CascadingLoader;
use crate::domain::model::{Classification, ImageAsset, LoadState, LookupItem, NoticeKind, Tier};
use crate::domain::ports::{LookupService, Notifier};
use crate::utils::error::Result;
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;

/// Handle of a load triggered by a selection.
pub type LoadHandle = JoinHandle<Result<LoadState>>;

#[derive(Debug, Clone, Serialize)]
pub struct ListingSubmission {
    pub classifications: Vec<Classification>,
    pub images: Vec<ImageAsset>,
}

/// One form session: loader, classifications, images and the notice channel.
///
/// Selection methods spawn their follow-up loads on the current tokio runtime
/// and must be called from within one. Dropping the session closes the
/// loader so late fetches and retries never touch released state.
pub struct ListingSession {
    loader: Arc<CascadingLoader>,
    form: ClassificationForm,
    assets: AssetCollection,
    validator: ImageValidator,
    notifier: Arc<dyn Notifier>,
}

impl ListingSession {
    pub fn new(
        loader: Arc<CascadingLoader>,
        notifier: Arc<dyn Notifier>,
        rules: ImageRules,
        limits: AssetLimits,
    ) -> Self {
        Self {
            loader,
            form: ClassificationForm::new(),
            assets: AssetCollection::new(limits),
            validator: ImageValidator::new(rules),
            notifier,
        }
    }

    pub fn from_config(
        config: &IntakeConfig,
        lookup: Arc<dyn LookupService>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let loader = CascadingLoader::new(lookup, notifier.clone()).with_policy(config.retry_policy());
        Self::new(
            Arc::new(loader),
            notifier,
            config.image_rules(),
            config.asset_limits(),
        )
    }

    pub fn loader(&self) -> &Arc<CascadingLoader> {
        &self.loader
    }

    pub fn classifications(&self) -> &[Classification] {
        self.form.entries()
    }

    pub fn images(&self) -> &[ImageAsset] {
        self.assets.assets()
    }

    pub fn is_active(&self) -> bool {
        self.loader.is_alive()
    }

    pub fn close(&self) {
        tracing::debug!("Closing listing session");
        self.loader.close();
    }

    fn spawn_load(&self, tier: Tier, parent_key: Option<String>) -> LoadHandle {
        let loader = Arc::clone(&self.loader);
        tokio::spawn(async move { loader.ensure_loaded(tier, parent_key.as_deref()).await })
    }

    /// Starts loading the industry list.
    pub fn start(&self) -> LoadHandle {
        self.spawn_load(Tier::Industry, None)
    }

    pub fn add_classification(&mut self) -> Option<usize> {
        let index = self.form.add_classification();
        if index.is_none() {
            self.notifier.notify(
                NoticeKind::Warning,
                &format!("You can add a maximum of {} classifications", MAX_CLASSIFICATIONS),
            );
        }
        index
    }

    pub fn remove_classification(&mut self, index: usize) -> Result<Classification> {
        self.form.remove_classification(index)
    }

    pub fn select_industry(&mut self, index: usize, item: Option<LookupItem>) -> Result<Option<LoadHandle>> {
        let key = item.as_ref().map(|i| i.id.clone());
        self.form.select_industry(index, item)?;
        Ok(key.map(|id| self.spawn_load(Tier::Category, Some(id))))
    }

    pub fn select_category(&mut self, index: usize, item: Option<LookupItem>) -> Result<Option<LoadHandle>> {
        let key = item.as_ref().map(|i| i.id.clone());
        self.form.select_category(index, item)?;
        Ok(key.map(|id| self.spawn_load(Tier::Subcategory, Some(id))))
    }

    pub fn toggle_sub_category(&mut self, index: usize, item: LookupItem) -> Result<ToggleOutcome> {
        let outcome = self.form.toggle_sub_category(index, item)?;
        if outcome == ToggleOutcome::LimitReached {
            self.notifier.notify(
                NoticeKind::Warning,
                &format!("You can select a maximum of {} subcategories", MAX_SUB_CATEGORIES),
            );
        }
        Ok(outcome)
    }

    /// Validates a batch of files and keeps the accepted ones. Returns one
    /// result per candidate in submission order.
    pub async fn intake_images(&mut self, candidates: Vec<ImageCandidate>) -> Vec<ImageAsset> {
        let results = self
            .validator
            .validate_batch(candidates, self.notifier.as_ref())
            .await;

        let mut overflow = 0;
        for asset in &results {
            if self.assets.add(asset.clone()) == AssetAdd::LimitReached {
                overflow += 1;
            }
        }
        if overflow > 0 {
            self.notifier.notify(
                NoticeKind::Warning,
                &format!(
                    "A listing can hold at most {} images, {} were not added",
                    self.assets.limits().max,
                    overflow
                ),
            );
        }
        results
    }

    pub fn remove_image(&mut self, index: usize) -> Option<ImageAsset> {
        self.assets.remove(index)
    }

    pub fn submission(&self) -> Result<ListingSubmission> {
        self.form.validate_for_submit()?;
        self.assets.validate_for_submit()?;
        Ok(ListingSubmission {
            classifications: self.form.entries().to_vec(),
            images: self.assets.assets().to_vec(),
        })
    }
}

impl Drop for ListingSession {
    fn drop(&mut self) {
        self.loader.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::notify::MemoryNotifier;
    use crate::core::intake::tests::encoded;
    use crate::core::intake::{MIME_JPEG, MIME_PNG};
    use crate::core::loader::tests::{items, RecordingScheduler, ScriptedLookup};
    use image::ImageFormat;

    fn session(lookup: Arc<ScriptedLookup>) -> (ListingSession, Arc<MemoryNotifier>) {
        let notifier = Arc::new(MemoryNotifier::default());
        let loader = CascadingLoader::new(lookup, notifier.clone())
            .with_scheduler(Arc::new(RecordingScheduler::default()));
        let session = ListingSession::new(
            Arc::new(loader),
            notifier.clone(),
            ImageRules::default(),
            AssetLimits::default(),
        );
        (session, notifier)
    }

    #[tokio::test]
    async fn test_selection_cascade_loads_each_tier() {
        let lookup = Arc::new(ScriptedLookup::default());
        lookup.push(Tier::Industry, vec![Ok(items(&["ind-1"]))]);
        lookup.push(Tier::Category, vec![Ok(items(&["cat-1"]))]);
        lookup.push(Tier::Subcategory, vec![Ok(items(&["sub-1", "sub-2"]))]);
        let (mut session, _) = session(lookup.clone());

        assert_eq!(session.start().await.unwrap().unwrap(), LoadState::Loaded);
        let industry = session.loader().items(Tier::Industry, None)[0].clone();

        let index = session.add_classification().unwrap();
        let handle = session.select_industry(index, Some(industry)).unwrap().unwrap();
        assert_eq!(handle.await.unwrap().unwrap(), LoadState::Loaded);

        let category = session.loader().items(Tier::Category, Some("ind-1"))[0].clone();
        let handle = session.select_category(index, Some(category)).unwrap().unwrap();
        handle.await.unwrap().unwrap();

        let subs = session.loader().items(Tier::Subcategory, Some("cat-1"));
        assert_eq!(subs.len(), 2);
        session.toggle_sub_category(index, subs[0].clone()).unwrap();

        let entry = &session.classifications()[0];
        assert_eq!(entry.category_id(), Some("cat-1"));
        assert_eq!(entry.sub_category_ids(), vec!["sub-1"]);
        assert_eq!(lookup.call_count(), 3);
    }

    #[tokio::test]
    async fn test_clearing_industry_triggers_no_load() {
        let lookup = Arc::new(ScriptedLookup::default());
        let (mut session, _) = session(lookup.clone());
        let index = session.add_classification().unwrap();

        assert!(session.select_industry(index, None).unwrap().is_none());
        assert_eq!(lookup.call_count(), 0);
    }

    #[tokio::test]
    async fn test_reselecting_cached_industry_skips_fetch() {
        let lookup = Arc::new(ScriptedLookup::default());
        lookup.push(Tier::Category, vec![Ok(items(&["cat-1"]))]);
        let (mut session, _) = session(lookup.clone());
        let first = session.add_classification().unwrap();
        let second = session.add_classification().unwrap();
        let industry = LookupItem::new("ind-1", "Retail");

        session
            .select_industry(first, Some(industry.clone()))
            .unwrap()
            .unwrap()
            .await
            .unwrap()
            .unwrap();
        session
            .select_industry(second, Some(industry))
            .unwrap()
            .unwrap()
            .await
            .unwrap()
            .unwrap();

        assert_eq!(lookup.call_count(), 1);
    }

    #[tokio::test]
    async fn test_limits_emit_warnings() {
        let (mut session, notifier) = session(Arc::new(ScriptedLookup::default()));
        for _ in 0..3 {
            session.add_classification().unwrap();
        }
        assert!(session.add_classification().is_none());

        let notices = notifier.notices();
        assert_eq!(notices.len(), 1);
        assert_eq!(notices[0].kind, NoticeKind::Warning);
    }

    #[tokio::test]
    async fn test_submission_requires_images_and_classification() {
        let (mut session, _) = session(Arc::new(ScriptedLookup::default()));
        let index = session.add_classification().unwrap();
        session
            .select_industry(index, Some(LookupItem::new("ind-1", "Retail")))
            .unwrap();
        session
            .select_category(index, Some(LookupItem::new("cat-1", "Grocery")))
            .unwrap();
        assert!(session.submission().is_err());

        let jpeg = encoded(1024, 768, ImageFormat::Jpeg);
        let results = session
            .intake_images(vec![
                ImageCandidate::from_bytes("a.jpg", MIME_JPEG, jpeg.clone()),
                ImageCandidate::from_bytes("b.jpg", MIME_JPEG, jpeg.clone()),
                ImageCandidate::from_bytes("small.png", MIME_PNG, encoded(320, 240, ImageFormat::Png)),
                ImageCandidate::from_bytes("c.jpg", MIME_JPEG, jpeg),
            ])
            .await;

        assert_eq!(results.len(), 4);
        assert_eq!(session.images().len(), 3);

        let submission = session.submission().unwrap();
        assert_eq!(submission.classifications.len(), 1);
        assert_eq!(submission.images.len(), 3);
        let payload = serde_json::to_value(&submission).unwrap();
        assert_eq!(payload["classifications"][0]["category"]["id"], "cat-1");
    }

    #[tokio::test]
    async fn test_drop_closes_loader() {
        let (session, _) = session(Arc::new(ScriptedLookup::default()));
        let loader = Arc::clone(session.loader());
        assert!(session.is_active());

        drop(session);

        assert!(!loader.is_alive());
    }
}
