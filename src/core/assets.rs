use crate::domain::model::ImageAsset;
use crate::utils::error::{IntakeError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssetLimits {
    pub min: usize,
    pub max: usize,
}

impl Default for AssetLimits {
    fn default() -> Self {
        Self { min: 3, max: 10 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetAdd {
    Added(usize),
    NotValid,
    LimitReached,
}

/// Accepted images of one listing, in upload order.
#[derive(Debug, Clone, Default)]
pub struct AssetCollection {
    limits: AssetLimits,
    assets: Vec<ImageAsset>,
}

impl AssetCollection {
    pub fn new(limits: AssetLimits) -> Self {
        Self {
            limits,
            assets: Vec::new(),
        }
    }

    pub fn limits(&self) -> AssetLimits {
        self.limits
    }

    pub fn assets(&self) -> &[ImageAsset] {
        &self.assets
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }

    pub fn add(&mut self, asset: ImageAsset) -> AssetAdd {
        if !asset.is_valid() {
            return AssetAdd::NotValid;
        }
        if self.assets.len() >= self.limits.max {
            return AssetAdd::LimitReached;
        }
        self.assets.push(asset);
        AssetAdd::Added(self.assets.len() - 1)
    }

    pub fn remove(&mut self, index: usize) -> Option<ImageAsset> {
        (index < self.assets.len()).then(|| self.assets.remove(index))
    }

    pub fn is_complete(&self) -> bool {
        (self.limits.min..=self.limits.max).contains(&self.assets.len())
    }

    pub fn validate_for_submit(&self) -> Result<()> {
        if self.assets.len() < self.limits.min {
            return Err(IntakeError::SubmissionError {
                message: format!(
                    "at least {} images are required, {} uploaded",
                    self.limits.min,
                    self.assets.len()
                ),
            });
        }
        Ok(())
    }
}
