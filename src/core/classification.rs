use crate::domain::model::{Classification, LookupItem, Tier};
use crate::utils::error::{IntakeError, Result};

pub const MAX_CLASSIFICATIONS: usize = 3;
pub const MAX_SUB_CATEGORIES: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Already at [`MAX_SUB_CATEGORIES`]; nothing changed.
    LimitReached,
}

/// Ordered list of 0..=3 classification entries.
///
/// Selecting an ancestor always clears that entry's descendants; sibling
/// entries are never touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClassificationForm {
    entries: Vec<Classification>,
}

impl ClassificationForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[Classification] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Classification> {
        self.entries.get(index)
    }

    fn entry_mut(&mut self, index: usize) -> Result<&mut Classification> {
        let len = self.entries.len();
        self.entries
            .get_mut(index)
            .ok_or(IntakeError::EntryOutOfRange { index, len })
    }

    /// Appends an empty entry and returns its index, or `None` when the form
    /// is full.
    pub fn add_classification(&mut self) -> Option<usize> {
        if self.entries.len() >= MAX_CLASSIFICATIONS {
            return None;
        }
        self.entries.push(Classification::default());
        Some(self.entries.len() - 1)
    }

    pub fn remove_classification(&mut self, index: usize) -> Result<Classification> {
        if index >= self.entries.len() {
            return Err(IntakeError::EntryOutOfRange {
                index,
                len: self.entries.len(),
            });
        }
        Ok(self.entries.remove(index))
    }

    pub fn select_industry(&mut self, index: usize, item: Option<LookupItem>) -> Result<()> {
        let entry = self.entry_mut(index)?;
        entry.industry = item;
        entry.category = None;
        entry.sub_categories.clear();
        Ok(())
    }

    pub fn select_category(&mut self, index: usize, item: Option<LookupItem>) -> Result<()> {
        let entry = self.entry_mut(index)?;
        if item.is_some() && entry.industry.is_none() {
            return Err(IntakeError::ParentNotSelected {
                parent: Tier::Industry.to_string(),
                child: Tier::Category.to_string(),
            });
        }
        entry.category = item;
        entry.sub_categories.clear();
        Ok(())
    }

    pub fn toggle_sub_category(&mut self, index: usize, item: LookupItem) -> Result<ToggleOutcome> {
        let entry = self.entry_mut(index)?;
        if entry.category.is_none() {
            return Err(IntakeError::ParentNotSelected {
                parent: Tier::Category.to_string(),
                child: Tier::Subcategory.to_string(),
            });
        }

        if let Some(pos) = entry.sub_categories.iter().position(|s| s.id == item.id) {
            entry.sub_categories.remove(pos);
            return Ok(ToggleOutcome::Removed);
        }
        if entry.sub_categories.len() >= MAX_SUB_CATEGORIES {
            return Ok(ToggleOutcome::LimitReached);
        }
        entry.sub_categories.push(item);
        Ok(ToggleOutcome::Added)
    }

    pub fn validate_for_submit(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(IntakeError::SubmissionError {
                message: "at least one classification is required".to_string(),
            });
        }
        if let Some(index) = self.entries.iter().position(|e| !e.is_complete()) {
            return Err(IntakeError::SubmissionError {
                message: format!(
                    "classification {} needs both an industry and a category",
                    index + 1
                ),
            });
        }
        Ok(())
    }
}
