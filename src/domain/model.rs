use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupItem {
    pub id: String,
    pub name: String,
}

impl LookupItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// The three dependent selection levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Industry,
    Category,
    Subcategory,
}

impl Tier {
    /// Industry is the only tier fetched without a parent key.
    pub fn requires_parent(self) -> bool {
        !matches!(self, Tier::Industry)
    }

    pub fn label(self) -> &'static str {
        match self {
            Tier::Industry => "industry",
            Tier::Category => "category",
            Tier::Subcategory => "subcategory",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Per (tier, parent key) load state.
///
/// `Idle → Loading → {Loaded | RetryPending → Loading | Empty}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Idle,
    Loading,
    RetryPending { retry_at: DateTime<Utc> },
    Loaded,
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TierEntry {
    pub items: Vec<LookupItem>,
    pub state: LoadState,
}

impl Default for TierEntry {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            state: LoadState::Idle,
        }
    }
}

/// Dedup and backoff bookkeeping for one (tier, parent key).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GuardEntry {
    pub in_flight: bool,
    pub attempt: u32,
    pub last_attempt_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// 交給外部 session recovery，不重試
    Auth,
    Transient,
}

const AUTH_MARKERS: [&str; 4] = ["permission", "auth", "token", "transport errored"];

/// Opaque failure reported by a lookup function.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Case-sensitive substring match against the auth markers.
    pub fn kind(&self) -> FailureKind {
        if AUTH_MARKERS.iter().any(|marker| self.message.contains(marker)) {
            FailureKind::Auth
        } else {
            FailureKind::Transient
        }
    }
}

/// One user-authored industry/category/subcategory selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub industry: Option<LookupItem>,
    pub category: Option<LookupItem>,
    pub sub_categories: Vec<LookupItem>,
}

impl Classification {
    pub fn industry_id(&self) -> Option<&str> {
        self.industry.as_ref().map(|item| item.id.as_str())
    }

    pub fn category_id(&self) -> Option<&str> {
        self.category.as_ref().map(|item| item.id.as_str())
    }

    pub fn sub_category_ids(&self) -> Vec<&str> {
        self.sub_categories.iter().map(|item| item.id.as_str()).collect()
    }

    pub fn is_complete(&self) -> bool {
        self.industry.is_some() && self.category.is_some()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub kind: NoticeKind,
    pub message: String,
}

/// Why an image was turned away at intake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Rejection {
    UnsupportedType,
    TooLarge,
    DimensionsTooSmall,
    DecodeFailed,
}

impl Rejection {
    pub fn reason(&self) -> &'static str {
        match self {
            Rejection::UnsupportedType => "unsupported type",
            Rejection::TooLarge => "too large",
            Rejection::DimensionsTooSmall => "dimensions too small",
            Rejection::DecodeFailed => "decode failed",
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AssetStatus {
    Pending,
    Valid,
    Rejected(Rejection),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageAsset {
    /// Path or caller-supplied handle the bytes came from.
    pub source: String,
    pub name: String,
    pub byte_size: u64,
    pub width: u32,
    pub height: u32,
    pub status: AssetStatus,
}

impl ImageAsset {
    pub fn is_valid(&self) -> bool {
        self.status == AssetStatus::Valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_denied_is_auth_failure() {
        assert_eq!(LookupError::new("permission denied").kind(), FailureKind::Auth);
        assert_eq!(LookupError::new("invalid token").kind(), FailureKind::Auth);
        assert_eq!(
            LookupError::new("the transport errored while reading").kind(),
            FailureKind::Auth
        );
    }

    #[test]
    fn test_auth_match_is_case_sensitive() {
        assert_eq!(LookupError::new("Permission Denied").kind(), FailureKind::Transient);
        assert_eq!(LookupError::new("connection reset").kind(), FailureKind::Transient);
    }

    #[test]
    fn test_classification_ids() {
        let entry = Classification {
            industry: Some(LookupItem::new("ind-1", "Retail")),
            category: Some(LookupItem::new("cat-1", "Grocery")),
            sub_categories: vec![LookupItem::new("sub-1", "Organic")],
        };
        assert_eq!(entry.industry_id(), Some("ind-1"));
        assert_eq!(entry.category_id(), Some("cat-1"));
        assert_eq!(entry.sub_category_ids(), vec!["sub-1"]);
        assert!(entry.is_complete());
    }
}
