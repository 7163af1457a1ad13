use crate::domain::model::{AssetStatus, ImageAsset, NoticeKind, Rejection};
use crate::domain::ports::Notifier;
use crate::utils::error::Result;
use futures::future::join_all;
use std::io::Cursor;
use std::path::Path;

pub const MIME_JPEG: &str = "image/jpeg";
pub const MIME_PNG: &str = "image/png";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRules {
    pub allowed_types: Vec<String>,
    pub max_bytes: u64,
    pub min_width: u32,
    pub min_height: u32,
}

impl Default for ImageRules {
    fn default() -> Self {
        Self {
            allowed_types: vec![MIME_JPEG.to_string(), MIME_PNG.to_string()],
            max_bytes: 5 * 1024 * 1024,
            min_width: 800,
            min_height: 600,
        }
    }
}

/// A file offered for intake, before validation.
#[derive(Debug, Clone)]
pub struct ImageCandidate {
    pub source: String,
    pub name: String,
    /// Declared by the picker, not sniffed.
    pub mime_type: String,
    pub byte_size: u64,
    pub data: Vec<u8>,
}

impl ImageCandidate {
    pub fn from_bytes(name: impl Into<String>, mime_type: impl Into<String>, data: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            source: name.clone(),
            name,
            mime_type: mime_type.into(),
            byte_size: data.len() as u64,
            data,
        }
    }

    /// 從檔案讀取，MIME 由副檔名推斷
    pub async fn from_path(path: &Path) -> Result<Self> {
        let data = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        Ok(Self {
            source: path.display().to_string(),
            name,
            mime_type: mime_from_extension(path).to_string(),
            byte_size: data.len() as u64,
            data,
        })
    }
}

pub fn mime_from_extension(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => MIME_JPEG,
        Some("png") => MIME_PNG,
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        _ => "application/octet-stream",
    }
}

/// Decodes just enough of the image header to read its intrinsic size.
/// Runs on the blocking pool.
async fn read_dimensions(data: Vec<u8>) -> Option<(u32, u32)> {
    let decode = tokio::task::spawn_blocking(move || {
        image::ImageReader::new(Cursor::new(data))
            .with_guessed_format()
            .ok()?
            .into_dimensions()
            .ok()
    });

    match decode.await {
        Ok(dimensions) => dimensions,
        Err(e) => {
            tracing::warn!("Image decode task failed: {}", e);
            None
        }
    }
}

/// Accepts or rejects candidate images. Checks run in order and stop at the
/// first failure: MIME type, declared size, decoded dimensions.
#[derive(Debug, Clone, Default)]
pub struct ImageValidator {
    rules: ImageRules,
}

impl ImageValidator {
    pub fn new(rules: ImageRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &ImageRules {
        &self.rules
    }

    pub async fn validate(&self, candidate: ImageCandidate) -> ImageAsset {
        let ImageCandidate {
            source,
            name,
            mime_type,
            byte_size,
            data,
        } = candidate;

        let mut asset = ImageAsset {
            source,
            name,
            byte_size,
            width: 0,
            height: 0,
            status: AssetStatus::Pending,
        };

        if !self.rules.allowed_types.iter().any(|t| *t == mime_type) {
            asset.status = AssetStatus::Rejected(Rejection::UnsupportedType);
            return asset;
        }
        if byte_size > self.rules.max_bytes {
            asset.status = AssetStatus::Rejected(Rejection::TooLarge);
            return asset;
        }

        let Some((width, height)) = read_dimensions(data).await else {
            asset.status = AssetStatus::Rejected(Rejection::DecodeFailed);
            return asset;
        };
        asset.width = width;
        asset.height = height;

        asset.status = if width < self.rules.min_width || height < self.rules.min_height {
            AssetStatus::Rejected(Rejection::DimensionsTooSmall)
        } else {
            AssetStatus::Valid
        };
        asset
    }

    /// Validates every candidate concurrently. Results keep submission order;
    /// a single error notice summarising rejections is sent once all settle.
    pub async fn validate_batch(
        &self,
        candidates: Vec<ImageCandidate>,
        notifier: &dyn Notifier,
    ) -> Vec<ImageAsset> {
        let results = join_all(candidates.into_iter().map(|c| self.validate(c))).await;

        let rejected: Vec<String> = results
            .iter()
            .filter_map(|asset| match &asset.status {
                AssetStatus::Rejected(reason) => Some(format!("{} ({})", asset.name, reason)),
                _ => None,
            })
            .collect();

        tracing::info!(
            "🖼️ Validated {} images, {} rejected",
            results.len(),
            rejected.len()
        );

        if !rejected.is_empty() {
            notifier.notify(
                NoticeKind::Error,
                &format!(
                    "{} image(s) rejected: {}",
                    rejected.len(),
                    rejected.join(", ")
                ),
            );
        }

        results
    }
}
