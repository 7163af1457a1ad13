use crate::core::assets::AssetLimits;
use crate::core::intake::ImageRules;
use crate::core::loader::RetryPolicy;
use crate::utils::error::{IntakeError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IntakeConfig {
    pub lookup: LookupConfig,
    pub retry: Option<RetryConfig>,
    pub images: Option<ImagesConfig>,
    pub logging: Option<LoggingConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupConfig {
    pub base_url: String,
    pub industries_path: Option<String>,
    pub categories_path: Option<String>,
    pub subcategories_path: Option<String>,
    pub bearer_token: Option<String>,
    pub timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RetryConfig {
    pub industry_ceiling: Option<u32>,
    pub category_ceiling: Option<u32>,
    pub subcategory_ceiling: Option<u32>,
    pub base_delay_seconds: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImagesConfig {
    pub allowed_types: Option<Vec<String>>,
    pub max_bytes: Option<u64>,
    pub min_width: Option<u32>,
    pub min_height: Option<u32>,
    pub min_assets: Option<usize>,
    pub max_assets: Option<usize>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: Option<String>,
    pub json: Option<bool>,
}

impl LookupConfig {
    pub fn industries_path(&self) -> &str {
        self.industries_path.as_deref().unwrap_or("/industries")
    }

    pub fn categories_path(&self) -> &str {
        self.categories_path
            .as_deref()
            .unwrap_or("/industries/{id}/categories")
    }

    pub fn subcategories_path(&self) -> &str {
        self.subcategories_path
            .as_deref()
            .unwrap_or("/categories/{id}/subcategories")
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds.unwrap_or(10))
    }
}

impl IntakeConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(IntakeError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| IntakeError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${LOOKUP_TOKEN})，找不到的變數保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = regex::Regex::new(r"\$\{([^}]+)\}").map_err(|e| IntakeError::ConfigError {
            message: format!("Invalid substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        let Some(retry) = &self.retry else {
            return defaults;
        };
        RetryPolicy {
            industry_ceiling: retry.industry_ceiling.unwrap_or(defaults.industry_ceiling),
            category_ceiling: retry.category_ceiling.unwrap_or(defaults.category_ceiling),
            subcategory_ceiling: retry
                .subcategory_ceiling
                .unwrap_or(defaults.subcategory_ceiling),
            base_delay: retry
                .base_delay_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.base_delay),
        }
    }

    pub fn image_rules(&self) -> ImageRules {
        let defaults = ImageRules::default();
        let Some(images) = &self.images else {
            return defaults;
        };
        ImageRules {
            allowed_types: images
                .allowed_types
                .clone()
                .unwrap_or(defaults.allowed_types),
            max_bytes: images.max_bytes.unwrap_or(defaults.max_bytes),
            min_width: images.min_width.unwrap_or(defaults.min_width),
            min_height: images.min_height.unwrap_or(defaults.min_height),
        }
    }

    pub fn asset_limits(&self) -> AssetLimits {
        let defaults = AssetLimits::default();
        let Some(images) = &self.images else {
            return defaults;
        };
        AssetLimits {
            min: images.min_assets.unwrap_or(defaults.min),
            max: images.max_assets.unwrap_or(defaults.max),
        }
    }

    pub fn json_logs(&self) -> bool {
        self.logging.as_ref().and_then(|l| l.json).unwrap_or(false)
    }

    pub fn verbose_logs(&self) -> bool {
        self.logging
            .as_ref()
            .and_then(|l| l.level.as_deref())
            .map(|level| matches!(level, "debug" | "trace"))
            .unwrap_or(false)
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_url("lookup.base_url", &self.lookup.base_url)?;
        validation::validate_id_template("lookup.categories_path", self.lookup.categories_path())?;
        validation::validate_id_template(
            "lookup.subcategories_path",
            self.lookup.subcategories_path(),
        )?;

        let policy = self.retry_policy();
        validation::validate_positive_number(
            "retry.industry_ceiling",
            policy.industry_ceiling as usize,
            1,
        )?;
        validation::validate_positive_number(
            "retry.category_ceiling",
            policy.category_ceiling as usize,
            1,
        )?;
        validation::validate_positive_number(
            "retry.subcategory_ceiling",
            policy.subcategory_ceiling as usize,
            1,
        )?;

        let rules = self.image_rules();
        validation::validate_non_empty_list("images.allowed_types", &rules.allowed_types)?;
        for mime in &rules.allowed_types {
            if !mime.starts_with("image/") {
                return Err(IntakeError::InvalidConfigValueError {
                    field: "images.allowed_types".to_string(),
                    value: mime.clone(),
                    reason: "Only image/* MIME types can be accepted".to_string(),
                });
            }
        }

        let limits = self.asset_limits();
        validation::validate_positive_number("images.max_assets", limits.max, 1)?;
        validation::validate_range("images.min_assets", limits.min, 0, limits.max)?;

        Ok(())
    }
}

impl Validate for IntakeConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}
