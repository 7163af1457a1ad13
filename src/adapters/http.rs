use crate::config::LookupConfig;
use crate::domain::model::{LookupError, LookupItem};
use crate::domain::ports::{LookupResult, LookupService};
use crate::utils::error::Result;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};

/// Lookup service reached over HTTP/JSON.
///
/// Every tier endpoint answers with either a JSON array of `{id, name}` or an
/// object wrapping that array under `data`. Numeric ids are accepted and
/// stringified.
pub struct HttpLookupService {
    client: Client,
    base_url: String,
    industries_path: String,
    categories_path: String,
    subcategories_path: String,
    bearer_token: Option<String>,
}

impl HttpLookupService {
    pub fn from_config(config: &LookupConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.timeout()).build()?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            industries_path: config.industries_path().to_string(),
            categories_path: config.categories_path().to_string(),
            subcategories_path: config.subcategories_path().to_string(),
            bearer_token: config.bearer_token.clone().filter(|t| !t.is_empty()),
        })
    }

    fn endpoint(&self, template: &str, id: Option<&str>) -> String {
        let path = match id {
            Some(id) => template.replace("{id}", &encode_segment(id)),
            None => template.to_string(),
        };
        format!("{}{}", self.base_url, path)
    }

    async fn get_items(&self, url: String) -> LookupResult {
        tracing::debug!("📡 GET {}", url);

        let mut request = self.client.get(&url);
        if let Some(token) = &self.bearer_token {
            request = request.bearer_auth(token);
        }

        // URL 可能含有 "auth"/"token" 字樣，錯誤訊息不帶 URL 以免誤判
        let response = request
            .send()
            .await
            .map_err(|e| LookupError::new(format!("lookup request failed: {}", e.without_url())))?;

        let status = response.status();
        tracing::debug!("Lookup response status: {}", status);

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(LookupError::new(format!(
                "permission denied (HTTP {})",
                status.as_u16()
            )));
        }
        if !status.is_success() {
            return Err(LookupError::new(format!(
                "lookup service returned HTTP {}",
                status.as_u16()
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| LookupError::new(format!("invalid lookup payload: {}", e.without_url())))?;

        parse_items(body)
    }
}

fn encode_segment(id: &str) -> String {
    url::form_urlencoded::byte_serialize(id.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

fn parse_items(body: serde_json::Value) -> LookupResult {
    let array = match body {
        serde_json::Value::Array(items) => items,
        serde_json::Value::Object(mut obj) => match obj.remove("data") {
            Some(serde_json::Value::Array(items)) => items,
            _ => {
                return Err(LookupError::new(
                    "invalid lookup payload: expected an array under \"data\"",
                ))
            }
        },
        _ => return Err(LookupError::new("invalid lookup payload: expected a JSON array")),
    };

    let mut items = Vec::with_capacity(array.len());
    for value in array {
        let id = match value.get("id") {
            Some(serde_json::Value::String(s)) => s.clone(),
            Some(serde_json::Value::Number(n)) => n.to_string(),
            _ => String::new(),
        };
        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string();

        if id.is_empty() || name.is_empty() {
            tracing::warn!("Skipping malformed lookup item: {}", value);
            continue;
        }
        items.push(LookupItem { id, name });
    }

    Ok(items)
}

#[async_trait]
impl LookupService for HttpLookupService {
    async fn fetch_industries(&self) -> LookupResult {
        self.get_items(self.endpoint(&self.industries_path, None))
            .await
    }

    async fn fetch_categories(&self, industry_id: &str) -> LookupResult {
        self.get_items(self.endpoint(&self.categories_path, Some(industry_id)))
            .await
    }

    async fn fetch_subcategories(&self, category_id: &str) -> LookupResult {
        self.get_items(self.endpoint(&self.subcategories_path, Some(category_id)))
            .await
    }
}
