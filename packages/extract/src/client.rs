//! Extraction API client.
//!
//! [`Extractor`] is the seam the application codes against; the production
//! implementation is [`FirecrawlExtractor`], a thin wrapper around the
//! Firecrawl extract endpoint. One request, one response: no retry, no
//! polling, no partial results.

use async_trait::async_trait;
use indexmap::IndexMap;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;

use crate::credentials::ApiKey;
use crate::error::{ExtractError, Result};
use crate::schema::SchemaDescriptor;

const FIRECRAWL_API_URL: &str = "https://api.firecrawl.dev/v1";

/// One extracted record: field name to value, in response order.
pub type Record = IndexMap<String, Value>;

/// Outcome of one extraction call.
///
/// `raw` is the full response body as received (what a JSON download
/// serves); `records` is the normalized list view of its `data` field
/// (what the table and CSV are built from).
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionResult {
    pub raw: Value,
    pub records: Vec<Record>,
}

impl ExtractionResult {
    /// Validate a response body and normalize its `data` field.
    ///
    /// A `data` object becomes a single-record list; a `data` array must
    /// hold only objects. Anything else is a shape error, and a missing
    /// `data` field is reported as such (the API contract this system
    /// depends on).
    pub fn from_response(raw: Value) -> Result<Self> {
        if let Some(Value::Bool(false)) = raw.get("success") {
            let message = raw
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("no error detail provided")
                .to_string();
            return Err(ExtractError::Failed { message });
        }

        let data = raw.get("data").ok_or(ExtractError::MissingData)?;

        let records = match data {
            Value::Object(map) => {
                vec![map.iter().map(|(k, v)| (k.clone(), v.clone())).collect()]
            }
            Value::Array(items) => {
                let mut records = Vec::with_capacity(items.len());
                for item in items {
                    match item {
                        Value::Object(map) => {
                            records.push(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
                        }
                        other => {
                            return Err(ExtractError::UnexpectedShape {
                                found: json_type_name(other),
                            })
                        }
                    }
                }
                records
            }
            other => {
                return Err(ExtractError::UnexpectedShape {
                    found: json_type_name(other),
                })
            }
        };

        Ok(Self { raw, records })
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Seam for the external extraction service.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Extract data from `urls` guided by a natural-language prompt and an
    /// optional schema constraint.
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
        schema: Option<&SchemaDescriptor>,
    ) -> Result<ExtractionResult>;

    fn name(&self) -> &str;
}

#[derive(Serialize)]
struct ExtractRequest<'a> {
    urls: &'a [String],
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    schema: Option<&'a SchemaDescriptor>,
}

/// Firecrawl implementation of [`Extractor`].
///
/// Constructed credential-less when no API key is configured; the missing
/// key surfaces as an extraction-time error, never a startup failure.
pub struct FirecrawlExtractor {
    client: Client,
    api_key: Option<ApiKey>,
    api_url: String,
}

impl FirecrawlExtractor {
    /// Create an extractor with the given API key (or none).
    pub fn new(api_key: Option<ApiKey>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| ExtractError::Transport(Box::new(e)))?;

        Ok(Self {
            client,
            api_key,
            api_url: FIRECRAWL_API_URL.to_string(),
        })
    }

    /// Create from the `FIRECRAWL_API_KEY` environment variable, which may
    /// be absent.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("FIRECRAWL_API_KEY").ok().map(ApiKey::new);
        Self::new(api_key)
    }

    /// Override the API base URL (self-hosted Firecrawl, tests).
    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }
}

#[async_trait]
impl Extractor for FirecrawlExtractor {
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
        schema: Option<&SchemaDescriptor>,
    ) -> Result<ExtractionResult> {
        let api_key = self.api_key.as_ref().ok_or(ExtractError::MissingCredential)?;

        tracing::debug!(
            urls = ?urls,
            schema = ?schema.map(|s| serde_json::to_value(s).unwrap_or_default()),
            "Sending extract request"
        );

        let request = ExtractRequest { urls, prompt, schema };
        let response = self
            .client
            .post(format!("{}/extract", self.api_url))
            .header("Authorization", format!("Bearer {}", api_key.expose()))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| ExtractError::Transport(Box::new(e)))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ExtractError::Api {
                status: status.as_u16(),
                message: truncate(&message, 500),
            });
        }

        let raw: Value = response
            .json()
            .await
            .map_err(|e| ExtractError::Transport(Box::new(e)))?;

        tracing::debug!(
            records = raw.get("data").map(json_type_name),
            "Extract response received"
        );

        ExtractionResult::from_response(raw)
    }

    fn name(&self) -> &str {
        "firecrawl"
    }
}

fn truncate(text: &str, max: usize) -> String {
    if text.len() <= max {
        text.to_string()
    } else {
        let mut end = max;
        while !text.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}…", &text[..end])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{FieldType, SchemaFieldStore};
    use serde_json::json;

    #[test]
    fn test_create_extractor_without_credential() {
        let extractor = FirecrawlExtractor::new(None).unwrap();
        assert_eq!(extractor.name(), "firecrawl");
        assert!(!extractor.has_credential());
    }

    #[test]
    fn test_single_record_response() {
        let raw = json!({"success": true, "data": {"title": "Example Domain"}});
        let result = ExtractionResult::from_response(raw).unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0]["title"], "Example Domain");
    }

    #[test]
    fn test_record_list_response() {
        let raw = json!({"data": [{"a": 1}, {"a": 2}]});
        let result = ExtractionResult::from_response(raw).unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[1]["a"], 2);
    }

    #[test]
    fn test_missing_data_field() {
        let raw = json!({"success": true});
        let err = ExtractionResult::from_response(raw).unwrap_err();
        assert!(matches!(err, ExtractError::MissingData));
    }

    #[test]
    fn test_scalar_data_is_shape_error() {
        let raw = json!({"data": "not a record"});
        let err = ExtractionResult::from_response(raw).unwrap_err();
        assert!(matches!(err, ExtractError::UnexpectedShape { found: "string" }));
    }

    #[test]
    fn test_array_of_scalars_is_shape_error() {
        let raw = json!({"data": [1, 2, 3]});
        let err = ExtractionResult::from_response(raw).unwrap_err();
        assert!(matches!(err, ExtractError::UnexpectedShape { found: "number" }));
    }

    #[test]
    fn test_api_reported_failure() {
        let raw = json!({"success": false, "error": "invalid URL"});
        let err = ExtractionResult::from_response(raw).unwrap_err();
        assert!(matches!(err, ExtractError::Failed { .. }));
        assert!(err.to_string().contains("invalid URL"));
    }

    #[test]
    fn test_request_omits_schema_when_none() {
        let urls = vec!["https://example.com".to_string()];
        let request = ExtractRequest {
            urls: &urls,
            prompt: "get the title",
            schema: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert!(json.get("schema").is_none());
        assert_eq!(json["urls"][0], "https://example.com");
    }

    #[test]
    fn test_request_carries_compiled_schema() {
        let mut store = SchemaFieldStore::new();
        store.update_field(0, "title", FieldType::Str);
        let schema = store.compile().unwrap();

        let urls = vec!["https://example.com".to_string()];
        let request = ExtractRequest {
            urls: &urls,
            prompt: "get the title",
            schema: Some(&schema),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["schema"]["properties"]["title"]["type"], "string");
    }

    #[test]
    fn test_missing_credential_is_auth_related() {
        assert!(ExtractError::MissingCredential.is_auth_related());
        assert!(ExtractError::Api { status: 401, message: String::new() }.is_auth_related());
        assert!(!ExtractError::MissingData.is_auth_related());
    }
}
