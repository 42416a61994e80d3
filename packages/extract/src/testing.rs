//! Testing utilities including a mock extractor.
//!
//! Lets applications exercise the full chat flow without network calls.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::client::{ExtractionResult, Extractor};
use crate::error::{ExtractError, Result};
use crate::schema::SchemaDescriptor;

/// Record of one call made to the mock extractor.
#[derive(Debug, Clone, PartialEq)]
pub struct MockExtractorCall {
    pub urls: Vec<String>,
    pub prompt: String,
    pub schema: Option<SchemaDescriptor>,
}

/// A scripted [`Extractor`] for tests.
///
/// Responses are served in FIFO order; once the script runs dry every call
/// fails with a transport error. Calls are recorded for assertions.
/// Clones share the same script and call log.
#[derive(Clone, Default)]
pub struct MockExtractor {
    script: Arc<Mutex<VecDeque<Result<ExtractionResult>>>>,
    calls: Arc<Mutex<Vec<MockExtractorCall>>>,
}

impl MockExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response built from a raw response body.
    pub fn with_response(self, raw: Value) -> Self {
        let result = ExtractionResult::from_response(raw);
        self.script.lock().unwrap().push_back(result);
        self
    }

    /// Queue a failure.
    pub fn with_error(self, error: ExtractError) -> Self {
        self.script.lock().unwrap().push_back(Err(error));
        self
    }

    /// Calls made so far, oldest first.
    pub fn calls(&self) -> Vec<MockExtractorCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl Extractor for MockExtractor {
    async fn extract(
        &self,
        urls: &[String],
        prompt: &str,
        schema: Option<&SchemaDescriptor>,
    ) -> Result<ExtractionResult> {
        self.calls.lock().unwrap().push(MockExtractorCall {
            urls: urls.to_vec(),
            prompt: prompt.to_string(),
            schema: schema.cloned(),
        });

        self.script.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(ExtractError::Transport(Box::new(std::io::Error::new(
                std::io::ErrorKind::NotConnected,
                "mock extractor script exhausted",
            ))))
        })
    }

    fn name(&self) -> &str {
        "mock"
    }
}
