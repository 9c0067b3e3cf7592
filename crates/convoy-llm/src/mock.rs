//! Mock client for tests.
//!
//! Available to downstream crates through the `testing` feature, mirroring
//! how integration tests exercise the agent loop without a network.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use convoy_types::AiModel;

use crate::client::AiClient;
use crate::error::Result;
use crate::types::{CompletionRequest, CompletionResponse};

/// A scripted [`AiClient`]: returns queued responses in order and records
/// every request it sees.
pub struct MockClient {
    name: String,
    models: Vec<AiModel>,
    responses: Mutex<Vec<CompletionResponse>>,
    requests: Arc<Mutex<Vec<CompletionRequest>>>,
}

impl MockClient {
    /// Create a mock named `name` supporting a single "mock-model".
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            models: vec![AiModel::new("mock-model", 100_000).with_alias("mock")],
            responses: Mutex::new(Vec::new()),
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Queue a response. Responses are returned in queue order; when the
    /// queue empties, an empty end-turn response is returned.
    pub fn push_response(&self, response: CompletionResponse) {
        self.responses.lock().push(response);
    }

    /// Queue a plain text response.
    pub fn push_text(&self, text: impl Into<String>) {
        self.push_response(CompletionResponse {
            text: text.into(),
            ..Default::default()
        });
    }

    /// Requests observed so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl AiClient for MockClient {
    fn name(&self) -> &str {
        &self.name
    }

    fn models(&self) -> &[AiModel] {
        &self.models
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        self.requests.lock().push(request);
        let mut responses = self.responses.lock();
        if responses.is_empty() {
            Ok(CompletionResponse::default())
        } else {
            Ok(responses.remove(0))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;

    #[tokio::test]
    async fn test_mock_returns_queued_responses_in_order() {
        let mock = MockClient::new("mock");
        mock.push_text("first");
        mock.push_text("second");

        let req = CompletionRequest::new("mock-model", vec![ChatMessage::user("hi")], 10);
        assert_eq!(mock.complete(req.clone()).await.unwrap().text, "first");
        assert_eq!(mock.complete(req.clone()).await.unwrap().text, "second");
        // Exhausted queue yields an empty end-turn.
        assert_eq!(mock.complete(req).await.unwrap().text, "");
        assert_eq!(mock.requests().len(), 3);
    }
}
