//! Fake generative client for testing.
//!
//! Returns deterministic responses based on prompt substring matching,
//! so classification tests run without network access or API costs.

use super::{GenerationConstraints, GenerativeClient, LlmError};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

/// A fake generative client for testing.
///
/// Responses are matched by checking if the prompt contains a registered
/// substring. If no match is found, the default response (if any) is used.
/// The constraints of the most recent call are recorded so tests can assert
/// on the fast-pass output contract.
#[derive(Debug)]
pub struct FakeClient {
    /// Map of prompt substring -> response.
    responses: RwLock<HashMap<String, String>>,
    /// Default response if no match found.
    default_response: Option<String>,
    /// When set, every call fails with this message.
    failure: Option<String>,
    /// Constraints passed to the most recent `complete` call.
    last_constraints: RwLock<Option<GenerationConstraints>>,
}

impl Default for FakeClient {
    /// The default answer is "D": a client nobody configured must never
    /// produce a SAFE verdict. Tests that want SAFE say so with
    /// `with_response`/`with_default_response`.
    fn default() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            default_response: Some("D".to_string()),
            failure: None,
            last_constraints: RwLock::new(None),
        }
    }
}

impl FakeClient {
    /// Create a new FakeClient with no registered responses.
    pub fn new() -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            default_response: None,
            failure: None,
            last_constraints: RwLock::new(None),
        }
    }

    /// Create a FakeClient that returns a specific response for prompts
    /// containing a substring.
    pub fn with_response(prompt_contains: &str, response: &str) -> Self {
        let mut client = Self::new();
        client.add_response(prompt_contains, response);
        client
    }

    /// Add a response for prompts containing a specific substring.
    pub fn add_response(&mut self, prompt_contains: &str, response: &str) {
        self.responses
            .write()
            .unwrap()
            .insert(prompt_contains.to_string(), response.to_string());
    }

    /// Set the default response when no pattern matches.
    pub fn with_default_response(mut self, response: &str) -> Self {
        self.default_response = Some(response.to_string());
        self
    }

    /// Create a FakeClient whose every call fails.
    pub fn failing(message: &str) -> Self {
        Self {
            responses: RwLock::new(HashMap::new()),
            default_response: None,
            failure: Some(message.to_string()),
            last_constraints: RwLock::new(None),
        }
    }

    /// Constraints from the most recent call, if any.
    pub fn last_constraints(&self) -> Option<GenerationConstraints> {
        self.last_constraints.read().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeClient for FakeClient {
    async fn complete(
        &self,
        prompt: &str,
        constraints: &GenerationConstraints,
    ) -> Result<String, LlmError> {
        *self.last_constraints.write().unwrap() = Some(constraints.clone());

        if let Some(message) = &self.failure {
            return Err(LlmError::RequestFailed(message.clone()));
        }

        let responses = self.responses.read().unwrap();

        let prompt_lower = prompt.to_lowercase();
        for (pattern, response) in responses.iter() {
            if prompt_lower.contains(&pattern.to_lowercase()) {
                return Ok(response.clone());
            }
        }

        match &self.default_response {
            Some(response) => Ok(response.clone()),
            None => Err(LlmError::RequestFailed(format!(
                "FakeClient: no response configured for prompt (first 100 chars): {}",
                prompt.chars().take(100).collect::<String>()
            ))),
        }
    }

    fn provider_name(&self) -> &'static str {
        "fake"
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_matching() {
        let client = FakeClient::with_response("hello", "world");
        let result = client
            .complete("Say hello to the user", &GenerationConstraints::fast())
            .await
            .unwrap();
        assert_eq!(result, "world");
    }

    #[tokio::test]
    async fn test_case_insensitive() {
        let client = FakeClient::with_response("HELLO", "world");
        let result = client
            .complete("hello there", &GenerationConstraints::fast())
            .await
            .unwrap();
        assert_eq!(result, "world");
    }

    #[tokio::test]
    async fn test_no_match_errors() {
        let client = FakeClient::new();
        let result = client
            .complete("random prompt", &GenerationConstraints::fast())
            .await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_default_answer_is_danger_token() {
        let client = FakeClient::default();
        let result = client
            .complete("classify this item", &GenerationConstraints::fast())
            .await
            .unwrap();
        assert_eq!(result, "D");
    }

    #[tokio::test]
    async fn test_records_constraints() {
        let client = FakeClient::default();
        let _ = client
            .complete("anything", &GenerationConstraints::detailed())
            .await;
        assert_eq!(
            client.last_constraints(),
            Some(GenerationConstraints::detailed())
        );
    }

    #[tokio::test]
    async fn test_failing_client() {
        let client = FakeClient::failing("boom");
        let result = client
            .complete("anything", &GenerationConstraints::fast())
            .await;
        assert!(matches!(result, Err(LlmError::RequestFailed(_))));
    }
}
