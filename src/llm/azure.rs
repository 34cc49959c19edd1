//! Azure OpenAI chat completions adapter.

use crate::config::AzureOpenAiSettings;
use crate::llm::{ChatClientError, ChatCompletion, ChatMessage};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Chat completion client backed by an Azure OpenAI deployment.
///
/// Cheap to clone; concurrent pipeline workers share the underlying
/// connection pool.
#[derive(Clone)]
pub struct AzureOpenAiChat {
    http: Client,
    endpoint: String,
    api_key: String,
    deployment: String,
    api_version: String,
}

impl AzureOpenAiChat {
    /// Construct a client from the `azure_openai` settings section.
    pub fn new(settings: &AzureOpenAiSettings) -> Self {
        let http = Client::builder()
            .user_agent("docbrief/chat")
            .build()
            .expect("Failed to construct reqwest::Client for chat completions");
        Self {
            http,
            endpoint: settings.endpoint.trim_end_matches('/').to_string(),
            api_key: settings.api_key.clone(),
            deployment: settings.deployment.clone(),
            api_version: settings.api_version.clone(),
        }
    }

    fn completions_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions",
            self.endpoint, self.deployment
        )
    }
}

/// Chat completions request body.
///
/// Serialized from a typed struct rather than a `serde_json::Value`: `Value`
/// holds every number as f64, which would widen the f32 temperature on the
/// wire (0.2 becomes 0.20000000298023224).
#[derive(Debug, Serialize)]
struct CompletionRequest {
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl ChatCompletion for AzureOpenAiChat {
    async fn complete(
        &self,
        messages: Vec<ChatMessage>,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<String, ChatClientError> {
        let payload = CompletionRequest {
            messages,
            temperature,
            max_tokens,
        };

        let response = self
            .http
            .post(self.completions_url())
            .query(&[("api-version", self.api_version.as_str())])
            .header("api-key", &self.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            tracing::error!(%status, deployment = %self.deployment, "Chat completion failed");
            return Err(ChatClientError::UnexpectedStatus { status, body });
        }

        let body: CompletionResponse = response.json().await.map_err(|error| {
            ChatClientError::MalformedResponse(format!("failed to decode chat response: {error}"))
        })?;

        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();

        if content.is_empty() {
            return Err(ChatClientError::MalformedResponse(
                "chat response contained no reply text".into(),
            ));
        }

        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};
    use serde_json::json;

    fn test_client(base_url: &str) -> AzureOpenAiChat {
        AzureOpenAiChat {
            http: Client::builder()
                .user_agent("docbrief-test")
                .build()
                .expect("client"),
            endpoint: base_url.trim_end_matches('/').to_string(),
            api_key: "test-key".into(),
            deployment: "gpt-test".into(),
            api_version: "2024-06-01".into(),
        }
    }

    #[test]
    fn request_body_serializes_temperature_exactly() {
        let request = CompletionRequest {
            messages: vec![ChatMessage::user("hi")],
            temperature: 0.2,
            max_tokens: 300,
        };

        let body = serde_json::to_string(&request).expect("serialize");

        assert_eq!(
            body,
            r#"{"messages":[{"role":"user","content":"hi"}],"temperature":0.2,"max_tokens":300}"#
        );
    }

    #[tokio::test]
    async fn complete_sends_deployment_request_and_returns_reply() {
        let server = MockServer::start_async().await;
        let client = test_client(&server.base_url());

        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/gpt-test/chat/completions")
                    .query_param("api-version", "2024-06-01")
                    .header("api-key", "test-key")
                    .json_body_partial(
                        r#"{
                            "temperature": 0.2,
                            "max_tokens": 300,
                            "messages": [
                                {"role": "system", "content": "be brief"},
                                {"role": "user", "content": "summarize this"}
                            ]
                        }"#,
                    );
                then.status(200).json_body(json!({
                    "choices": [
                        {"message": {"role": "assistant", "content": "A short reply"}}
                    ]
                }));
            })
            .await;

        let reply = client
            .complete(
                vec![
                    ChatMessage::system("be brief"),
                    ChatMessage::user("summarize this"),
                ],
                300,
                0.2,
            )
            .await
            .expect("completion");

        mock.assert();
        assert_eq!(reply, "A short reply");
    }

    #[tokio::test]
    async fn complete_surfaces_error_status_with_body() {
        let server = MockServer::start_async().await;
        let client = test_client(&server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/gpt-test/chat/completions");
                then.status(429).body("rate limited");
            })
            .await;

        let error = client
            .complete(vec![ChatMessage::user("hello")], 300, 0.2)
            .await
            .expect_err("error response");

        match error {
            ChatClientError::UnexpectedStatus { status, body } => {
                assert_eq!(status.as_u16(), 429);
                assert_eq!(body, "rate limited");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[tokio::test]
    async fn complete_rejects_empty_choices() {
        let server = MockServer::start_async().await;
        let client = test_client(&server.base_url());

        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/openai/deployments/gpt-test/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let error = client
            .complete(vec![ChatMessage::user("hello")], 300, 0.2)
            .await
            .expect_err("empty choices rejected");

        assert!(matches!(error, ChatClientError::MalformedResponse(_)));
    }
}
