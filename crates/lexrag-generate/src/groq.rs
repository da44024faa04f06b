use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::{Duration, Instant};
use tracing::debug;

use lexrag_core::config::GenerationSettings;
use lexrag_core::traits::Generator;
use lexrag_core::{Error, Result};

const SYSTEM_PROMPT: &str = "You are a careful legal research assistant. Answer clearly, cite the provided sources when they are relevant, and say so when the law is unsettled.";

/// Chat-completion client for Groq or any OpenAI-compatible endpoint.
pub struct GroqClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
}

impl GroqClient {
    pub fn new(api_key: String, settings: &GenerationSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::GenerationUnavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", settings.base_url.trim_end_matches('/')),
            api_key,
            model: settings.model.clone(),
            temperature: settings.temperature,
            max_tokens: settings.max_tokens,
        })
    }

    /// Reads the API key from the variable named by `settings.api_key_env`.
    pub fn from_settings(settings: &GenerationSettings) -> Result<Self> {
        let api_key = env::var(&settings.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| Error::GenerationUnavailable(format!("{} not set", settings.api_key_env)))?;
        Self::new(api_key, settings)
    }

    pub fn model(&self) -> &str { &self.model }

    fn request<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: prompt },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: usize,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

fn parse_completion(body: &str) -> Result<String> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| Error::GenerationUnavailable(format!("failed to parse completion: {e}")))?;
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| Error::GenerationUnavailable("completion has no choices".into()))
}

#[async_trait]
impl Generator for GroqClient {
    fn name(&self) -> &str { "groq" }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let start = Instant::now();
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.request(prompt))
            .send()
            .await
            .map_err(|e| Error::GenerationUnavailable(format!("request failed: {e}")))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| Error::GenerationUnavailable(format!("failed to read response: {e}")))?;
        if !status.is_success() {
            return Err(Error::GenerationUnavailable(format!("API error {status}: {body}")));
        }
        let text = parse_completion(&body)?;
        debug!(model = %self.model, ms = start.elapsed().as_millis() as u64, chars = text.len(), "completion received");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(base_url: &str) -> GenerationSettings {
        GenerationSettings { base_url: base_url.to_string(), timeout_secs: 2, ..GenerationSettings::default() }
    }

    #[test]
    fn request_carries_system_and_user_messages() {
        let client = GroqClient::new("k".into(), &settings("https://api.groq.com/openai/v1/")).unwrap();
        assert_eq!(client.endpoint, "https://api.groq.com/openai/v1/chat/completions");
        let json = serde_json::to_value(client.request("What is negligence?")).unwrap();
        assert_eq!(json["model"], "llama-3.1-8b-instant");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "What is negligence?");
        assert_eq!(json["max_tokens"], 1024);
    }

    #[test]
    fn parses_first_choice() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Duty, breach, causation, damages."}}],"usage":{"prompt_tokens":3}}"#;
        assert_eq!(parse_completion(body).unwrap(), "Duty, breach, causation, damages.");
    }

    #[test]
    fn empty_choices_and_bad_json_are_unavailable() {
        assert!(matches!(parse_completion(r#"{"choices":[]}"#), Err(Error::GenerationUnavailable(_))));
        assert!(matches!(parse_completion("<html>"), Err(Error::GenerationUnavailable(_))));
    }

    #[test]
    fn missing_api_key_is_unavailable() {
        let s = GenerationSettings { api_key_env: "LEXRAG_TEST_UNSET_KEY".into(), ..GenerationSettings::default() };
        assert!(matches!(GroqClient::from_settings(&s), Err(Error::GenerationUnavailable(_))));
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_unavailable() {
        let client = GroqClient::new("k".into(), &settings("http://127.0.0.1:9/v1")).unwrap();
        let err = client.generate("hello").await.unwrap_err();
        assert!(matches!(err, Error::GenerationUnavailable(_)), "got {err:?}");
    }
}
