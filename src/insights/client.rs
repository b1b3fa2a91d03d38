//! The chat completion client used to talk to the language model.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};

use crate::Error;

/// A single prompt for the language model.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Sets the model's role and the shape of its reply.
    pub system_prompt: String,
    /// The task and its data.
    pub user_prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Something that can complete a prompt, usually a hosted language model.
#[async_trait::async_trait]
pub trait InsightModel: Send + Sync {
    /// Send `request` to the model and return the text of its reply.
    ///
    /// # Errors
    /// Returns [Error::AiRequest] if the model could not be reached and
    /// [Error::AiResponse] if it replied with nothing usable.
    async fn complete(&self, request: CompletionRequest) -> Result<String, Error>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl ChatResponse {
    fn into_content(self) -> Result<String, Error> {
        self.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| Error::AiResponse("the response had no content".to_owned()))
    }
}

/// An [InsightModel] backed by an OpenAI compatible chat completions API.
pub struct ChatCompletionClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
}

impl ChatCompletionClient {
    /// Create a client for the API at `base_url`, e.g. "https://api.novita.ai/openai".
    ///
    /// `app_url` is sent as the referer so the provider can attribute usage.
    ///
    /// # Errors
    /// Returns [Error::AiRequest] if the API key or app URL cannot be used as a
    /// header value, or if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: &str, model: &str, app_url: &str) -> Result<Self, Error> {
        let header_value = |value: &str| {
            HeaderValue::from_str(value)
                .map_err(|error| Error::AiRequest(format!("invalid header value: {error}")))
        };

        let mut headers = HeaderMap::new();
        let mut authorization = header_value(&format!("Bearer {api_key}"))?;
        authorization.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, authorization);
        headers.insert("HTTP-Referer", header_value(app_url)?);
        headers.insert("X-Title", HeaderValue::from_static("ExpenseTracker AI"));

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|error| Error::AiRequest(format!("could not build HTTP client: {error}")))?;

        Ok(Self {
            http,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            model: model.to_owned(),
        })
    }
}

#[async_trait::async_trait]
impl InsightModel for ChatCompletionClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, Error> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &request.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: &request.user_prompt,
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(
            "Sending chat completion request to {} with model {}",
            self.endpoint,
            self.model
        );

        let response = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .and_then(|response| response.error_for_status())
            .map_err(|error| Error::AiRequest(error.to_string()))?;

        let response: ChatResponse = response
            .json()
            .await
            .map_err(|error| Error::AiResponse(format!("could not parse response: {error}")))?;

        response.into_content()
    }
}
