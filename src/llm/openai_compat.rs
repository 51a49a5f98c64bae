//! Provider for OpenAI-compatible HTTP endpoints (chat + embeddings).

use std::sync::Arc;

use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde_json::{json, Value};
use tokio::sync::mpsc;

use crate::config::{EmbeddingConfig, ModelConfig};
use crate::errors::ChatbotError;

use super::provider::{ChatModel, ChatModelFactory, Embedder};
use super::types::{Message, ToolCall, ToolSpec};

#[derive(Clone)]
pub struct OpenAiCompatProvider {
    config: ModelConfig,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(config: ModelConfig) -> Self {
        Self {
            config: ModelConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client: Client::new(),
        }
    }

    /// Probe the endpoint; used by the factory to translate
    /// model-initialization failures before any turn runs.
    pub async fn health_check(&self) -> Result<(), ChatbotError> {
        let url = format!("{}/v1/models", self.config.base_url);
        let response = authorize(self.client.get(&url), self.config.api_key.as_deref())
            .send()
            .await
            .map_err(ChatbotError::provider)?;
        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status, "model listing failed"));
        }
        Ok(())
    }

    fn chat_body(&self, messages: &[Message], tools: &[ToolSpec], stream: bool) -> Value {
        let mut body = json!({
            "model": self.config.model,
            "messages": messages.iter().map(to_wire).collect::<Vec<_>>(),
            "stream": stream,
        });
        if let Some(obj) = body.as_object_mut() {
            if !tools.is_empty() {
                obj.insert("tools".to_string(), tools_to_wire(tools));
            }
            if let Some(t) = self.config.temperature {
                obj.insert("temperature".to_string(), json!(t));
            }
            if let Some(m) = self.config.max_tokens {
                obj.insert("max_tokens".to_string(), json!(m));
            }
        }
        body
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatProvider {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ChatbotError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = self.chat_body(messages, tools, false);

        let response = authorize(self.client.post(&url), self.config.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(ChatbotError::provider)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let payload: Value = response.json().await.map_err(ChatbotError::provider)?;
        parse_assistant_message(&payload)
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<mpsc::Receiver<Result<String, ChatbotError>>, ChatbotError> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let body = self.chat_body(messages, tools, true);

        let response = authorize(self.client.post(&url), self.config.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(ChatbotError::provider)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let (tx, rx) = mpsc::channel(32);
        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            while let Some(item) = stream.next().await {
                match item {
                    Ok(bytes) => {
                        let chunk = String::from_utf8_lossy(&bytes);
                        for line in chunk.lines() {
                            let line = line.trim();
                            if line.is_empty() {
                                continue;
                            }
                            if line == "data: [DONE]" {
                                return;
                            }
                            if let Some(data) = line.strip_prefix("data: ") {
                                if let Ok(parsed) = serde_json::from_str::<Value>(data) {
                                    if let Some(content) =
                                        parsed["choices"][0]["delta"]["content"].as_str()
                                    {
                                        if !content.is_empty()
                                            && tx.send(Ok(content.to_string())).await.is_err()
                                        {
                                            return;
                                        }
                                    }
                                }
                            }
                        }
                    }
                    Err(err) => {
                        let _ = tx.send(Err(ChatbotError::provider(err))).await;
                        return;
                    }
                }
            }
        });

        Ok(rx)
    }
}

/// Embedding access over the `/v1/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiCompatEmbedder {
    config: EmbeddingConfig,
    client: Client,
}

impl OpenAiCompatEmbedder {
    pub fn new(config: EmbeddingConfig) -> Self {
        Self {
            config: EmbeddingConfig {
                base_url: config.base_url.trim_end_matches('/').to_string(),
                ..config
            },
            client: Client::new(),
        }
    }
}

#[async_trait]
impl Embedder for OpenAiCompatEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatbotError> {
        let url = format!("{}/v1/embeddings", self.config.base_url);
        let body = json!({
            "model": self.config.model,
            "input": texts,
        });

        let response = authorize(self.client.post(&url), self.config.api_key.as_deref())
            .json(&body)
            .send()
            .await
            .map_err(ChatbotError::provider)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(status_error(status, &text));
        }

        let payload: Value = response.json().await.map_err(ChatbotError::provider)?;
        let data = payload["data"]
            .as_array()
            .ok_or_else(|| ChatbotError::Provider("embeddings response missing data".into()))?;

        let mut embeddings = Vec::with_capacity(data.len());
        for item in data {
            let values = item["embedding"].as_array().ok_or_else(|| {
                ChatbotError::Provider("embeddings entry missing vector".into())
            })?;
            embeddings.push(
                values
                    .iter()
                    .filter_map(|v| v.as_f64().map(|f| f as f32))
                    .collect(),
            );
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ChatbotError> {
        let text = text.to_string();
        let mut vectors = self.embed(std::slice::from_ref(&text)).await?;
        vectors
            .pop()
            .ok_or_else(|| ChatbotError::Provider("embeddings response was empty".into()))
    }
}

/// Builds `OpenAiCompatProvider` handles, probing the endpoint once so that
/// credential problems surface at construction time.
pub struct OpenAiCompatFactory;

#[async_trait]
impl ChatModelFactory for OpenAiCompatFactory {
    async fn build(&self, config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ChatbotError> {
        let provider = OpenAiCompatProvider::new(config.clone());
        provider.health_check().await?;
        Ok(Arc::new(provider))
    }
}

fn authorize(request: RequestBuilder, api_key: Option<&str>) -> RequestBuilder {
    match api_key {
        Some(key) => request.bearer_auth(key),
        None => request,
    }
}

/// Error for a non-success response status.
fn status_error(status: StatusCode, detail: &str) -> ChatbotError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return ChatbotError::InvalidCredentials(format!(
            "provider rejected credentials ({status})"
        ));
    }
    ChatbotError::Provider(format!("{status}: {detail}"))
}

fn to_wire(message: &Message) -> Value {
    match message {
        Message::System { content } => json!({"role": "system", "content": content}),
        Message::User { content } => json!({"role": "user", "content": content}),
        Message::Assistant {
            content,
            tool_calls,
        } => {
            let mut wire = json!({"role": "assistant", "content": content});
            if !tool_calls.is_empty() {
                wire["tool_calls"] = Value::Array(
                    tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments.to_string(),
                                },
                            })
                        })
                        .collect(),
                );
            }
            wire
        }
        Message::Tool { content, call_id } => {
            json!({"role": "tool", "tool_call_id": call_id, "content": content})
        }
    }
}

fn tools_to_wire(tools: &[ToolSpec]) -> Value {
    Value::Array(
        tools
            .iter()
            .map(|tool| {
                json!({
                    "type": "function",
                    "function": {
                        "name": tool.name,
                        "description": tool.description,
                        "parameters": tool.parameters,
                    },
                })
            })
            .collect(),
    )
}

fn parse_assistant_message(payload: &Value) -> Result<Message, ChatbotError> {
    let message = &payload["choices"][0]["message"];
    if message.is_null() {
        return Err(ChatbotError::Provider(
            "chat response missing choices[0].message".into(),
        ));
    }

    let content = message["content"].as_str().unwrap_or_default().to_string();
    let mut tool_calls = Vec::new();
    if let Some(calls) = message["tool_calls"].as_array() {
        for call in calls {
            let id = call["id"].as_str().unwrap_or_default().to_string();
            let name = call["function"]["name"].as_str().unwrap_or_default();
            let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
            let arguments = serde_json::from_str(raw_args)
                .unwrap_or_else(|_| Value::String(raw_args.to_string()));
            tool_calls.push(ToolCall {
                id,
                name: name.to_string(),
                arguments,
            });
        }
    }
    Ok(Message::assistant_with_tools(content, tool_calls))
}
