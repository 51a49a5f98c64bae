//! Hand-rolled mock capabilities shared by the integration tests.
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};

use docuchat::{
    ChatModel, ChatModelFactory, ChatbotError, Embedder, Message, ModelConfig, TextExtractor,
    ToolSpec,
};

/// Deterministic embedder: the same text always maps to the same vector.
pub struct MockEmbedder {
    dimension: usize,
}

impl MockEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    pub fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0; self.dimension];
        for (i, byte) in text.bytes().enumerate() {
            vector[(i + byte as usize) % self.dimension] += byte as f32 / 255.0;
        }
        vector
    }
}

#[async_trait]
impl Embedder for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatbotError> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ChatbotError> {
        Ok(self.vectorize(text))
    }
}

/// Fails the first `failures` batch embeddings with a transient error.
pub struct FlakyEmbedder {
    inner: MockEmbedder,
    failures_left: Mutex<u32>,
}

impl FlakyEmbedder {
    pub fn new(dimension: usize, failures: u32) -> Self {
        Self {
            inner: MockEmbedder::new(dimension),
            failures_left: Mutex::new(failures),
        }
    }
}

#[async_trait]
impl Embedder for FlakyEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatbotError> {
        let mut left = self.failures_left.lock().await;
        if *left > 0 {
            *left -= 1;
            return Err(ChatbotError::Provider("temporary outage".to_string()));
        }
        drop(left);
        self.inner.embed(texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, ChatbotError> {
        self.inner.embed_query(text).await
    }
}

/// Produces document vectors of the right size but query vectors of the
/// wrong size, to force a search-side dimension failure.
pub struct WrongDimensionEmbedder {
    inner: MockEmbedder,
    dimension: usize,
}

impl WrongDimensionEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            inner: MockEmbedder::new(dimension),
            dimension,
        }
    }
}

#[async_trait]
impl Embedder for WrongDimensionEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ChatbotError> {
        self.inner.embed(texts).await
    }

    async fn embed_query(&self, _text: &str) -> Result<Vec<f32>, ChatbotError> {
        Ok(vec![0.0; self.dimension + 1])
    }
}

/// Chat model that replays a scripted sequence of responses and records
/// every prompt it was given.
pub struct MockChatModel {
    script: Mutex<VecDeque<Message>>,
    prompts: Mutex<Vec<(Vec<Message>, bool)>>,
}

impl MockChatModel {
    pub fn scripted(responses: Vec<Message>) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(responses.into()),
            prompts: Mutex::new(Vec::new()),
        })
    }

    pub async fn push_response(&self, response: Message) {
        self.script.lock().await.push_back(response);
    }

    /// Recorded `(prompt, tools_offered)` pairs, in invocation order.
    pub async fn recorded(&self) -> Vec<(Vec<Message>, bool)> {
        self.prompts.lock().await.clone()
    }
}

#[async_trait]
impl ChatModel for MockChatModel {
    async fn invoke(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<Message, ChatbotError> {
        self.prompts
            .lock()
            .await
            .push((messages.to_vec(), !tools.is_empty()));
        self.script
            .lock()
            .await
            .pop_front()
            .ok_or_else(|| ChatbotError::Provider("mock script exhausted".to_string()))
    }

    async fn stream(
        &self,
        messages: &[Message],
        tools: &[ToolSpec],
    ) -> Result<mpsc::Receiver<Result<String, ChatbotError>>, ChatbotError> {
        let response = self.invoke(messages, tools).await?;
        let content = response.content().to_string();
        let (tx, rx) = mpsc::channel(8);
        tokio::spawn(async move {
            let chars: Vec<char> = content.chars().collect();
            for piece in chars.chunks(8) {
                let fragment: String = piece.iter().collect();
                if tx.send(Ok(fragment)).await.is_err() {
                    return;
                }
            }
        });
        Ok(rx)
    }
}

/// Hands out pre-built mock models, one per `build` call.
pub struct MockFactory {
    models: Mutex<VecDeque<Arc<MockChatModel>>>,
}

impl MockFactory {
    pub fn new(models: Vec<Arc<MockChatModel>>) -> Self {
        Self {
            models: Mutex::new(models.into()),
        }
    }

    pub async fn add_model(&self, model: Arc<MockChatModel>) {
        self.models.lock().await.push_back(model);
    }
}

#[async_trait]
impl ChatModelFactory for MockFactory {
    async fn build(&self, _config: &ModelConfig) -> Result<Arc<dyn ChatModel>, ChatbotError> {
        self.models
            .lock()
            .await
            .pop_front()
            .map(|model| model as Arc<dyn ChatModel>)
            .ok_or_else(|| ChatbotError::InvalidCredentials("no model configured".to_string()))
    }
}

/// In-memory extractor: unknown paths fail with an extraction error.
#[derive(Default)]
pub struct MapExtractor {
    pages: HashMap<PathBuf, Vec<String>>,
}

impl MapExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, path: &str, pages: Vec<&str>) -> Self {
        self.pages.insert(
            PathBuf::from(path),
            pages.into_iter().map(|p| p.to_string()).collect(),
        );
        self
    }
}

#[async_trait]
impl TextExtractor for MapExtractor {
    async fn extract(&self, source: &Path) -> Result<Vec<String>, ChatbotError> {
        self.pages
            .get(source)
            .cloned()
            .ok_or_else(|| ChatbotError::Extraction {
                path: source.display().to_string(),
                reason: "no such source".to_string(),
            })
    }
}

/// Panics for one configured path; all others delegate to the inner map.
pub struct PanickingExtractor {
    inner: MapExtractor,
    panic_on: PathBuf,
}

impl PanickingExtractor {
    pub fn new(inner: MapExtractor, panic_on: &str) -> Self {
        Self {
            inner,
            panic_on: PathBuf::from(panic_on),
        }
    }
}

#[async_trait]
impl TextExtractor for PanickingExtractor {
    async fn extract(&self, source: &Path) -> Result<Vec<String>, ChatbotError> {
        if source == self.panic_on {
            panic!("extractor crashed");
        }
        self.inner.extract(source).await
    }
}
