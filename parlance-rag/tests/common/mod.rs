//! Deterministic embedders and language models shared by the integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parlance_rag::{Document, EmbeddingProvider, LanguageModel, RagError, Result};

/// Counts vocabulary words; the last axis is a constant so no vector is zero.
pub struct KeywordEmbedder {
    vocabulary: Vec<&'static str>,
    pub calls: AtomicUsize,
    pub batches: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(vocabulary: &[&'static str]) -> Self {
        Self {
            vocabulary: vocabulary.to_vec(),
            calls: AtomicUsize::new(0),
            batches: AtomicUsize::new(0),
        }
    }

    pub fn vector(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        let mut v: Vec<f32> =
            self.vocabulary.iter().map(|word| lower.matches(word).count() as f32).collect();
        v.push(0.1);
        v
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.vector(text))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        self.batches.fetch_add(1, Ordering::SeqCst);
        self.calls.fetch_add(texts.len(), Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.vocabulary.len() + 1
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// Fails any text containing `poison`.
pub struct PoisonedEmbedder {
    inner: KeywordEmbedder,
    poison: &'static str,
}

impl PoisonedEmbedder {
    pub fn new(vocabulary: &[&'static str], poison: &'static str) -> Self {
        Self { inner: KeywordEmbedder::new(vocabulary), poison }
    }
}

#[async_trait]
impl EmbeddingProvider for PoisonedEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        if text.contains(self.poison) {
            return Err(RagError::EmbeddingUnavailable {
                provider: "poisoned".into(),
                message: "connection reset".into(),
            });
        }
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// Sleeps before answering, for timeout and cancellation tests.
pub struct SlowEmbedder {
    inner: KeywordEmbedder,
    delay: Duration,
}

impl SlowEmbedder {
    pub fn new(vocabulary: &[&'static str], delay: Duration) -> Self {
        Self { inner: KeywordEmbedder::new(vocabulary), delay }
    }
}

#[async_trait]
impl EmbeddingProvider for SlowEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        tokio::time::sleep(self.delay).await;
        self.inner.embed(text).await
    }

    fn dimensions(&self) -> usize {
        self.inner.dimensions()
    }

    fn model_name(&self) -> &str {
        "keyword"
    }
}

/// Reports `dimensions` but returns vectors one longer.
pub struct WrongDimsEmbedder {
    pub dimensions: usize,
}

#[async_trait]
impl EmbeddingProvider for WrongDimsEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Ok(vec![1.0; self.dimensions + 1])
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model_name(&self) -> &str {
        "wrong-dims"
    }
}

/// Answers with the question line of the prompt and records every prompt.
#[derive(Default)]
pub struct EchoModel {
    pub prompts: Mutex<Vec<String>>,
    pub rewrites: Mutex<HashMap<String, String>>,
}

impl EchoModel {
    /// Answer condense prompts for `follow_up` with `standalone`.
    pub fn rewrite(self, follow_up: &str, standalone: &str) -> Self {
        self.rewrites.lock().unwrap().insert(follow_up.to_string(), standalone.to_string());
        self
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl LanguageModel for EchoModel {
    async fn generate(&self, prompt: &str) -> Result<String> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(follow_up) = prompt
            .lines()
            .find_map(|line| line.strip_prefix("Follow-up question: "))
        {
            let rewrites = self.rewrites.lock().unwrap();
            return Ok(rewrites.get(follow_up).cloned().unwrap_or_default());
        }
        let question = prompt
            .lines()
            .rev()
            .find_map(|line| line.strip_prefix("Question: "))
            .unwrap_or_default();
        Ok(format!("answer to: {question}"))
    }

    fn model_name(&self) -> &str {
        "echo"
    }
}

/// Always fails with a retryable generation error.
pub struct FailingModel;

#[async_trait]
impl LanguageModel for FailingModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        Err(RagError::GenerationUnavailable {
            model: "failing".into(),
            message: "model not loaded".into(),
        })
    }

    fn model_name(&self) -> &str {
        "failing"
    }
}

/// Never answers until the test runtime's clock passes the timeout.
pub struct StalledModel;

#[async_trait]
impl LanguageModel for StalledModel {
    async fn generate(&self, _prompt: &str) -> Result<String> {
        tokio::time::sleep(Duration::from_secs(3600)).await;
        Ok(String::new())
    }

    fn model_name(&self) -> &str {
        "stalled"
    }
}

pub const VOCABULARY: &[&str] = &["rust", "garden", "ocean", "music"];

/// One short document per topic.
pub fn corpus() -> Vec<Document> {
    vec![
        Document::new("rust.md", "Rust ownership rules keep rust programs memory safe."),
        Document::new("garden.md", "A garden needs sun, water and patience."),
        Document::new("ocean.md", "The ocean covers most of the planet."),
        Document::new("music.md", "Music theory explains scales and chords."),
    ]
}
