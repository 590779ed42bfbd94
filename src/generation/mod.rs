//! Text generation client layer
//!
//! A generator turns one system prompt + user prompt into raw text.
//! It knows nothing about the structured output the agents expect;
//! retry of throttled calls lives in [`retry`].

use crate::error::{PipelineError, ServiceErrorKind};
use crate::Result;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

pub mod gemini;
pub mod retry;

pub use gemini::GeminiClient;
pub use retry::{classify_failure, complete_with_retry, RetryPolicy};

/// Trait for a single-shot text completion service
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String>;
}

/// One scripted reply of the [`MockGenerator`]
#[derive(Debug, Clone)]
pub enum Scripted {
    Text(String),
    Fail(ServiceErrorKind, String),
}

/// A call observed by the [`MockGenerator`]
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub marker: Option<String>,
    pub system_prompt: String,
    pub user_prompt: String,
    pub max_output_tokens: u32,
}

/// Scripted generator for development & testing
///
/// Replies are keyed by a marker substring of the system prompt (each agent's
/// system prompt names its role). Queued replies are consumed in order; the
/// last one repeats once the queue is down to a single entry.
#[derive(Default)]
pub struct MockGenerator {
    scripts: Mutex<Vec<(String, VecDeque<Scripted>)>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl MockGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always answer prompts containing `marker` with `text`
    pub fn respond_to(self, marker: &str, text: impl Into<String>) -> Self {
        self.script(marker, vec![Scripted::Text(text.into())])
    }

    /// Always fail prompts containing `marker`
    pub fn fail_for(self, marker: &str, kind: ServiceErrorKind, message: &str) -> Self {
        self.script(marker, vec![Scripted::Fail(kind, message.to_string())])
    }

    pub fn script(self, marker: &str, replies: Vec<Scripted>) -> Self {
        lock(&self.scripts).push((marker.to_string(), replies.into()));
        self
    }

    pub fn call_count(&self) -> usize {
        lock(&self.calls).len()
    }

    pub fn calls_for(&self, marker: &str) -> Vec<RecordedCall> {
        lock(&self.calls)
            .iter()
            .filter(|call| call.marker.as_deref() == Some(marker))
            .cloned()
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[async_trait]
impl TextGenerator for MockGenerator {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        max_output_tokens: u32,
    ) -> Result<String> {
        let reply = {
            let mut scripts = lock(&self.scripts);
            scripts
                .iter_mut()
                .find(|(marker, _)| system_prompt.contains(marker.as_str()))
                .map(|(marker, queue)| {
                    let reply = if queue.len() > 1 {
                        queue.pop_front()
                    } else {
                        queue.front().cloned()
                    };
                    (marker.clone(), reply)
                })
        };

        lock(&self.calls).push(RecordedCall {
            marker: reply.as_ref().map(|(marker, _)| marker.clone()),
            system_prompt: system_prompt.to_string(),
            user_prompt: user_prompt.to_string(),
            max_output_tokens,
        });

        match reply {
            Some((_, Some(Scripted::Text(text)))) => Ok(text),
            Some((_, Some(Scripted::Fail(kind, message)))) => {
                Err(PipelineError::Service { kind, message })
            }
            _ => Err(PipelineError::permanent("No scripted response for prompt")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_generator_replays_queue_then_repeats_last() {
        let generator = MockGenerator::new().script(
            "Analyst",
            vec![
                Scripted::Fail(ServiceErrorKind::Transient, "429".to_string()),
                Scripted::Text("first".to_string()),
            ],
        );

        assert!(generator.complete("Analyst", "u", 10).await.is_err());
        assert_eq!(generator.complete("Analyst", "u", 10).await.unwrap(), "first");
        assert_eq!(generator.complete("Analyst", "u", 10).await.unwrap(), "first");
        assert_eq!(generator.calls_for("Analyst").len(), 3);
    }

    #[tokio::test]
    async fn test_mock_generator_unscripted_prompt_is_permanent_failure() {
        let generator = MockGenerator::new();
        let err = generator.complete("Nobody", "u", 10).await.unwrap_err();
        assert!(!err.is_retryable());
        assert_eq!(generator.call_count(), 1);
    }
}
