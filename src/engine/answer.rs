// chatsql Engine — Answer Synthesizer
// Question + query + execution result → natural-language answer, streamed
// as text fragments in generation order.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{FragmentStream, TextGenerator};
use crate::atoms::types::ExecutionResult;
use crate::engine::prompts;
use futures::{Stream, StreamExt};
use log::{debug, info, warn};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pub struct AnswerSynthesizer {
    generator: Arc<dyn TextGenerator>,
    model: String,
    temperature: f64,
    explain_failures: bool,
}

impl AnswerSynthesizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
        temperature: f64,
        explain_failures: bool,
    ) -> Self {
        Self { generator, model: model.into(), temperature, explain_failures }
    }

    /// Start generating the answer. Returns as soon as the provider has
    /// accepted the request; fragments are pulled from the returned stream.
    pub async fn synthesize_answer(
        &self,
        history: &str,
        question: &str,
        schema: &str,
        query: &str,
        result: &ExecutionResult,
    ) -> EngineResult<AnswerStream> {
        let prompt = match result {
            ExecutionResult::Failed(error) if self.explain_failures => {
                debug!("[answer] Using failure prompt");
                prompts::failure_prompt(schema, history, question, query, error)
            }
            _ => prompts::answer_prompt(schema, history, question, query, &result.as_prompt_text()),
        };

        let inner = self
            .generator
            .complete_stream(&prompt, &self.model, Some(self.temperature))
            .await
            .map_err(|e| e.into_engine(&self.model))?;
        info!("[answer] Streaming from {} via {}", self.model, self.generator.name());
        Ok(AnswerStream::new(inner, &self.model))
    }
}

// ── AnswerStream ───────────────────────────────────────────────────────────────

/// Lazy, forward-only sequence of answer fragments.
///
/// A provider failure is yielded once as `EngineError::Generation` and ends
/// the sequence; fragments already yielded remain valid.
pub struct AnswerStream {
    inner: FragmentStream,
    model: String,
    done: bool,
}

impl AnswerStream {
    pub fn new(inner: FragmentStream, model: &str) -> Self {
        Self { inner, model: model.to_string(), done: false }
    }

    /// Drain every remaining fragment into one string.
    pub async fn collect_text(mut self) -> EngineResult<String> {
        let mut text = String::new();
        while let Some(fragment) = self.next().await {
            text.push_str(&fragment?);
        }
        Ok(text)
    }
}

impl Stream for AnswerStream {
    type Item = EngineResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.done {
            return Poll::Ready(None);
        }
        match this.inner.as_mut().poll_next(cx) {
            Poll::Ready(Some(Ok(fragment))) => Poll::Ready(Some(Ok(fragment))),
            Poll::Ready(Some(Err(e))) => {
                this.done = true;
                warn!("[answer] Stream from {} failed: {}", this.model, e);
                Poll::Ready(Some(Err(EngineError::generation(&this.model, e.to_string()))))
            }
            Poll::Ready(None) => {
                this.done = true;
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::traits::ProviderError;
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Scripted {
        fragments: Vec<Result<&'static str, &'static str>>,
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TextGenerator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn complete(
            &self,
            _: &str,
            _: &str,
            _: Option<f64>,
        ) -> Result<String, ProviderError> {
            Err(ProviderError::Transport("not used".into()))
        }

        async fn complete_stream(
            &self,
            prompt: &str,
            _: &str,
            _: Option<f64>,
        ) -> Result<FragmentStream, ProviderError> {
            self.prompts.lock().push(prompt.to_string());
            let items: Vec<Result<String, ProviderError>> = self
                .fragments
                .iter()
                .map(|f| match f {
                    Ok(t) => Ok(t.to_string()),
                    Err(e) => Err(ProviderError::Transport(e.to_string())),
                })
                .collect();
            Ok(Box::pin(futures::stream::iter(items)))
        }
    }

    fn scripted(fragments: Vec<Result<&'static str, &'static str>>) -> Arc<Scripted> {
        Arc::new(Scripted { fragments, prompts: Mutex::new(vec![]) })
    }

    #[tokio::test]
    async fn streamed_fragments_concatenate_to_bulk_answer() {
        let gen = scripted(vec![Ok("As far as I know, "), Ok("there are "), Ok("12 phones.")]);
        let synth = AnswerSynthesizer::new(gen.clone(), "mixtral-8x7b-32768", 0.7, false);
        let result = ExecutionResult::Success("count\n12".into());

        let mut streamed = String::new();
        let mut stream = synth.synthesize_answer("", "q", "s", "SELECT 1", &result).await.unwrap();
        while let Some(f) = stream.next().await {
            streamed.push_str(&f.unwrap());
        }

        let bulk = synth
            .synthesize_answer("", "q", "s", "SELECT 1", &result)
            .await
            .unwrap()
            .collect_text()
            .await
            .unwrap();
        assert_eq!(streamed, bulk);
        assert_eq!(bulk, "As far as I know, there are 12 phones.");
    }

    #[tokio::test]
    async fn mid_stream_error_ends_sequence() {
        let gen = scripted(vec![Ok("partial"), Err("connection reset"), Ok("never seen")]);
        let synth = AnswerSynthesizer::new(gen, "m", 0.7, false);
        let mut stream = synth
            .synthesize_answer("", "q", "s", "x", &ExecutionResult::Success(String::new()))
            .await
            .unwrap();

        assert_eq!(stream.next().await.unwrap().unwrap(), "partial");
        assert!(matches!(stream.next().await, Some(Err(EngineError::Generation { .. }))));
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn failed_execution_goes_verbatim_into_answer_prompt() {
        let gen = scripted(vec![Ok("ok")]);
        let synth = AnswerSynthesizer::new(gen.clone(), "m", 0.7, false);
        let failed = ExecutionResult::Failed("no such column: colour".into());
        synth.synthesize_answer("", "q", "s", "SELECT colour", &failed).await.unwrap();

        let prompt = gen.prompts.lock()[0].clone();
        assert!(prompt.contains("SQL Response: Error: no such column: colour"));
        assert!(prompt.contains("As far as I know"));
    }

    #[tokio::test]
    async fn explain_failures_switches_prompt() {
        let gen = scripted(vec![Ok("ok")]);
        let synth = AnswerSynthesizer::new(gen.clone(), "m", 0.7, true);
        let failed = ExecutionResult::Failed("permission denied".into());
        synth.synthesize_answer("", "q", "s", "DROP TABLE t", &failed).await.unwrap();
        synth
            .synthesize_answer("", "q", "s", "SELECT 1", &ExecutionResult::Success("1".into()))
            .await
            .unwrap();

        let prompts = gen.prompts.lock();
        assert!(prompts[0].contains("Do not invent any data"));
        assert!(prompts[0].contains("Error: permission denied"));
        assert!(!prompts[1].contains("Do not invent any data"));
    }
}
