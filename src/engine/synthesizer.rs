// chatsql Engine — Query Synthesizer
// Question + schema + history → one SQL statement, via a blocking
// (non-streaming) completion at a low temperature.

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::TextGenerator;
use crate::engine::http::log_preview;
use crate::engine::prompts;
use log::{debug, info};
use std::sync::Arc;

pub struct QuerySynthesizer {
    generator: Arc<dyn TextGenerator>,
    model: String,
    temperature: f64,
}

impl QuerySynthesizer {
    pub fn new(
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
        temperature: f64,
    ) -> Self {
        Self { generator, model: model.into(), temperature }
    }

    /// Synthesize the statement for `question`.
    ///
    /// The completion is returned as produced, surrounding whitespace aside;
    /// it is not parsed or validated here and a malformed statement fails at
    /// execution. An empty completion is a `Generation` error.
    pub async fn synthesize(
        &self,
        history: &str,
        question: &str,
        schema: &str,
    ) -> EngineResult<String> {
        let prompt = prompts::query_prompt(schema, history, question);
        debug!("[synthesizer] Prompt {} chars for model {}", prompt.len(), self.model);

        let completion = self
            .generator
            .complete(&prompt, &self.model, Some(self.temperature))
            .await
            .map_err(|e| e.into_engine(&self.model))?;

        let query = completion.trim();
        if query.is_empty() {
            return Err(EngineError::generation(&self.model, "model returned an empty query"));
        }
        info!("[synthesizer] {} → {}", self.model, log_preview(query, 200));
        Ok(query.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::traits::{FragmentStream, ProviderError};
    use async_trait::async_trait;
    use parking_lot::Mutex;

    struct Canned {
        reply: Result<String, u16>,
        seen: Mutex<Vec<(String, String, Option<f64>)>>,
    }

    impl Canned {
        fn ok(reply: &str) -> Arc<Self> {
            Arc::new(Self { reply: Ok(reply.into()), seen: Mutex::new(vec![]) })
        }
    }

    #[async_trait]
    impl TextGenerator for Canned {
        fn name(&self) -> &str {
            "canned"
        }

        async fn complete(
            &self,
            prompt: &str,
            model: &str,
            temperature: Option<f64>,
        ) -> Result<String, ProviderError> {
            self.seen.lock().push((prompt.to_string(), model.to_string(), temperature));
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(ProviderError::Api { status: *status, message: "boom".into() }),
            }
        }

        async fn complete_stream(
            &self,
            _: &str,
            _: &str,
            _: Option<f64>,
        ) -> Result<FragmentStream, ProviderError> {
            Err(ProviderError::Transport("not used".into()))
        }
    }

    #[tokio::test]
    async fn returns_trimmed_completion_unparsed() {
        let gen = Canned::ok("\n  SELECT COUNT(*) FROM \"tbl_phones\" WHERE \"price\" < 500;  \n");
        let synth = QuerySynthesizer::new(gen.clone(), "gemma2-9b-it", 0.0);
        let sql = synth.synthesize("", "How many phones under 500?", "schema").await.unwrap();
        assert_eq!(sql, "SELECT COUNT(*) FROM \"tbl_phones\" WHERE \"price\" < 500;");

        let seen = gen.seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].1, "gemma2-9b-it");
        assert_eq!(seen[0].2, Some(0.0));
        assert!(seen[0].0.contains("How many phones under 500?"));
    }

    #[tokio::test]
    async fn malformed_output_is_passed_through() {
        let synth = QuerySynthesizer::new(Canned::ok("Sure! Here you go"), "m", 0.0);
        assert_eq!(synth.synthesize("", "q", "").await.unwrap(), "Sure! Here you go");
    }

    #[tokio::test]
    async fn empty_completion_is_generation_error() {
        let synth = QuerySynthesizer::new(Canned::ok("   "), "gemma2-9b-it", 0.0);
        match synth.synthesize("", "q", "").await {
            Err(EngineError::Generation { model, .. }) => assert_eq!(model, "gemma2-9b-it"),
            other => panic!("expected generation error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn provider_failure_is_generation_error() {
        let gen = Arc::new(Canned { reply: Err(503), seen: Mutex::new(vec![]) });
        let synth = QuerySynthesizer::new(gen, "m", 0.0);
        let err = synth.synthesize("", "q", "").await.unwrap_err();
        assert!(matches!(err, EngineError::Generation { .. }));
        assert!(err.to_string().contains("503"));
    }
}
