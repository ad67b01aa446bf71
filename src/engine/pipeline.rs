// chatsql Engine — Turn pipeline
// One turn, strictly in order: schema fetch → query synthesis → execution →
// answer streaming. Holds no conversation or connection state of its own.

use crate::atoms::constants::HISTORY_TOKEN_WARNING;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Database, TextGenerator};
use crate::atoms::types::{ExecutionResult, Turn, TurnTrace};
use crate::engine::answer::{AnswerStream, AnswerSynthesizer};
use crate::engine::config::AssistantConfig;
use crate::engine::conversation::{estimate_tokens, render};
use crate::engine::executor;
use crate::engine::schema;
use crate::engine::synthesizer::QuerySynthesizer;
use log::{debug, info, warn};
use std::sync::Arc;

/// Everything a processed turn hands back: what ran, and the answer stream.
pub struct TurnOutput {
    pub trace: TurnTrace,
    pub answer: AnswerStream,
}

pub struct Pipeline {
    query: QuerySynthesizer,
    answer: AnswerSynthesizer,
    sample_rows: usize,
    max_result_rows: usize,
    history_window: Option<usize>,
}

impl Pipeline {
    pub fn new(generator: Arc<dyn TextGenerator>, config: &AssistantConfig) -> Self {
        Self {
            query: QuerySynthesizer::new(
                generator.clone(),
                &config.query_model,
                config.query_temperature,
            ),
            answer: AnswerSynthesizer::new(
                generator,
                &config.answer_model,
                config.answer_temperature,
                config.explain_failures,
            ),
            sample_rows: config.sample_rows,
            max_result_rows: config.max_result_rows,
            history_window: config.history_window,
        }
    }

    /// Process one question against `db` in the context of `history`.
    ///
    /// Returns once the answer has started streaming. A failed statement is
    /// not an error; it reaches the answer stage as `ExecutionResult::Failed`.
    pub async fn handle_turn(
        &self,
        question: &str,
        history: &[Turn],
        db: &dyn Database,
    ) -> EngineResult<TurnOutput> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::InvalidInput("question is empty".into()));
        }

        let history_text = render(history, self.history_window);
        let tokens = estimate_tokens(&history_text);
        debug!("[pipeline] History: {} turns, ~{} tokens", history.len(), tokens);
        if tokens > HISTORY_TOKEN_WARNING {
            warn!(
                "[pipeline] Rendered history is ~{} tokens; \
                 set history_window to bound prompt size",
                tokens
            );
        }

        let schema = schema::describe(db, self.sample_rows).await?;
        let query = self.query.synthesize(&history_text, question, &schema).await?;
        let result = executor::execute(db, &query, self.max_result_rows).await?;
        if let ExecutionResult::Failed(error) = &result {
            info!("[pipeline] Query failed at the database, narrating: {}", error);
        }

        let answer = self
            .answer
            .synthesize_answer(&history_text, question, &schema, &query, &result)
            .await?;

        Ok(TurnOutput { trace: TurnTrace { query, result }, answer })
    }
}
