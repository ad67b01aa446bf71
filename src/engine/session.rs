// chatsql Engine — Session
// The explicit state a shell owns for one interactive conversation: the
// single live connection, the conversation history and the pipeline.
//
// Turn bookkeeping:
//   • empty questions and unconnected sessions are refused up front
//   • the user turn is recorded once the answer has started streaming
//   • the assistant turn is recorded when the stream ends, fails, or is
//     dropped, with whatever text arrived
//   • a turn that fails before streaming leaves history untouched

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::{Database, TextGenerator};
use crate::atoms::types::{ConnectionDescriptor, Turn, TurnTrace};
use crate::engine::answer::AnswerStream;
use crate::engine::config::AssistantConfig;
use crate::engine::conversation::ConversationHistory;
use crate::engine::database;
use crate::engine::pipeline::Pipeline;
use crate::engine::providers::OpenAiProvider;
use futures::{Stream, StreamExt};
use log::{info, warn};
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

pub struct Session {
    id: String,
    pipeline: Pipeline,
    connection: Option<Arc<dyn Database>>,
    history: ConversationHistory,
    connect_timeout_secs: u64,
}

impl Session {
    /// Validate `config` and build a session backed by the configured
    /// OpenAI-compatible provider.
    pub fn new(config: &AssistantConfig) -> EngineResult<Self> {
        config.validate()?;
        let provider = OpenAiProvider::new(config)?;
        Ok(Self::with_generator(Arc::new(provider), config))
    }

    /// Session over any text generator.
    pub fn with_generator(generator: Arc<dyn TextGenerator>, config: &AssistantConfig) -> Self {
        let id = uuid::Uuid::new_v4().to_string();
        info!(
            "[session] {} created (query={}, answer={})",
            id, config.query_model, config.answer_model
        );
        Self {
            id,
            pipeline: Pipeline::new(generator, config),
            connection: None,
            history: ConversationHistory::with_greeting(),
            connect_timeout_secs: config.connect_timeout_secs,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    /// Open the session's connection. A session that is already connected
    /// keeps its existing handle; use `reset_all` to switch databases.
    pub async fn connect(&mut self, descriptor: &ConnectionDescriptor) -> EngineResult<()> {
        if self.is_connected() {
            warn!("[session] {} already connected; keeping the existing connection", self.id);
            return Ok(());
        }
        let db = database::connect(descriptor, self.connect_timeout_secs).await?;
        self.connection = Some(db);
        Ok(())
    }

    /// Use an already-open database handle as the session's connection.
    pub fn attach(&mut self, db: Arc<dyn Database>) {
        if self.is_connected() {
            warn!("[session] {} already connected; ignoring attach", self.id);
            return;
        }
        self.connection = Some(db);
    }

    /// Turns so far, oldest first, starting with the greeting.
    pub fn history(&self) -> &[Turn] {
        self.history.snapshot()
    }

    /// Start the conversation over. The connection is kept.
    pub fn reset(&mut self) {
        info!("[session] {} history reset ({} turns dropped)", self.id, self.history.len());
        self.history.reset();
    }

    /// Drop both history and connection.
    pub fn reset_all(&mut self) {
        self.reset();
        self.connection = None;
    }

    /// Ask one question. On success the returned stream yields the answer
    /// fragments; see the module notes for when turns are recorded.
    pub async fn ask(&mut self, question: &str) -> EngineResult<TurnStream<'_>> {
        let question = question.trim();
        if question.is_empty() {
            return Err(EngineError::InvalidInput("question is empty".into()));
        }
        let db = self.connection.clone().ok_or(EngineError::NotConnected)?;

        let output = self.pipeline.handle_turn(question, self.history.snapshot(), &*db).await?;

        self.history.append(Turn::user(question));
        Ok(TurnStream {
            session_id: &self.id,
            history: &mut self.history,
            trace: output.trace,
            answer: output.answer,
            text: String::new(),
            committed: false,
        })
    }
}

// ── TurnStream ─────────────────────────────────────────────────────────────────

/// Pull-based answer for one turn. Records the assistant turn in the
/// session's history when it ends, fails, or is dropped.
pub struct TurnStream<'a> {
    session_id: &'a str,
    history: &'a mut ConversationHistory,
    trace: TurnTrace,
    answer: AnswerStream,
    text: String,
    committed: bool,
}

impl TurnStream<'_> {
    /// The statement that ran and its outcome.
    pub fn trace(&self) -> &TurnTrace {
        &self.trace
    }

    /// Answer text received so far.
    pub fn text(&self) -> &str {
        &self.text
    }

    pub async fn next_fragment(&mut self) -> Option<EngineResult<String>> {
        self.next().await
    }

    /// Drain the rest of the answer and return it whole. On a mid-stream
    /// failure the partial answer is still recorded and the error returned.
    pub async fn finish(mut self) -> EngineResult<String> {
        while let Some(fragment) = self.next().await {
            fragment?;
        }
        Ok(std::mem::take(&mut self.text))
    }

    fn commit(&mut self) {
        if self.committed {
            return;
        }
        self.committed = true;
        info!("[session] {} answer recorded ({} chars)", self.session_id, self.text.len());
        self.history.append(Turn::assistant(self.text.clone()));
    }
}

impl Stream for TurnStream<'_> {
    type Item = EngineResult<String>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.committed {
            return Poll::Ready(None);
        }
        match Pin::new(&mut this.answer).poll_next(cx) {
            Poll::Ready(Some(Ok(fragment))) => {
                this.text.push_str(&fragment);
                Poll::Ready(Some(Ok(fragment)))
            }
            Poll::Ready(Some(Err(e))) => {
                this.commit();
                Poll::Ready(Some(Err(e)))
            }
            Poll::Ready(None) => {
                this.commit();
                Poll::Ready(None)
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl Drop for TurnStream<'_> {
    fn drop(&mut self) {
        if !self.committed {
            warn!(
                "[session] {} answer stream dropped early; keeping partial text",
                self.session_id
            );
            self.commit();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atoms::types::Role;

    #[test]
    fn new_session_rejects_missing_credential() {
        let err = Session::new(&AssistantConfig::default()).err().unwrap();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn new_session_starts_with_greeting() {
        let config = AssistantConfig { api_key: "k".into(), ..Default::default() };
        let session = Session::new(&config).unwrap();
        assert!(!session.is_connected());
        assert_eq!(session.history().len(), 1);
        assert_eq!(session.history()[0].role, Role::Assistant);
    }

    #[tokio::test]
    async fn ask_without_connection_is_refused() {
        let config = AssistantConfig { api_key: "k".into(), ..Default::default() };
        let mut session = Session::new(&config).unwrap();
        assert!(matches!(
            session.ask("how many phones?").await.err(),
            Some(EngineError::NotConnected)
        ));
        assert!(matches!(session.ask("   ").await.err(), Some(EngineError::InvalidInput(_))));
        assert_eq!(session.history().len(), 1);
    }
}
