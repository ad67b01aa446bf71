// ── chatsql Atoms: Seams ───────────────────────────────────────────────────
// The two outbound collaborators of the pipeline, expressed as traits so the
// engine never names a concrete HTTP client or database driver.
//
//   TextGenerator: completes a rendered prompt, whole or as a fragment stream
//   Database: the session's single live connection

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::types::{ResultSet, TableInfo};
use async_trait::async_trait;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

// ── Provider errors ────────────────────────────────────────────────────────

/// Failure talking to a text-generation provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Network / stream-level failure before or during the response.
    #[error("transport: {0}")]
    Transport(String),

    /// Credential rejected (401 / 403).
    #[error("authentication failed: {0}")]
    Auth(String),

    #[error("rate limited: {message}")]
    RateLimited { message: String, retry_after_secs: Option<u64> },

    /// Any other non-success HTTP status.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The provider answered, but not with anything usable.
    #[error("malformed response: {0}")]
    Malformed(String),
}

impl ProviderError {
    /// Attach the model name and lift into the engine taxonomy.
    pub fn into_engine(self, model: &str) -> EngineError {
        EngineError::generation(model, self.to_string())
    }
}

/// Forward-only sequence of generated text fragments, in generation order.
/// An `Err` item ends the sequence.
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String, ProviderError>> + Send>>;

// ── Text generation ────────────────────────────────────────────────────────

#[async_trait]
pub trait TextGenerator: Send + Sync {
    /// Short provider identifier for logs.
    fn name(&self) -> &str;

    /// Complete `prompt` in one piece.
    async fn complete(
        &self,
        prompt: &str,
        model: &str,
        temperature: Option<f64>,
    ) -> Result<String, ProviderError>;

    /// Complete `prompt` incrementally. Returns once generation has started.
    async fn complete_stream(
        &self,
        prompt: &str,
        model: &str,
        temperature: Option<f64>,
    ) -> Result<FragmentStream, ProviderError>;
}

// ── Database ───────────────────────────────────────────────────────────────

#[async_trait]
pub trait Database: Send + Sync {
    /// Backend label for logs ("postgres", "sqlite").
    fn backend(&self) -> &str;

    /// Every user table with its columns and up to `sample_rows` example
    /// rows, ordered by table name. `EngineError::Connection` if the
    /// connection is gone.
    async fn tables(&self, sample_rows: usize) -> EngineResult<Vec<TableInfo>>;

    /// Run one statement exactly as given.
    ///
    /// `Ok(Err(text))` carries a database-side rejection (syntax, permission…),
    /// including a query holding more than one statement, which is refused
    /// before any of it runs. The outer `Err` is reserved for a dead connection.
    async fn run(&self, sql: &str) -> EngineResult<Result<ResultSet, String>>;
}
