// ── chatsql Atoms: Error Types ─────────────────────────────────────────────
// Single canonical error enum for the engine, built with `thiserror`.
//
// Design rules:
//   • Variants are coarse-grained by domain (I/O, DB, Generation, Config…).
//   • The `#[from]` attribute wires std/external error conversions automatically.
//   • A failed SQL statement is NOT an error here: the executor captures it as
//     `ExecutionResult::Failed` and the answer stage narrates it.
//   • No variant carries secret material (API keys, passwords) in its message.

use thiserror::Error;

// ── Primary error enum ─────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum EngineError {
    /// Filesystem or OS-level I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP / network failure (reqwest layer).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Embedded SQLite failure outside of query execution.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Cannot reach or authenticate to the database, or the connection died.
    #[error("Connection error: {0}")]
    Connection(String),

    /// Text-generation provider failure, or a malformed / empty completion.
    #[error("Generation error: {model}: {message}")]
    Generation { model: String, message: String },

    /// A turn was requested before `connect` succeeded.
    #[error("Not connected: connect to a database before asking questions")]
    NotConnected,

    /// Caller handed the engine something it cannot process (empty question…).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration is invalid or missing.
    #[error("Configuration error: {0}")]
    Config(String),

    /// TOML config file could not be parsed.
    #[error("Config file error: {0}")]
    ConfigFile(#[from] toml::de::Error),
}

// ── Convenience constructors ───────────────────────────────────────────────

impl EngineError {
    /// Create a generation error with model name and message.
    pub fn generation(model: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Generation { model: model.into(), message: message.into() }
    }

    /// Create a connection error from anything displayable.
    pub fn connection(message: impl std::fmt::Display) -> Self {
        Self::Connection(message.to_string())
    }
}

// ── Convenience alias ──────────────────────────────────────────────────────

/// All engine operations return this type.
pub type EngineResult<T> = Result<T, EngineError>;
