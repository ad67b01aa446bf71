// ── chatsql Atoms: Pure Data Types ────────────────────────────────────────────
// All plain struct/enum definitions with no logic.
// Atoms layer rule: no I/O, no side effects, no imports from engine/.

use serde::{Deserialize, Serialize};

// ── Text-generation provider ───────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    Groq,
    OpenAI,
    Ollama,
    Custom,
}

// ── Conversation ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message in a conversation. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
}

// ── Database connection ────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseScheme {
    #[default]
    Postgres,
    /// Embedded file (or `:memory:`) database; `database` holds the path.
    Sqlite,
}

/// Parameters needed to open the session's single database connection.
/// `Debug` is implemented by hand in engine/database so the password never
/// reaches a log line.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionDescriptor {
    #[serde(default)]
    pub scheme: DatabaseScheme,
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

// ── Schema ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnInfo {
    pub name: String,
    pub data_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub name: String,
    pub columns: Vec<ColumnInfo>,
    /// Example rows; empty when sampling is off or failed.
    pub sample: ResultSet,
}

// ── Query execution ────────────────────────────────────────────────────

/// Raw rows captured from a statement, every value already rendered as text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResultSet {
    pub columns: Vec<String>,
    /// `None` marks SQL NULL.
    pub rows: Vec<Vec<Option<String>>>,
    /// Set for statements that report an affected-row count instead of rows.
    pub rows_affected: Option<u64>,
}

/// Textual outcome of running a synthesized statement.
/// A database-side failure is data here, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionResult {
    Success(String),
    Failed(String),
}

/// What the shell sees of one processed turn besides the answer stream.
#[derive(Debug, Clone)]
pub struct TurnTrace {
    pub query: String,
    pub result: ExecutionResult,
}
