// ── chatsql Atoms: Constants ───────────────────────────────────────────────
// All named constants for the crate live here.

// ── Session ────────────────────────────────────────────────────────────
/// Assistant turn every fresh session starts with.
pub const GREETING: &str = "I'm here to help you query your database.";

// ── Model defaults ─────────────────────────────────────────────────────
// Two distinct models: a terse one for SQL, a fluent one for the narrative.
pub const DEFAULT_QUERY_MODEL: &str = "gemma2-9b-it";
pub const DEFAULT_ANSWER_MODEL: &str = "mixtral-8x7b-32768";
pub const DEFAULT_QUERY_TEMPERATURE: f64 = 0.0;
pub const DEFAULT_ANSWER_TEMPERATURE: f64 = 0.7;

// ── Credential environment variables ───────────────────────────────────
pub const API_KEY_ENV: &str = "GROQ_API_KEY";
pub const API_KEY_ENV_FALLBACK: &str = "CHATSQL_API_KEY";
pub const QUERY_MODEL_ENV: &str = "CHATSQL_QUERY_MODEL";
pub const ANSWER_MODEL_ENV: &str = "CHATSQL_ANSWER_MODEL";

// ── Schema / result rendering ──────────────────────────────────────────
/// Example rows shown under each table in the schema description.
pub const DEFAULT_SAMPLE_ROWS: usize = 3;
/// Rows rendered into the answer prompt before the rest is summarised.
pub const DEFAULT_MAX_RESULT_ROWS: usize = 100;

// ── Statement execution ────────────────────────────────────────────────
// Reported as the statement's failure text, same wording on every backend.
pub const MULTIPLE_STATEMENTS_ERROR: &str =
    "multiple statements are not supported; run one statement per question";
pub const EMPTY_STATEMENT_ERROR: &str = "no SQL statement to run";

// ── Connection descriptor defaults ─────────────────────────────────────
pub const DEFAULT_DB_HOST: &str = "localhost";
pub const DEFAULT_DB_PORT: u16 = 5432;
pub const DEFAULT_DB_USER: &str = "postgres";

// ── HTTP ───────────────────────────────────────────────────────────────
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
/// Longest silence from the provider: before the response starts, or between
/// two chunks of a streamed answer.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 120;

// ── History growth ─────────────────────────────────────────────────────
// History is never truncated. Past this estimate (~4 chars per token) a
// warning is logged on every turn so the operator can set `history_window`.
pub const HISTORY_TOKEN_WARNING: usize = 60_000;
