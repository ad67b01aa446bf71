// chatsql — conversational natural-language-to-SQL assistant.
//
// Layout:
//   atoms/: pure types, constants, error enum and the two outbound seams
//   engine/: configuration, providers, database backends and the pipeline

pub mod atoms;
pub mod engine;

pub use atoms::error::{EngineError, EngineResult};
pub use atoms::traits::{Database, FragmentStream, ProviderError, TextGenerator};
pub use atoms::types::{
    ColumnInfo, ConnectionDescriptor, DatabaseScheme, ExecutionResult, ProviderKind, ResultSet,
    Role, TableInfo, Turn, TurnTrace,
};
pub use engine::config::AssistantConfig;
pub use engine::database::{connect, PostgresDatabase, SqliteDatabase};
pub use engine::pipeline::{Pipeline, TurnOutput};
pub use engine::session::{Session, TurnStream};
