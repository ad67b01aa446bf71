// chatsql Engine — natural-language-to-SQL turn pipeline
// Schema fetch, query synthesis, execution and streamed answers over one live
// database connection, driven by an explicit Session the shell owns.

pub mod answer;
pub mod config;
pub mod conversation;
pub mod database;
pub mod executor;
pub mod http;
pub mod pipeline;
pub mod prompts;
pub mod providers;
pub mod schema;
pub mod session;
pub mod synthesizer;
