// chatsql Engine — Query Executor
// Runs the synthesized statement exactly as written and renders the outcome
// as the text the answer stage consumes. Database-side failures are data.

use crate::atoms::constants::EMPTY_STATEMENT_ERROR;
use crate::atoms::error::EngineResult;
use crate::atoms::traits::Database;
use crate::atoms::types::{ExecutionResult, ResultSet};
use crate::engine::http::log_preview;
use log::{info, warn};

impl ExecutionResult {
    /// Text placed into the answer prompt's result slot.
    pub fn as_prompt_text(&self) -> String {
        match self {
            ExecutionResult::Success(text) => text.clone(),
            ExecutionResult::Failed(error) => format!("Error: {}", error),
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, ExecutionResult::Failed(_))
    }
}

/// True when `sql` holds nothing but whitespace, comments and semicolons.
/// An unterminated block comment is left for the database to judge.
pub(crate) fn is_blank_statement(sql: &str) -> bool {
    let mut rest = sql;
    loop {
        rest = rest.trim_start_matches(|c: char| c.is_whitespace() || c == ';');
        if let Some(after) = rest.strip_prefix("--") {
            rest = after.find('\n').map_or("", |i| &after[i + 1..]);
        } else if let Some(after) = rest.strip_prefix("/*") {
            match after.find("*/") {
                Some(i) => rest = &after[i + 2..],
                None => return false,
            }
        } else {
            return rest.is_empty();
        }
    }
}

/// Execute `query` on `db`.
///
/// Syntax, permission and other statement errors come back as
/// `ExecutionResult::Failed` carrying the database's own message, as does a
/// query with no statement in it or more than one. Only a dead connection is
/// an `Err`.
pub async fn execute(
    db: &dyn Database,
    query: &str,
    max_rows: usize,
) -> EngineResult<ExecutionResult> {
    if is_blank_statement(query) {
        warn!("[executor] Nothing to run in {}", log_preview(query, 100));
        return Ok(ExecutionResult::Failed(EMPTY_STATEMENT_ERROR.to_string()));
    }
    info!("[executor] Running on {}: {}", db.backend(), log_preview(query, 200));
    Ok(match db.run(query).await? {
        Ok(result_set) => {
            info!(
                "[executor] {} rows{}",
                result_set.rows.len(),
                result_set.rows_affected.map(|n| format!(", {} affected", n)).unwrap_or_default()
            );
            ExecutionResult::Success(render_result_set(&result_set, max_rows))
        }
        Err(error) => ExecutionResult::Failed(error),
    })
}

/// Render rows as a column header line followed by one ` | `-separated line
/// per row, at most `max_rows` of them.
pub fn render_result_set(result: &ResultSet, max_rows: usize) -> String {
    if result.columns.is_empty() {
        return format!("OK ({} rows affected)", result.rows_affected.unwrap_or(0));
    }

    let mut lines = vec![result.columns.join(" | ")];
    if result.rows.is_empty() {
        lines.push("(no rows)".to_string());
        return lines.join("\n");
    }

    for row in result.rows.iter().take(max_rows) {
        let cells: Vec<&str> = row.iter().map(|v| v.as_deref().unwrap_or("NULL")).collect();
        lines.push(cells.join(" | "));
    }
    if result.rows.len() > max_rows {
        lines.push(format!("… {} more rows", result.rows.len() - max_rows));
    }
    lines.join("\n")
}
