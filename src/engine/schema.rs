// chatsql Engine — Schema Introspector
// Renders the live database's tables into the text block both prompts embed.
//
// Per table:
//
//   CREATE TABLE "tbl_phones" (
//   	"model" text,
//   	"price" numeric
//   )
//
//   /*
//   3 rows from tbl_phones table:
//   model	price
//   Galaxy S21	799
//   */

use crate::atoms::error::EngineResult;
use crate::atoms::traits::Database;
use crate::atoms::types::TableInfo;
use crate::engine::database::quote_ident;
use log::{debug, warn};

/// Describe every user table reachable through `db`.
///
/// Pure read; calling it twice on an unchanged database yields identical
/// text. Connection loss surfaces as `EngineError::Connection`.
pub async fn describe(db: &dyn Database, sample_rows: usize) -> EngineResult<String> {
    let tables = db.tables(sample_rows).await?;
    if tables.is_empty() {
        warn!("[schema] {} database has no user tables", db.backend());
    }
    let text = render_tables(&tables);
    debug!("[schema] {} tables, {} chars", tables.len(), text.len());
    Ok(text)
}

pub fn render_tables(tables: &[TableInfo]) -> String {
    tables.iter().map(render_table).collect::<Vec<_>>().join("\n\n")
}

fn render_table(table: &TableInfo) -> String {
    let columns: Vec<String> = table
        .columns
        .iter()
        .map(|c| format!("\t{} {}", quote_ident(&c.name), c.data_type))
        .collect();
    let mut out =
        format!("CREATE TABLE {} (\n{}\n)", quote_ident(&table.name), columns.join(",\n"));

    let sample = &table.sample;
    if !sample.rows.is_empty() {
        out.push_str(&format!("\n\n/*\n{} rows from {} table:\n", sample.rows.len(), table.name));
        out.push_str(&sample.columns.join("\t"));
        for row in &sample.rows {
            out.push('\n');
            let cells: Vec<&str> = row.iter().map(|v| v.as_deref().unwrap_or("NULL")).collect();
            out.push_str(&cells.join("\t"));
        }
        out.push_str("\n*/");
    }
    out
}
