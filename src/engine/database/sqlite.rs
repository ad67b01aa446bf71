// chatsql Engine — embedded SQLite backend
// rusqlite is synchronous; every call runs on the blocking pool behind a
// parking_lot Mutex so the async pipeline never stalls the runtime.

use super::quote_ident;
use crate::atoms::constants::{EMPTY_STATEMENT_ERROR, MULTIPLE_STATEMENTS_ERROR};
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::Database;
use crate::atoms::types::{ColumnInfo, ResultSet, TableInfo};
use crate::engine::http::log_preview;
use async_trait::async_trait;
use log::{info, warn};
use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{Batch, Connection};
use std::sync::Arc;

pub struct SqliteDatabase {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteDatabase {
    /// Open (or create) the database file; `:memory:` gives a private in-memory one.
    pub fn open(path: &str) -> EngineResult<Self> {
        info!("[database] Opening SQLite database at {}", path);
        let conn = if path == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(path)
        }
        .map_err(EngineError::connection)?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already-open connection (seeded fixtures, demos).
    pub fn from_connection(conn: Connection) -> Self {
        Self { conn: Arc::new(Mutex::new(conn)) }
    }

    async fn blocking<T, F>(&self, f: F) -> EngineResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> T + Send + 'static,
    {
        let conn = Arc::clone(&self.conn);
        tokio::task::spawn_blocking(move || {
            let guard = conn.lock();
            f(&*guard)
        })
        .await
        .map_err(|e| EngineError::connection(format!("sqlite worker failed: {}", e)))
    }
}

fn value_text(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(v) => Some(v.to_string()),
        ValueRef::Real(v) => Some(v.to_string()),
        ValueRef::Text(v) => Some(String::from_utf8_lossy(v).into_owned()),
        ValueRef::Blob(v) => Some(format!("<{} bytes>", v.len())),
    }
}

/// Run exactly one statement; database-side failures come back as text.
/// Nothing runs when `sql` holds no statement or more than one.
fn run_statement(conn: &Connection, sql: &str) -> Result<ResultSet, String> {
    let mut batch = Batch::new(conn, sql);
    let mut stmt = batch
        .next()
        .map_err(|e| e.to_string())?
        .ok_or_else(|| EMPTY_STATEMENT_ERROR.to_string())?;
    if !matches!(batch.next(), Ok(None)) {
        return Err(MULTIPLE_STATEMENTS_ERROR.to_string());
    }
    let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();

    if columns.is_empty() {
        let affected = stmt.execute([]).map_err(|e| e.to_string())?;
        return Ok(ResultSet { rows_affected: Some(affected as u64), ..Default::default() });
    }

    let width = columns.len();
    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(value_text(row.get_ref(i).map_err(|e| e.to_string())?));
        }
        out.push(values);
    }
    Ok(ResultSet { columns, rows: out, rows_affected: None })
}

fn load_tables(conn: &Connection, sample_rows: usize) -> EngineResult<Vec<TableInfo>> {
    let names: Vec<String> = conn
        .prepare(
            "SELECT name FROM sqlite_master
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%'
             ORDER BY name",
        )?
        .query_map([], |row| row.get(0))?
        .collect::<Result<_, _>>()?;

    let mut tables = Vec::with_capacity(names.len());
    for name in names {
        let columns: Vec<ColumnInfo> = conn
            .prepare(&format!("PRAGMA table_info({})", quote_ident(&name)))?
            .query_map([], |row| {
                Ok(ColumnInfo { name: row.get(1)?, data_type: row.get(2)? })
            })?
            .collect::<Result<_, _>>()?;

        let sample = if sample_rows > 0 {
            let sql = format!("SELECT * FROM {} LIMIT {}", quote_ident(&name), sample_rows);
            run_statement(conn, &sql).unwrap_or_else(|e| {
                warn!("[schema] Could not sample {}: {}", name, e);
                ResultSet::default()
            })
        } else {
            ResultSet::default()
        };

        tables.push(TableInfo { name, columns, sample });
    }
    Ok(tables)
}

#[async_trait]
impl Database for SqliteDatabase {
    fn backend(&self) -> &str {
        "sqlite"
    }

    async fn tables(&self, sample_rows: usize) -> EngineResult<Vec<TableInfo>> {
        self.blocking(move |conn| load_tables(conn, sample_rows)).await?
    }

    async fn run(&self, sql: &str) -> EngineResult<Result<ResultSet, String>> {
        let sql_owned = sql.to_string();
        let result = self.blocking(move |conn| run_statement(conn, &sql_owned)).await?;
        if let Err(e) = &result {
            warn!("[executor] SQLite rejected {}: {}", log_preview(sql, 100), e);
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> SqliteDatabase {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE tbl_phones (model TEXT, brand TEXT, price NUMERIC);
             INSERT INTO tbl_phones VALUES ('Galaxy S21', 'Samsung', 799);
             INSERT INTO tbl_phones VALUES ('Redmi 9', 'Xiaomi', 149.5);
             INSERT INTO tbl_phones VALUES ('Nokia 3310', NULL, 49);
             CREATE TABLE accessories (id INTEGER PRIMARY KEY, name TEXT);",
        )
        .unwrap();
        SqliteDatabase::from_connection(conn)
    }

    #[tokio::test]
    async fn tables_sorted_with_columns_and_samples() {
        let db = fixture();
        let tables = db.tables(2).await.unwrap();
        let names: Vec<&str> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["accessories", "tbl_phones"]);

        let phones = &tables[1];
        assert_eq!(phones.columns.len(), 3);
        assert_eq!(
            phones.columns[2],
            ColumnInfo { name: "price".into(), data_type: "NUMERIC".into() }
        );
        assert_eq!(phones.sample.rows.len(), 2);
        assert!(tables[0].sample.rows.is_empty());
    }

    #[tokio::test]
    async fn no_sampling_when_zero() {
        let tables = fixture().tables(0).await.unwrap();
        assert!(tables.iter().all(|t| t.sample.rows.is_empty() && t.sample.columns.is_empty()));
    }

    #[tokio::test]
    async fn run_select_renders_values_as_text() {
        let db = fixture();
        let result = db
            .run("SELECT model, brand, price FROM tbl_phones ORDER BY price")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(result.columns, vec!["model", "brand", "price"]);
        assert_eq!(result.rows[0], vec![Some("Nokia 3310".into()), None, Some("49".into())]);
        assert_eq!(result.rows[1][2], Some("149.5".into()));
    }

    #[tokio::test]
    async fn run_write_reports_affected_rows() {
        let db = fixture();
        let result = db.run("DELETE FROM tbl_phones WHERE price < 200").await.unwrap().unwrap();
        assert_eq!(result.rows_affected, Some(2));
    }

    #[tokio::test]
    async fn syntax_error_is_captured_not_raised() {
        let db = fixture();
        let result = db.run("SELEC nonsense FROM").await.unwrap();
        let text = result.unwrap_err();
        assert!(text.contains("syntax error"), "got: {}", text);
    }

    #[tokio::test]
    async fn second_statement_is_refused_before_anything_runs() {
        let db = fixture();
        let text = db
            .run("DELETE FROM tbl_phones; SELECT COUNT(*) FROM tbl_phones")
            .await
            .unwrap()
            .unwrap_err();
        assert_eq!(text, MULTIPLE_STATEMENTS_ERROR);

        let left = db.run("SELECT COUNT(*) FROM tbl_phones").await.unwrap().unwrap();
        assert_eq!(left.rows, vec![vec![Some("3".to_string())]]);
    }

    #[tokio::test]
    async fn trailing_semicolon_and_comment_are_one_statement() {
        let db = fixture();
        let result = db.run("SELECT COUNT(*) FROM tbl_phones; -- all of them\n").await.unwrap();
        assert_eq!(result.unwrap().rows, vec![vec![Some("3".to_string())]]);
    }

    #[tokio::test]
    async fn comment_only_query_names_the_problem() {
        let db = fixture();
        let text = db.run("-- cannot answer").await.unwrap().unwrap_err();
        assert_eq!(text, EMPTY_STATEMENT_ERROR);
    }

    #[tokio::test]
    async fn missing_table_is_captured() {
        let db = fixture();
        let text = db.run("SELECT * FROM nope").await.unwrap().unwrap_err();
        assert!(text.contains("no such table"));
    }
}
