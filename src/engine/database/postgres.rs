// chatsql Engine — PostgreSQL backend
// Results come from the simple-query protocol: every value comes back as text,
// which is exactly what the prompts consume, and the synthesized statement is
// sent unparameterized, as written. It is parsed once beforehand only to refuse
// multi-statement input.

use super::quote_ident;
use crate::atoms::constants::MULTIPLE_STATEMENTS_ERROR;
use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::Database;
use crate::atoms::types::{ColumnInfo, ConnectionDescriptor, ResultSet, TableInfo};
use crate::engine::http::log_preview;
use async_trait::async_trait;
use log::{error, warn};
use std::time::Duration;
use tokio_postgres::{Client, NoTls, SimpleQueryMessage};

const COLUMNS_SQL: &str = "SELECT table_name::text, column_name::text, data_type::text \
     FROM information_schema.columns \
     WHERE table_schema = current_schema() \
     ORDER BY table_name, ordinal_position";

pub struct PostgresDatabase {
    client: Client,
}

impl PostgresDatabase {
    pub async fn connect(
        descriptor: &ConnectionDescriptor,
        connect_timeout_secs: u64,
    ) -> EngineResult<Self> {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&descriptor.host)
            .port(descriptor.port)
            .user(&descriptor.user)
            .password(descriptor.password.as_bytes())
            .dbname(&descriptor.database)
            .connect_timeout(Duration::from_secs(connect_timeout_secs));

        let (client, connection) = config.connect(NoTls).await.map_err(EngineError::connection)?;

        // The connection object drives the socket; it finishes when the client drops.
        tokio::spawn(async move {
            if let Err(e) = connection.await {
                error!("[database] Postgres connection closed: {}", e);
            }
        });

        Ok(Self { client })
    }

    async fn simple(&self, sql: &str) -> Result<Vec<SimpleQueryMessage>, tokio_postgres::Error> {
        self.client.simple_query(sql).await
    }

    fn rejected(sql: &str, e: tokio_postgres::Error) -> EngineResult<Result<ResultSet, String>> {
        if e.is_closed() {
            return Err(EngineError::connection(e));
        }
        let text = e.as_db_error().map(|db| db.to_string()).unwrap_or_else(|| e.to_string());
        let text = rejection_text(text);
        warn!("[executor] Postgres rejected {}: {}", log_preview(sql, 100), text);
        Ok(Err(text))
    }
}

/// The server's own wording for a multi-statement parse failure is replaced
/// with the message every backend uses.
pub(crate) fn rejection_text(text: String) -> String {
    if text.contains("cannot insert multiple commands") {
        MULTIPLE_STATEMENTS_ERROR.to_string()
    } else {
        text
    }
}

/// Fold simple-query messages into one result set.
pub(crate) fn collect_messages(messages: Vec<SimpleQueryMessage>) -> ResultSet {
    let mut result = ResultSet::default();
    let mut saw_rows = false;
    for message in messages {
        match message {
            SimpleQueryMessage::RowDescription(columns) => {
                saw_rows = true;
                result.columns = columns.iter().map(|c| c.name().to_string()).collect();
            }
            SimpleQueryMessage::Row(row) => {
                saw_rows = true;
                if result.columns.is_empty() {
                    result.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                }
                result
                    .rows
                    .push((0..row.len()).map(|i| row.get(i).map(|v| v.to_string())).collect());
            }
            SimpleQueryMessage::CommandComplete(n) => {
                if !saw_rows {
                    result.rows_affected = Some(n);
                }
            }
            _ => {}
        }
    }
    result
}

#[async_trait]
impl Database for PostgresDatabase {
    fn backend(&self) -> &str {
        "postgres"
    }

    async fn tables(&self, sample_rows: usize) -> EngineResult<Vec<TableInfo>> {
        let listing = self.simple(COLUMNS_SQL).await.map_err(EngineError::connection)?;
        let listing = collect_messages(listing);

        let mut tables: Vec<TableInfo> = Vec::new();
        for row in listing.rows {
            let [Some(table), Some(column), data_type] = <[Option<String>; 3]>::try_from(row)
                .map_err(|_| EngineError::connection("unexpected information_schema row shape"))?
            else {
                continue;
            };
            let column = ColumnInfo { name: column, data_type: data_type.unwrap_or_default() };
            match tables.last_mut() {
                Some(t) if t.name == table => t.columns.push(column),
                _ => tables.push(TableInfo {
                    name: table,
                    columns: vec![column],
                    sample: ResultSet::default(),
                }),
            }
        }

        if sample_rows > 0 {
            for table in &mut tables {
                let sql =
                    format!("SELECT * FROM {} LIMIT {}", quote_ident(&table.name), sample_rows);
                match self.simple(&sql).await {
                    Ok(messages) => table.sample = collect_messages(messages),
                    Err(e) if e.is_closed() => return Err(EngineError::connection(e)),
                    Err(e) => warn!("[schema] Could not sample {}: {}", table.name, e),
                }
            }
        }

        Ok(tables)
    }

    /// Parses `sql` once as a prepared statement first: the server refuses
    /// to prepare more than one command, so a multi-statement query is
    /// rejected before any of it runs.
    async fn run(&self, sql: &str) -> EngineResult<Result<ResultSet, String>> {
        if let Err(e) = self.client.prepare(sql).await {
            return Self::rejected(sql, e);
        }
        match self.simple(sql).await {
            Ok(messages) => Ok(Ok(collect_messages(messages))),
            Err(e) => Self::rejected(sql, e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_complete_without_rows_reports_affected() {
        let result = collect_messages(vec![SimpleQueryMessage::CommandComplete(3)]);
        assert_eq!(result.rows_affected, Some(3));
        assert!(result.columns.is_empty());
    }

    #[test]
    fn multi_command_parse_error_uses_shared_wording() {
        let server = "ERROR: cannot insert multiple commands into a prepared statement".to_string();
        assert_eq!(rejection_text(server), MULTIPLE_STATEMENTS_ERROR);
        let other = "ERROR: relation \"nope\" does not exist".to_string();
        assert_eq!(rejection_text(other.clone()), other);
    }

    #[test]
    fn empty_message_list() {
        assert_eq!(collect_messages(vec![]), ResultSet::default());
    }
}
