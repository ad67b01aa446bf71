// chatsql — interactive terminal shell
// Connects once, then reads questions line by line and streams each answer to
// stdout as it is generated. Logs go to stderr (RUST_LOG, default `warn`).

use chatsql::{AssistantConfig, ConnectionDescriptor, EngineError, EngineResult, Role, Session};
use clap::Parser;
use futures::StreamExt;
use log::info;
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Parser, Debug)]
#[command(
    name = "chatsql",
    version,
    about = "Ask questions about a SQL database in plain language"
)]
struct Cli {
    /// Database host
    #[arg(long, env = "PGHOST", default_value = "localhost")]
    host: String,

    /// Database port
    #[arg(long, env = "PGPORT", default_value_t = 5432)]
    port: u16,

    /// Database user
    #[arg(long, env = "PGUSER", default_value = "postgres")]
    user: String,

    /// Database password
    #[arg(long, env = "PGPASSWORD", default_value = "", hide_env_values = true)]
    password: String,

    /// Database name
    #[arg(long, env = "PGDATABASE")]
    database: Option<String>,

    /// Full connection URL (postgresql://… or sqlite://path); overrides the fields above
    #[arg(long, env = "DATABASE_URL", conflicts_with = "database")]
    database_url: Option<String>,

    /// Config file (default: $CONFIG_DIR/chatsql/config.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Model for SQL synthesis
    #[arg(long, value_name = "MODEL")]
    query_model: Option<String>,

    /// Model for the streamed answer
    #[arg(long, value_name = "MODEL")]
    answer_model: Option<String>,

    /// Print the generated SQL and its outcome to stderr before each answer
    #[arg(long)]
    show_sql: bool,
}

impl Cli {
    fn descriptor(&self) -> EngineResult<ConnectionDescriptor> {
        if let Some(url) = &self.database_url {
            return ConnectionDescriptor::from_url(url);
        }
        let database = self.database.clone().ok_or_else(|| {
            EngineError::InvalidInput("--database or --database-url is required".into())
        })?;
        Ok(ConnectionDescriptor::postgres(
            &self.host,
            self.port,
            &self.user,
            &self.password,
            database,
        ))
    }

    fn config(&self) -> EngineResult<AssistantConfig> {
        let mut config = AssistantConfig::load(self.config.as_deref())?;
        if let Some(model) = &self.query_model {
            config.query_model = model.clone();
        }
        if let Some(model) = &self.answer_model {
            config.answer_model = model.clone();
        }
        Ok(config)
    }
}

const HELP: &str = "\
Ask a question about your data, or:
  /help     show this message
  /history  print the conversation so far
  /reset    forget the conversation (keeps the connection)
  /quit     exit";

#[tokio::main]
async fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        // Reader went away (`chatsql | head`); nothing left to say.
        Err(EngineError::Io(e)) if e.kind() == io::ErrorKind::BrokenPipe => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> EngineResult<()> {
    let descriptor = cli.descriptor()?;
    let mut session = Session::new(&cli.config()?)?;
    session.connect(&descriptor).await?;
    info!("[shell] Session {} ready", session.id());

    let mut out = io::stdout();
    print_greeting(&mut out, &session)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        write!(out, "> ")?;
        out.flush()?;
        let Some(line) = lines.next_line().await? else {
            writeln!(out)?;
            break;
        };
        match line.trim() {
            "" => continue,
            "/quit" | "/exit" => break,
            "/help" => writeln!(out, "{}", HELP)?,
            "/history" => print_history(&mut out, &session)?,
            "/reset" => {
                session.reset();
                print_greeting(&mut out, &session)?;
            }
            question => ask(&mut out, &mut session, question, cli.show_sql).await?,
        }
    }
    Ok(())
}

/// Stream one answer to `out`. Engine failures are reported and the shell
/// carries on; a failed write to `out` ends the shell.
async fn ask(
    out: &mut impl Write,
    session: &mut Session,
    question: &str,
    show_sql: bool,
) -> io::Result<()> {
    let mut turn = match session.ask(question).await {
        Ok(turn) => turn,
        Err(e) => {
            eprintln!("error: {}", e);
            return Ok(());
        }
    };

    if show_sql {
        let trace = turn.trace();
        eprintln!("sql: {}", trace.query);
        if trace.result.is_failure() {
            eprintln!("{}", trace.result.as_prompt_text());
        }
    }

    while let Some(fragment) = turn.next().await {
        match fragment {
            Ok(text) => {
                write!(out, "{}", text)?;
                out.flush()?;
            }
            Err(e) => {
                writeln!(out)?;
                eprintln!("error: {}", e);
                break;
            }
        }
    }
    writeln!(out)
}

fn print_greeting(out: &mut impl Write, session: &Session) -> io::Result<()> {
    match session.history().first() {
        Some(first) => writeln!(out, "{}", first.text),
        None => Ok(()),
    }
}

fn print_history(out: &mut impl Write, session: &Session) -> io::Result<()> {
    for turn in session.history() {
        let who = match turn.role {
            Role::User => "you",
            Role::Assistant => "assistant",
        };
        writeln!(out, "{:>9}: {}", who, turn.text)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct ClosedPipe;

    impl Write for ClosedPipe {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn session() -> Session {
        let config = AssistantConfig { api_key: "k".into(), ..Default::default() };
        Session::new(&config).unwrap()
    }

    #[test]
    fn greeting_is_written_to_output() {
        let mut out = Vec::new();
        print_greeting(&mut out, &session()).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), format!("{}\n", session().history()[0].text));
    }

    #[test]
    fn closed_output_is_an_error_not_a_panic() {
        let err = print_history(&mut ClosedPipe, &session()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::BrokenPipe);
        let engine: EngineError = err.into();
        assert!(matches!(engine, EngineError::Io(ref e) if e.kind() == io::ErrorKind::BrokenPipe));
    }
}
