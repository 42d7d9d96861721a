//! ask - query a SQLite database in plain language.

use std::io::Write;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use db_ask::agents::Orchestrator;
use db_ask::cli::{Cli, OutputFormat};
use db_ask::config::Config;
use db_ask::db::{sample, DatabaseClient, MockDatabaseClient, SqliteClient};
use db_ask::llm::Conversation;
use db_ask::logging;
use db_ask::observability::TracingEventSink;
use db_ask::render;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{error, info};

#[tokio::main]
async fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse_args();

    match cli.log_path() {
        Some(path) => logging::init_file_logging(&path, cli.verbose),
        None => logging::init_stderr_logging(cli.verbose),
    }

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config_path = cli.config_path();
    info!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    cli.apply_overrides(&mut config)?;

    if cli.init_sample && !cli.mock_db {
        let created = sample::seed_sample_database(&config.database.path).await?;
        if created {
            eprintln!("Created sample database at {}", config.database.path.display());
        }
    }

    let db = open_database(&cli, &config).await?;

    if cli.show_schema {
        println!("{}", db.schema_text().await?);
        db.close().await?;
        return Ok(ExitCode::SUCCESS);
    }

    let orchestrator = Orchestrator::from_config(&config, db.clone(), Arc::new(TracingEventSink))
        .context("Could not start the assistant")?;

    let format = cli.output_format();
    let code = match cli.question.as_deref() {
        Some(question) => ask_once(&orchestrator, question, format).await?,
        None => interactive(&orchestrator, format).await?,
    };

    db.close().await?;
    Ok(code)
}

async fn open_database(cli: &Cli, config: &Config) -> anyhow::Result<Arc<dyn DatabaseClient>> {
    if cli.mock_db {
        info!("Using in-memory sample database");
        return Ok(Arc::new(MockDatabaseClient::sample()));
    }

    let client = SqliteClient::open(&config.database.path, config.database.query_timeout())
        .await
        .with_context(|| format!("Could not open {}", config.database.path.display()))?;
    Ok(Arc::new(client))
}

async fn ask_once(
    orchestrator: &Orchestrator,
    question: &str,
    format: OutputFormat,
) -> anyhow::Result<ExitCode> {
    let envelope = orchestrator.process(question).await;
    println!("{}", render::render(&envelope, format)?);

    Ok(if envelope.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn interactive(orchestrator: &Orchestrator, format: OutputFormat) -> anyhow::Result<ExitCode> {
    let mut conversation = Conversation::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    eprintln!("Ask a question about the database. Type 'clear' to forget context, 'exit' to quit.");

    loop {
        eprint!("ask> ");
        std::io::stderr().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };

        match line.trim() {
            "" => continue,
            "exit" | "quit" => break,
            "clear" => {
                conversation.clear();
                eprintln!("Context cleared.");
                continue;
            }
            question => {
                let envelope = orchestrator
                    .process_with_context(question, conversation.messages())
                    .await;
                println!("{}\n", render::render(&envelope, format)?);

                if let Some(sql) = envelope.sql_query() {
                    conversation.record_turn(question, sql);
                }
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
