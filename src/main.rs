use clap::Parser;
use curabot::repl::{self, Input};
use curabot::{AppState, Config, Session};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "curabot")]
#[command(about = "Medical symptom chatbot and PDF report assistant", long_about = None)]
struct Cli {
    /// SQLite database file (overrides CURABOT_DB)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Where uploaded reports are kept (overrides CURABOT_UPLOAD_DIR)
    #[arg(long)]
    upload_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "curabot=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let mut config = Config::from_env()?;
    if let Some(path) = cli.database {
        config.database_path = path;
    }
    if let Some(dir) = cli.upload_dir {
        config.upload_dir = dir;
    }
    for (key, value) in config.masked() {
        tracing::info!("{} = {}", key, value);
    }

    let state = AppState::from_config(&config)?;
    let mut session = Session::new();

    let mut stdout = tokio::io::stdout();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    stdout
        .write_all(b"Curabot is ready. Type /help for commands.\n")
        .await?;

    loop {
        stdout.write_all(repl::prompt(&session).as_bytes()).await?;
        stdout.flush().await?;
        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if repl::parse(line) == Input::Quit {
            break;
        }

        let output = match repl::dispatch(&state, &mut session, line).await {
            Ok(text) => text,
            Err(e) => format!("error: {}", e),
        };
        if !output.is_empty() {
            stdout.write_all(output.as_bytes()).await?;
            stdout.write_all(b"\n").await?;
        }
    }
    Ok(())
}
