use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use owo_colors::OwoColorize;
use rustyline::{error::ReadlineError, DefaultEditor};
use shorty::{
    app::App,
    cli::{Command, Reply, Session},
    clock::SystemClock,
    config::{Secrets, Settings, CONFIG_PATH_ENV},
    engine::InMemoryStore,
    logging::init_logging,
};
use tokio_util::sync::CancellationToken;

const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("SHORTY_GIT_COMMIT"),
    ", built ",
    env!("SHORTY_BUILD_TIME"),
    ")"
);

/// Interactive console for accounts, sessions, short links and API keys
/// over an in-memory store.
#[derive(Parser, Debug)]
#[command(name = "shorty", version, long_version = LONG_VERSION, about)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = CONFIG_PATH_ENV)]
    config: Option<PathBuf>,
    /// Generate missing secrets instead of failing.
    #[arg(long)]
    dev: bool,
    /// Override the configured log level.
    #[arg(short, long)]
    log_level: Option<String>,
    /// Run one command and exit, e.g. `shorty --dev HELP`.
    command: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("load configuration")?;
    settings.dev_mode |= cli.dev;
    if let Some(level) = cli.log_level {
        settings.logging.level = level;
    }
    let logging = init_logging(settings.logging.clone()).context("initialize logging")?;

    let secrets = Secrets::resolve(&settings)?;
    let app = App::new(
        &settings,
        secrets,
        Arc::new(InMemoryStore::new()),
        Arc::new(SystemClock),
    )
    .context("build application")?;
    let mut session = Session::new(Arc::new(app));

    if cli.command.is_empty() {
        repl(&mut session).await?;
    } else {
        run_line(&mut session, &cli.command.join(" ")).await;
    }

    logging.shutdown(Duration::from_secs(2)).await;
    Ok(())
}

async fn repl(session: &mut Session<InMemoryStore>) -> Result<()> {
    let mut editor = DefaultEditor::new().context("start line editor")?;
    println!(
        "{} {} - type {} for commands",
        "shorty".bold(),
        env!("CARGO_PKG_VERSION"),
        "HELP".cyan()
    );

    loop {
        let prompt = if session.is_logged_in() {
            "shorty*> "
        } else {
            "shorty> "
        };
        match editor.readline(prompt) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                let _ = editor.add_history_entry(line.as_str());
                if run_line(session, &line).await {
                    break;
                }
            }
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
            Err(e) => return Err(e).context("read input"),
        }
    }
    Ok(())
}

/// Returns `true` when the console should exit.
async fn run_line(
    session: &mut Session<InMemoryStore>,
    line: &str,
) -> bool {
    let command = match line.parse::<Command>() {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{} {e}", "error:".red());
            return false;
        }
    };

    // Ctrl-C cancels the running command, not the console.
    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };
    let outcome = session.execute(command, &cancel).await;
    watcher.abort();
    if cancel.is_cancelled() {
        eprintln!("{}", "cancelled".yellow());
    }

    match outcome {
        Ok(Reply::Text(text)) => {
            println!("{text}");
            false
        }
        Ok(Reply::Quit) => true,
        Err(e) => {
            tracing::debug!(error = %e, "command failed");
            eprintln!(
                "{} {} ({})",
                "error:".red(),
                e.client_message(),
                e.status_code()
            );
            false
        }
    }
}
