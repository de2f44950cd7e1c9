//! Feedback Desk CLI - headless console for pending feedback sessions
//!
//! Uses the feedback store from feedback-core, sharing the tab selection
//! and bulk-close logic with the desktop console.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{CommandFactory, Parser, Subcommand};
use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use feedback_core::config::{Config, ConfigManager};
use feedback_core::feedback::{FeedbackData, FeedbackStore, FeedbackTab, StoreEvent};
use feedback_core::server::DEFAULT_CONTEXT;
use feedback_core::{
    client_config, source_from_env, AiSource, FeedbackBackend, FeedbackOutcome, FeedbackRequester,
    FileBackend, RequestWatcher, ScanMode, ToolServer,
};

#[derive(Parser)]
#[command(name = "feedback-desk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Console for feedback requests raised by AI tools", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run as the tool server an AI client launches (JSON-RPC on stdio)
    #[arg(long = "mcp-mode")]
    mcp_mode: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Exchange directory shared with the tool server
    #[arg(long, global = true)]
    storage: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Watch for feedback requests and print tab changes until Ctrl-C
    Watch,

    /// List pending feedback requests
    List,

    /// Answer a feedback session
    Submit {
        /// Session id
        session_id: String,
        /// Feedback text
        content: String,
    },

    /// Raise a feedback request and wait for the answer
    Request {
        /// Text shown to the user
        ai_response: String,
        /// Tab title
        #[arg(long)]
        context: Option<String>,
        /// Source tag (defaults to $MCP_SOURCE)
        #[arg(long)]
        source: Option<String>,
    },

    /// Cancel a feedback session
    Cancel {
        /// Session id
        session_id: String,
    },

    /// Cancel every pending feedback session
    CloseAll,

    /// Show configuration
    Config,

    /// Print the MCP client configuration for an AI tool
    ClientConfig {
        /// cursor, augment, claude-desktop, chatgpt or a custom name
        source: String,
    },
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let manager = match &cli.config {
        Some(path) => ConfigManager::with_path(path.clone())?,
        None => ConfigManager::new()?,
    };
    let mut config = manager.config().clone();
    if let Some(storage) = &cli.storage {
        config.storage.root_dir = Some(storage.clone());
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // warn by default so logs don't interleave with command output
    let default_filter = if cli.verbose {
        "info,feedback_core=debug"
    } else {
        "warn"
    };
    // stdout carries command output, or the JSON-RPC stream in tool-server mode
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();

    let config = load_config(&cli)?;
    let backend = Arc::new(FileBackend::from_config(&config.storage));

    if cli.mcp_mode {
        let requester = FeedbackRequester::new(backend, source_from_env());
        let reader = tokio::io::BufReader::new(tokio::io::stdin());
        ToolServer::new(requester)
            .serve(reader, tokio::io::stdout())
            .await?;
        return Ok(());
    }

    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    match command {
        Commands::Watch => run_watch(&config, backend).await?,
        Commands::List => {
            let store = load_pending(&config, backend).await?;
            print_tabs(&store.tabs(), &store.active_id());
        }
        Commands::Submit {
            session_id,
            content,
        } => {
            backend.submit(&session_id, &content).await?;
            println!("{} {}", style("✓").green(), style(format!("Feedback sent to {}", session_id)).dim());
        }
        Commands::Request {
            ai_response,
            context,
            source,
        } => {
            let requester = FeedbackRequester::new(backend, source.unwrap_or_else(source_from_env));
            let session_id = requester
                .open(&ai_response, context.as_deref().unwrap_or(DEFAULT_CONTEXT))
                .await?;
            println!("{} {}", style("Waiting for feedback on").dim(), style(&session_id).cyan());
            match requester.wait(&session_id).await? {
                FeedbackOutcome::Response(feedback) => println!("{}", feedback),
                FeedbackOutcome::Cancelled => {
                    println!("{}", style("Feedback session was cancelled").yellow())
                }
            }
        }
        Commands::Cancel { session_id } => {
            backend.cancel(&session_id).await?;
            println!("{} {}", style("✓").green(), style(format!("Cancelled {}", session_id)).dim());
        }
        Commands::CloseAll => {
            let store = load_pending(&config, backend).await?;
            let report = store.close_all().await;
            if report.total() == 0 {
                println!("{}", style("No pending feedback sessions").dim());
            }
            for message in store.notifications() {
                println!("{}", message);
            }
        }
        Commands::Config => show_config(&config)?,
        Commands::ClientConfig { source } => {
            let source: AiSource = source.parse()?;
            let exe_path = std::env::current_exe()?.to_string_lossy().to_string();
            println!("{}", serde_json::to_string_pretty(&client_config(&source, &exe_path))?);
        }
    }

    Ok(())
}

/// Fresh store populated from one full scan of the request directory
async fn load_pending(config: &Config, backend: Arc<FileBackend>) -> anyhow::Result<Arc<FeedbackStore>> {
    let store = Arc::new(FeedbackStore::new(&config.tabs, backend.clone()));
    let watcher = RequestWatcher::new(backend, store.clone(), config.storage.clone());
    watcher.scan(ScanMode::Full).await?;
    Ok(store)
}

async fn run_watch(config: &Config, backend: Arc<FileBackend>) -> anyhow::Result<()> {
    let store = Arc::new(FeedbackStore::new(&config.tabs, backend.clone()));
    let mut events = store.subscribe();
    let shutdown = CancellationToken::new();

    println!(
        "{} {}",
        style("Watching").bold(),
        style(backend.requests_dir().display()).green()
    );

    // Terminal bell for requests arriving while we watch
    let watcher = RequestWatcher::new(backend, store.clone(), config.storage.clone())
        .with_arrival_hook(Arc::new(|_: &FeedbackData| eprint!("\x07")));
    let watcher_task = tokio::spawn(watcher.run(shutdown.clone()));

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            event = events.recv() => match event {
                Ok(event) => {
                    print_event(&event);
                    if matches!(
                        event,
                        StoreEvent::SessionAdded { .. }
                            | StoreEvent::SessionRemoved { .. }
                            | StoreEvent::ActiveChanged { .. }
                    ) {
                        print_tabs(&store.tabs(), &store.active_id());
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!("Event stream lagged, skipped {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    shutdown.cancel();
    watcher_task.await?;
    Ok(())
}

fn print_event(event: &StoreEvent) {
    match event {
        StoreEvent::SessionAdded { id } => println!("{} {}", style("+").green(), id),
        StoreEvent::SessionUpdated { id } => println!("{} {}", style("~").yellow(), id),
        StoreEvent::SessionRemoved { id } => println!("{} {}", style("-").red(), id),
        StoreEvent::NotificationAdded { message } => {
            println!("{} {}", style("!").yellow().bold(), message)
        }
        _ => {}
    }
}

fn print_tabs(tabs: &[FeedbackTab], active_id: &str) {
    if tabs.is_empty() {
        println!("  {}", style("No pending feedback sessions").dim());
        return;
    }

    println!("{}", style("Feedback Sessions:").bold());
    for tab in tabs {
        let marker = if tab.id == active_id { "▶" } else { " " };
        let new_badge = if tab.is_new {
            style("new").yellow().to_string()
        } else {
            String::new()
        };
        println!(
            "  {} {:<24} {:<40} {:<16} {}",
            style(marker).cyan(),
            style(&tab.id).cyan(),
            tab.title,
            style(tab.ai_source_display.as_deref().unwrap_or("-")).dim(),
            new_badge
        );
    }
}

fn show_config(config: &Config) -> anyhow::Result<()> {
    println!("{}", style("Configuration:").bold());
    println!();
    println!(
        "  Config file: {}",
        style(
            ConfigManager::default_config_path()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|_| "N/A".to_string())
        )
        .dim()
    );
    println!("  Exchange dir: {}", style(config.storage.root().display()).green());
    println!();
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config_launches_tool_server() {
        let config = client_config(&AiSource::Cursor, "feedback-desk");
        let server = &config["mcpServers"][feedback_core::source::SERVER_KEY];

        let mut argv = vec![server["command"].as_str().unwrap().to_string()];
        for arg in server["args"].as_array().unwrap() {
            argv.push(arg.as_str().unwrap().to_string());
        }

        let cli = Cli::try_parse_from(argv).unwrap();
        assert!(cli.mcp_mode);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_request_subcommand() {
        let cli = Cli::try_parse_from([
            "feedback-desk",
            "request",
            "Draft ready",
            "--context",
            "Review",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Request {
                ai_response,
                context,
                source,
            }) => {
                assert_eq!(ai_response, "Draft ready");
                assert_eq!(context.as_deref(), Some("Review"));
                assert!(source.is_none());
            }
            _ => panic!("expected request subcommand"),
        }
    }
}
