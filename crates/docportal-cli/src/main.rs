//! docportal - command-line portal for the medical document service.
//!
//! Log in once, then browse categories, upload and tag documents, and send
//! feedback. Expired access tokens are refreshed transparently; when that is
//! impossible the stored session is cleared and you are asked to log in again.

mod commands;

use std::io;
use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use docportal_core::{Config, PortalApi, SessionEvent};

/// Log file prefix inside `log_dir`
const LOG_FILE_PREFIX: &str = "docportal.log";

#[derive(Parser)]
#[command(name = "docportal")]
#[command(about = "Command-line portal for the medical document service", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// UI language sent to the service (en or de)
    #[arg(short, long, global = true)]
    locale: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Sign in and store the session
    Login {
        /// Account email (defaults to DOCPORTAL_EMAIL or the last used email)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Clear the stored session
    Logout,

    /// Show session and configuration status
    Status,

    /// List document categories
    Categories,

    /// List content, optionally within one category
    Contents {
        /// Category id
        #[arg(short, long)]
        category: Option<i64>,

        /// Page number
        #[arg(short, long, default_value = "1")]
        page: u32,
    },

    /// Show one content item
    Show {
        /// Content id
        id: i64,
    },

    /// Upload a new content item
    Add {
        /// Category id
        #[arg(short, long)]
        category: i64,

        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        notes: String,

        /// Media file to attach
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Tag id (repeatable)
        #[arg(long = "tag")]
        tags: Vec<i64>,
    },

    /// Edit an existing content item
    Edit {
        /// Content id
        id: i64,

        #[arg(short, long)]
        title: Option<String>,

        #[arg(short, long)]
        notes: Option<String>,

        /// Media files to attach (repeatable)
        #[arg(short, long = "file")]
        files: Vec<PathBuf>,

        /// Replace the tags with these ids (repeatable)
        #[arg(long = "tag")]
        tags: Option<Vec<i64>>,
    },

    /// List tags
    Tags,

    /// Create a tag
    TagAdd {
        /// Tag name
        name: String,
    },

    /// Send feedback to the support team
    Feedback {
        #[arg(short, long)]
        title: String,

        #[arg(short, long)]
        message: String,
    },

    /// Search categories and tags by name
    Search {
        query: String,
    },
}

/// Initialize the tracing subscriber for logging.
/// Returns the file writer guard, which must stay alive until exit.
fn init_tracing(verbose: bool, log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

/// Caller-level handler for session events: the data layer only reports a
/// terminated session, this is where the user gets told and sent to login.
fn spawn_session_listener(mut events: broadcast::Receiver<SessionEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(SessionEvent::Refreshed) => debug!("Session refreshed"),
                Ok(SessionEvent::Terminated { notice, redirect, reason }) => {
                    debug!(reason = %reason, redirect = %redirect, "Session terminated");
                    eprintln!("{}", notice);
                    eprintln!("Run `docportal login` to sign in again.");
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped = skipped, "Missed session events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let config = match Config::load() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Warning: failed to load config ({:#}), using defaults", e);
            Config::default()
        }
    }
    .with_env_overrides();

    let _log_guard = init_tracing(cli.verbose, config.log_dir.as_deref());
    info!(base_url = config.base_url(), "docportal starting");

    let locale = cli.locale.clone().unwrap_or_else(|| config.locale().to_string());
    let session = config.session_client()?;
    let listener = spawn_session_listener(session.subscribe());
    let api = PortalApi::new(session, &locale);

    let result = commands::run(cli.command, &api, config).await;

    // Dropping the last client closes the event channel so the listener can
    // flush pending notices and exit.
    drop(api);
    let _ = listener.await;

    result
}
