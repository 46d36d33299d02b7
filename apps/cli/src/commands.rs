//! CLI command definitions, routing, and tracing setup.

use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use serde_json::json;
use tracing::{info, warn};

use bibresolve_core::{Annotator, CancellationToken, Resolution, ResolveFailure, Resolver};
use bibresolve_providers::{ChatCompletionClient, HttpExecutor, RequestExecutor};
use bibresolve_shared::{AppConfig, init_config, load_config};

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// bibresolve: bibliographic metadata from public catalogues.
#[derive(Parser)]
#[command(
    name = "bibresolve",
    version,
    about = "Resolve ISBNs, titles, and URLs into canonical bibliographic records.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Look up a book by ISBN-10 or ISBN-13.
    Isbn {
        /// ISBN; hyphens and spaces are ignored.
        isbn: String,

        /// Add generated keywords and a summary.
        #[arg(long)]
        annotate: bool,
    },

    /// Search by title, optionally narrowed by author.
    Title {
        title: String,

        #[arg(short, long, default_value = "")]
        author: String,

        /// Add generated keywords and a summary.
        #[arg(long)]
        annotate: bool,
    },

    /// Describe a web page, PDF, or video URL.
    Url {
        url: String,

        /// Add generated keywords and a summary.
        #[arg(long)]
        annotate: bool,
    },

    /// Configuration management.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr; stdout carries
/// the JSON result.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "bibresolve=info",
        1 => "bibresolve=debug",
        _ => "bibresolve=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

enum Query {
    Isbn(String),
    Title { title: String, author: String },
    Url(String),
}

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Isbn { isbn, annotate } => cmd_resolve(Query::Isbn(isbn), annotate).await,
        Command::Title {
            title,
            author,
            annotate,
        } => cmd_resolve(Query::Title { title, author }, annotate).await,
        Command::Url { url, annotate } => cmd_resolve(Query::Url(url), annotate).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

async fn cmd_resolve(query: Query, annotate: bool) -> Result<()> {
    let config = load_config()?;
    let executor: Arc<dyn RequestExecutor> = Arc::new(HttpExecutor::new(&config.http)?);

    // Fail on a missing API key before spending any provider requests.
    let annotator = if annotate {
        let client = ChatCompletionClient::from_config(executor.clone(), &config)?;
        Some(Annotator::new(Arc::new(client)))
    } else {
        None
    };

    let resolver = Resolver::standard(executor, &config);
    let cancel = CancellationToken::new();
    spawn_ctrl_c(cancel.clone());

    let outcome = match &query {
        Query::Isbn(isbn) => resolver.resolve_isbn_with(isbn, &cancel).await,
        Query::Title { title, author } => {
            resolver
                .resolve_title_author_with(title, author, &cancel)
                .await
        }
        Query::Url(url) => resolver.resolve_url_with(url, &cancel).await,
    };

    let mut resolution = match outcome {
        Ok(resolution) => resolution,
        Err(failure) => return report_failure(failure),
    };

    if let Some(annotator) = annotator {
        resolution.record = annotator.annotate(&resolution.record).await?;
    }

    print_resolution(&resolution)
}

/// Cancel the resolution on the first Ctrl-C.
fn spawn_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            cancel.cancel();
        }
    });
}

fn print_resolution(resolution: &Resolution) -> Result<()> {
    info!(
        provider = %resolution.provider,
        id = %resolution.record.id,
        "record resolved"
    );
    println!("{}", serde_json::to_string_pretty(resolution)?);
    Ok(())
}

fn report_failure(failure: ResolveFailure) -> Result<()> {
    let report = json!({
        "error": failure.error.to_string(),
        "attempts": &failure.attempts,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Err(eyre!(failure))
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}
