//! Herald CLI entry point.
//!
//! Provides `send`, `validate`, and `providers` subcommands for dispatching
//! an email, checking addresses, and health-checking the configured providers.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use herald::config::{self, Config};
use herald::service::EmailService;
use herald::types::{Priority, SendOptions};

/// Herald: resilient email dispatch through a provider chain.
#[derive(Parser)]
#[command(name = "herald", version, about)]
struct Cli {
    /// Path to `config.toml` (defaults to `$HERALD_CONFIG`, then `~/.herald/config.toml`).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

/// Available CLI subcommands.
#[derive(Subcommand)]
enum Command {
    /// Send an email to one or more addresses.
    Send {
        /// Recipient address; repeat for several.
        #[arg(long = "to", required = true)]
        to: Vec<String>,
        /// Subject line.
        #[arg(long)]
        subject: String,
        /// Plain-text body.
        #[arg(long, conflicts_with = "body_file")]
        body: Option<String>,
        /// Read the body from a file.
        #[arg(long)]
        body_file: Option<PathBuf>,
        /// Send the body as HTML.
        #[arg(long)]
        html: bool,
        /// Template identifier forwarded to the providers.
        #[arg(long)]
        template: Option<String>,
        /// Delivery priority.
        #[arg(long, value_enum, default_value_t = PriorityArg::Medium)]
        priority: PriorityArg,
    },
    /// Check addresses without sending anything.
    Validate {
        /// Addresses to check.
        #[arg(required = true)]
        addresses: Vec<String>,
    },
    /// Health-check every configured provider.
    Providers,
}

/// CLI spelling of [`Priority`].
#[derive(Clone, Copy, clap::ValueEnum)]
enum PriorityArg {
    Low,
    Medium,
    High,
}

impl From<PriorityArg> for Priority {
    fn from(value: PriorityArg) -> Self {
        match value {
            PriorityArg::Low => Priority::Low,
            PriorityArg::Medium => Priority::Medium,
            PriorityArg::High => Priority::High,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    // A missing .env is fine; tokens may come from the real environment.
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    match cli.command {
        Command::Validate { addresses } => handle_validate(&addresses),
        Command::Send {
            to,
            subject,
            body,
            body_file,
            html,
            template,
            priority,
        } => {
            let body = read_body(body, body_file)?;
            let options = SendOptions {
                html,
                html_content: html.then(|| body.clone()),
                template_id: template,
                priority: priority.into(),
            };
            let (config, _guard) = bootstrap(cli.config)?;
            handle_send(&config, &to, &subject, &body, &options).await
        }
        Command::Providers => {
            let (config, _guard) = bootstrap(cli.config)?;
            handle_providers(&config).await
        }
    }
}

/// Load configuration and start logging.
fn bootstrap(
    explicit: Option<PathBuf>,
) -> anyhow::Result<(Config, Option<herald::logging::LoggingGuard>)> {
    let path = config::resolve_config_path(explicit.as_deref(), |k| std::env::var(k).ok())?;
    let config = config::load_or_default(&path)
        .with_context(|| format!("failed to load {}", path.display()))?;

    let guard = match &config.logging.directory {
        Some(dir) => Some(herald::logging::init_production(dir, &config.logging.level)?),
        None => {
            herald::logging::init_cli(&config.logging.level);
            None
        }
    };
    info!(config = %path.display(), "configuration loaded");
    Ok((config, guard))
}

fn read_body(body: Option<String>, body_file: Option<PathBuf>) -> anyhow::Result<String> {
    match (body, body_file) {
        (Some(body), _) => Ok(body),
        (None, Some(path)) => std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read body from {}", path.display())),
        (None, None) => anyhow::bail!("either --body or --body-file is required"),
    }
}

fn handle_validate(addresses: &[String]) -> anyhow::Result<ExitCode> {
    let check = herald::validation::validate_email_list(addresses);
    println!("{}", serde_json::to_string_pretty(&check)?);
    Ok(if check.invalid.is_empty() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn handle_send(
    config: &Config,
    to: &[String],
    subject: &str,
    body: &str,
    options: &SendOptions,
) -> anyhow::Result<ExitCode> {
    let service = EmailService::from_config(config, |k| std::env::var(k).ok())?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, finishing current batch");
            on_signal.cancel();
        }
    });

    let outcome = service
        .send_to_specific_emails_cancellable(to, subject, body, options, &cancel)
        .await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(if outcome.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn handle_providers(config: &Config) -> anyhow::Result<ExitCode> {
    let service = EmailService::from_config(config, |k| std::env::var(k).ok())?;
    let statuses = service.provider_status().await;
    println!("{}", serde_json::to_string_pretty(&statuses)?);
    Ok(ExitCode::SUCCESS)
}
