//! Medico CLI - command-line front end for the Medico Store.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog
//! medico products --popular
//! medico products --image ~/Downloads/glucometer.jpg
//!
//! # Ask the symptom checker
//! medico symptom I have a headache
//!
//! # Guest cart
//! medico cart add 5 --qty 2
//! medico cart show
//!
//! # Interactive session (the access token only lives as long as the process)
//! medico shell
//! ```
//!
//! # Commands
//!
//! - `products` - List products
//! - `symptom` - Get medicine suggestions for a symptom
//! - `cart` - Show and edit the cart
//! - `login` / `logout` / `whoami` - Sign in and out
//! - `profile` - Show profile, addresses and family members
//! - `route` - Resolve an app route for the current user
//! - `shell` - Run commands interactively

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use medico_client::storage::FileStore;
use medico_client::{ClientConfig, MedicoClient};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod output;

use commands::Command;
use commands::prompt::Prompt;

#[derive(Parser)]
#[command(name = "medico")]
#[command(author, version, about = "Medico Store command-line client")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ClientConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let config = ClientConfig::from_env();
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "medico_client=info,medico_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(config, cli.command).await,
        Err(e) => Err(e.into()),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Command failed: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(config: ClientConfig, command: Command) -> Result<(), Box<dyn std::error::Error>> {
    let store = FileStore::open(&config.storage_dir)?;
    let client = MedicoClient::connect(config, Arc::new(store))?;

    let mut prompt = Prompt::stdin();

    match command {
        Command::Shell => commands::shell::run(&client, &mut prompt).await,
        command => commands::run(&client, command, &mut prompt).await,
    }
}
