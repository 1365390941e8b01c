//! CLI command definitions and dispatch.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod prompt;
pub mod shell;

use std::path::PathBuf;

use clap::Subcommand;
use medico_client::MedicoClient;

use crate::output;
use prompt::Prompt;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

#[derive(Subcommand)]
pub enum Command {
    /// List products
    Products {
        /// Only the featured products
        #[arg(long, conflicts_with = "image")]
        popular: bool,

        /// Find products matching an image's file name
        #[arg(long, value_name = "FILE")]
        image: Option<PathBuf>,
    },
    /// Ask the symptom checker for medicine suggestions
    Symptom {
        /// How you are feeling, e.g. "I have a headache"
        #[arg(required = true, num_args = 1..)]
        text: Vec<String>,
    },
    /// Show and edit the cart
    Cart {
        #[command(subcommand)]
        action: cart::CartAction,
    },
    /// Sign in
    Login {
        #[command(subcommand)]
        action: account::LoginAction,
    },
    /// Sign out
    Logout {
        /// End every session of this account
        #[arg(long)]
        all: bool,
    },
    /// Show who is signed in
    Whoami,
    /// Show profile details
    Profile {
        #[command(subcommand)]
        action: account::ProfileAction,
    },
    /// Resolve an app route for the current user
    Route {
        /// Path such as `/admin` or `/orders`
        path: String,
    },
    /// Run commands interactively
    Shell,
}

/// Run one command, then print any notifications it raised.
pub async fn run(client: &MedicoClient, command: Command, prompt: &mut Prompt) -> CommandResult {
    client.cart().catch_up().await;

    let result = match command {
        Command::Products { popular, image } => {
            catalog::products(popular, image.as_deref());
            Ok(())
        }
        Command::Symptom { text } => catalog::symptom(client, &text.join(" ")).await,
        Command::Cart { action } => cart::run(client, action, prompt).await,
        Command::Login { action } => account::login(client, action, prompt).await,
        Command::Logout { all } => account::logout(client, all, prompt).await,
        Command::Whoami => {
            account::whoami(client);
            Ok(())
        }
        Command::Profile { action } => account::profile(client, action).await,
        Command::Route { path } => {
            output::navigation(&client.navigate(&path));
            Ok(())
        }
        Command::Shell => Err("already in the shell".into()),
    };

    output::toasts(client.toasts());
    result
}
