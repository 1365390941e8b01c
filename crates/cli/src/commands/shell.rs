//! Interactive shell.
//!
//! The access token is never written to disk, so commands that need a
//! signed-in customer only work within one shell session.

use clap::Parser;
use medico_client::MedicoClient;

use super::prompt::Prompt;
use super::{Command, CommandResult};
use crate::output;

#[derive(Parser)]
#[command(no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: Command,
}

pub async fn run(client: &MedicoClient, prompt: &mut Prompt) -> CommandResult {
    output::line("Medico shell. Type `help` for commands, `exit` to quit.");
    output::session(client.auth().session().as_ref());

    loop {
        output::ask("medico");
        let Some(line) = prompt.read_line().await? else {
            break;
        };
        let words: Vec<&str> = line.split_whitespace().collect();
        match words.as_slice() {
            [] => continue,
            ["exit" | "quit"] => break,
            _ => {}
        }

        let parsed = match ShellLine::try_parse_from(words.iter().copied()) {
            Ok(parsed) => parsed,
            Err(e) => {
                output::line(e.render());
                continue;
            }
        };
        if let Err(e) = super::run(client, parsed.command, prompt).await {
            tracing::error!("Command failed: {e}");
        }
    }

    Ok(())
}
