//! Product listing and the symptom checker.

use std::path::Path;

use medico_client::MedicoClient;
use medico_client::catalog;

use super::CommandResult;
use crate::output;

pub fn products(popular: bool, image: Option<&Path>) {
    let products = match image {
        Some(path) => {
            let file_name = path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            tracing::debug!(%file_name, "searching by image");
            catalog::search_by_image(&file_name)
        }
        None if popular => catalog::popular_products(),
        None => catalog::products(),
    };
    output::products(&products);
}

pub async fn symptom(client: &MedicoClient, text: &str) -> CommandResult {
    let mut chat = client.symptom_chat();
    let reply = chat.send(text).await.ok_or("Tell me how you are feeling")?;
    output::reply(reply);
    output::line("Add a suggestion with `cart add <id>`.");
    Ok(())
}
