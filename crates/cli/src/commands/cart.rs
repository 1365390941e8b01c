//! Cart commands.

use clap::Subcommand;
use medico_client::MedicoClient;
use medico_client::catalog;
use medico_client::notify::ConfirmRequest;
use medico_core::ProductId;

use super::CommandResult;
use super::prompt::Prompt;
use crate::output;

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Reload the cart from the server
    Sync,
    /// Add a product
    Add {
        /// Product ID (see `medico products`)
        id: ProductId,

        /// Number of units
        #[arg(long, default_value_t = 1)]
        qty: u32,
    },
    /// Add one unit of a product already in the cart
    Inc { id: ProductId },
    /// Remove one unit of a product
    Dec { id: ProductId },
    /// Remove a product entirely
    Remove { id: ProductId },
    /// Empty the cart
    Clear {
        /// Skip the confirmation
        #[arg(long)]
        yes: bool,
    },
}

pub async fn run(client: &MedicoClient, action: CartAction, prompt: &mut Prompt) -> CommandResult {
    let cart = client.cart();
    match action {
        CartAction::Show => {}
        CartAction::Sync => {
            cart.sync().await?;
        }
        CartAction::Add { id, qty } => {
            let product = catalog::find(id).ok_or_else(|| format!("Unknown product: {id}"))?;
            cart.add(&product, qty).await?;
        }
        CartAction::Inc { id } => cart.increase(id).await?,
        CartAction::Dec { id } => cart.decrease(id).await?,
        CartAction::Remove { id } => cart.remove(id).await?,
        CartAction::Clear { yes } => {
            if cart.cart().is_empty() {
                output::line("Your cart is already empty.");
                return Ok(());
            }
            let request = ConfirmRequest::new("Clear cart", "Remove every item from your cart?")
                .buttons("Clear", "Keep")
                .dangerous();
            if !yes && !prompt.confirm(client.dialogs(), request).await? {
                tracing::info!("cart clear cancelled");
                return Ok(());
            }
            cart.clear().await?;
        }
    }

    output::cart(&cart.cart());
    Ok(())
}
