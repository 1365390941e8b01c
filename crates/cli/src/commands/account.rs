//! Sign-in, sign-out and profile commands.

use clap::Subcommand;
use medico_client::MedicoClient;
use medico_client::notify::ConfirmRequest;
use medico_core::{Email, PhoneNumber};
use secrecy::SecretString;

use super::CommandResult;
use super::prompt::Prompt;
use crate::output;

#[derive(Subcommand)]
pub enum LoginAction {
    /// Text a one-time password to a phone number
    Otp { phone: PhoneNumber },
    /// Sign in as a customer with the texted OTP
    Verify { phone: PhoneNumber, otp: String },
    /// Sign in as an administrator (password is prompted for)
    Admin { email: Email },
}

#[derive(Subcommand)]
pub enum ProfileAction {
    /// Show the profile of whoever is signed in
    Show,
    /// List saved addresses
    Addresses,
    /// List address types
    AddressTypes,
    /// List family members
    Family,
}

pub async fn login(client: &MedicoClient, action: LoginAction, prompt: &mut Prompt) -> CommandResult {
    let api = client.api();
    match action {
        LoginAction::Otp { phone } => {
            let response = api.get_otp(&phone).await?;
            output::line(response.message.as_deref().unwrap_or("OTP sent"));
            return Ok(());
        }
        LoginAction::Verify { phone, otp } => {
            api.login(&phone, &otp).await?;
        }
        LoginAction::Admin { email } => {
            let password = SecretString::from(prompt.ask("Password").await?);
            api.admin_login(&email, &password).await?;
        }
    }

    // Merge the guest cart before reporting.
    client.cart().catch_up().await;
    output::session(client.auth().session().as_ref());
    if !client.cart().cart().is_empty() {
        output::cart(&client.cart().cart());
    }
    Ok(())
}

pub async fn logout(client: &MedicoClient, all: bool, prompt: &mut Prompt) -> CommandResult {
    if !client.auth().is_authenticated() {
        output::line("Not signed in.");
        return Ok(());
    }

    let request = if all {
        ConfirmRequest::new("Logout", "Sign out of every device?").dangerous()
    } else {
        ConfirmRequest::new("Logout", "Are you sure you want to logout?")
    };
    if !prompt.confirm(client.dialogs(), request).await? {
        return Ok(());
    }

    let result = if all {
        client.api().logout_all().await
    } else {
        client.api().logout().await
    };
    client.cart().catch_up().await;
    result?;
    output::line("Signed out.");
    Ok(())
}

pub fn whoami(client: &MedicoClient) {
    output::session(client.auth().session().as_ref());
    output::line(format!("Cart: {:?}", client.cart().mode()));
}

pub async fn profile(client: &MedicoClient, action: ProfileAction) -> CommandResult {
    let api = client.api();
    match action {
        ProfileAction::Show if client.auth().is_admin() => {
            let profile = api.admin_profile().await?;
            output::line(format!("{} ({})", profile.name, profile.phone_number));
            if let Some(pic) = profile.profile_pic {
                output::line(format!("Profile picture: #{pic}"));
            }
        }
        ProfileAction::Show => {
            let profile = api.customer_profile().await?;
            output::line(format!(
                "{}  {}",
                profile.name.as_deref().unwrap_or("(no name)"),
                profile.email.as_deref().unwrap_or("(no email)")
            ));
            if let Some(blood_group) = &profile.blood_group {
                output::line(format!("Blood group: {blood_group}"));
            }
            if let Some(dob) = &profile.dob {
                output::line(format!("Date of birth: {dob}"));
            }
        }
        ProfileAction::Addresses => {
            let addresses = api.customer_addresses().await?;
            if addresses.is_empty() {
                output::line("No saved addresses.");
            }
            for address in addresses {
                let parts: Vec<&str> = [
                    &address.house_no,
                    &address.street_name,
                    &address.locality,
                    &address.city,
                    &address.state,
                    &address.pincode,
                ]
                .into_iter()
                .filter_map(|part| part.as_deref())
                .collect();
                output::line(parts.join(", "));
            }
        }
        ProfileAction::AddressTypes => {
            for kind in api.address_types().await? {
                output::line(format!("{:>4}  {}", kind.type_id, kind.name));
            }
        }
        ProfileAction::Family => {
            let members = api.family_members().await?;
            if members.is_empty() {
                output::line("No family members.");
            }
            for member in members {
                output::line(format!(
                    "{:>4}  {} ({}){}",
                    member.member_id,
                    member.name,
                    member.relation,
                    member.age.map(|age| format!(", {age}")).unwrap_or_default()
                ));
            }
        }
    }
    Ok(())
}
