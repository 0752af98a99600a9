//! Init command implementation

use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};

use crate::client::ConsoleClient;
use crate::config::Config;
use crate::error::Result;

/// Run the init command
///
/// Signs in to the Spot console interactively and stores the access token
/// in the config file. Plain advisory queries work without this; live
/// market scores need it.
pub async fn run(config_path: Option<&str>) -> Result<()> {
    println!("{}", "Welcome to spotop!".bold().green());
    println!("Let's connect your Spot console account for live market scores.\n");

    let email: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Spot console email")
        .interact_text()?;

    let password: String = Password::with_theme(&ColorfulTheme::default())
        .with_prompt("Spot console password")
        .interact()?;

    let account_id: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Account ID (optional)")
        .allow_empty(true)
        .interact_text()?;

    println!("\n{}", "Signing in...".cyan());
    let client = ConsoleClient::new(None, None)?;
    let token = client.sign_in(&email, &password).await?;

    println!("{}", "✓ Sign-in successful!".green());

    // Keep existing preferences when re-initializing
    let mut config = Config::load_or_default(config_path);
    config.token = Some(token);
    config.account_id = if account_id.is_empty() {
        None
    } else {
        Some(account_id)
    };
    config.save_at(config_path)?;

    let path = Config::resolve_path(config_path)?;
    println!("\nConfiguration saved to {}", path.display().to_string().cyan());
    println!("Try: {}", "spotop advice --scores".bold());

    Ok(())
}
