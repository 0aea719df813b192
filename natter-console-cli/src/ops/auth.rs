//! Session operations: login, logout, auth status.

use super::output::{print_json, OutputFormat};
use super::ui::{
    finish_progress_error, finish_progress_success, print_error, print_header, print_hint,
    print_kv, print_kv_colored, print_progress, print_success,
};
use crate::client::ApiClient;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Password;
use natter_console_core::render::StatusClass;
use serde_json::json;

/// Log in and persist the token. Prompts for the password when not given.
pub async fn login(
    client: &ApiClient,
    password: Option<String>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let password = match password {
        Some(p) => p,
        None => Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Console password")
            .interact()?,
    };

    match output {
        OutputFormat::Json => {
            client.login(&password).await?;
            print_json(&json!({ "success": true }))?;
        }
        OutputFormat::Table => {
            print_progress("Logging in");
            match client.login(&password).await {
                Ok(_) => {
                    finish_progress_success("Logged in");
                    print_hint("The token is stored for later commands; use 'logout' to forget it");
                }
                Err(e) => {
                    finish_progress_error("Login failed");
                    print_error(&e.to_string());
                    return Err(e.into());
                }
            }
        }
    }
    Ok(())
}

pub fn logout(client: &ApiClient, output: OutputFormat) -> anyhow::Result<()> {
    client.tokens().clear()?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success("Logged out"),
    }
    Ok(())
}

pub async fn auth_status(client: &ApiClient, output: OutputFormat) -> anyhow::Result<()> {
    let check = client.auth_check().await?;
    let has_token = client.tokens().token().is_some();
    match output {
        OutputFormat::Json => print_json(&json!({
            "auth_required": check.auth_required,
            "authenticated": check.authenticated,
            "token_stored": has_token,
        }))?,
        OutputFormat::Table => {
            print_header("🔐 AUTH STATUS");
            print_kv("Backend", client.base());
            print_kv(
                "Password",
                if check.auth_required { "required" } else { "not required" },
            );
            print_kv("Stored token", if has_token { "yes" } else { "no" });
            let (label, class) = match (check.auth_required, check.authenticated) {
                (false, _) => ("open", StatusClass::Success),
                (true, Some(false)) => ("not logged in", StatusClass::Danger),
                (true, _) if has_token => ("logged in", StatusClass::Success),
                (true, _) => ("not logged in", StatusClass::Danger),
            };
            print_kv_colored("Session", label, class);
            if check.auth_required && matches!(check.authenticated, Some(false)) {
                print_hint("Run 'natter-console login' to sign in");
            }
        }
    }
    Ok(())
}

pub async fn show_version(client: &ApiClient, output: OutputFormat) -> anyhow::Result<()> {
    let backend = client.version().await?;
    let console = env!("CARGO_PKG_VERSION");
    match output {
        OutputFormat::Json => print_json(&json!({ "backend": backend, "console": console }))?,
        OutputFormat::Table => {
            print_kv("Backend", &backend);
            print_kv("Console", console);
        }
    }
    Ok(())
}
