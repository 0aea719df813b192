//! Forwarding helper tools (socat, gost) on the backend host.

use super::output::{print_json, OutputFormat};
use super::ui::{finish_progress_success, print_info, print_kv_colored, print_warning};
use super::with_progress;
use crate::client::ApiClient;
use natter_console_core::render::StatusClass;
use natter_console_core::ConsoleError;
use serde_json::json;

/// Tools the backend knows how to check and install.
pub const KNOWN_TOOLS: &[&str] = &["socat", "gost"];

/// Forward methods that need an external helper.
pub fn tool_for_method(method: &str) -> Option<&'static str> {
    match method {
        "socat" => Some("socat"),
        "gost" => Some("gost"),
        _ => None,
    }
}

fn known(tool: &str) -> Result<(), ConsoleError> {
    if KNOWN_TOOLS.contains(&tool) {
        Ok(())
    } else {
        Err(ConsoleError::validation(format!(
            "unknown tool '{}', expected one of {}",
            tool,
            KNOWN_TOOLS.join(", ")
        )))
    }
}

pub async fn check_tool(client: &ApiClient, tool: &str, output: OutputFormat) -> anyhow::Result<bool> {
    known(tool)?;
    let check = client.check_tool(tool).await?;
    match output {
        OutputFormat::Json => print_json(&check)?,
        OutputFormat::Table => {
            if check.installed {
                print_kv_colored(tool, "installed", StatusClass::Success);
            } else {
                print_kv_colored(tool, "not installed", StatusClass::Danger);
                if let Some(err) = &check.error {
                    print_warning(err);
                }
            }
        }
    }
    Ok(check.installed)
}

pub async fn install_tool(client: &ApiClient, tool: &str, output: OutputFormat) -> anyhow::Result<()> {
    known(tool)?;
    match output {
        OutputFormat::Json => {
            let message = client.install_tool(tool).await?;
            print_json(&json!({ "success": true, "message": message }))?;
        }
        OutputFormat::Table => {
            let message = with_progress(
                &format!("Installing {}", tool),
                "Installation failed",
                client.install_tool(tool),
            )
            .await?;
            finish_progress_success(&format!("{} installed", tool));
            if !message.is_empty() {
                print_info(&message);
            }
        }
    }
    Ok(())
}
