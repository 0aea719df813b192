//! Service management operations.

use super::clipboard::copy_to_clipboard;
use super::output::{print_json, OutputFormat};
use super::paint::{detail_frame, services_frame};
use super::ui::{
    finish_progress_success, print_error, print_header, print_hint, print_info, print_kv,
    print_success,
};
use super::{confirm, with_progress};
use crate::client::ApiClient;
use crossterm::style::Stylize;
use natter_console_core::render::{copyable_address, now_epoch, render_service_detail, render_services};
use natter_console_core::{build_args, CommandMode, StartRequest};
use serde_json::json;

/// Everything needed to start a service besides the backend.
#[derive(Debug, Clone)]
pub struct StartOptions {
    pub mode: CommandMode,
    pub auto_restart: bool,
    pub remark: Option<String>,
    pub group_id: Option<String>,
}

impl StartOptions {
    /// Validate and build the request; nothing is sent when this fails.
    pub fn to_request(&self) -> natter_console_core::Result<StartRequest> {
        Ok(StartRequest {
            args: build_args(&self.mode)?,
            auto_restart: self.auto_restart,
            remark: self
                .remark
                .as_deref()
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(str::to_string),
            group_id: self.group_id.clone().filter(|g| !g.is_empty()),
        })
    }
}

/// List services.
pub async fn list_services(client: &ApiClient, output: OutputFormat) -> anyhow::Result<()> {
    let services = client.list_services().await?;
    match output {
        OutputFormat::Json => print_json(&services)?,
        OutputFormat::Table => {
            println!();
            print!("{}", services_frame(&render_services(&services, now_epoch())));
            println!();
        }
    }
    Ok(())
}

/// Show one service with its latest output.
pub async fn get_service(client: &ApiClient, id: &str, output: OutputFormat) -> anyhow::Result<()> {
    let service = client.get_service(id).await?;
    match output {
        OutputFormat::Json => print_json(&service)?,
        OutputFormat::Table => {
            println!();
            print!("{}", detail_frame(&render_service_detail(&service, now_epoch())));
            println!();
        }
    }
    Ok(())
}

/// Start a new service from form fields or raw arguments.
pub async fn start_service(
    client: &ApiClient,
    opts: &StartOptions,
    output: OutputFormat,
) -> anyhow::Result<String> {
    let req = match opts.to_request() {
        Ok(req) => req,
        Err(e) => {
            if output == OutputFormat::Table {
                print_error(&e.to_string());
            }
            return Err(e.into());
        }
    };

    match output {
        OutputFormat::Json => {
            let id = client.start_service(&req).await?;
            print_json(&json!({ "service_id": id }))?;
            Ok(id)
        }
        OutputFormat::Table => {
            print_header("▶️  START SERVICE");
            print_kv("Command", &format!("natter.py {}", req.args.join(" ")).yellow().to_string());
            println!();
            let id = with_progress(
                "Starting service",
                "Failed to start",
                client.start_service(&req),
            )
            .await?;
            finish_progress_success("Service started");
            println!();
            print_kv("Service ID", &id.as_str().cyan().to_string());
            println!();
            print_hint(&format!("Use 'get {}' to follow its mapping", id));
            Ok(id)
        }
    }
}

/// Stop service.
pub async fn stop_service(
    client: &ApiClient,
    id: &str,
    assume_yes: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    if !confirm(&format!("Stop service {}?", id), assume_yes)? {
        print_info("Cancelled.");
        return Ok(());
    }
    match output {
        OutputFormat::Json => {
            client.stop_service(id).await?;
            print_json(&json!({ "success": true }))?;
        }
        OutputFormat::Table => {
            with_progress("Stopping service", "Failed to stop", client.stop_service(id)).await?;
            finish_progress_success(&format!("Service '{}' stopped", id));
        }
    }
    Ok(())
}

/// Restart service.
pub async fn restart_service(
    client: &ApiClient,
    id: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    match output {
        OutputFormat::Json => {
            client.restart_service(id).await?;
            print_json(&json!({ "success": true }))?;
        }
        OutputFormat::Table => {
            with_progress(
                "Restarting service",
                "Failed to restart",
                client.restart_service(id),
            )
            .await?;
            finish_progress_success(&format!("Service '{}' restarted", id));
        }
    }
    Ok(())
}

/// Delete a service.
pub async fn delete_service(
    client: &ApiClient,
    id: &str,
    assume_yes: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    if !confirm(
        &format!("Delete service {}? This cannot be undone", id),
        assume_yes,
    )? {
        print_info("Cancelled.");
        return Ok(());
    }
    match output {
        OutputFormat::Json => {
            client.delete_service(id).await?;
            print_json(&json!({ "success": true }))?;
        }
        OutputFormat::Table => {
            with_progress("Deleting service", "Failed to delete", client.delete_service(id))
                .await?;
            finish_progress_success(&format!("Service '{}' deleted", id));
        }
    }
    Ok(())
}

/// Stop every running service.
pub async fn stop_all_services(
    client: &ApiClient,
    assume_yes: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    if !confirm("Stop ALL running services?", assume_yes)? {
        print_info("Cancelled.");
        return Ok(());
    }
    match output {
        OutputFormat::Json => {
            let count = client.stop_all_services().await?;
            print_json(&json!({ "success": true, "stopped_count": count }))?;
        }
        OutputFormat::Table => {
            let count = with_progress(
                "Stopping all services",
                "Failed to stop services",
                client.stop_all_services(),
            )
            .await?;
            finish_progress_success(&format!("Stopped {} service(s)", count));
        }
    }
    Ok(())
}

pub async fn set_auto_restart(
    client: &ApiClient,
    id: &str,
    enabled: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    client.set_auto_restart(id, enabled).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true, "enabled": enabled }))?,
        OutputFormat::Table => print_success(&format!(
            "Auto restart {} for '{}'",
            if enabled { "enabled" } else { "disabled" },
            id
        )),
    }
    Ok(())
}

pub async fn clear_logs(client: &ApiClient, id: &str, output: OutputFormat) -> anyhow::Result<()> {
    client.clear_logs(id).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success(&format!("Logs cleared for '{}'", id)),
    }
    Ok(())
}

pub async fn set_remark(
    client: &ApiClient,
    id: &str,
    remark: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    client.set_remark(id, remark.trim()).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success(&format!("Remark updated for '{}'", id)),
    }
    Ok(())
}

/// Copy the mapped address of a service to the clipboard.
pub async fn copy_address(client: &ApiClient, id: &str, output: OutputFormat) -> anyhow::Result<()> {
    let service = client.get_service(id).await?;
    let Some(address) = copyable_address(service.mapped_address.as_deref()) else {
        anyhow::bail!("service {} has no mapped address yet", id);
    };
    match output {
        OutputFormat::Json => print_json(&json!({ "address": address }))?,
        OutputFormat::Table => {
            copy_to_clipboard(&address)?;
            print_success(&format!("Copied {} to clipboard", address));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_backend;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use natter_console_core::{BasicOptions, ConsoleError, TokenStore};
    use serde_json::Value;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn missing_port_fails_before_any_request() {
        let opts = StartOptions {
            mode: CommandMode::Basic(BasicOptions {
                udp: true,
                ..Default::default()
            }),
            auto_restart: false,
            remark: None,
            group_id: None,
        };
        let err = opts.to_request().unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }

    #[test]
    fn blank_remark_and_group_are_dropped() {
        let opts = StartOptions {
            mode: CommandMode::Advanced("-p 9000".into()),
            auto_restart: true,
            remark: Some("   ".into()),
            group_id: Some(String::new()),
        };
        let req = opts.to_request().unwrap();
        assert_eq!(req.remark, None);
        assert_eq!(req.group_id, None);
        assert_eq!(req.args, vec!["-p", "9000"]);
    }

    #[tokio::test]
    async fn invalid_form_sends_nothing() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/api/services/start",
            post(move |Json(_): Json<Value>| {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(json!({ "service_id": "x" })) }
            }),
        );
        let base = spawn_backend(router).await;
        let client = ApiClient::new(base, TokenStore::memory(None)).unwrap();
        let opts = StartOptions {
            mode: CommandMode::Advanced("   ".into()),
            auto_restart: false,
            remark: None,
            group_id: None,
        };
        assert!(start_service(&client, &opts, OutputFormat::Json).await.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn copy_refuses_pending_address() {
        let router = Router::new().route(
            "/api/service",
            get(|| async { Json(json!({ "service": { "id": "a", "status": "waiting" } })) }),
        );
        let base = spawn_backend(router).await;
        let client = ApiClient::new(base, TokenStore::memory(None)).unwrap();
        let err = copy_address(&client, "a", OutputFormat::Json).await.unwrap_err();
        assert!(err.to_string().contains("no mapped address"));
    }
}
