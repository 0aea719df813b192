//! Group operations.

use super::output::{print_json, OutputFormat};
use super::paint::groups_frame;
use super::ui::{finish_progress_success, print_info, print_kv, print_success};
use super::{confirm, with_progress};
use crate::client::ApiClient;
use crossterm::style::Stylize;
use natter_console_core::render::{mask_secret, render_groups};
use natter_console_core::ConsoleError;
use serde_json::json;

/// List groups; passwords stay masked unless `show_secrets`.
pub async fn list_groups(
    client: &ApiClient,
    show_secrets: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let mut groups = client.list_groups().await?;
    match output {
        OutputFormat::Json => {
            if !show_secrets {
                for group in &mut groups {
                    group.password = group.password.as_deref().map(mask_secret);
                }
            }
            print_json(&groups)?
        }
        OutputFormat::Table => {
            println!();
            print!("{}", groups_frame(&render_groups(&groups), show_secrets));
            println!();
        }
    }
    Ok(())
}

fn require_name(name: &str) -> Result<&str, ConsoleError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ConsoleError::validation("group name is required"));
    }
    Ok(name)
}

pub async fn create_group(
    client: &ApiClient,
    name: &str,
    password: Option<&str>,
    output: OutputFormat,
) -> anyhow::Result<String> {
    let name = require_name(name)?;
    let password = password.map(str::trim).filter(|p| !p.is_empty());
    let id = match output {
        OutputFormat::Json => {
            let id = client.create_group(name, password).await?;
            print_json(&json!({ "group_id": id }))?;
            id
        }
        OutputFormat::Table => {
            let id = with_progress(
                "Creating group",
                "Failed to create group",
                client.create_group(name, password),
            )
            .await?;
            finish_progress_success(&format!("Group '{}' created", name));
            print_kv("Group ID", &id.as_str().cyan().to_string());
            id
        }
    };
    Ok(id)
}

pub async fn update_group(
    client: &ApiClient,
    id: &str,
    name: &str,
    password: Option<&str>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let name = require_name(name)?;
    client.update_group(id, name, password).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success(&format!("Group '{}' updated", name)),
    }
    Ok(())
}

pub async fn delete_group(
    client: &ApiClient,
    id: &str,
    assume_yes: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    if !confirm(
        &format!("Delete group {}? Its services move to the default group", id),
        assume_yes,
    )? {
        print_info("Cancelled.");
        return Ok(());
    }
    client.delete_group(id).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success("Group deleted"),
    }
    Ok(())
}

/// Move a service into a group; an empty group id means the default group.
pub async fn move_service(
    client: &ApiClient,
    service_id: &str,
    group_id: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    client.move_service(service_id, group_id).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => {
            let target = if group_id.is_empty() { "default" } else { group_id };
            print_success(&format!("Moved '{}' to group '{}'", service_id, target))
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::spawn_backend;
    use axum::routing::post;
    use axum::{Json, Router};
    use natter_console_core::TokenStore;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn blank_name_is_rejected_locally() {
        let client = ApiClient::new("http://127.0.0.1:9", TokenStore::memory(None)).unwrap();
        let err = create_group(&client, "  ", None, OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<ConsoleError>(),
            Some(ConsoleError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn create_trims_and_drops_empty_password() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let slot = seen.clone();
        let router = Router::new().route(
            "/api/groups/create",
            post(move |Json(body): Json<Value>| {
                *slot.lock().unwrap() = body;
                async { Json(json!({ "group_id": "g1" })) }
            }),
        );
        let client = ApiClient::new(spawn_backend(router).await, TokenStore::memory(None)).unwrap();

        let id = create_group(&client, " home ", Some(" "), OutputFormat::Json)
            .await
            .unwrap();
        assert_eq!(id, "g1");
        assert_eq!(*seen.lock().unwrap(), json!({ "name": "home" }));
    }

    #[tokio::test]
    async fn move_to_default_group_sends_empty_id() {
        let seen = Arc::new(Mutex::new(Value::Null));
        let slot = seen.clone();
        let router = Router::new().route(
            "/api/groups/move-service",
            post(move |Json(body): Json<Value>| {
                *slot.lock().unwrap() = body;
                async { Json(json!({ "success": true })) }
            }),
        );
        let client = ApiClient::new(spawn_backend(router).await, TokenStore::memory(None)).unwrap();

        move_service(&client, "s1", "", OutputFormat::Json).await.unwrap();
        assert_eq!(
            *seen.lock().unwrap(),
            json!({ "service_id": "s1", "group_id": "" })
        );
    }
}
