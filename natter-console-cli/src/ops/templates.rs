//! Template operations.

use super::output::{print_json, OutputFormat};
use super::paint::templates_frame;
use super::ui::{finish_progress_success, print_hint, print_info, print_kv};
use super::{confirm, with_progress};
use crate::client::ApiClient;
use crossterm::style::Stylize;
use natter_console_core::render::render_templates;
use natter_console_core::{ConsoleError, SaveTemplateRequest};
use serde_json::json;

pub async fn list_templates(client: &ApiClient, output: OutputFormat) -> anyhow::Result<()> {
    let templates = client.list_templates().await?;
    match output {
        OutputFormat::Json => print_json(&templates)?,
        OutputFormat::Table => {
            println!();
            print!("{}", templates_frame(&render_templates(&templates)));
            println!();
            if !templates.is_empty() {
                print_hint("Use 'start --template <id>' or 'use #n' in the console");
            }
        }
    }
    Ok(())
}

/// Save an argument preset.
pub async fn save_template(
    client: &ApiClient,
    name: &str,
    description: &str,
    cmd_args: Vec<String>,
    output: OutputFormat,
) -> anyhow::Result<String> {
    if name.trim().is_empty() {
        return Err(ConsoleError::validation("template name is required").into());
    }
    if cmd_args.is_empty() {
        return Err(ConsoleError::validation("template needs at least one argument").into());
    }
    let req = SaveTemplateRequest {
        name: name.trim().to_string(),
        description: description.trim().to_string(),
        cmd_args,
    };
    match output {
        OutputFormat::Json => {
            let id = client.save_template(&req).await?;
            print_json(&json!({ "template_id": id }))?;
            Ok(id)
        }
        OutputFormat::Table => {
            let id = with_progress(
                "Saving template",
                "Failed to save template",
                client.save_template(&req),
            )
            .await?;
            finish_progress_success(&format!("Template '{}' saved", req.name));
            print_kv("Template ID", &id.as_str().cyan().to_string());
            Ok(id)
        }
    }
}

pub async fn delete_template(
    client: &ApiClient,
    id: &str,
    assume_yes: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    if !confirm(&format!("Delete template {}?", id), assume_yes)? {
        print_info("Cancelled.");
        return Ok(());
    }
    match output {
        OutputFormat::Json => {
            client.delete_template(id).await?;
            print_json(&json!({ "success": true }))?;
        }
        OutputFormat::Table => {
            with_progress(
                "Deleting template",
                "Failed to delete template",
                client.delete_template(id),
            )
            .await?;
            finish_progress_success("Template deleted");
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

    #[tokio::test]
    async fn empty_arguments_are_rejected_locally() {
        let client = ApiClient::new("http://127.0.0.1:9", TokenStore::memory(None)).unwrap();
        let err = save_template(&client, "web", "", vec![], OutputFormat::Json)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("at least one argument"));
    }

    #[tokio::test]
    async fn backend_error_in_body_fails_the_save() {
        let router = Router::new().route(
            "/api/templates/save",
            post(|Json(_): Json<Value>| async { Json(json!({ "error": "duplicate name" })) }),
        );
        let client = ApiClient::new(spawn_backend(router).await, TokenStore::memory(None)).unwrap();
        let err = save_template(
            &client,
            "web",
            "",
            vec!["-p".into(), "80".into()],
            OutputFormat::Json,
        )
        .await
        .unwrap_err();
        assert!(err.to_string().contains("duplicate name"));
    }
}
