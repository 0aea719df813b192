//! IYUU push-notification settings.

use super::output::{print_json, OutputFormat};
use super::paint::iyuu_frame;
use super::ui::{finish_progress_success, print_info, print_success};
use super::with_progress;
use crate::client::ApiClient;
use natter_console_core::render::{mask_secret, render_iyuu};
use natter_console_core::{ConsoleError, IyuuUpdateRequest};
use serde_json::json;

pub async fn iyuu_show(client: &ApiClient, reveal: bool, output: OutputFormat) -> anyhow::Result<()> {
    let config = client.iyuu_config().await?;
    match output {
        OutputFormat::Json => {
            let mut config = config;
            if !reveal {
                config.tokens = config.tokens.iter().map(|t| mask_secret(t)).collect();
            }
            print_json(&config)?
        }
        OutputFormat::Table => {
            println!();
            print!("{}", iyuu_frame(&render_iyuu(&config, reveal)));
            println!();
        }
    }
    Ok(())
}

/// Toggle pushing while keeping the schedule as it is.
pub async fn iyuu_set_enabled(
    client: &ApiClient,
    enabled: bool,
    output: OutputFormat,
) -> anyhow::Result<()> {
    let config = client.iyuu_config().await?;
    let req = IyuuUpdateRequest {
        enabled,
        schedule: config.schedule,
    };
    client.iyuu_update(&req).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true, "enabled": enabled }))?,
        OutputFormat::Table => print_success(&format!(
            "IYUU push {}",
            if enabled { "enabled" } else { "disabled" }
        )),
    }
    Ok(())
}

/// Daily push times must be `HH:MM`.
pub fn validate_time(value: &str) -> Result<(), ConsoleError> {
    let ok = value
        .split_once(':')
        .and_then(|(h, m)| {
            if h.len() != 2 || m.len() != 2 {
                return None;
            }
            Some((h.parse::<u8>().ok()?, m.parse::<u8>().ok()?))
        })
        .map(|(h, m)| h < 24 && m < 60)
        .unwrap_or(false);
    if ok {
        Ok(())
    } else {
        Err(ConsoleError::validation(format!(
            "invalid time '{}', expected HH:MM",
            value
        )))
    }
}

/// Update the schedule. Empty `times` keeps the saved ones; an enabled
/// schedule must end up with at least one time.
pub async fn iyuu_set_schedule(
    client: &ApiClient,
    enabled: bool,
    times: Vec<String>,
    message: Option<String>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    for time in &times {
        validate_time(time)?;
    }
    let config = client.iyuu_config().await?;
    let mut schedule = config.schedule;
    if !times.is_empty() {
        schedule.times = times;
    }
    if enabled && schedule.times.is_empty() {
        return Err(ConsoleError::validation("an enabled schedule needs at least one time").into());
    }
    schedule.enabled = enabled;
    if let Some(message) = message {
        schedule.message = message;
    }
    client
        .iyuu_update(&IyuuUpdateRequest {
            enabled: config.enabled,
            schedule,
        })
        .await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success("Schedule updated"),
    }
    Ok(())
}

pub async fn iyuu_add_token(client: &ApiClient, token: &str, output: OutputFormat) -> anyhow::Result<()> {
    let token = token.trim();
    if token.is_empty() {
        return Err(ConsoleError::validation("token is empty").into());
    }
    client.iyuu_add_token(token).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success(&format!("Token {} added", mask_secret(token))),
    }
    Ok(())
}

pub async fn iyuu_remove_token(
    client: &ApiClient,
    token: &str,
    output: OutputFormat,
) -> anyhow::Result<()> {
    client.iyuu_delete_token(token.trim()).await?;
    match output {
        OutputFormat::Json => print_json(&json!({ "success": true }))?,
        OutputFormat::Table => print_success("Token removed"),
    }
    Ok(())
}

pub async fn iyuu_test(client: &ApiClient, output: OutputFormat) -> anyhow::Result<()> {
    match output {
        OutputFormat::Json => {
            let message = client.iyuu_test().await?;
            print_json(&json!({ "success": true, "message": message }))?;
        }
        OutputFormat::Table => {
            let message =
                with_progress("Sending test push", "Test push failed", client.iyuu_test()).await?;
            finish_progress_success("Test push sent");
            if !message.is_empty() {
                print_info(&message);
            }
        }
    }
    Ok(())
}

pub async fn iyuu_push(
    client: &ApiClient,
    message: Option<&str>,
    output: OutputFormat,
) -> anyhow::Result<()> {
    match output {
        OutputFormat::Json => {
            let reply = client.iyuu_push(message).await?;
            print_json(&json!({ "success": true, "message": reply }))?;
        }
        OutputFormat::Table => {
            let reply =
                with_progress("Pushing status", "Push failed", client.iyuu_push(message)).await?;
            finish_progress_success("Push sent");
            if !reply.is_empty() {
                print_info(&reply);
            }
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
    use natter_console_core::TokenStore;
    use serde_json::Value;
    use std::sync::{Arc, Mutex};

    /// Backend with two saved push times that records every update body.
    async fn backend() -> (ApiClient, Arc<Mutex<Vec<Value>>>) {
        let updates = Arc::new(Mutex::new(Vec::new()));
        let slot = updates.clone();
        let router = Router::new()
            .route(
                "/api/iyuu/config",
                get(|| async {
                    Json(json!({
                        "config": {
                            "enabled": true,
                            "tokens": [],
                            "schedule": {
                                "enabled": true,
                                "times": ["08:00", "20:30"],
                                "message": "daily"
                            }
                        }
                    }))
                }),
            )
            .route(
                "/api/iyuu/update",
                post(move |Json(body): Json<Value>| {
                    slot.lock().unwrap().push(body);
                    async { Json(json!({ "success": true })) }
                }),
            );
        let client = ApiClient::new(spawn_backend(router).await, TokenStore::memory(None)).unwrap();
        (client, updates)
    }

    #[tokio::test]
    async fn disabling_schedule_keeps_saved_times() {
        let (client, updates) = backend().await;
        iyuu_set_schedule(&client, false, vec![], None, OutputFormat::Json)
            .await
            .unwrap();
        let body = updates.lock().unwrap()[0].clone();
        assert_eq!(body["enabled"], json!(true));
        assert_eq!(body["schedule"]["enabled"], json!(false));
        assert_eq!(body["schedule"]["times"], json!(["08:00", "20:30"]));
        assert_eq!(body["schedule"]["message"], json!("daily"));
    }

    #[tokio::test]
    async fn new_times_replace_saved_ones() {
        let (client, updates) = backend().await;
        iyuu_set_schedule(
            &client,
            true,
            vec!["12:15".into()],
            Some("noon".into()),
            OutputFormat::Json,
        )
        .await
        .unwrap();
        let body = updates.lock().unwrap()[0].clone();
        assert_eq!(body["schedule"]["times"], json!(["12:15"]));
        assert_eq!(body["schedule"]["message"], json!("noon"));
    }

    #[tokio::test]
    async fn bad_time_sends_nothing() {
        let (client, updates) = backend().await;
        assert!(
            iyuu_set_schedule(&client, true, vec!["25:00".into()], None, OutputFormat::Json)
                .await
                .is_err()
        );
        assert!(updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn toggling_push_keeps_schedule() {
        let (client, updates) = backend().await;
        iyuu_set_enabled(&client, false, OutputFormat::Json)
            .await
            .unwrap();
        let body = updates.lock().unwrap()[0].clone();
        assert_eq!(body["enabled"], json!(false));
        assert_eq!(body["schedule"]["times"], json!(["08:00", "20:30"]));
        assert_eq!(body["schedule"]["enabled"], json!(true));
    }

    #[test]
    fn schedule_times_are_hh_mm() {
        assert!(validate_time("08:00").is_ok());
        assert!(validate_time("23:59").is_ok());
        assert!(validate_time("24:00").is_err());
        assert!(validate_time("8:00").is_err());
        assert!(validate_time("08-00").is_err());
    }
}
