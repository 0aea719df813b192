//! Typed backend endpoints on top of the gateway.

use crate::client::ApiClient;
use natter_console_core::{
    Ack, AuthCheck, ConsoleError, Group, GroupCreated, GroupList, IyuuConfig, IyuuConfigEnvelope,
    IyuuUpdateRequest, LoginResponse, MoveServiceRequest, Result, SaveGroupRequest,
    SaveTemplateRequest, Service, ServiceEnvelope, ServiceList, StartRequest, StartResponse,
    Template, TemplateList, TemplateSaved, ToolCheck, VersionInfo,
};
use reqwest::StatusCode;
use serde_json::json;
use tracing::{debug, info};

impl ApiClient {
    // ==================== services ====================

    pub async fn list_services(&self) -> Result<Vec<Service>> {
        let list: ServiceList = self.get("/api/services", &[]).await?.decode()?;
        Ok(list.services)
    }

    pub async fn get_service(&self, id: &str) -> Result<Service> {
        let envelope: ServiceEnvelope = self.get("/api/service", &[("id", id)]).await?.decode()?;
        envelope
            .service
            .ok_or_else(|| ConsoleError::NotFound(format!("service {id}")))
    }

    /// Start a new service and return its id.
    pub async fn start_service(&self, req: &StartRequest) -> Result<String> {
        let resp: StartResponse = self.post("/api/services/start", req).await?.decode()?;
        if let Some(err) = resp.error {
            return Err(ConsoleError::api(200, err));
        }
        let id = resp
            .service_id
            .ok_or_else(|| ConsoleError::Other("backend returned no service id".into()))?;
        info!("started service {}", id);
        Ok(id)
    }

    pub async fn stop_service(&self, id: &str) -> Result<()> {
        self.ack("/api/services/stop", json!({ "id": id }), "stop").await
    }

    pub async fn restart_service(&self, id: &str) -> Result<()> {
        self.ack("/api/services/restart", json!({ "id": id }), "restart")
            .await
    }

    pub async fn delete_service(&self, id: &str) -> Result<()> {
        self.ack("/api/services/delete", json!({ "id": id }), "delete")
            .await
    }

    /// Stop every running service; returns how many were stopped.
    pub async fn stop_all_services(&self) -> Result<u32> {
        let ack = self
            .post("/api/services/stop-all", &json!({}))
            .await?
            .decode::<Ack>()?
            .into_result("stop-all")?;
        Ok(ack.stopped_count.unwrap_or(0))
    }

    pub async fn set_auto_restart(&self, id: &str, enabled: bool) -> Result<()> {
        self.ack(
            "/api/services/auto-restart",
            json!({ "id": id, "enabled": enabled }),
            "auto-restart",
        )
        .await
    }

    pub async fn clear_logs(&self, id: &str) -> Result<()> {
        self.ack("/api/services/clear-logs", json!({ "id": id }), "clear-logs")
            .await
    }

    pub async fn set_remark(&self, id: &str, remark: &str) -> Result<()> {
        self.ack(
            "/api/services/set-remark",
            json!({ "id": id, "remark": remark }),
            "set-remark",
        )
        .await
    }

    // ==================== templates ====================

    pub async fn list_templates(&self) -> Result<Vec<Template>> {
        let list: TemplateList = self.get("/api/templates", &[]).await?.decode()?;
        Ok(list.templates)
    }

    pub async fn save_template(&self, req: &SaveTemplateRequest) -> Result<String> {
        let saved: TemplateSaved = self.post("/api/templates/save", req).await?.decode()?;
        if let Some(err) = saved.error {
            return Err(ConsoleError::api(200, err));
        }
        saved
            .template_id
            .ok_or_else(|| ConsoleError::Other("backend returned no template id".into()))
    }

    pub async fn delete_template(&self, id: &str) -> Result<()> {
        self.ack("/api/templates/delete", json!({ "id": id }), "delete template")
            .await
    }

    // ==================== groups ====================

    pub async fn list_groups(&self) -> Result<Vec<Group>> {
        let list: GroupList = self.get("/api/groups", &[]).await?.decode()?;
        Ok(list.groups)
    }

    pub async fn create_group(&self, name: &str, password: Option<&str>) -> Result<String> {
        let req = SaveGroupRequest {
            id: None,
            name: name.to_string(),
            password: password.map(str::to_string),
        };
        let created: GroupCreated = self.post("/api/groups/create", &req).await?.decode()?;
        if let Some(err) = created.error {
            return Err(ConsoleError::api(200, err));
        }
        created
            .group_id
            .ok_or_else(|| ConsoleError::Other("backend returned no group id".into()))
    }

    pub async fn update_group(&self, id: &str, name: &str, password: Option<&str>) -> Result<()> {
        let req = SaveGroupRequest {
            id: Some(id.to_string()),
            name: name.to_string(),
            password: password.map(str::to_string),
        };
        self.ack("/api/groups/update", req, "update group").await
    }

    pub async fn delete_group(&self, id: &str) -> Result<()> {
        self.ack("/api/groups/delete", json!({ "id": id }), "delete group")
            .await
    }

    pub async fn move_service(&self, service_id: &str, group_id: &str) -> Result<()> {
        let req = MoveServiceRequest {
            service_id: service_id.to_string(),
            group_id: group_id.to_string(),
        };
        self.ack("/api/groups/move-service", req, "move service").await
    }

    // ==================== tools ====================

    pub async fn check_tool(&self, tool: &str) -> Result<ToolCheck> {
        self.get("/api/tools/check", &[("tool", tool)]).await?.decode()
    }

    /// Ask the backend to install a forwarding helper; returns its message.
    pub async fn install_tool(&self, tool: &str) -> Result<String> {
        let ack = self
            .post("/api/tools/install", &json!({ "tool": tool }))
            .await?
            .decode::<Ack>()?
            .into_result("install")?;
        Ok(ack.message.unwrap_or_default())
    }

    // ==================== auth ====================

    /// Whether the backend wants a password. A pending-auth 401 is a valid answer.
    pub async fn auth_check(&self) -> Result<AuthCheck> {
        let resp = self.get("/api/auth/check", &[]).await?;
        if resp.status == StatusCode::UNAUTHORIZED {
            let mut check: AuthCheck = serde_json::from_slice(&resp.body)?;
            check.authenticated = Some(false);
            return Ok(check);
        }
        resp.decode()
    }

    /// Exchange a password for a token and persist it.
    ///
    /// Goes around the interceptor: a wrong password is not an expired session.
    pub async fn login(&self, password: &str) -> Result<String> {
        let resp = self
            .post_unguarded("/api/auth/login", &json!({ "password": password }))
            .await?;
        if resp.status == StatusCode::UNAUTHORIZED {
            return Err(ConsoleError::AuthRequired(resp.error_message()));
        }
        let login: LoginResponse = resp.decode()?;
        match (login.success, login.token) {
            (true, Some(token)) => {
                self.tokens().save(&token)?;
                debug!("login succeeded");
                Ok(token)
            }
            (_, _) => Err(ConsoleError::AuthRequired(
                login.error.unwrap_or_else(|| "login rejected".into()),
            )),
        }
    }

    // ==================== iyuu ====================

    pub async fn iyuu_config(&self) -> Result<IyuuConfig> {
        let envelope: IyuuConfigEnvelope = self.get("/api/iyuu/config", &[]).await?.decode()?;
        Ok(envelope.config)
    }

    pub async fn iyuu_update(&self, req: &IyuuUpdateRequest) -> Result<()> {
        self.ack("/api/iyuu/update", req, "update IYUU settings").await
    }

    pub async fn iyuu_add_token(&self, token: &str) -> Result<()> {
        self.ack("/api/iyuu/add_token", json!({ "token": token }), "add token")
            .await
    }

    pub async fn iyuu_delete_token(&self, token: &str) -> Result<()> {
        self.ack(
            "/api/iyuu/delete_token",
            json!({ "token": token }),
            "delete token",
        )
        .await
    }

    pub async fn iyuu_test(&self) -> Result<String> {
        let ack = self
            .post("/api/iyuu/test", &json!({}))
            .await?
            .decode::<Ack>()?
            .into_result("test push")?;
        Ok(ack.message.unwrap_or_default())
    }

    pub async fn iyuu_push(&self, message: Option<&str>) -> Result<String> {
        let body = match message {
            Some(m) => json!({ "message": m }),
            None => json!({}),
        };
        let ack = self
            .post("/api/iyuu/push_now", &body)
            .await?
            .decode::<Ack>()?
            .into_result("push")?;
        Ok(ack.message.unwrap_or_default())
    }

    // ==================== misc ====================

    pub async fn version(&self) -> Result<String> {
        let info: VersionInfo = self.get("/api/version", &[]).await?.decode()?;
        Ok(info.version)
    }

    async fn ack<B: serde::Serialize>(&self, path: &str, body: B, action: &str) -> Result<()> {
        self.post(path, &body)
            .await?
            .decode::<Ack>()?
            .into_result(action)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::ApiClient;
    use crate::testing::spawn_backend;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use natter_console_core::{
        build_args, BasicOptions, CommandMode, ConsoleError, StartRequest, TokenStore,
    };
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::{Arc, Mutex};

    async fn client_for(router: Router) -> ApiClient {
        let base = spawn_backend(router).await;
        ApiClient::new(base, TokenStore::memory(Some("t".into()))).unwrap()
    }

    #[tokio::test]
    async fn basic_form_start_posts_expected_body() {
        let captured: Arc<Mutex<Option<Value>>> = Arc::default();
        let sink = captured.clone();
        let router = Router::new().route(
            "/api/services/start",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    *sink.lock().unwrap() = Some(body);
                    Json(json!({ "service_id": "1700000000000" }))
                }
            }),
        );
        let client = client_for(router).await;

        let opts = BasicOptions {
            target_port: "8080".into(),
            udp: true,
            forward_method: "socket".into(),
            ..Default::default()
        };
        let args = build_args(&CommandMode::Basic(opts)).unwrap();
        let req = StartRequest {
            args,
            auto_restart: false,
            remark: None,
            group_id: None,
        };
        let id = client.start_service(&req).await.unwrap();
        assert_eq!(id, "1700000000000");
        assert_eq!(
            captured.lock().unwrap().clone().unwrap(),
            json!({ "args": ["-p", "8080", "-u"], "auto_restart": false })
        );
    }

    #[tokio::test]
    async fn empty_service_list() {
        let router = Router::new().route(
            "/api/services",
            get(|| async { Json(json!({ "services": [] })) }),
        );
        let client = client_for(router).await;
        assert!(client.list_services().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn missing_service_is_not_found() {
        let router = Router::new().route(
            "/api/service",
            get(|Query(q): Query<HashMap<String, String>>| async move {
                assert_eq!(q.get("id").map(String::as_str), Some("gone"));
                (
                    StatusCode::NOT_FOUND,
                    Json(json!({ "error": "Service not found" })),
                )
            }),
        );
        let client = client_for(router).await;
        let err = client.get_service("gone").await.unwrap_err();
        assert!(matches!(err, ConsoleError::NotFound(_)));
    }

    #[tokio::test]
    async fn failed_stop_surfaces_backend_error() {
        let router = Router::new().route(
            "/api/services/stop",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "Failed to stop service" })),
                )
            }),
        );
        let client = client_for(router).await;
        let err = client.stop_service("a").await.unwrap_err();
        assert!(
            matches!(err, ConsoleError::Api { status: 500, ref message } if message == "Failed to stop service")
        );
    }

    #[tokio::test]
    async fn stop_all_returns_count() {
        let router = Router::new().route(
            "/api/services/stop-all",
            post(|| async { Json(json!({ "success": true, "stopped_count": 3 })) }),
        );
        let client = client_for(router).await;
        assert_eq!(client.stop_all_services().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn login_stores_token_and_wrong_password_keeps_session() {
        let router = Router::new().route(
            "/api/auth/login",
            post(|Json(body): Json<Value>| async move {
                if body["password"] == "secret" {
                    (
                        StatusCode::OK,
                        Json(json!({ "success": true, "token": "dXNlcjpzZWNyZXQ=" })),
                    )
                } else {
                    (
                        StatusCode::UNAUTHORIZED,
                        Json(json!({ "error": "wrong password" })),
                    )
                }
            }),
        );
        let base = spawn_backend(router).await;
        let tokens = TokenStore::memory(Some("old".into()));
        let client = ApiClient::new(base, tokens.clone()).unwrap();

        let err = client.login("nope").await.unwrap_err();
        assert!(matches!(err, ConsoleError::AuthRequired(_)));
        assert_eq!(tokens.token().as_deref(), Some("old"));

        client.login("secret").await.unwrap();
        assert_eq!(tokens.token().as_deref(), Some("dXNlcjpzZWNyZXQ="));
    }

    #[tokio::test]
    async fn auth_check_accepts_pending_401() {
        let router = Router::new().route(
            "/api/auth/check",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "auth_required": true })),
                )
            }),
        );
        let client = client_for(router).await;
        let check = client.auth_check().await.unwrap();
        assert!(check.auth_required);
        assert_eq!(check.authenticated, Some(false));
    }

    #[tokio::test]
    async fn group_update_sends_id_name_and_optional_password() {
        let captured: Arc<Mutex<Vec<Value>>> = Arc::default();
        let sink = captured.clone();
        let router = Router::new().route(
            "/api/groups/update",
            post(move |Json(body): Json<Value>| {
                let sink = sink.clone();
                async move {
                    sink.lock().unwrap().push(body);
                    Json(json!({ "success": true }))
                }
            }),
        );
        let client = client_for(router).await;
        client.update_group("g1", "home", None).await.unwrap();
        client.update_group("g1", "home", Some("pw")).await.unwrap();
        let seen = captured.lock().unwrap().clone();
        assert_eq!(seen[0], json!({ "id": "g1", "name": "home" }));
        assert_eq!(seen[1], json!({ "id": "g1", "name": "home", "password": "pw" }));
    }

    #[tokio::test]
    async fn iyuu_config_envelope() {
        let router = Router::new().route(
            "/api/iyuu/config",
            get(|| async {
                Json(json!({
                    "config": {
                        "enabled": true,
                        "tokens": ["IYUU1234567890abcd"],
                        "schedule": { "enabled": true, "times": ["08:00"], "message": "daily" }
                    }
                }))
            }),
        );
        let client = client_for(router).await;
        let config = client.iyuu_config().await.unwrap();
        assert!(config.enabled);
        assert_eq!(config.tokens.len(), 1);
        assert_eq!(config.schedule.times, vec!["08:00".to_string()]);
    }
}
