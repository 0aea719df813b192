use crate::error::{ConsoleError, Result};
use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;

/// Runtime state of a supervised natter process.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum ServiceState {
    Running,
    Stopped,
    #[default]
    Waiting,
}

impl From<String> for ServiceState {
    fn from(value: String) -> Self {
        match value.trim().to_lowercase().as_str() {
            "running" => ServiceState::Running,
            "stopped" => ServiceState::Stopped,
            _ => ServiceState::Waiting,
        }
    }
}

/// One supervised NAT-traversal process as reported by the backend.
///
/// The console never owns this record: every fetch replaces it wholesale.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub id: String,
    #[serde(default)]
    pub status: ServiceState,
    /// Liveness flag some backends send next to `status`.
    #[serde(default)]
    pub running: Option<bool>,
    #[serde(default)]
    pub mapped_address: Option<String>,
    #[serde(default)]
    pub cmd_args: Vec<String>,
    /// Epoch seconds, fractional.
    #[serde(default)]
    pub start_time: Option<f64>,
    #[serde(default)]
    pub last_output: Vec<String>,
    #[serde(default)]
    pub remark: Option<String>,
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub auto_restart: bool,
    #[serde(default)]
    pub lan_status: Option<String>,
    #[serde(default)]
    pub wan_status: Option<String>,
    #[serde(default)]
    pub nat_type: Option<String>,
}

impl Service {
    /// Effective state: an explicit `running` flag wins over a vague status.
    pub fn state(&self) -> ServiceState {
        match (self.status, self.running) {
            (ServiceState::Waiting, Some(true)) => ServiceState::Running,
            (ServiceState::Waiting, Some(false)) => ServiceState::Stopped,
            (state, _) => state,
        }
    }

    /// Services without a group id belong to the default group.
    pub fn in_default_group(&self) -> bool {
        self.group_id.as_deref().map(str::is_empty).unwrap_or(true)
    }
}

/// Saved argument preset for quickly starting a service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub cmd_args: Vec<String>,
    #[serde(default)]
    pub created_at: f64,
}

/// User-defined label partitioning services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub id: String,
    pub name: String,
    /// Shared label secret; not a credential.
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub service_count: usize,
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IyuuSchedule {
    #[serde(default)]
    pub enabled: bool,
    /// Daily push times, `HH:MM`.
    #[serde(default)]
    pub times: Vec<String>,
    #[serde(default)]
    pub message: String,
}

/// IYUU push-notification settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IyuuConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub tokens: Vec<String>,
    #[serde(default)]
    pub schedule: IyuuSchedule,
}

// ==================== response envelopes ====================

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceList {
    #[serde(default)]
    pub services: Vec<Service>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceEnvelope {
    #[serde(default)]
    pub service: Option<Service>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartResponse {
    #[serde(default)]
    pub service_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateList {
    #[serde(default)]
    pub templates: Vec<Template>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TemplateSaved {
    #[serde(default)]
    pub template_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupList {
    #[serde(default)]
    pub groups: Vec<Group>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GroupCreated {
    #[serde(default)]
    pub group_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IyuuConfigEnvelope {
    #[serde(default)]
    pub config: IyuuConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCheck {
    #[serde(default)]
    pub installed: bool,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthCheck {
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub authenticated: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VersionInfo {
    pub version: String,
}

/// Generic `{success, error?, message?}` acknowledgement.
#[skip_serializing_none]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ack {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub stopped_count: Option<u32>,
}

impl Ack {
    /// Turn a `success: false` body into an error carrying the backend's reason.
    pub fn into_result(self, action: &str) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let reason = self
            .error
            .or(self.message)
            .unwrap_or_else(|| "unknown error".to_string());
        Err(ConsoleError::Other(format!("{action} failed: {reason}")))
    }
}

// ==================== request payloads ====================

#[skip_serializing_none]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StartRequest {
    pub args: Vec<String>,
    pub auto_restart: bool,
    pub remark: Option<String>,
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaveTemplateRequest {
    pub name: String,
    pub description: String,
    pub cmd_args: Vec<String>,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize)]
pub struct SaveGroupRequest {
    pub id: Option<String>,
    pub name: String,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MoveServiceRequest {
    pub service_id: String,
    pub group_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct IyuuUpdateRequest {
    pub enabled: bool,
    pub schedule: IyuuSchedule,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn service_defaults_optional_fields() {
        let svc: Service = serde_json::from_value(json!({
            "id": "1700000000000",
            "status": "running",
            "cmd_args": ["-p", "8080"],
        }))
        .unwrap();
        assert_eq!(svc.state(), ServiceState::Running);
        assert!(svc.last_output.is_empty());
        assert!(svc.in_default_group());
        assert!(!svc.auto_restart);
        assert_eq!(ServiceState::default(), ServiceState::Waiting);
    }

    #[test]
    fn unknown_status_falls_back_to_running_flag() {
        let svc: Service = serde_json::from_value(json!({
            "id": "a",
            "status": "initializing",
            "running": false,
        }))
        .unwrap();
        assert_eq!(svc.status, ServiceState::Waiting);
        assert_eq!(svc.state(), ServiceState::Stopped);
    }

    #[test]
    fn start_request_omits_empty_optionals() {
        let req = StartRequest {
            args: vec!["-p".into(), "8080".into()],
            auto_restart: false,
            remark: None,
            group_id: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value, json!({"args": ["-p", "8080"], "auto_restart": false}));
    }

    #[test]
    fn failed_ack_carries_reason() {
        let ack = Ack {
            success: false,
            error: Some("Failed to stop service".into()),
            ..Default::default()
        };
        let err = ack.into_result("stop").unwrap_err();
        assert!(err.to_string().contains("Failed to stop service"));
    }
}
