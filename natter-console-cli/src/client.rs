//! HTTP gateway: bearer injection and the session-expiry interceptor.

use natter_console_core::{ConsoleError, Result, TokenStore};
use reqwest::{RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Body field a 401 carries while the user simply has not logged in yet.
pub const AUTH_PENDING_MARKER: &str = "auth_required";

/// Runs once per forced logout; the console uses it to send the user to `login`.
pub type LogoutHook = Arc<dyn Fn() + Send + Sync>;

/// Fully buffered response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

/// What the interceptor decided about a response.
#[derive(Debug)]
pub enum AuthOutcome {
    /// Hand the response to the caller untouched.
    PassThrough(ApiResponse),
    /// The session is gone: clear the token and abort the caller.
    Logout,
}

/// Classify a response. Only a 401 without the auth-pending marker logs out.
pub fn intercept(resp: ApiResponse) -> AuthOutcome {
    if resp.status != StatusCode::UNAUTHORIZED || resp.auth_pending() {
        AuthOutcome::PassThrough(resp)
    } else {
        AuthOutcome::Logout
    }
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    fn json_value(&self) -> Option<Value> {
        serde_json::from_slice(&self.body).ok()
    }

    /// True when the body says authentication is still pending.
    pub fn auth_pending(&self) -> bool {
        self.json_value()
            .and_then(|v| v.get(AUTH_PENDING_MARKER).and_then(Value::as_bool))
            .unwrap_or(false)
    }

    /// Best-effort error text from an `{error}` / `{message}` body.
    pub fn error_message(&self) -> String {
        match self.json_value() {
            Some(v) => v
                .get("error")
                .or_else(|| v.get("message"))
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| v.to_string()),
            None => {
                let text = String::from_utf8_lossy(&self.body).trim().to_string();
                if text.is_empty() {
                    self.status
                        .canonical_reason()
                        .unwrap_or("unknown error")
                        .to_string()
                } else {
                    text
                }
            }
        }
    }

    /// Decode a successful body, mapping failures onto the error taxonomy.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T> {
        if self.status == StatusCode::UNAUTHORIZED {
            return Err(ConsoleError::AuthRequired(self.error_message()));
        }
        if self.status == StatusCode::NOT_FOUND {
            return Err(ConsoleError::NotFound(self.error_message()));
        }
        if !self.is_success() {
            return Err(ConsoleError::api(self.status.as_u16(), self.error_message()));
        }
        Ok(serde_json::from_slice(&self.body)?)
    }
}

/// Thin wrapper over `reqwest::Client` bound to one backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    tokens: TokenStore,
    on_logout: Option<LogoutHook>,
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("base", &self.base)
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base: impl Into<String>, tokens: TokenStore) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(|e| ConsoleError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base: base.into().trim_end_matches('/').to_string(),
            tokens,
            on_logout: None,
        })
    }

    pub fn with_logout_hook(mut self, hook: LogoutHook) -> Self {
        self.on_logout = Some(hook);
        self
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base, path)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<ApiResponse> {
        let builder = self.http.get(self.url(path)).query(query);
        self.dispatch(builder).await
    }

    #[instrument(skip(self, body), level = "debug")]
    pub async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<ApiResponse> {
        let builder = self.http.post(self.url(path)).json(body);
        self.dispatch(builder).await
    }

    /// POST outside the interceptor, for calls that must see their own 401s.
    pub async fn post_unguarded<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<ApiResponse> {
        let resp = self
            .http
            .post(self.url(path))
            .json(body)
            .send()
            .await
            .map_err(transport)?;
        buffer(resp).await
    }

    /// Single attempt. The token is re-read from storage for every call.
    async fn dispatch(&self, builder: RequestBuilder) -> Result<ApiResponse> {
        let builder = match self.tokens.token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        };
        let resp = builder.send().await.map_err(transport)?;
        match intercept(buffer(resp).await?) {
            AuthOutcome::PassThrough(resp) => Ok(resp),
            AuthOutcome::Logout => {
                self.logout();
                Err(ConsoleError::SessionExpired)
            }
        }
    }

    /// Forget the token and notify the hook.
    pub fn logout(&self) {
        warn!("session rejected by backend, logging out");
        if let Err(e) = self.tokens.clear() {
            warn!("failed to clear stored token: {}", e);
        }
        if let Some(hook) = &self.on_logout {
            hook();
        }
    }
}

async fn buffer(resp: reqwest::Response) -> Result<ApiResponse> {
    let status = resp.status();
    let body = resp.bytes().await.map_err(transport)?.to_vec();
    debug!(%status, bytes = body.len(), "response received");
    Ok(ApiResponse { status, body })
}

fn transport(err: reqwest::Error) -> ConsoleError {
    ConsoleError::Transport(err.to_string())
}
