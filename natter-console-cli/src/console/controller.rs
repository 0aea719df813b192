//! Console controller: view routing, polling and the actions behind each
//! console command.

use super::screen::{Notice, Screen};
use crate::client::ApiClient;
use crate::ops::clipboard::copy_to_clipboard;
use crate::ops::form::prompt_start_options;
use crate::ops::paint::{
    detail_frame, groups_frame, help_frame, iyuu_frame, services_frame, templates_frame,
};
use crate::ops::confirm;
use crate::ops::ui::{empty_line, header_block};
use anyhow::anyhow;
use dialoguer::theme::ColorfulTheme;
use dialoguer::{Input, Password};
use futures::FutureExt;
use natter_console_core::render::{
    copyable_address, now_epoch, render_groups, render_iyuu, render_service_detail,
    render_services, render_templates, runtime_since, RenderedList,
};
use natter_console_core::{
    CommandMode, ConsoleError, CurrentService, Group, Panel, PollingConfig, PollingSynchronizer,
    SaveTemplateRequest, Service, Template, ViewState,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, warn};

pub const SESSION_EXPIRED_NOTICE: &str = "Session expired. Use 'login' to sign in again.";

/// What the shell should do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Everything the console shows, owned by the controller and shared with
/// the polling tasks. Never locked across an await point.
#[derive(Debug, Default)]
pub struct ConsoleState {
    pub view: ViewState,
    pub services: Vec<Service>,
    pub templates: Vec<Template>,
    pub groups: Vec<Group>,
    pub detail: Option<Service>,
    /// Elapsed time of the service on screen, updated every runtime tick.
    pub runtime_label: Option<String>,
    /// Background paints are held back while a prompt owns the terminal.
    pub paused: bool,
    list_fingerprint: Option<String>,
    detail_fingerprint: Option<String>,
}

/// Result of one detail load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DetailOutcome {
    Shown,
    Missing,
    Failed,
    Stale,
}

/// The pieces polling tasks need; cheap to clone into each task.
#[derive(Clone)]
struct Shared {
    client: ApiClient,
    state: Arc<Mutex<ConsoleState>>,
    current: CurrentService,
    screen: Arc<dyn Screen>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, ConsoleState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Fetch the list and repaint it if it is on screen and changed.
    async fn refresh_list(&self, force: bool) {
        let result = self.client.list_services().await;
        let frame = {
            let mut state = self.lock();
            let (fingerprint, frame) = match result {
                Ok(services) => {
                    let fingerprint = serde_json::to_string(&services).unwrap_or_default();
                    let frame = services_frame(&render_services(&services, now_epoch()));
                    state.services = services;
                    (fingerprint, frame)
                }
                Err(e) if e.is_auth() => {
                    debug!("list refresh skipped: {}", e);
                    return;
                }
                Err(e) => {
                    warn!("service list refresh failed: {}", e);
                    let msg = format!("Failed to load services: {}", e);
                    (msg.clone(), services_frame(&RenderedList::placeholder(msg)))
                }
            };
            let unchanged = state.list_fingerprint.as_deref() == Some(fingerprint.as_str());
            if !state.view.is_visible(Panel::Services) || state.paused || (unchanged && !force) {
                None
            } else {
                state.list_fingerprint = Some(fingerprint);
                Some(frame)
            }
        };
        if let Some(frame) = frame {
            self.screen.paint(&frame);
        }
    }

    /// Fetch one service. A missing service sends the user back to the list.
    async fn refresh_detail(&self, id: String, force: bool) -> DetailOutcome {
        let result = self.client.get_service(&id).await;
        if !self.current.is(&id) {
            return DetailOutcome::Stale;
        }
        let (outcome, painted) = {
            let mut state = self.lock();
            let (outcome, fingerprint, frame) = match result {
                Ok(service) => {
                    let fingerprint = serde_json::to_string(&service).unwrap_or_default();
                    let frame = detail_frame(&render_service_detail(&service, now_epoch()));
                    state.runtime_label = Some(runtime_since(service.start_time, now_epoch()));
                    state.detail = Some(service);
                    (DetailOutcome::Shown, fingerprint, frame)
                }
                Err(ConsoleError::NotFound(_)) => {
                    state.detail = None;
                    state.runtime_label = None;
                    state.detail_fingerprint = None;
                    state.view = state.view.show(Panel::Services);
                    (DetailOutcome::Missing, String::new(), String::new())
                }
                Err(e) if e.is_auth() => return DetailOutcome::Failed,
                Err(e) => {
                    warn!("detail refresh for {} failed: {}", id, e);
                    let msg = format!("Failed to load service details: {}", e);
                    (DetailOutcome::Failed, msg.clone(), failed_detail_frame(&id, &msg))
                }
            };
            let painted = if outcome == DetailOutcome::Missing {
                None
            } else {
                let unchanged =
                    state.detail_fingerprint.as_deref() == Some(fingerprint.as_str());
                if !state.view.is_visible(Panel::ServiceDetails)
                    || state.paused
                    || (unchanged && !force)
                {
                    None
                } else {
                    state.detail_fingerprint = Some(fingerprint);
                    Some(frame)
                }
            };
            (outcome, painted)
        };

        if outcome == DetailOutcome::Missing {
            self.current.clear();
            self.screen.notify(
                Notice::Warning,
                &format!("Service {} no longer exists", id),
            );
            self.refresh_list(true).await;
        } else if let Some(frame) = painted {
            self.screen.paint(&frame);
        }
        outcome
    }

    /// Recompute the runtime shown in the prompt. Nothing is painted: the
    /// label is read the next time the prompt is drawn, and an empty line
    /// (Enter) redraws it.
    fn tick_runtime(&self) {
        let now = now_epoch();
        let current = self.current.get();
        let mut state = self.lock();
        state.runtime_label = match current {
            Some(id) => state
                .detail
                .as_ref()
                .filter(|s| s.id == id)
                .map(|s| runtime_since(s.start_time, now)),
            None => None,
        };
    }
}

fn failed_detail_frame(id: &str, msg: &str) -> String {
    let mut frame = header_block(&format!("📦 SERVICE: {}", id));
    frame.push_str(&empty_line(msg));
    frame
}

/// Drives the interactive console.
pub struct Controller {
    shared: Shared,
    sync: PollingSynchronizer,
    config: PollingConfig,
    show_secrets: bool,
    assume_yes: bool,
    session_expired: Arc<AtomicBool>,
}

impl Controller {
    pub fn new(
        client: ApiClient,
        screen: Arc<dyn Screen>,
        config: PollingConfig,
        show_secrets: bool,
    ) -> Self {
        let session_expired = Arc::new(AtomicBool::new(false));
        let flag = session_expired.clone();
        let hook_screen = screen.clone();
        let client = client.with_logout_hook(Arc::new(move || {
            if !flag.swap(true, Ordering::SeqCst) {
                hook_screen.notify(Notice::Warning, SESSION_EXPIRED_NOTICE);
            }
        }));
        Self {
            shared: Shared {
                client,
                state: Arc::new(Mutex::new(ConsoleState::default())),
                current: CurrentService::new(),
                screen,
            },
            sync: PollingSynchronizer::new(),
            config,
            show_secrets,
            assume_yes: false,
            session_expired,
        }
    }

    /// Skip confirmation prompts.
    pub fn assume_yes(mut self, yes: bool) -> Self {
        self.assume_yes = yes;
        self
    }

    pub fn state(&self) -> MutexGuard<'_, ConsoleState> {
        self.shared.lock()
    }

    #[cfg(test)]
    pub fn current_service(&self) -> Option<String> {
        self.shared.current.get()
    }

    /// Service ids known from the last list load, for completion.
    pub fn service_ids(&self) -> Vec<String> {
        self.state().services.iter().map(|s| s.id.clone()).collect()
    }

    /// Start the page-lifetime list refresh; its first tick paints the list.
    pub fn start(&mut self) {
        let shared = self.shared.clone();
        self.sync.start_list_refresh(self.config.list, move || {
            let shared = shared.clone();
            async move { shared.refresh_list(false).await }.boxed()
        });
    }

    pub fn prompt(&self) -> String {
        let state = self.state();
        match (state.view.active(), self.shared.current.get()) {
            (Panel::ServiceDetails, Some(id)) => match &state.runtime_label {
                Some(runtime) => format!("natter[{} {}]> ", short_id(&id), runtime),
                None => format!("natter[{}]> ", short_id(&id)),
            },
            (Panel::Services | Panel::NewService, _) => "natter> ".to_string(),
            (panel, _) => format!("natter[{}]> ", panel.title().to_lowercase()),
        }
    }

    pub fn shutdown(&mut self) {
        self.shared.current.clear();
        self.sync.shutdown();
    }

    /// Drop detail timers whose service was cleared by a background refresh.
    fn reconcile(&mut self) {
        if self.shared.current.get().is_none()
            && (self.sync.detail_service().is_some() || self.sync.runtime_tick_active())
        {
            self.sync.leave_details();
        }
    }

    pub async fn execute(&mut self, cmd: &str, args: &[String]) -> anyhow::Result<Flow> {
        self.reconcile();
        let first = args.first().map(String::as_str);
        match cmd {
            "services" | "list" | "ls" => self.show_services().await,
            "view" | "info" => match first {
                Some(target) => self.view_service(target).await?,
                None => return Err(anyhow!("usage: view <id|#n>")),
            },
            "back" => self.back().await,
            "help" => self.open(Panel::Help).await,
            "templates" => self.open(Panel::Templates).await,
            "groups" => self.open(Panel::Groups).await,
            "iyuu" => self.open(Panel::IyuuSettings).await,
            "close" => self.close().await,
            "new" => self.new_service(None).await?,
            "use" => match first {
                Some(target) => self.use_template(target).await?,
                None => return Err(anyhow!("usage: use <#n|template id>")),
            },
            "stop" => self.stop(first).await?,
            "restart" => self.restart(first).await?,
            "delete" | "rm" => self.delete(first).await?,
            "stop-all" => self.stop_all().await?,
            "auto-restart" => {
                let enabled = match first {
                    Some("on" | "true" | "enable") => true,
                    Some("off" | "false" | "disable") => false,
                    _ => return Err(anyhow!("usage: auto-restart <on|off> [id|#n]")),
                };
                self.auto_restart(enabled, args.get(1).map(String::as_str))
                    .await?
            }
            "clear-logs" => self.clear_logs(first).await?,
            "remark" => self.remark(args).await?,
            "copy" => self.copy(first).await?,
            "save-template" => self.save_template(args).await?,
            "login" => self.login().await?,
            "refresh" => self.refresh_active(true).await,
            "exit" | "quit" => {
                self.shutdown();
                return Ok(Flow::Exit);
            }
            other => return Err(anyhow!("unknown command '{}', type 'help'", other)),
        }
        Ok(Flow::Continue)
    }

    // ==================== navigation ====================

    pub async fn show_services(&mut self) {
        {
            let mut state = self.state();
            state.view = state.view.show(Panel::Services);
        }
        self.shared.refresh_list(true).await;
    }

    /// Enter the details view for `target` (`id` or `#n`).
    pub async fn view_service(&mut self, target: &str) -> anyhow::Result<()> {
        let id = self.resolve(Some(target))?;
        self.sync.leave_details();
        self.shared.current.set(id.clone());
        {
            let mut state = self.state();
            state.view = state.view.show(Panel::ServiceDetails);
            state.detail = None;
            state.detail_fingerprint = None;
            state.runtime_label = None;
        }

        if self.shared.refresh_detail(id.clone(), true).await == DetailOutcome::Missing {
            return Ok(());
        }

        let shared = self.shared.clone();
        self.sync.start_detail_refresh(
            id,
            self.shared.current.clone(),
            self.config.detail,
            move |id| {
                let shared = shared.clone();
                async move {
                    shared.refresh_detail(id, false).await;
                }
                .boxed()
            },
        );
        let shared = self.shared.clone();
        self.sync
            .start_runtime_tick(self.config.runtime, move || shared.tick_runtime());
        Ok(())
    }

    pub async fn back(&mut self) {
        self.shared.current.clear();
        self.sync.leave_details();
        {
            let mut state = self.state();
            state.detail = None;
            state.runtime_label = None;
        }
        self.show_services().await;
    }

    async fn open(&mut self, panel: Panel) {
        {
            let mut state = self.state();
            state.view = state.view.show(panel);
        }
        self.paint_panel(panel, true).await;
    }

    async fn close(&mut self) {
        let active = self.state().view.active();
        match active {
            Panel::ServiceDetails => self.back().await,
            Panel::Services | Panel::NewService => self
                .shared
                .screen
                .notify(Notice::Info, "Nothing to close"),
            panel => {
                let next = {
                    let mut state = self.state();
                    state.view = state.view.hide(panel);
                    state.view.active()
                };
                self.paint_panel(next, true).await;
            }
        }
    }

    async fn refresh_active(&mut self, force: bool) {
        let active = self.state().view.active();
        self.paint_panel(active, force).await;
    }

    async fn paint_panel(&mut self, panel: Panel, force: bool) {
        let screen = self.shared.screen.clone();
        match panel {
            Panel::Services | Panel::NewService => self.shared.refresh_list(force).await,
            Panel::ServiceDetails => match self.shared.current.get() {
                Some(id) => {
                    self.shared.refresh_detail(id, force).await;
                }
                None => self.show_services().await,
            },
            Panel::Help => screen.paint(&help_frame()),
            Panel::Templates => match self.shared.client.list_templates().await {
                Ok(templates) => {
                    screen.paint(&templates_frame(&render_templates(&templates)));
                    self.state().templates = templates;
                }
                Err(e) => {
                    warn!("template load failed: {}", e);
                    screen.paint(&templates_frame(&RenderedList::placeholder(format!(
                        "Failed to load templates: {}",
                        e
                    ))));
                }
            },
            Panel::Groups => match self.shared.client.list_groups().await {
                Ok(groups) => {
                    screen.paint(&groups_frame(&render_groups(&groups), self.show_secrets));
                    self.state().groups = groups;
                }
                Err(e) => {
                    warn!("group load failed: {}", e);
                    screen.paint(&groups_frame(
                        &RenderedList::placeholder(format!("Failed to load groups: {}", e)),
                        self.show_secrets,
                    ));
                }
            },
            Panel::IyuuSettings => match self.shared.client.iyuu_config().await {
                Ok(config) => screen.paint(&iyuu_frame(&render_iyuu(&config, self.show_secrets))),
                Err(e) => {
                    warn!("IYUU settings load failed: {}", e);
                    screen.notify(
                        Notice::Error,
                        &format!("Failed to load IYUU settings: {}", e),
                    );
                }
            },
        }
    }

    // ==================== actions ====================

    /// `None` means the service on screen; `#n` indexes the last list.
    fn resolve(&self, target: Option<&str>) -> anyhow::Result<String> {
        match target {
            None => self
                .shared
                .current
                .get()
                .ok_or_else(|| anyhow!("no service selected, use 'view <id|#n>' or pass an id")),
            Some(t) if t.starts_with('#') => {
                let n: usize = t[1..]
                    .parse()
                    .map_err(|_| anyhow!("invalid index '{}'", t))?;
                self.state()
                    .services
                    .get(n.wrapping_sub(1))
                    .map(|s| s.id.clone())
                    .ok_or_else(|| anyhow!("no service at {}, run 'services' to reload", t))
            }
            Some(t) => Ok(t.to_string()),
        }
    }

    fn set_paused(&self, paused: bool) {
        self.state().paused = paused;
    }

    fn confirm(&self, prompt: &str) -> anyhow::Result<bool> {
        self.set_paused(true);
        let answer = confirm(prompt, self.assume_yes);
        self.set_paused(false);
        answer
    }

    fn notify(&self, notice: Notice, msg: &str) {
        self.shared.screen.notify(notice, msg);
    }

    async fn stop(&mut self, target: Option<&str>) -> anyhow::Result<()> {
        let id = self.resolve(target)?;
        if !self.confirm(&format!("Stop service {}?", id))? {
            return Ok(());
        }
        self.shared.client.stop_service(&id).await?;
        self.notify(Notice::Success, &format!("Service {} stopped", id));
        self.refresh_active(true).await;
        Ok(())
    }

    async fn restart(&mut self, target: Option<&str>) -> anyhow::Result<()> {
        let id = self.resolve(target)?;
        self.shared.client.restart_service(&id).await?;
        self.notify(Notice::Success, &format!("Service {} restarted", id));
        self.refresh_active(true).await;
        Ok(())
    }

    async fn delete(&mut self, target: Option<&str>) -> anyhow::Result<()> {
        let id = self.resolve(target)?;
        if !self.confirm(&format!("Delete service {}? This cannot be undone", id))? {
            return Ok(());
        }
        self.shared.client.delete_service(&id).await?;
        self.notify(Notice::Success, &format!("Service {} deleted", id));
        if self.shared.current.is(&id) {
            self.back().await;
        } else {
            self.refresh_active(true).await;
        }
        Ok(())
    }

    async fn stop_all(&mut self) -> anyhow::Result<()> {
        if !self.confirm("Stop ALL running services?")? {
            return Ok(());
        }
        let count = self.shared.client.stop_all_services().await?;
        self.notify(Notice::Success, &format!("Stopped {} service(s)", count));
        self.refresh_active(true).await;
        Ok(())
    }

    async fn auto_restart(&mut self, enabled: bool, target: Option<&str>) -> anyhow::Result<()> {
        let id = self.resolve(target)?;
        self.shared.client.set_auto_restart(&id, enabled).await?;
        self.notify(
            Notice::Success,
            &format!(
                "Auto restart {} for {}",
                if enabled { "enabled" } else { "disabled" },
                id
            ),
        );
        self.refresh_active(true).await;
        Ok(())
    }

    async fn clear_logs(&mut self, target: Option<&str>) -> anyhow::Result<()> {
        let id = self.resolve(target)?;
        self.shared.client.clear_logs(&id).await?;
        self.notify(Notice::Success, &format!("Logs cleared for {}", id));
        self.refresh_active(true).await;
        Ok(())
    }

    /// `remark <text>` on the service on screen, or `remark #n <text>`.
    async fn remark(&mut self, args: &[String]) -> anyhow::Result<()> {
        let (target, text) = match args {
            [first, rest @ ..] if first.starts_with('#') && !rest.is_empty() => {
                (Some(first.as_str()), rest.join(" "))
            }
            _ => (None, args.join(" ")),
        };
        let id = self.resolve(target)?;
        self.shared.client.set_remark(&id, text.trim()).await?;
        self.notify(Notice::Success, &format!("Remark updated for {}", id));
        self.refresh_active(true).await;
        Ok(())
    }

    async fn copy(&mut self, target: Option<&str>) -> anyhow::Result<()> {
        let id = self.resolve(target)?;
        let service = self.shared.client.get_service(&id).await?;
        let address = copyable_address(service.mapped_address.as_deref())
            .ok_or_else(|| anyhow!("service {} has no mapped address yet", id))?;
        copy_to_clipboard(&address)?;
        self.notify(Notice::Success, &format!("Copied {} to clipboard", address));
        Ok(())
    }

    /// Save the arguments of a service as a template.
    async fn save_template(&mut self, args: &[String]) -> anyhow::Result<()> {
        let id = self.resolve(None)?;
        let service = self.shared.client.get_service(&id).await?;
        if service.cmd_args.is_empty() {
            return Err(ConsoleError::validation("service has no arguments to save").into());
        }
        let name = match args.first() {
            Some(name) => name.clone(),
            None => {
                self.set_paused(true);
                let name = Input::<String>::with_theme(&ColorfulTheme::default())
                    .with_prompt("Template name")
                    .interact_text();
                self.set_paused(false);
                name?
            }
        };
        if name.trim().is_empty() {
            return Err(ConsoleError::validation("template name is required").into());
        }
        let req = SaveTemplateRequest {
            name: name.trim().to_string(),
            description: args.get(1..).map(|d| d.join(" ")).unwrap_or_default(),
            cmd_args: service.cmd_args,
        };
        let template_id = self.shared.client.save_template(&req).await?;
        self.notify(
            Notice::Success,
            &format!("Template '{}' saved ({})", req.name, template_id),
        );
        Ok(())
    }

    async fn use_template(&mut self, target: &str) -> anyhow::Result<()> {
        if self.state().templates.is_empty() {
            let templates = self.shared.client.list_templates().await?;
            self.state().templates = templates;
        }
        let template = {
            let state = self.state();
            let found = match target.strip_prefix('#') {
                Some(n) => n
                    .parse::<usize>()
                    .ok()
                    .and_then(|n| state.templates.get(n.wrapping_sub(1))),
                None => state.templates.iter().find(|t| t.id == target),
            };
            found
                .cloned()
                .ok_or_else(|| anyhow!("no template {}, run 'templates' to list them", target))?
        };
        self.notify(Notice::Info, &format!("Using template '{}'", template.name));
        self.new_service(Some(CommandMode::from_args(&template.cmd_args)))
            .await
    }

    /// Run the new-service form and start the result.
    async fn new_service(&mut self, prefill: Option<CommandMode>) -> anyhow::Result<()> {
        let groups = match self.shared.client.list_groups().await {
            Ok(groups) => groups,
            Err(e) => {
                debug!("groups unavailable for the form: {}", e);
                Vec::new()
            }
        };
        {
            let mut state = self.state();
            state.view = state.view.show(Panel::NewService);
            state.paused = true;
        }
        let form = prompt_start_options(&self.shared.client, prefill, &groups).await;
        self.set_paused(false);

        let Some(opts) = form? else {
            return Ok(());
        };
        let req = match opts.to_request() {
            Ok(req) => req,
            Err(e) => {
                self.notify(Notice::Error, &e.to_string());
                return Ok(());
            }
        };
        let id = self.shared.client.start_service(&req).await?;
        self.notify(Notice::Success, &format!("Service {} started", id));
        self.shared.refresh_list(true).await;
        Ok(())
    }

    async fn login(&mut self) -> anyhow::Result<()> {
        self.set_paused(true);
        let password = Password::with_theme(&ColorfulTheme::default())
            .with_prompt("Console password")
            .interact();
        self.set_paused(false);
        self.shared.client.login(&password?).await?;
        self.session_expired.store(false, Ordering::SeqCst);
        self.notify(Notice::Success, "Logged in");
        self.refresh_active(true).await;
        Ok(())
    }

    #[cfg(test)]
    fn polling(&self) -> &PollingSynchronizer {
        &self.sync
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn short_id(id: &str) -> String {
    if id.chars().count() > 8 {
        id.chars().skip(id.chars().count() - 8).collect()
    } else {
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::console::screen::RecordingScreen;
    use crate::testing::spawn_backend;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use natter_console_core::render::NO_SERVICES;
    use natter_console_core::TokenStore;
    use serde_json::{json, Value};
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    fn fast() -> PollingConfig {
        PollingConfig {
            list: Duration::from_millis(50),
            detail: Duration::from_millis(50),
            runtime: Duration::from_millis(20),
        }
    }

    async fn controller(router: Router, config: PollingConfig) -> (Controller, Arc<RecordingScreen>) {
        let base = spawn_backend(router).await;
        let client = ApiClient::new(base, TokenStore::memory(Some("t".into()))).unwrap();
        let screen = Arc::new(RecordingScreen::default());
        let ctrl = Controller::new(client, screen.clone(), config, false).assume_yes(true);
        (ctrl, screen)
    }

    fn two_services() -> Value {
        json!({ "services": [
            { "id": "a", "status": "running", "mapped_address": "tcp://203.0.113.7:40001", "start_time": 1.0 },
            { "id": "b", "status": "stopped" },
        ]})
    }

    fn service_routes() -> Router {
        Router::new()
            .route("/api/services", get(|| async { Json(two_services()) }))
            .route(
                "/api/service",
                get(|Query(q): Query<HashMap<String, String>>| async move {
                    let id = q.get("id").cloned().unwrap_or_default();
                    Json(json!({ "service": { "id": id, "status": "running", "last_output": ["ok"] } }))
                }),
            )
    }

    #[tokio::test]
    async fn empty_list_paints_placeholder() {
        let router = Router::new().route(
            "/api/services",
            get(|| async { Json(json!({ "services": [] })) }),
        );
        let (mut ctrl, screen) = controller(router, PollingConfig::default()).await;
        ctrl.show_services().await;
        let frame = screen.last_frame().unwrap();
        assert!(frame.contains(NO_SERVICES));
    }

    #[tokio::test]
    async fn failed_list_paints_failure_placeholder() {
        let router = Router::new().route(
            "/api/services",
            get(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "database locked" })),
                )
            }),
        );
        let (mut ctrl, screen) = controller(router, PollingConfig::default()).await;
        ctrl.show_services().await;
        let frame = screen.last_frame().unwrap();
        assert!(frame.contains("Failed to load services"));
        assert!(frame.contains("database locked"));
    }

    #[tokio::test]
    async fn list_refresh_keeps_polling_and_skips_unchanged_frames() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = hits.clone();
        let router = Router::new().route(
            "/api/services",
            get(move || {
                counter.fetch_add(1, Ordering::SeqCst);
                async { Json(two_services()) }
            }),
        );
        let (mut ctrl, screen) = controller(router, fast()).await;
        ctrl.start();
        tokio::time::sleep(Duration::from_millis(230)).await;
        assert!(hits.load(Ordering::SeqCst) >= 3);
        assert_eq!(screen.frame_count(), 1);
        assert_eq!(ctrl.service_ids(), vec!["a".to_string(), "b".to_string()]);
    }

    #[tokio::test]
    async fn switching_services_keeps_one_detail_timer() {
        let (mut ctrl, _screen) = controller(service_routes(), PollingConfig::default()).await;
        ctrl.show_services().await;
        ctrl.execute("view", &["#1".into()]).await.unwrap();
        ctrl.execute("view", &["#2".into()]).await.unwrap();

        assert_eq!(ctrl.polling().active_detail_timers(), 1);
        assert_eq!(ctrl.polling().detail_service(), Some("b"));
        assert!(ctrl.polling().runtime_tick_active());
        assert_eq!(ctrl.current_service().as_deref(), Some("b"));
        assert_eq!(ctrl.state().view.active(), Panel::ServiceDetails);
    }

    #[tokio::test]
    async fn runtime_tick_updates_prompt_without_painting() {
        let router = Router::new().route(
            "/api/service",
            get(|| async {
                Json(json!({ "service": { "id": "a", "status": "running", "start_time": 1.0 } }))
            }),
        );
        let config = PollingConfig {
            list: Duration::from_secs(60),
            detail: Duration::from_secs(60),
            runtime: Duration::from_millis(20),
        };
        let (mut ctrl, screen) = controller(router, config).await;
        ctrl.execute("view", &["a".into()]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(30)).await;
        let frames = screen.frame_count();

        ctrl.state().runtime_label = None;
        assert_eq!(ctrl.prompt(), "natter[a]> ");
        tokio::time::sleep(Duration::from_millis(80)).await;

        let prompt = ctrl.prompt();
        assert!(prompt.starts_with("natter[a "), "{}", prompt);
        assert!(!prompt.contains("N/A"));
        assert_eq!(screen.frame_count(), frames);
    }

    #[tokio::test]
    async fn back_clears_detail_timers() {
        let (mut ctrl, _screen) = controller(service_routes(), PollingConfig::default()).await;
        ctrl.execute("view", &["a".into()]).await.unwrap();
        ctrl.execute("back", &[]).await.unwrap();
        tokio::task::yield_now().await;
        assert_eq!(ctrl.polling().active_detail_timers(), 0);
        assert!(!ctrl.polling().runtime_tick_active());
        assert_eq!(ctrl.current_service(), None);
        assert!(ctrl.state().view.is_visible(Panel::Services));
    }

    #[tokio::test]
    async fn missing_service_on_entry_returns_to_list() {
        let router = Router::new()
            .route("/api/services", get(|| async { Json(json!({ "services": [] })) }))
            .route(
                "/api/service",
                get(|| async {
                    (
                        StatusCode::NOT_FOUND,
                        Json(json!({ "error": "Service not found" })),
                    )
                }),
            );
        let (mut ctrl, screen) = controller(router, PollingConfig::default()).await;
        ctrl.execute("view", &["gone".into()]).await.unwrap();

        assert_eq!(ctrl.current_service(), None);
        assert_eq!(ctrl.polling().active_detail_timers(), 0);
        assert_eq!(ctrl.state().view.active(), Panel::Services);
        assert!(screen.has_notice(Notice::Warning, "gone"));
        assert!(screen.last_frame().unwrap().contains(NO_SERVICES));
    }

    #[tokio::test]
    async fn service_deleted_elsewhere_stops_detail_polling() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let router = Router::new()
            .route("/api/services", get(|| async { Json(json!({ "services": [] })) }))
            .route(
                "/api/service",
                get(move || {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    async move {
                        if n == 0 {
                            (
                                StatusCode::OK,
                                Json(json!({ "service": { "id": "a", "status": "running" } })),
                            )
                        } else {
                            (
                                StatusCode::NOT_FOUND,
                                Json(json!({ "error": "Service not found" })),
                            )
                        }
                    }
                }),
            );
        let (mut ctrl, screen) = controller(router, fast()).await;
        ctrl.execute("view", &["a".into()]).await.unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(ctrl.current_service(), None);
        assert_eq!(ctrl.state().view.active(), Panel::Services);
        assert!(screen.has_notice(Notice::Warning, "no longer exists"));
        assert_eq!(ctrl.polling().active_detail_timers(), 0);
        let seen = calls.load(Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), seen);

        ctrl.execute("refresh", &[]).await.unwrap();
        assert!(!ctrl.polling().runtime_tick_active());
    }

    #[tokio::test]
    async fn deleting_the_open_service_returns_to_list() {
        let router = service_routes().route(
            "/api/services/delete",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body, json!({ "id": "a" }));
                Json(json!({ "success": true }))
            }),
        );
        let (mut ctrl, screen) = controller(router, PollingConfig::default()).await;
        ctrl.execute("view", &["a".into()]).await.unwrap();
        ctrl.execute("delete", &[]).await.unwrap();

        assert_eq!(ctrl.current_service(), None);
        assert_eq!(ctrl.state().view.active(), Panel::Services);
        assert!(screen.has_notice(Notice::Success, "deleted"));
    }

    #[tokio::test]
    async fn help_returns_to_previous_view_on_close() {
        let (mut ctrl, _screen) = controller(service_routes(), PollingConfig::default()).await;
        ctrl.execute("view", &["a".into()]).await.unwrap();
        ctrl.execute("help", &[]).await.unwrap();
        assert_eq!(ctrl.state().view.active(), Panel::Help);
        assert_eq!(ctrl.prompt(), "natter[help]> ");

        ctrl.execute("close", &[]).await.unwrap();
        assert_eq!(ctrl.state().view.active(), Panel::ServiceDetails);
        assert_eq!(ctrl.polling().detail_service(), Some("a"));
    }

    #[tokio::test]
    async fn expired_session_notifies_once() {
        let router = Router::new().route(
            "/api/services",
            get(|| async {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({ "error": "invalid token" })),
                )
            }),
        );
        let (mut ctrl, screen) = controller(router, PollingConfig::default()).await;
        ctrl.show_services().await;
        ctrl.show_services().await;
        let count = screen
            .notices
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, m)| m == SESSION_EXPIRED_NOTICE)
            .count();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn unknown_index_is_an_error() {
        let (mut ctrl, _screen) = controller(service_routes(), PollingConfig::default()).await;
        ctrl.show_services().await;
        assert!(ctrl.execute("view", &["#9".into()]).await.is_err());
        assert!(ctrl.execute("stop", &[]).await.is_err());
        assert!(ctrl.execute("bogus", &[]).await.is_err());
    }

    #[test]
    fn short_id_keeps_tail() {
        assert_eq!(short_id("1700000000123"), "00000123");
        assert_eq!(short_id("abc"), "abc");
    }
}
