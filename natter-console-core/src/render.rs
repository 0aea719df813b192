//! Render models for service, template and group lists.
//!
//! Rendering is a pure function of its input and always produces a complete
//! replacement of the previous output; nothing is diffed or patched.

use crate::models::{Group, IyuuConfig, Service, ServiceState, Template};
use chrono::{Local, TimeZone};

pub const NO_SERVICES: &str = "No services";
pub const NO_TEMPLATES: &str = "No saved templates";
pub const NO_GROUPS: &str = "No groups";
pub const ADDRESS_PENDING: &str = "waiting for mapping...";
pub const UNKNOWN: &str = "unknown";
/// Log lines kept on the detail view.
pub const MAX_LOG_LINES: usize = 100;

const SHORT_ADDRESS_LIMIT: usize = 25;
const SHORT_HOST_LIMIT: usize = 15;
const SHORT_HOST_KEEP: usize = 12;

/// Colour taxonomy shared by every status badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    Danger,
    Warning,
    Neutral,
}

/// Port status strings reported by natter (`OPEN`, `CLOSED`, `UNKNOWN`).
pub fn status_class(status: Option<&str>) -> StatusClass {
    match status {
        Some("OPEN") => StatusClass::Success,
        Some("CLOSED") => StatusClass::Danger,
        Some("UNKNOWN") => StatusClass::Warning,
        _ => StatusClass::Neutral,
    }
}

pub fn state_class(state: ServiceState) -> StatusClass {
    match state {
        ServiceState::Running => StatusClass::Success,
        ServiceState::Stopped => StatusClass::Danger,
        ServiceState::Waiting => StatusClass::Warning,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Badge {
    pub text: String,
    pub class: StatusClass,
}

impl Badge {
    fn port_status(status: Option<&str>) -> Self {
        Self {
            text: status.unwrap_or(UNKNOWN).to_string(),
            class: status_class(status),
        }
    }
}

/// One node of a rendered list.
#[derive(Debug, Clone, PartialEq)]
pub enum ListNode<T> {
    Placeholder(String),
    Item(T),
}

/// Fully rendered list; an empty input yields a single placeholder.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedList<T> {
    pub nodes: Vec<ListNode<T>>,
}

impl<T> RenderedList<T> {
    fn from_items<S>(source: &[S], placeholder: &str, render: impl Fn(usize, &S) -> T) -> Self {
        if source.is_empty() {
            return Self::placeholder(placeholder);
        }
        Self {
            nodes: source
                .iter()
                .enumerate()
                .map(|(idx, item)| ListNode::Item(render(idx, item)))
                .collect(),
        }
    }

    /// A list holding only a message, used for empty and failed loads.
    pub fn placeholder(message: impl Into<String>) -> Self {
        Self {
            nodes: vec![ListNode::Placeholder(message.into())],
        }
    }

    pub fn items(&self) -> impl Iterator<Item = &T> {
        self.nodes.iter().filter_map(|n| match n {
            ListNode::Item(item) => Some(item),
            ListNode::Placeholder(_) => None,
        })
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.nodes.iter().filter_map(|n| match n {
            ListNode::Placeholder(msg) => Some(msg.as_str()),
            ListNode::Item(_) => None,
        })
    }
}

/// Actions bound to a card at render time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CardAction {
    View(String),
    Stop(String),
    Delete(String),
    /// Carries the full, untruncated address.
    Copy(String),
    UseTemplate(String),
    DeleteTemplate(String),
    ViewGroup(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceCard {
    /// 1-based position, used as `#n` shorthand.
    pub index: usize,
    pub id: String,
    pub short_address: String,
    pub full_address: Option<String>,
    pub state: ServiceState,
    pub state_class: StatusClass,
    pub command: String,
    pub runtime: String,
    pub remark: Option<String>,
    pub group: Option<String>,
    pub auto_restart: bool,
    pub lan: Badge,
    pub wan: Badge,
    pub actions: Vec<CardAction>,
}

pub fn render_services(services: &[Service], now: f64) -> RenderedList<ServiceCard> {
    RenderedList::from_items(services, NO_SERVICES, |idx, svc| service_card(idx, svc, now))
}

fn service_card(idx: usize, svc: &Service, now: f64) -> ServiceCard {
    let full_address = copyable_address(svc.mapped_address.as_deref());
    let display = svc.mapped_address.as_deref().unwrap_or(ADDRESS_PENDING);
    let mut actions = vec![CardAction::View(svc.id.clone())];
    if svc.state() == ServiceState::Running {
        actions.push(CardAction::Stop(svc.id.clone()));
    }
    actions.push(CardAction::Delete(svc.id.clone()));
    if let Some(addr) = &full_address {
        actions.push(CardAction::Copy(addr.clone()));
    }
    ServiceCard {
        index: idx + 1,
        id: svc.id.clone(),
        short_address: format_address_short(display),
        full_address,
        state: svc.state(),
        state_class: state_class(svc.state()),
        command: svc.cmd_args.join(" "),
        runtime: runtime_since(svc.start_time, now),
        remark: svc.remark.clone().filter(|r| !r.trim().is_empty()),
        group: svc.group_name.clone().filter(|g| !g.trim().is_empty()),
        auto_restart: svc.auto_restart,
        lan: Badge::port_status(svc.lan_status.as_deref()),
        wan: Badge::port_status(svc.wan_status.as_deref()),
        actions,
    }
}

/// Everything the service-details view shows.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceDetail {
    pub id: String,
    pub state: ServiceState,
    pub state_class: StatusClass,
    pub address: String,
    /// `None` when there is nothing worth copying yet.
    pub copy_address: Option<String>,
    pub command_line: String,
    pub runtime: String,
    pub remark: Option<String>,
    pub group: Option<String>,
    pub auto_restart: bool,
    pub lan: Badge,
    pub wan: Badge,
    pub nat_type: String,
    /// Truncation notice followed by the newest log lines.
    pub log_header: Option<String>,
    pub log_lines: Vec<String>,
}

pub fn render_service_detail(svc: &Service, now: f64) -> ServiceDetail {
    let state = svc.state();
    let total = svc.last_output.len();
    let (log_header, log_lines) = if total > MAX_LOG_LINES {
        (
            Some(format!(
                "[showing latest {MAX_LOG_LINES} of {total} log lines]"
            )),
            svc.last_output[total - MAX_LOG_LINES..].to_vec(),
        )
    } else {
        (None, svc.last_output.clone())
    };
    let copy_address = if state == ServiceState::Running {
        copyable_address(svc.mapped_address.as_deref())
    } else {
        None
    };

    ServiceDetail {
        id: svc.id.clone(),
        state,
        state_class: state_class(state),
        address: svc.mapped_address.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        copy_address,
        command_line: format!("natter.py {}", svc.cmd_args.join(" ")),
        runtime: runtime_since(svc.start_time, now),
        remark: svc.remark.clone().filter(|r| !r.trim().is_empty()),
        group: svc.group_name.clone().filter(|g| !g.trim().is_empty()),
        auto_restart: svc.auto_restart,
        lan: Badge::port_status(svc.lan_status.as_deref()),
        wan: Badge::port_status(svc.wan_status.as_deref()),
        nat_type: svc.nat_type.clone().unwrap_or_else(|| UNKNOWN.to_string()),
        log_header,
        log_lines,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateCard {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub created: String,
    pub description: String,
    pub command_line: String,
    pub actions: Vec<CardAction>,
}

pub fn render_templates(templates: &[Template]) -> RenderedList<TemplateCard> {
    RenderedList::from_items(templates, NO_TEMPLATES, |idx, tmpl| TemplateCard {
        index: idx + 1,
        id: tmpl.id.clone(),
        name: tmpl.name.clone(),
        created: format_timestamp(tmpl.created_at),
        description: tmpl
            .description
            .clone()
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "no description".to_string()),
        command_line: format!("natter.py {}", tmpl.cmd_args.join(" ")),
        actions: vec![
            CardAction::UseTemplate(tmpl.id.clone()),
            CardAction::DeleteTemplate(tmpl.id.clone()),
        ],
    })
}

#[derive(Debug, Clone, PartialEq)]
pub struct GroupCard {
    pub index: usize,
    pub id: String,
    pub name: String,
    pub service_count: usize,
    pub protected: bool,
    /// Shown verbatim only when secrets are requested.
    pub password: Option<String>,
    pub service_ids: Vec<String>,
    pub actions: Vec<CardAction>,
}

pub fn render_groups(groups: &[Group]) -> RenderedList<GroupCard> {
    RenderedList::from_items(groups, NO_GROUPS, |idx, group| {
        let password = group.password.clone().filter(|p| !p.is_empty());
        GroupCard {
            index: idx + 1,
            id: group.id.clone(),
            name: group.name.clone(),
            service_count: group.service_count.max(group.services.len()),
            protected: password.is_some(),
            password,
            service_ids: group.services.iter().map(|s| s.id.clone()).collect(),
            actions: vec![CardAction::ViewGroup(group.id.clone())],
        }
    })
}

/// IYUU settings with tokens masked for display.
#[derive(Debug, Clone, PartialEq)]
pub struct IyuuView {
    pub enabled: bool,
    pub tokens: Vec<String>,
    pub schedule_enabled: bool,
    pub schedule_times: Vec<String>,
    pub schedule_message: String,
}

pub fn render_iyuu(config: &IyuuConfig, reveal: bool) -> IyuuView {
    IyuuView {
        enabled: config.enabled,
        tokens: config
            .tokens
            .iter()
            .map(|t| if reveal { t.clone() } else { mask_secret(t) })
            .collect(),
        schedule_enabled: config.schedule.enabled,
        schedule_times: config.schedule.times.clone(),
        schedule_message: config.schedule.message.clone(),
    }
}

/// Shorten an address for compact display while keeping the port.
pub fn format_address_short(address: &str) -> String {
    if address.is_empty() || address == ADDRESS_PENDING || address == UNKNOWN {
        return address.to_string();
    }
    let result = match address.split_once("://") {
        Some((_, rest)) => rest,
        None => address,
    };
    if result.chars().count() > SHORT_ADDRESS_LIMIT {
        if let Some((host, port)) = result.rsplit_once(':') {
            let short_host = if host.chars().count() > SHORT_HOST_LIMIT {
                format!("{}...", host.chars().take(SHORT_HOST_KEEP).collect::<String>())
            } else {
                host.to_string()
            };
            return format!("{short_host}:{port}");
        }
    }
    result.to_string()
}

/// The full address if there is something worth copying.
pub fn copyable_address(address: Option<&str>) -> Option<String> {
    address
        .map(str::trim)
        .filter(|a| !a.is_empty() && *a != ADDRESS_PENDING && *a != UNKNOWN)
        .map(str::to_string)
}

/// Human readable elapsed time, `N/A` for negative or non-finite input.
pub fn format_runtime(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "N/A".to_string();
    }
    let total = seconds as u64;
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let secs = total % 60;

    if days > 0 {
        format!("{}d {}h {}m", days, hours, minutes)
    } else if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

pub fn runtime_since(start_time: Option<f64>, now: f64) -> String {
    match start_time {
        Some(start) if start > 0.0 => format_runtime(now - start),
        _ => "N/A".to_string(),
    }
}

/// Keep the first and last four characters of a secret.
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() <= 8 {
        return "*".repeat(chars.len().max(4));
    }
    let head: String = chars[..4].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}****{tail}")
}

fn format_timestamp(epoch: f64) -> String {
    Local
        .timestamp_opt(epoch as i64, 0)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "N/A".to_string())
}

/// Current wall-clock time as fractional epoch seconds.
pub fn now_epoch() -> f64 {
    chrono::Utc::now().timestamp_millis() as f64 / 1000.0
}
