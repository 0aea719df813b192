//! Turn render models into terminal frames.
//!
//! Each function returns the whole frame as text; callers decide whether to
//! print it directly or hand it to the console screen.

use super::ui::{
    empty_line, format_state, header_block, hint_line, kv_line, paint_class, section_line,
    table_header, truncate,
};
use crossterm::style::Stylize;
use natter_console_core::render::{
    mask_secret, GroupCard, IyuuView, ListNode, RenderedList, ServiceCard, ServiceDetail,
    TemplateCard,
};
use std::fmt::Write;

pub fn services_frame(list: &RenderedList<ServiceCard>) -> String {
    let mut out = header_block("📋 SERVICES");
    let cards: Vec<&ServiceCard> = list.items().collect();
    if cards.is_empty() {
        for msg in list.placeholders() {
            out.push_str(&empty_line(msg));
        }
        out.push_str(&hint_line("Use 'new' to start a service"));
        return out;
    }

    let running = cards
        .iter()
        .filter(|c| c.state == natter_console_core::ServiceState::Running)
        .count();
    let _ = writeln!(
        out,
        "  Total: {}  |  {} Running  |  {} Other\n",
        cards.len().to_string().white().bold(),
        running.to_string().green(),
        (cards.len() - running).to_string().dark_grey()
    );
    out.push_str(&table_header(&[
        ("#", 4),
        ("ADDRESS", 28),
        ("STATUS", 12),
        ("LAN/WAN", 16),
        ("RUNTIME", 12),
        ("NOTE", 20),
    ]));
    out.push('\n');

    for node in &list.nodes {
        match node {
            ListNode::Placeholder(msg) => out.push_str(&empty_line(msg)),
            ListNode::Item(card) => {
                let note = card
                    .remark
                    .as_deref()
                    .or(card.group.as_deref())
                    .unwrap_or("");
                let restart = if card.auto_restart { " ↻" } else { "" };
                let _ = writeln!(
                    out,
                    "  {:<4} {:<28} {:<21} {} / {}  {:<12} {}{}",
                    format!("#{}", card.index).cyan(),
                    card.short_address,
                    format_state(card.state),
                    paint_class(&card.lan.text, card.lan.class),
                    paint_class(&card.wan.text, card.wan.class),
                    card.runtime,
                    truncate(note, 20),
                    restart
                );
            }
        }
    }
    out.push('\n');
    out.push_str(&hint_line("Use 'view #n' to see details and logs"));
    out
}

pub fn detail_frame(detail: &ServiceDetail) -> String {
    let mut out = header_block(&format!("📦 SERVICE: {}", detail.id));
    out.push_str(&section_line("Status"));
    out.push('\n');
    let lines = [
        kv_line("State", &format_state(detail.state)),
        kv_line("Address", &detail.address.as_str().cyan().to_string()),
        kv_line("Runtime", &detail.runtime),
        kv_line("LAN", &paint_class(&detail.lan.text, detail.lan.class)),
        kv_line("WAN", &paint_class(&detail.wan.text, detail.wan.class)),
        kv_line("NAT type", &detail.nat_type),
        kv_line(
            "Auto restart",
            if detail.auto_restart { "Yes" } else { "No" },
        ),
    ];
    for line in lines {
        out.push_str(&line);
        out.push('\n');
    }
    if let Some(remark) = &detail.remark {
        out.push_str(&kv_line("Remark", remark));
        out.push('\n');
    }
    if let Some(group) = &detail.group {
        out.push_str(&kv_line("Group", group));
        out.push('\n');
    }
    out.push_str(&kv_line("Command", &detail.command_line.as_str().yellow().to_string()));
    out.push('\n');

    out.push('\n');
    out.push_str(&section_line("Output"));
    out.push('\n');
    if let Some(header) = &detail.log_header {
        let _ = writeln!(out, "  {}", header.as_str().dark_grey().italic());
    }
    if detail.log_lines.is_empty() {
        out.push_str(&empty_line("No output yet"));
    }
    for line in &detail.log_lines {
        let _ = writeln!(out, "  {}", line);
    }
    out
}

pub fn templates_frame(list: &RenderedList<TemplateCard>) -> String {
    let mut out = header_block("📑 TEMPLATES");
    for node in &list.nodes {
        match node {
            ListNode::Placeholder(msg) => out.push_str(&empty_line(msg)),
            ListNode::Item(card) => {
                let _ = writeln!(
                    out,
                    "  {} {}  {}",
                    format!("#{}", card.index).cyan(),
                    card.name.as_str().white().bold(),
                    card.created.as_str().dark_grey()
                );
                let _ = writeln!(out, "     {}", card.description);
                let _ = writeln!(out, "     {}", card.command_line.as_str().yellow());
            }
        }
    }
    out
}

pub fn groups_frame(list: &RenderedList<GroupCard>, show_secrets: bool) -> String {
    let mut out = header_block("🗂  GROUPS");
    let has_items = list.items().next().is_some();
    if has_items {
        out.push_str(&table_header(&[
            ("#", 4),
            ("ID", 16),
            ("NAME", 20),
            ("SERVICES", 9),
            ("PASSWORD", 16),
        ]));
        out.push('\n');
    }
    for node in &list.nodes {
        match node {
            ListNode::Placeholder(msg) => out.push_str(&empty_line(msg)),
            ListNode::Item(card) => {
                let password = match (&card.password, show_secrets) {
                    (Some(p), true) => p.clone(),
                    (Some(p), false) => mask_secret(p),
                    (None, _) => "-".to_string(),
                };
                let _ = writeln!(
                    out,
                    "  {:<4} {:<16} {:<20} {:<9} {}",
                    format!("#{}", card.index).cyan(),
                    truncate(&card.id, 16),
                    truncate(&card.name, 20),
                    card.service_count,
                    password
                );
            }
        }
    }
    out
}

pub fn iyuu_frame(view: &IyuuView) -> String {
    let mut out = header_block("🔔 IYUU SETTINGS");
    let on_off = |b: bool| {
        if b {
            "enabled".green().to_string()
        } else {
            "disabled".dark_grey().to_string()
        }
    };
    let _ = writeln!(out, "{}", kv_line("Push", &on_off(view.enabled)));
    let _ = writeln!(out, "{}", kv_line("Schedule", &on_off(view.schedule_enabled)));
    let times = if view.schedule_times.is_empty() {
        "-".to_string()
    } else {
        view.schedule_times.join(", ")
    };
    let _ = writeln!(out, "{}", kv_line("Times", &times));
    if !view.schedule_message.is_empty() {
        let _ = writeln!(out, "{}", kv_line("Message", &view.schedule_message));
    }
    out.push('\n');
    out.push_str(&section_line("Tokens"));
    out.push('\n');
    if view.tokens.is_empty() {
        out.push_str(&empty_line("No tokens"));
    }
    for (idx, token) in view.tokens.iter().enumerate() {
        let _ = writeln!(out, "  {} {}", format!("#{}", idx + 1).cyan(), token);
    }
    out
}

pub fn help_frame() -> String {
    let mut out = header_block("❓ HELP");
    let sections: &[(&str, &[(&str, &str)])] = &[
        (
            "Navigation",
            &[
                ("services", "Show the service list"),
                ("view <id|#n>", "Show service details and logs"),
                ("back", "Return from details"),
                ("templates", "Show saved templates"),
                ("groups", "Show service groups"),
                ("iyuu", "Show IYUU push settings"),
                ("close", "Close the current panel"),
                ("help", "Show this help"),
            ],
        ),
        (
            "Services",
            &[
                ("new", "Start a new service (interactive form)"),
                ("use <#n>", "Start a new service from a template"),
                ("stop [id|#n]", "Stop a service"),
                ("restart [id|#n]", "Restart a service"),
                ("delete [id|#n]", "Delete a service"),
                ("stop-all", "Stop every running service"),
                ("auto-restart <on|off>", "Toggle auto restart"),
                ("clear-logs", "Clear the service output"),
                ("remark <text>", "Set the service remark"),
                ("copy", "Copy the mapped address"),
                ("save-template", "Save the service as a template"),
            ],
        ),
        (
            "Other",
            &[("refresh", "Reload the current view"), ("exit", "Leave the console")],
        ),
    ];
    for (title, cmds) in sections {
        out.push_str(&section_line(title));
        out.push('\n');
        for (cmd, desc) in *cmds {
            let _ = writeln!(out, "  {:<24} {}", cmd.cyan(), desc);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use natter_console_core::render::{render_groups, render_services, NO_SERVICES};
    use natter_console_core::{Group, Service};
    use serde_json::json;

    #[test]
    fn empty_service_list_paints_placeholder() {
        let frame = services_frame(&render_services(&[], 0.0));
        assert!(frame.contains(NO_SERVICES));
        assert!(!frame.contains("ADDRESS"));
    }

    #[test]
    fn service_rows_show_short_address() {
        let svc: Service = serde_json::from_value(json!({
            "id": "a",
            "status": "running",
            "mapped_address": "tcp://203.0.113.7:40123",
        }))
        .unwrap();
        let frame = services_frame(&render_services(&[svc], 0.0));
        assert!(frame.contains("203.0.113.7:40123"));
        assert!(frame.contains("#1"));
    }

    #[test]
    fn group_password_is_masked_unless_requested() {
        let group: Group = serde_json::from_value(json!({
            "id": "g1",
            "name": "home",
            "password": "supersecret123",
        }))
        .unwrap();
        let list = render_groups(&[group]);
        assert!(!groups_frame(&list, false).contains("supersecret123"));
        assert!(groups_frame(&list, true).contains("supersecret123"));
    }
}
