//! Interactive new-service form.

use super::services::StartOptions;
use super::tools::tool_for_method;
use crate::client::ApiClient;
use crossterm::style::Stylize;
use dialoguer::{theme::ColorfulTheme, Confirm, Input, Select};
use natter_console_core::{
    build_args, BasicOptions, CommandMode, Group, DEFAULT_FORWARD_METHOD, FORWARD_METHODS,
};

/// Walk the user through the form. `Ok(None)` means they backed out.
///
/// `prefill` comes from a template; it opens the form in advanced mode.
pub async fn prompt_start_options(
    client: &ApiClient,
    prefill: Option<CommandMode>,
    groups: &[Group],
) -> anyhow::Result<Option<StartOptions>> {
    let theme = ColorfulTheme::default();

    println!();
    println!(
        "{}",
        "╔══════════════════════════════════════════════════════════════╗".dark_cyan()
    );
    println!(
        "{}",
        "║                  🚀 START A NEW NATTER SERVICE               ║".dark_cyan()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════════╝".dark_cyan()
    );

    let mode = prompt_mode(&theme, prefill)?;
    if let CommandMode::Basic(opts) = &mode {
        ensure_forward_tool(&theme, client, &opts.forward_method).await?;
    }
    let (auto_restart, remark, group_id) = prompt_service_options(&theme, groups)?;

    let opts = StartOptions {
        mode,
        auto_restart,
        remark,
        group_id,
    };
    if !preview_and_confirm(&theme, &opts)? {
        println!("  {} Cancelled.", "✗".red());
        return Ok(None);
    }
    Ok(Some(opts))
}

fn prompt_mode(theme: &ColorfulTheme, prefill: Option<CommandMode>) -> anyhow::Result<CommandMode> {
    print_step(1, "Command");
    let (default_idx, basic_prefill, initial, preset) = match prefill {
        Some(CommandMode::Basic(opts)) => (0, opts, String::new(), None),
        Some(CommandMode::Advanced(text)) => (1, BasicOptions::default(), text, None),
        Some(CommandMode::Preset(args)) => (1, BasicOptions::default(), args.join(" "), Some(args)),
        None => (0, BasicOptions::default(), String::new(), None),
    };

    let idx = Select::with_theme(theme)
        .with_prompt("How do you want to describe the service?")
        .items(&["Basic form", "Advanced (raw natter arguments)"])
        .default(default_idx)
        .interact()?;

    if idx == 1 {
        let text: String = Input::with_theme(theme)
            .with_prompt("natter.py arguments")
            .with_initial_text(initial.clone())
            .allow_empty(true)
            .interact_text()?;
        return Ok(keep_preset(preset, &initial, text));
    }
    Ok(CommandMode::Basic(prompt_basic(theme, basic_prefill)?))
}

/// Unedited template arguments keep their original tokens.
fn keep_preset(preset: Option<Vec<String>>, initial: &str, text: String) -> CommandMode {
    match preset {
        Some(args) if text == initial => CommandMode::Preset(args),
        _ => CommandMode::Advanced(text),
    }
}

fn input(theme: &ColorfulTheme, prompt: &str, initial: &str) -> anyhow::Result<String> {
    Ok(Input::with_theme(theme)
        .with_prompt(prompt)
        .with_initial_text(initial)
        .allow_empty(true)
        .interact_text()?)
}

fn yes_no(theme: &ColorfulTheme, prompt: &str, default: bool) -> anyhow::Result<bool> {
    Ok(Confirm::with_theme(theme)
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}

fn prompt_basic(theme: &ColorfulTheme, prefill: BasicOptions) -> anyhow::Result<BasicOptions> {
    print_step(2, "Target");
    let mut opts = prefill;
    opts.target_ip = input(theme, "Target IP (empty: this host)", &opts.target_ip)?;
    opts.target_port = input(theme, "Target port (required)", &opts.target_port)?;
    opts.udp = yes_no(theme, "UDP mode?", opts.udp)?;

    let current = if opts.forward_method.is_empty() {
        DEFAULT_FORWARD_METHOD
    } else {
        opts.forward_method.as_str()
    };
    let default_idx = FORWARD_METHODS
        .iter()
        .position(|m| *m == current)
        .unwrap_or(0);
    let idx = Select::with_theme(theme)
        .with_prompt("Forward method")
        .items(FORWARD_METHODS)
        .default(default_idx)
        .interact()?;
    opts.forward_method = FORWARD_METHODS[idx].to_string();

    print_step(3, "Advanced options");
    if !yes_no(theme, "Configure binding, STUN and keep-alive?", false)? {
        return Ok(opts);
    }
    opts.bind_interface = input(theme, "Bind interface", &opts.bind_interface)?;
    opts.bind_port = input(theme, "Bind port", &opts.bind_port)?;
    opts.upnp = yes_no(theme, "Enable UPnP?", opts.upnp)?;
    opts.stun_server = input(theme, "STUN server", &opts.stun_server)?;
    opts.keepalive_server = input(theme, "Keep-alive server", &opts.keepalive_server)?;
    opts.keepalive_interval = input(theme, "Keep-alive interval (s)", &opts.keepalive_interval)?;
    opts.notify_script = input(theme, "Notification script", &opts.notify_script)?;
    opts.retry = yes_no(theme, "Retry until the port is open?", opts.retry)?;
    opts.quit_on_change = yes_no(theme, "Quit when the mapping changes?", opts.quit_on_change)?;
    Ok(opts)
}

/// socat and gost forwarding need the helper installed on the backend host.
async fn ensure_forward_tool(
    theme: &ColorfulTheme,
    client: &ApiClient,
    method: &str,
) -> anyhow::Result<()> {
    let Some(tool) = tool_for_method(method) else {
        return Ok(());
    };
    let check = match client.check_tool(tool).await {
        Ok(check) => check,
        Err(e) => {
            tracing::warn!("tool check for {} failed: {}", tool, e);
            return Ok(());
        }
    };
    if check.installed {
        return Ok(());
    }
    println!("  {} {} is not installed on the backend host", "⚠".yellow(), tool);
    if yes_no(theme, &format!("Install {} now?", tool), true)? {
        match client.install_tool(tool).await {
            Ok(_) => println!("  {} {} installed", "✓".green(), tool),
            Err(e) => println!("  {} {}", "✗".red(), e),
        }
    }
    Ok(())
}

fn prompt_service_options(
    theme: &ColorfulTheme,
    groups: &[Group],
) -> anyhow::Result<(bool, Option<String>, Option<String>)> {
    print_step(4, "Service options");
    let auto_restart = yes_no(theme, "Restart automatically when it exits?", false)?;
    let remark = input(theme, "Remark", "")?;

    let group_id = if groups.is_empty() {
        None
    } else {
        let mut items = vec!["Default group".to_string()];
        items.extend(groups.iter().map(|g| g.name.clone()));
        let idx = Select::with_theme(theme)
            .with_prompt("Group")
            .items(&items)
            .default(0)
            .interact()?;
        idx.checked_sub(1).map(|i| groups[i].id.clone())
    };
    Ok((auto_restart, Some(remark), group_id))
}

fn preview_and_confirm(theme: &ColorfulTheme, opts: &StartOptions) -> anyhow::Result<bool> {
    println!();
    println!("  {}", "📋 PREVIEW".dark_cyan().bold());
    println!("  {}", "─".repeat(50).dark_grey());
    match build_args(&opts.mode) {
        Ok(args) => println!(
            "  {} {}",
            "Command:".dark_grey(),
            format!("natter.py {}", args.join(" ")).yellow()
        ),
        // The start request reports the validation error itself.
        Err(e) => println!("  {} {}", "✗".red(), e),
    }
    println!(
        "  {} {}",
        "Auto restart:".dark_grey(),
        if opts.auto_restart { "Yes" } else { "No" }
    );
    if let Some(remark) = opts.remark.as_deref().filter(|r| !r.trim().is_empty()) {
        println!("  {} {}", "Remark:".dark_grey(), remark);
    }
    println!();
    yes_no(theme, "Start this service?", true)
}

fn print_step(num: u8, title: &str) {
    println!();
    println!(
        "  {} {} {}",
        format!("STEP {}", num).dark_cyan().bold(),
        "│".dark_grey(),
        title.white().bold()
    );
    println!("  {}", "─".repeat(50).dark_grey());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unedited_template_keeps_its_tokens() {
        let preset = vec!["-e".to_string(), "/opt/my hooks/run.sh".to_string()];
        let initial = preset.join(" ");
        assert_eq!(
            keep_preset(Some(preset.clone()), &initial, initial.clone()),
            CommandMode::Preset(preset.clone())
        );
        assert_eq!(
            keep_preset(Some(preset), &initial, "-p 80".into()),
            CommandMode::Advanced("-p 80".into())
        );
        assert_eq!(
            keep_preset(None, "-p 80", "-p 80".into()),
            CommandMode::Advanced("-p 80".into())
        );
    }
}
