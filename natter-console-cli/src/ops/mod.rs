mod auth;
pub mod clipboard;
pub mod form;
mod groups;
mod iyuu;
mod output;
pub mod paint;
mod services;
mod templates;
mod tools;
pub mod ui;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Confirm;

pub use auth::{auth_status, login, logout, show_version};
pub use groups::{create_group, delete_group, list_groups, move_service, update_group};
pub use iyuu::{
    iyuu_add_token, iyuu_push, iyuu_remove_token, iyuu_set_enabled, iyuu_set_schedule, iyuu_show,
    iyuu_test,
};
pub use output::OutputFormat;
pub use services::{
    clear_logs, copy_address, delete_service, get_service, list_services, restart_service,
    set_auto_restart, set_remark, start_service, stop_all_services, stop_service, StartOptions,
};
pub use templates::{delete_template, list_templates, save_template};
pub use tools::{check_tool, install_tool};

/// Run `fut` behind a progress line, finishing it with the outcome.
pub(crate) async fn with_progress<T, F>(
    label: &str,
    failed: &str,
    fut: F,
) -> anyhow::Result<T>
where
    F: std::future::Future<Output = natter_console_core::Result<T>>,
{
    ui::print_progress(label);
    match fut.await {
        Ok(value) => Ok(value),
        Err(e) => {
            ui::finish_progress_error(failed);
            println!();
            ui::print_error(&e.to_string());
            Err(e.into())
        }
    }
}

/// Ask before a destructive action; `assume_yes` skips the prompt.
pub fn confirm(prompt: &str, assume_yes: bool) -> anyhow::Result<bool> {
    if assume_yes {
        return Ok(true);
    }
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(false)
        .interact()?)
}
