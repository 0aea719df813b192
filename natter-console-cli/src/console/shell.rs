use super::controller::{Controller, Flow};
use super::screen::TerminalScreen;
use crate::client::ApiClient;
use crate::ops::ui::print_error;
use crossterm::style::Stylize;
use natter_console_core::{ConsoleError, PollingConfig};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{CompletionType, Config, Context, EditMode, Editor};
use std::borrow::Cow;
use std::sync::{Arc, Mutex};
use tracing::debug;

/// All console commands, for completion.
const COMMANDS: &[&str] = &[
    "services", "view", "back", "help", "templates", "groups", "iyuu", "close", "new", "use",
    "stop", "restart", "delete", "stop-all", "auto-restart", "clear-logs", "remark", "copy",
    "save-template", "login", "refresh", "exit",
];

/// Commands whose first argument is a service id.
const SERVICE_ID_COMMANDS: &[&str] = &[
    "view", "info", "stop", "restart", "delete", "rm", "clear-logs", "copy",
];

/// Completion and hints for the console prompt.
#[derive(Clone, Default)]
struct ConsoleHelper {
    service_ids: Arc<Mutex<Vec<String>>>,
}

impl ConsoleHelper {
    fn set_service_ids(&self, ids: Vec<String>) {
        if let Ok(mut slot) = self.service_ids.lock() {
            *slot = ids;
        }
    }

    fn service_ids(&self) -> Vec<String> {
        self.service_ids
            .lock()
            .map(|ids| ids.clone())
            .unwrap_or_default()
    }

    /// Ids plus their `#n` shorthands.
    fn targets(&self) -> Vec<String> {
        let ids = self.service_ids();
        let mut targets: Vec<String> = (1..=ids.len()).map(|n| format!("#{}", n)).collect();
        targets.extend(ids);
        targets
    }
}

impl Completer for ConsoleHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let line_to_cursor = &line[..pos];
        let tokens: Vec<&str> = line_to_cursor.split_whitespace().collect();
        let start = line_to_cursor.rfind(' ').map(|i| i + 1).unwrap_or(0);

        if tokens.is_empty() || (tokens.len() == 1 && !line_to_cursor.ends_with(' ')) {
            let prefix = tokens.first().copied().unwrap_or("");
            let matches = COMMANDS
                .iter()
                .filter(|cmd| cmd.starts_with(prefix))
                .map(|cmd| Pair {
                    display: cmd.to_string(),
                    replacement: cmd.to_string(),
                })
                .collect();
            return Ok((start, matches));
        }

        let cmd = tokens[0];
        let typing_first_arg = tokens.len() == 1 || (tokens.len() == 2 && !line_to_cursor.ends_with(' '));
        if SERVICE_ID_COMMANDS.contains(&cmd) && typing_first_arg {
            let prefix = if line_to_cursor.ends_with(' ') {
                ""
            } else {
                tokens.get(1).copied().unwrap_or("")
            };
            let matches = self
                .targets()
                .into_iter()
                .filter(|id| id.starts_with(prefix))
                .map(|id| Pair {
                    display: id.clone(),
                    replacement: id,
                })
                .collect();
            return Ok((start, matches));
        }

        if cmd == "auto-restart" && typing_first_arg {
            let prefix = tokens.get(1).copied().unwrap_or("");
            let matches = ["on", "off"]
                .iter()
                .filter(|v| v.starts_with(prefix))
                .map(|v| Pair {
                    display: v.to_string(),
                    replacement: v.to_string(),
                })
                .collect();
            return Ok((start, matches));
        }

        Ok((pos, vec![]))
    }
}

impl Hinter for ConsoleHelper {
    type Hint = String;

    fn hint(&self, line: &str, pos: usize, _ctx: &Context<'_>) -> Option<String> {
        if pos < line.len() {
            return None;
        }
        let tokens: Vec<&str> = line.split_whitespace().collect();

        if tokens.len() == 1 && !line.ends_with(' ') {
            let prefix = tokens[0];
            return COMMANDS
                .iter()
                .find(|cmd| cmd.starts_with(prefix) && **cmd != prefix)
                .map(|cmd| cmd[prefix.len()..].to_string());
        }

        let cmd = tokens.first().copied().unwrap_or("");
        if SERVICE_ID_COMMANDS.contains(&cmd) && tokens.len() == 2 && !line.ends_with(' ') {
            let prefix = tokens[1];
            return self
                .service_ids()
                .into_iter()
                .find(|id| id.starts_with(prefix) && id != prefix)
                .map(|id| id[prefix.len()..].to_string());
        }
        None
    }
}

impl Highlighter for ConsoleHelper {
    fn highlight_prompt<'b, 's: 'b, 'p: 'b>(
        &'s self,
        prompt: &'p str,
        _default: bool,
    ) -> Cow<'b, str> {
        Cow::Owned(format!("\x1b[1;36m{}\x1b[0m", prompt))
    }

    fn highlight_hint<'h>(&self, hint: &'h str) -> Cow<'h, str> {
        Cow::Owned(format!("\x1b[90m{}\x1b[0m", hint))
    }
}

impl Validator for ConsoleHelper {}

impl rustyline::Helper for ConsoleHelper {}

/// Interactive console (`natter>`) with live polling.
pub async fn console_loop(
    client: ApiClient,
    polling: PollingConfig,
    show_secrets: bool,
    assume_yes: bool,
) -> anyhow::Result<()> {
    print_banner(client.base());

    let config = Config::builder()
        .history_ignore_space(true)
        .completion_type(CompletionType::List)
        .edit_mode(EditMode::Emacs)
        .build();

    let helper = ConsoleHelper::default();
    let mut rl: Editor<ConsoleHelper, DefaultHistory> = Editor::with_config(config)?;
    rl.set_helper(Some(helper.clone()));

    let history_path = dirs_next::cache_dir().map(|p| p.join("natter-console").join("history.txt"));
    if let Some(path) = &history_path {
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let _ = rl.load_history(path);
    }

    let screen = Arc::new(TerminalScreen::new());
    match rl.create_external_printer() {
        Ok(printer) => screen.attach_printer(Box::new(printer)),
        Err(e) => debug!("external printer unavailable: {}", e),
    }

    let mut ctrl =
        Controller::new(client, screen.clone(), polling, show_secrets).assume_yes(assume_yes);
    ctrl.start();

    loop {
        helper.set_service_ids(ctrl.service_ids());
        let prompt = ctrl.prompt();
        screen.set_reading(true);
        let line = rl.readline(&prompt);
        screen.set_reading(false);

        match line {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                let tokens = match shell_words::split(line) {
                    Ok(t) if !t.is_empty() => t,
                    Ok(_) => continue,
                    Err(e) => {
                        print_error(&format!("cannot parse line: {}", e));
                        continue;
                    }
                };

                match ctrl.execute(&tokens[0], &tokens[1..]).await {
                    Ok(Flow::Exit) => {
                        println!();
                        println!("  {} Goodbye!", "👋".yellow());
                        println!();
                        break;
                    }
                    Ok(Flow::Continue) => {}
                    // The logout hook has already told the user.
                    Err(e) if matches!(
                        e.downcast_ref::<ConsoleError>(),
                        Some(ConsoleError::SessionExpired)
                    ) => {}
                    Err(e) => print_error(&e.to_string()),
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("^C");
                continue;
            }
            Err(ReadlineError::Eof) => {
                println!();
                break;
            }
            Err(err) => {
                print_error(&format!("Error: {:?}", err));
                break;
            }
        }
    }

    ctrl.shutdown();
    if let Some(path) = &history_path {
        let _ = rl.save_history(path);
    }
    Ok(())
}

fn print_banner(base: &str) {
    println!();
    println!(
        "{}",
        "╔══════════════════════════════════════════════════════════════╗".dark_cyan()
    );
    println!(
        "{}",
        "║                    🛰  NATTER CONSOLE                         ║".dark_cyan()
    );
    println!(
        "{}",
        "╚══════════════════════════════════════════════════════════════╝".dark_cyan()
    );
    println!();
    println!("  {} {}", "Backend:".dark_grey(), base.cyan());
    println!(
        "  Type {} for commands, {} to complete, {} to quit.",
        "help".cyan(),
        "Tab".cyan(),
        "exit".cyan()
    );
    println!();
}
