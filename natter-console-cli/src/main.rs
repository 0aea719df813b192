mod api;
mod client;
mod console;
mod ops;
#[cfg(test)]
mod testing;

use clap::{Args, Parser, Subcommand, ValueEnum};
use client::ApiClient;
use natter_console_core::{BasicOptions, CommandMode, PollingConfig, TokenStore};
use ops::{
    auth_status, check_tool, clear_logs, copy_address, create_group, delete_group,
    delete_service, delete_template, get_service, install_tool, iyuu_add_token, iyuu_push,
    iyuu_remove_token, iyuu_set_enabled, iyuu_set_schedule, iyuu_show, iyuu_test, list_groups,
    list_services, list_templates, login, logout, move_service, restart_service, save_template,
    set_auto_restart, set_remark, show_version, start_service, stop_all_services, stop_service,
    update_group, OutputFormat, StartOptions,
};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Terminal console for a natter service manager.
#[derive(Parser)]
#[command(
    name = "natter-console",
    author,
    version,
    about = "Manage natter NAT-traversal services from the terminal"
)]
struct Cli {
    /// API base url
    #[arg(long, env = "NATTER_API_BASE", default_value = "http://127.0.0.1:8080")]
    api_base: String,

    /// Bearer token; overrides the stored session for this run
    #[arg(long, env = "NATTER_TOKEN")]
    token: Option<String>,

    /// Session file holding the login token
    #[arg(long, env = "NATTER_SESSION_FILE")]
    session_file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    output: OutputFormat,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    yes: bool,

    /// Show group passwords and IYUU tokens unmasked
    #[arg(long, global = true)]
    show_secrets: bool,

    /// Service list refresh period in the console
    #[arg(long, default_value_t = 10)]
    list_refresh_secs: u64,

    /// Service detail refresh period in the console
    #[arg(long, default_value_t = 5)]
    detail_refresh_secs: u64,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    // ==================== services ====================
    /// List services
    List,
    /// Show one service with its latest output
    Get { id: String },
    /// Start a new service
    Start(StartArgs),
    /// Stop a service
    Stop { id: String },
    /// Restart a service
    Restart { id: String },
    /// Delete a service
    Delete { id: String },
    /// Stop every running service
    StopAll,
    /// Turn automatic restart on or off
    AutoRestart { id: String, state: Toggle },
    /// Clear the captured output of a service
    ClearLogs { id: String },
    /// Set the remark shown next to a service
    Remark { id: String, text: Vec<String> },
    /// Copy the mapped public address to the clipboard
    Copy { id: String },

    // ==================== presets ====================
    /// Template management
    #[command(subcommand)]
    Template(TemplateCommands),
    /// Group management
    #[command(subcommand)]
    Group(GroupCommands),
    /// IYUU push notifications
    #[command(subcommand)]
    Iyuu(IyuuCommands),
    /// Forwarding helper tools on the backend host
    #[command(subcommand)]
    Tool(ToolCommands),

    // ==================== session ====================
    /// Log in and store the session token
    Login {
        /// Password; prompted when omitted
        #[arg(long, short)]
        password: Option<String>,
    },
    /// Forget the stored session token
    Logout,
    /// Show whether the backend requires a login
    AuthStatus,
    /// Show backend and console versions
    Version,
    /// Interactive console with live refresh (natter>)
    Console,
}

#[derive(Clone, Copy, ValueEnum)]
enum Toggle {
    On,
    Off,
}

#[derive(Args)]
struct StartArgs {
    /// Target IP (-t)
    #[arg(long)]
    target_ip: Option<String>,
    /// Target port (-p)
    #[arg(long, short = 'p')]
    port: Option<String>,
    /// UDP mode (-u)
    #[arg(long, short = 'u')]
    udp: bool,
    /// Forward method (-m)
    #[arg(long, short = 'm')]
    method: Option<String>,
    /// Bind interface (-i)
    #[arg(long)]
    interface: Option<String>,
    /// Bind port (-b)
    #[arg(long)]
    bind_port: Option<String>,
    /// Enable UPnP (-U)
    #[arg(long)]
    upnp: bool,
    /// STUN server (-s)
    #[arg(long)]
    stun: Option<String>,
    /// Keep-alive server (-h)
    #[arg(long)]
    keepalive_server: Option<String>,
    /// Keep-alive interval in seconds (-k)
    #[arg(long)]
    keepalive_interval: Option<String>,
    /// Notification script (-e)
    #[arg(long)]
    notify_script: Option<String>,
    /// Retry until the port is open (-r)
    #[arg(long)]
    retry: bool,
    /// Quit when the mapping changes (-q)
    #[arg(long)]
    quit_on_change: bool,

    /// Raw natter arguments instead of the flags above
    #[arg(long, allow_hyphen_values = true, conflicts_with_all = ["port", "template"])]
    args: Option<String>,
    /// Start from a saved template id
    #[arg(long)]
    template: Option<String>,
    /// Fill in the form interactively
    #[arg(long, short = 'I')]
    interactive: bool,

    /// Restart automatically when the process exits
    #[arg(long)]
    auto_restart: bool,
    #[arg(long)]
    remark: Option<String>,
    /// Group id; the default group when omitted
    #[arg(long)]
    group: Option<String>,
}

impl StartArgs {
    fn basic(&self) -> BasicOptions {
        let text = |v: &Option<String>| v.clone().unwrap_or_default();
        BasicOptions {
            target_ip: text(&self.target_ip),
            target_port: text(&self.port),
            udp: self.udp,
            forward_method: text(&self.method),
            bind_interface: text(&self.interface),
            bind_port: text(&self.bind_port),
            upnp: self.upnp,
            stun_server: text(&self.stun),
            keepalive_server: text(&self.keepalive_server),
            keepalive_interval: text(&self.keepalive_interval),
            notify_script: text(&self.notify_script),
            retry: self.retry,
            quit_on_change: self.quit_on_change,
        }
    }
}

#[derive(Subcommand)]
enum TemplateCommands {
    /// List saved templates
    List,
    /// Save arguments as a template
    Save {
        name: String,
        #[arg(long, short, default_value = "")]
        description: String,
        /// Copy the arguments of an existing service
        #[arg(long, conflicts_with = "args")]
        from: Option<String>,
        /// Raw natter arguments
        #[arg(long, allow_hyphen_values = true)]
        args: Option<String>,
    },
    /// Delete a template
    Delete { id: String },
}

#[derive(Subcommand)]
enum GroupCommands {
    /// List groups
    List,
    /// Create a group
    Create {
        name: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Rename a group or change its password
    Update {
        id: String,
        #[arg(long)]
        name: String,
        #[arg(long)]
        password: Option<String>,
    },
    /// Delete a group
    Delete { id: String },
    /// Move a service into a group (omit the group for the default group)
    Move {
        service_id: String,
        group_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum IyuuCommands {
    /// Show push settings
    Show,
    /// Enable pushing
    Enable,
    /// Disable pushing
    Disable,
    /// Add an IYUU token
    AddToken { token: String },
    /// Remove an IYUU token
    RemoveToken { token: String },
    /// Set the daily push schedule
    Schedule {
        /// Push time, HH:MM; repeatable
        #[arg(long = "time")]
        times: Vec<String>,
        #[arg(long)]
        message: Option<String>,
        /// Keep the times but stop the schedule
        #[arg(long)]
        disable: bool,
    },
    /// Send a test notification
    Test,
    /// Push the current status now
    Push {
        #[arg(long)]
        message: Option<String>,
    },
}

#[derive(Subcommand)]
enum ToolCommands {
    /// Check whether socat or gost is installed
    Check { tool: String },
    /// Install socat or gost on the backend host
    Install { tool: String },
}

fn token_store(cli: &Cli) -> TokenStore {
    if let Some(token) = &cli.token {
        return TokenStore::memory(Some(token.clone()));
    }
    let path = cli.session_file.clone().or_else(|| {
        dirs_next::config_dir().map(|dir| dir.join("natter-console").join("session.json"))
    });
    match path {
        Some(path) => TokenStore::file(path),
        None => TokenStore::memory(None),
    }
}

async fn resolve_start(client: &ApiClient, args: &StartArgs) -> anyhow::Result<CommandMode> {
    if let Some(raw) = &args.args {
        return Ok(CommandMode::Advanced(raw.clone()));
    }
    if let Some(id) = &args.template {
        let templates = client.list_templates().await?;
        let template = templates
            .iter()
            .find(|t| &t.id == id)
            .ok_or_else(|| anyhow::anyhow!("template {} not found", id))?;
        return Ok(CommandMode::from_args(&template.cmd_args));
    }
    Ok(CommandMode::Basic(args.basic()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();
    let cli = Cli::parse();

    let client = ApiClient::new(cli.api_base.clone(), token_store(&cli))?.with_logout_hook(
        Arc::new(|| {
            ops::ui::print_warning("Session expired. Run 'natter-console login' to sign in again.")
        }),
    );
    let output = cli.output;
    let yes = cli.yes;

    match cli.command {
        Commands::List => list_services(&client, output).await?,
        Commands::Get { id } => get_service(&client, &id, output).await?,
        Commands::Start(args) => {
            if args.interactive {
                let prefill = if args.template.is_some() || args.args.is_some() {
                    Some(resolve_start(&client, &args).await?)
                } else {
                    None
                };
                let groups = client.list_groups().await.unwrap_or_default();
                if let Some(opts) = ops::form::prompt_start_options(&client, prefill, &groups).await? {
                    start_service(&client, &opts, output).await?;
                }
            } else {
                let opts = StartOptions {
                    mode: resolve_start(&client, &args).await?,
                    auto_restart: args.auto_restart,
                    remark: args.remark.clone(),
                    group_id: args.group.clone(),
                };
                start_service(&client, &opts, output).await?;
            }
        }
        Commands::Stop { id } => stop_service(&client, &id, yes, output).await?,
        Commands::Restart { id } => restart_service(&client, &id, output).await?,
        Commands::Delete { id } => delete_service(&client, &id, yes, output).await?,
        Commands::StopAll => stop_all_services(&client, yes, output).await?,
        Commands::AutoRestart { id, state } => {
            set_auto_restart(&client, &id, matches!(state, Toggle::On), output).await?
        }
        Commands::ClearLogs { id } => clear_logs(&client, &id, output).await?,
        Commands::Remark { id, text } => set_remark(&client, &id, &text.join(" "), output).await?,
        Commands::Copy { id } => copy_address(&client, &id, output).await?,

        Commands::Template(cmd) => match cmd {
            TemplateCommands::List => list_templates(&client, output).await?,
            TemplateCommands::Save {
                name,
                description,
                from,
                args,
            } => {
                let cmd_args = match (from, args) {
                    (Some(service_id), _) => client.get_service(&service_id).await?.cmd_args,
                    (None, Some(raw)) => raw.split_whitespace().map(str::to_string).collect(),
                    (None, None) => anyhow::bail!("provide --from <service id> or --args"),
                };
                save_template(&client, &name, &description, cmd_args, output).await?;
            }
            TemplateCommands::Delete { id } => delete_template(&client, &id, yes, output).await?,
        },

        Commands::Group(cmd) => match cmd {
            GroupCommands::List => list_groups(&client, cli.show_secrets, output).await?,
            GroupCommands::Create { name, password } => {
                create_group(&client, &name, password.as_deref(), output).await?;
            }
            GroupCommands::Update { id, name, password } => {
                update_group(&client, &id, &name, password.as_deref(), output).await?
            }
            GroupCommands::Delete { id } => delete_group(&client, &id, yes, output).await?,
            GroupCommands::Move {
                service_id,
                group_id,
            } => {
                move_service(&client, &service_id, group_id.as_deref().unwrap_or(""), output)
                    .await?
            }
        },

        Commands::Iyuu(cmd) => match cmd {
            IyuuCommands::Show => iyuu_show(&client, cli.show_secrets, output).await?,
            IyuuCommands::Enable => iyuu_set_enabled(&client, true, output).await?,
            IyuuCommands::Disable => iyuu_set_enabled(&client, false, output).await?,
            IyuuCommands::AddToken { token } => iyuu_add_token(&client, &token, output).await?,
            IyuuCommands::RemoveToken { token } => {
                iyuu_remove_token(&client, &token, output).await?
            }
            IyuuCommands::Schedule {
                times,
                message,
                disable,
            } => iyuu_set_schedule(&client, !disable, times, message, output).await?,
            IyuuCommands::Test => iyuu_test(&client, output).await?,
            IyuuCommands::Push { message } => {
                iyuu_push(&client, message.as_deref(), output).await?
            }
        },

        Commands::Tool(cmd) => match cmd {
            ToolCommands::Check { tool } => {
                check_tool(&client, &tool, output).await?;
            }
            ToolCommands::Install { tool } => install_tool(&client, &tool, output).await?,
        },

        Commands::Login { password } => login(&client, password, output).await?,
        Commands::Logout => logout(&client, output)?,
        Commands::AuthStatus => auth_status(&client, output).await?,
        Commands::Version => show_version(&client, output).await?,
        Commands::Console => {
            let polling = PollingConfig {
                list: Duration::from_secs(cli.list_refresh_secs.max(1)),
                detail: Duration::from_secs(cli.detail_refresh_secs.max(1)),
                ..PollingConfig::default()
            };
            console::console_loop(client, polling, cli.show_secrets, yes).await?
        }
    }

    Ok(())
}

fn init_tracing() {
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    let filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into());
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn clap_parses() {
        let _ = Cli::parse_from(["natter-console", "list"]);
        let _ = Cli::parse_from(["natter-console", "--output", "json", "stop-all", "--yes"]);
        let _ = Cli::parse_from(["natter-console", "iyuu", "schedule", "--time", "08:00", "--time", "20:30"]);
        let _ = Cli::parse_from(["natter-console", "group", "move", "1700000000000"]);
    }

    #[test]
    fn start_flags_map_to_basic_options() {
        let cli = Cli::parse_from(["natter-console", "start", "-p", "8080", "-u", "-m", "socket"]);
        let Commands::Start(args) = cli.command else {
            panic!("expected start");
        };
        let opts = args.basic();
        assert_eq!(opts.target_port, "8080");
        assert!(opts.udp);
        assert_eq!(
            natter_console_core::build_args(&CommandMode::Basic(opts)).unwrap(),
            vec!["-p", "8080", "-u"]
        );
    }

    #[test]
    fn raw_args_accept_leading_hyphens() {
        let cli = Cli::parse_from(["natter-console", "start", "--args", "-p 9000 -r"]);
        let Commands::Start(args) = cli.command else {
            panic!("expected start");
        };
        assert_eq!(args.args.as_deref(), Some("-p 9000 -r"));
    }

    #[test]
    fn explicit_token_wins_over_session_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("session.json");
        let cli = Cli::parse_from([
            "natter-console",
            "--token",
            "abc",
            "--session-file",
            file.to_str().unwrap(),
            "list",
        ]);
        let store = token_store(&cli);
        assert_eq!(store.token().as_deref(), Some("abc"));
        assert!(!file.exists());

        let cli = Cli::parse_from([
            "natter-console",
            "--session-file",
            file.to_str().unwrap(),
            "list",
        ]);
        assert!(matches!(token_store(&cli), TokenStore::File(_)));
    }
}
