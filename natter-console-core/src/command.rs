//! Builds the natter argument vector sent with a start request.

use crate::error::{ConsoleError, Result};

/// Forward method natter uses when `-m` is absent.
pub const DEFAULT_FORWARD_METHOD: &str = "socket";

/// Forward methods understood by natter, default first.
pub const FORWARD_METHODS: &[&str] = &[
    "socket",
    "iptables",
    "sudo-iptables",
    "iptables-snat",
    "sudo-iptables-snat",
    "nftables",
    "sudo-nftables",
    "nftables-snat",
    "sudo-nftables-snat",
    "gost",
    "socat",
];

/// Structured form fields of the basic mode. Text fields are raw user input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BasicOptions {
    pub target_ip: String,
    pub target_port: String,
    pub udp: bool,
    pub forward_method: String,
    pub bind_interface: String,
    pub bind_port: String,
    pub upnp: bool,
    pub stun_server: String,
    pub keepalive_server: String,
    pub keepalive_interval: String,
    pub notify_script: String,
    pub retry: bool,
    pub quit_on_change: bool,
}

/// How the user described the service to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandMode {
    Basic(BasicOptions),
    /// Free text, split on whitespace and forwarded verbatim.
    Advanced(String),
    /// Arguments saved in a template; tokens are forwarded as stored, so a
    /// value containing spaces stays one argument.
    Preset(Vec<String>),
}

impl CommandMode {
    pub fn from_args(args: &[String]) -> Self {
        CommandMode::Preset(args.to_vec())
    }
}

/// Produce the argument vector for `mode`, or a validation error when a
/// required field is missing. Nothing is emitted on failure.
pub fn build_args(mode: &CommandMode) -> Result<Vec<String>> {
    match mode {
        CommandMode::Basic(opts) => build_basic(opts),
        CommandMode::Advanced(raw) => {
            let args: Vec<String> = raw.split_whitespace().map(str::to_string).collect();
            if args.is_empty() {
                return Err(ConsoleError::validation("command arguments are required"));
            }
            Ok(args)
        }
        CommandMode::Preset(args) => {
            if args.iter().all(|a| a.trim().is_empty()) {
                return Err(ConsoleError::validation("command arguments are required"));
            }
            Ok(args.clone())
        }
    }
}

fn build_basic(opts: &BasicOptions) -> Result<Vec<String>> {
    let port = opts.target_port.trim();
    if port.is_empty() {
        return Err(ConsoleError::validation("target port is required"));
    }

    let mut args = Vec::new();
    push_value(&mut args, "-t", &opts.target_ip);
    args.push("-p".to_string());
    args.push(port.to_string());
    push_flag(&mut args, "-u", opts.udp);

    let method = opts.forward_method.trim();
    if !method.is_empty() && method != DEFAULT_FORWARD_METHOD {
        args.push("-m".to_string());
        args.push(method.to_string());
    }

    push_value(&mut args, "-i", &opts.bind_interface);
    push_value(&mut args, "-b", &opts.bind_port);
    push_flag(&mut args, "-U", opts.upnp);
    push_value(&mut args, "-s", &opts.stun_server);
    push_value(&mut args, "-h", &opts.keepalive_server);
    push_value(&mut args, "-k", &opts.keepalive_interval);
    push_value(&mut args, "-e", &opts.notify_script);
    push_flag(&mut args, "-r", opts.retry);
    push_flag(&mut args, "-q", opts.quit_on_change);
    Ok(args)
}

fn push_value(args: &mut Vec<String>, flag: &str, value: &str) {
    let value = value.trim();
    if !value.is_empty() {
        args.push(flag.to_string());
        args.push(value.to_string());
    }
}

fn push_flag(args: &mut Vec<String>, flag: &str, enabled: bool) {
    if enabled {
        args.push(flag.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn basic(port: &str) -> BasicOptions {
        BasicOptions {
            target_port: port.to_string(),
            forward_method: DEFAULT_FORWARD_METHOD.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn udp_with_default_method() {
        let mut opts = basic("8080");
        opts.udp = true;
        let args = build_args(&CommandMode::Basic(opts)).unwrap();
        assert_eq!(args, vec!["-p", "8080", "-u"]);
    }

    #[test]
    fn missing_port_is_rejected() {
        let mut opts = basic("   ");
        opts.udp = true;
        opts.stun_server = "stun.example.com".into();
        let err = build_args(&CommandMode::Basic(opts)).unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }

    #[test]
    fn every_field_in_order() {
        let opts = BasicOptions {
            target_ip: " 192.168.1.10 ".into(),
            target_port: "80".into(),
            udp: true,
            forward_method: "iptables".into(),
            bind_interface: "eth0".into(),
            bind_port: "40000".into(),
            upnp: true,
            stun_server: "stun.l.google.com".into(),
            keepalive_server: "www.qq.com".into(),
            keepalive_interval: "20".into(),
            notify_script: "/opt/notify.sh".into(),
            retry: true,
            quit_on_change: true,
        };
        let args = build_args(&CommandMode::Basic(opts)).unwrap();
        assert_eq!(
            args,
            vec![
                "-t", "192.168.1.10", "-p", "80", "-u", "-m", "iptables", "-i", "eth0", "-b",
                "40000", "-U", "-s", "stun.l.google.com", "-h", "www.qq.com", "-k", "20", "-e",
                "/opt/notify.sh", "-r", "-q",
            ]
        );
    }

    #[test]
    fn blank_fields_and_false_flags_are_omitted() {
        let mut opts = basic("3389");
        opts.bind_interface = "  ".into();
        opts.keepalive_interval = "".into();
        opts.forward_method = String::new();
        let args = build_args(&CommandMode::Basic(opts)).unwrap();
        assert_eq!(args, vec!["-p", "3389"]);
        for flag in ["-u", "-m", "-i", "-U", "-r", "-q"] {
            assert!(!args.iter().any(|a| a == flag), "unexpected {flag}");
        }
    }

    #[test]
    fn advanced_mode_forwards_tokens() {
        let args = build_args(&CommandMode::Advanced("  -p 22   -m gost --custom ".into())).unwrap();
        assert_eq!(args, vec!["-p", "22", "-m", "gost", "--custom"]);
    }

    #[test]
    fn advanced_mode_requires_input() {
        let err = build_args(&CommandMode::Advanced(" \t ".into())).unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }

    #[test]
    fn template_prefill_round_trips_to_same_args() {
        let saved = vec!["-p".to_string(), "443".to_string(), "-u".to_string()];
        let args = build_args(&CommandMode::from_args(&saved)).unwrap();
        assert_eq!(args, saved);
    }

    #[test]
    fn template_args_with_spaces_stay_whole() {
        let saved = vec![
            "-p".to_string(),
            "8080".to_string(),
            "-e".to_string(),
            "/opt/natter hooks/notify.sh".to_string(),
        ];
        let args = build_args(&CommandMode::from_args(&saved)).unwrap();
        assert_eq!(args.len(), 4);
        assert_eq!(args[3], "/opt/natter hooks/notify.sh");
    }

    #[test]
    fn empty_template_is_rejected() {
        let err = build_args(&CommandMode::from_args(&[])).unwrap_err();
        assert!(matches!(err, ConsoleError::Validation(_)));
    }
}
