use std::fmt;

use crate::tunnel::{DEFAULT_PORT, ForwardingRule, TunnelSpec};

/// Name of the external client, resolved through PATH.
pub const SSH_PROGRAM: &str = "ssh";

/// Keepalive probes ssh may miss before giving up on the server.
const KEEPALIVE_MAX_COUNT: u32 = 3;

/// The complete argument vector for one ssh run, program name first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    argv: Vec<String>,
}

impl Invocation {
    #[cfg(test)]
    pub(crate) fn from_argv(argv: &[&str]) -> Self {
        Self {
            argv: argv.iter().map(|a| a.to_string()).collect(),
        }
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    /// Everything after the program name.
    pub fn args(&self) -> &[String] {
        &self.argv[1..]
    }

    pub fn as_slice(&self) -> &[String] {
        &self.argv
    }
}

impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quoted: Vec<String> = self.as_slice().iter().map(|a| shell_quote(a)).collect();
        f.write_str(&quoted.join(" "))
    }
}

/// Quote an argument for display so the preview can be pasted into a shell.
fn shell_quote(arg: &str) -> String {
    let safe = !arg.is_empty()
        && arg
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:@=,+%".contains(c));
    if safe {
        arg.to_string()
    } else {
        format!("'{}'", arg.replace('\'', r"'\''"))
    }
}

/// Turn a tunnel description into the ssh argument vector.
///
/// The order matters: every option comes before the destination, and the
/// remote command (if any) is the final argument.
pub fn build(
    spec: &TunnelSpec,
    rule: &ForwardingRule,
    background: bool,
    remote_command: Option<&str>,
) -> Invocation {
    let mut argv = vec![SSH_PROGRAM.to_string()];

    if spec.disable_pty {
        argv.push("-T".to_string());
    }

    argv.extend([
        "-o".to_string(),
        "ExitOnForwardFailure=yes".to_string(),
        "-o".to_string(),
        format!("ServerAliveInterval={}", spec.keepalive_seconds),
        "-o".to_string(),
        format!("ServerAliveCountMax={}", KEEPALIVE_MAX_COUNT),
    ]);

    if let Some(ref identity) = spec.identity_file {
        argv.push("-i".to_string());
        argv.push(identity.clone());
    }

    if spec.port != DEFAULT_PORT {
        argv.push("-p".to_string());
        argv.push(spec.port.to_string());
    }

    argv.extend(spec.extra_args.iter().cloned());

    argv.push(rule.mode().flag().to_string());
    argv.push(rule.as_str().to_string());

    match remote_command {
        Some(command) => {
            argv.push(spec.destination());
            argv.push(command.to_string());
        }
        None => {
            argv.push("-N".to_string());
            if background {
                argv.push("-f".to_string());
            }
            argv.push(spec.destination());
        }
    }

    Invocation { argv }
}
