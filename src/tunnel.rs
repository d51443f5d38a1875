use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

use crate::error::TunnelError;

pub const DEFAULT_PORT: u32 = 22;
pub const DEFAULT_KEEPALIVE: u32 = 30;

/// Connection parameters for one SSH session, independent of the forwarding mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TunnelSpec {
    pub user: Option<String>,
    pub host: String,
    pub port: u32,
    pub identity_file: Option<String>,
    pub disable_pty: bool,
    pub keepalive_seconds: u32,
    pub extra_args: Vec<String>,
}

impl TunnelSpec {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            user: None,
            host: host.into(),
            port: DEFAULT_PORT,
            identity_file: None,
            disable_pty: false,
            keepalive_seconds: DEFAULT_KEEPALIVE,
            extra_args: Vec::new(),
        }
    }

    /// `user@host`, or just `host` when no user is set.
    pub fn destination(&self) -> String {
        match self.user {
            Some(ref user) => format!("{}@{}", user, self.host),
            None => self.host.clone(),
        }
    }
}

/// Forwarding mode: ssh -L, -R or -D.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Mode {
    #[serde(rename = "local")]
    Local,
    #[serde(rename = "remoto")]
    Remote,
    #[serde(rename = "socks")]
    Socks,
}

impl Mode {
    /// The ssh flag that introduces a forward of this kind.
    pub fn flag(self) -> &'static str {
        match self {
            Mode::Local => "-L",
            Mode::Remote => "-R",
            Mode::Socks => "-D",
        }
    }

    /// Accepted colon-separated field counts.
    fn arity(self) -> &'static [usize] {
        match self {
            Mode::Local | Mode::Remote => &[3, 4],
            Mode::Socks => &[1, 2],
        }
    }

    pub fn format_hint(self) -> &'static str {
        match self {
            Mode::Local => "[bind_address:]local_port:dest_host:dest_port",
            Mode::Remote => "[bind_address:]remote_port:dest_host:dest_port",
            Mode::Socks => "[bind_address:]socks_port",
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Mode::Local => "local",
            Mode::Remote => "remoto",
            Mode::Socks => "socks",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("modo desconocido '{0}'")]
pub struct UnknownMode(pub String);

impl FromStr for Mode {
    type Err = UnknownMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" => Ok(Mode::Local),
            "remoto" | "remote" => Ok(Mode::Remote),
            "socks" => Ok(Mode::Socks),
            other => Err(UnknownMode(other.to_string())),
        }
    }
}

/// A forward specification whose shape has been checked against its mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwardingRule {
    mode: Mode,
    raw: String,
}

impl ForwardingRule {
    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ForwardingRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// Check that `raw` has the field count `mode` expects. Ports and addresses
/// are left for ssh to reject.
pub fn validate(mode: Mode, raw: &str) -> Result<ForwardingRule, TunnelError> {
    let fields = raw.split(':').count();
    if !mode.arity().contains(&fields) {
        return Err(TunnelError::InvalidFormat {
            mode,
            example: mode.format_hint(),
        });
    }
    Ok(ForwardingRule {
        mode,
        raw: raw.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_with_user() {
        let mut spec = TunnelSpec::new("10.0.0.1");
        spec.user = Some("ubuntu".to_string());
        assert_eq!(spec.destination(), "ubuntu@10.0.0.1");
    }

    #[test]
    fn destination_without_user() {
        assert_eq!(TunnelSpec::new("bastion.example.com").destination(), "bastion.example.com");
    }

    #[test]
    fn new_spec_defaults() {
        let spec = TunnelSpec::new("h");
        assert_eq!(spec.port, 22);
        assert_eq!(spec.keepalive_seconds, 30);
        assert!(!spec.disable_pty);
        assert!(spec.extra_args.is_empty());
    }

    #[test]
    fn local_and_remote_accept_three_or_four_fields() {
        for mode in [Mode::Local, Mode::Remote] {
            for raw in ["8080:127.0.0.1:80", "0.0.0.0:8080:127.0.0.1:80"] {
                let rule = validate(mode, raw).unwrap();
                assert_eq!(rule.as_str(), raw);
                assert_eq!(rule.mode(), mode);
            }
        }
    }

    #[test]
    fn local_and_remote_reject_other_field_counts() {
        for mode in [Mode::Local, Mode::Remote] {
            for raw in ["", "8080", "8080:80", "a:b:c:d:e", "::::::"] {
                assert!(validate(mode, raw).is_err(), "{mode} accepted {raw:?}");
            }
        }
    }

    #[test]
    fn socks_accepts_one_or_two_fields() {
        assert_eq!(validate(Mode::Socks, "1080").unwrap().as_str(), "1080");
        assert_eq!(validate(Mode::Socks, "127.0.0.1:1080").unwrap().as_str(), "127.0.0.1:1080");
        // Purely syntactic: an empty string is still one field.
        assert!(validate(Mode::Socks, "").is_ok());
    }

    #[test]
    fn socks_rejects_forward_shaped_rules() {
        assert!(validate(Mode::Socks, "8080:127.0.0.1:80").is_err());
        assert!(validate(Mode::Socks, "a:b:c").is_err());
    }

    #[test]
    fn no_semantic_checks() {
        assert!(validate(Mode::Local, "99999:not a host:port").is_ok());
    }

    #[test]
    fn error_carries_mode_example() {
        let err = validate(Mode::Remote, "9090").unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("remote_port:dest_host:dest_port"), "{msg}");
        match err {
            TunnelError::InvalidFormat { mode, .. } => assert_eq!(mode, Mode::Remote),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn mode_from_str() {
        assert_eq!("local".parse::<Mode>().unwrap(), Mode::Local);
        assert_eq!(" Remoto ".parse::<Mode>().unwrap(), Mode::Remote);
        assert_eq!("remote".parse::<Mode>().unwrap(), Mode::Remote);
        assert_eq!("SOCKS".parse::<Mode>().unwrap(), Mode::Socks);
        assert!("dynamic".parse::<Mode>().is_err());
    }

    #[test]
    fn unknown_mode_message() {
        let err = " Tunel ".parse::<Mode>().unwrap_err();
        assert_eq!(err, UnknownMode("tunel".to_string()));
        assert_eq!(err.to_string(), "modo desconocido 'tunel'");
    }

    #[test]
    fn mode_flags() {
        assert_eq!(Mode::Local.flag(), "-L");
        assert_eq!(Mode::Remote.flag(), "-R");
        assert_eq!(Mode::Socks.flag(), "-D");
    }
}
