use std::ffi::OsString;

use clap::{Parser, Subcommand};

use crate::error::TunnelError;
use crate::tunnel::{self, DEFAULT_KEEPALIVE, DEFAULT_PORT, ForwardingRule, Mode, TunnelSpec};

#[derive(Parser)]
#[command(name = "tunelssh", about = "TuneladoraSSH (local, remoto y dinámico)", version)]
pub struct Cli {
    /// Usuario SSH
    #[arg(long, short = 'u', global = true)]
    pub user: Option<String>,

    /// Puerto SSH
    #[arg(long, short = 'p', global = true, default_value_t = DEFAULT_PORT,
          value_parser = clap::value_parser!(u32).range(1..))]
    pub port: u32,

    /// Ruta a clave privada
    #[arg(long, short = 'i', global = true)]
    pub identity: Option<String>,

    /// Desactiva pseudo-TTY
    #[arg(long, global = true)]
    pub no_pty: bool,

    /// Intervalo de keepalive (segundos)
    #[arg(long, global = true, default_value_t = DEFAULT_KEEPALIVE)]
    pub keepalive: u32,

    /// Argumento adicional para ssh (se puede repetir)
    #[arg(long = "ssh-arg", global = true, value_name = "ARG", allow_hyphen_values = true)]
    pub ssh_args: Vec<String>,

    /// Ejecuta en segundo plano (ssh -f -N)
    #[arg(long, short = 'f', global = true)]
    pub background: bool,

    /// Comando remoto opcional (si no se especifica usa -N)
    #[arg(long, short = 'c', global = true)]
    pub command: Option<String>,

    /// Muestra el comando ssh antes de ejecutarlo
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Imprime el comando ssh sin ejecutarlo
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Desactiva los colores
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub action: Action,
}

fn local_rule(raw: &str) -> Result<ForwardingRule, TunnelError> {
    tunnel::validate(Mode::Local, raw)
}

fn remote_rule(raw: &str) -> Result<ForwardingRule, TunnelError> {
    tunnel::validate(Mode::Remote, raw)
}

fn socks_rule(raw: &str) -> Result<ForwardingRule, TunnelError> {
    tunnel::validate(Mode::Socks, raw)
}

#[derive(Subcommand)]
pub enum Action {
    /// Reenvío local (L)
    Local {
        /// Host remoto (IP o DNS)
        host: String,
        /// [bind_address:]local_port:dest_host:dest_port
        #[arg(long, short = 'L', value_parser = local_rule)]
        forward: ForwardingRule,
    },
    /// Reenvío remoto (R)
    Remoto {
        /// Host remoto (IP o DNS)
        host: String,
        /// [bind_address:]remote_port:dest_host:dest_port
        #[arg(long, short = 'R', value_parser = remote_rule)]
        forward: ForwardingRule,
    },
    /// SOCKS dinámico (D)
    Socks {
        /// Host remoto (IP o DNS)
        host: String,
        /// [bind_address:]socks_port
        #[arg(long, short = 'D', value_parser = socks_rule)]
        forward: ForwardingRule,
    },
    /// Modo interactivo con persistencia
    Interactivo,
    /// Guía rápida de uso en terminal
    Ayuda,
}

impl Cli {
    /// Parse a full argv. A bare program name opens the wizard; anything
    /// else must name a subcommand.
    pub fn parse_args<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let mut argv: Vec<OsString> = args.into_iter().map(Into::into).collect();
        if argv.len() == 1 {
            argv.push("interactivo".into());
        }
        Self::try_parse_from(argv)
    }

    /// Connection parameters from the global flags.
    pub fn tunnel_spec(&self, host: &str) -> TunnelSpec {
        TunnelSpec {
            user: self.user.clone(),
            host: host.to_string(),
            port: self.port,
            identity_file: self.identity.clone(),
            disable_pty: self.no_pty,
            keepalive_seconds: self.keepalive,
            extra_args: self.ssh_args.clone(),
        }
    }
}
