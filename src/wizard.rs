use anyhow::{Context, Result};
use dialoguer::Input;

use crate::config::{ConfigStore, PersistedProfile};
use crate::display;
use crate::tunnel::{self, DEFAULT_KEEPALIVE, DEFAULT_PORT, ForwardingRule, Mode, TunnelSpec};

const BANNER: &str = "Modo interactivo. Escribe 'ayuda' o '?' en cualquier paso para ver instrucciones.";
const REQUIRED: &str = "Este campo es obligatorio. Debes indicar un valor válido.";

// ─── Input seam ─────────────────────────────────────────────

/// Line-oriented terminal access used by the wizard.
pub trait Prompter {
    /// Show `prompt` and read one line.
    fn read_line(&mut self, prompt: &str) -> Result<String>;
    fn say(&mut self, message: &str);
}

/// Prompts on the controlling terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn read_line(&mut self, prompt: &str) -> Result<String> {
        let line: String = Input::new()
            .with_prompt(prompt)
            .allow_empty(true)
            .interact_text()
            .context("entrada cancelada")?;
        Ok(line)
    }

    fn say(&mut self, message: &str) {
        println!("{}", message);
    }
}

// ─── Per-field retry machine ────────────────────────────────

enum Answer<T> {
    Accept(T),
    Retry(String),
}

fn is_help_request(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "ayuda" | "help" | "?")
}

/// Ask until `parse` accepts. Help requests print `help` and ask again
/// without reaching `parse`.
fn ask<T>(
    io: &mut dyn Prompter,
    prompt: &str,
    help: &str,
    mut parse: impl FnMut(&str) -> Answer<T>,
) -> Result<T> {
    loop {
        let line = io.read_line(prompt)?;
        let input = line.trim();
        if is_help_request(input) {
            io.say(help);
            continue;
        }
        match parse(input) {
            Answer::Accept(value) => return Ok(value),
            Answer::Retry(message) => io.say(&message),
        }
    }
}

fn with_default(label: &str, default: &str) -> String {
    if default.is_empty() {
        label.to_string()
    } else {
        format!("{} [{}]", label, default)
    }
}

fn ask_text(io: &mut dyn Prompter, label: &str, default: &str, required: bool, help: &str) -> Result<String> {
    ask(io, &with_default(label, default), help, |input| {
        if !input.is_empty() {
            Answer::Accept(input.to_string())
        } else if !default.is_empty() {
            Answer::Accept(default.to_string())
        } else if !required {
            Answer::Accept(String::new())
        } else {
            Answer::Retry(REQUIRED.to_string())
        }
    })
}

/// Optional text: an empty answer with no default means "unset".
fn ask_optional(io: &mut dyn Prompter, label: &str, default: Option<&str>, help: &str) -> Result<Option<String>> {
    let value = ask_text(io, label, default.unwrap_or(""), false, help)?;
    Ok(Some(value).filter(|v| !v.is_empty()))
}

fn ask_int(io: &mut dyn Prompter, label: &str, default: u32, help: &str) -> Result<u32> {
    ask(io, &with_default(label, &default.to_string()), help, |input| {
        if input.is_empty() {
            return Answer::Accept(default);
        }
        match input.parse::<i64>() {
            Ok(n) => match u32::try_from(n) {
                Ok(n) => Answer::Accept(n),
                Err(_) => Answer::Retry(format!("Valor fuera de rango. Debe estar entre 0 y {}.", u32::MAX)),
            },
            Err(_) => Answer::Retry("Valor inválido. Debe ser un número entero.".to_string()),
        }
    })
}

fn ask_bool(io: &mut dyn Prompter, label: &str, default: bool, help: &str) -> Result<bool> {
    let shown = if default { "s" } else { "n" };
    let prompt = format!("{} [s/n] ({})", label, shown);
    ask(io, &prompt, help, |input| match input.to_lowercase().as_str() {
        "" => Answer::Accept(default),
        "s" | "si" | "sí" | "y" | "yes" => Answer::Accept(true),
        "n" | "no" => Answer::Accept(false),
        _ => Answer::Retry("Respuesta inválida. Usa s o n.".to_string()),
    })
}

/// Comma-separated list; blank items are dropped.
fn ask_list(io: &mut dyn Prompter, label: &str, default: &[String], help: &str) -> Result<Vec<String>> {
    ask(io, &with_default(label, &default.join(",")), help, |input| {
        if input.is_empty() {
            return Answer::Accept(default.to_vec());
        }
        Answer::Accept(
            input
                .split(',')
                .map(str::trim)
                .filter(|item| !item.is_empty())
                .map(str::to_string)
                .collect(),
        )
    })
}

fn ask_mode(io: &mut dyn Prompter, default: Mode) -> Result<Mode> {
    let help = "Elige el tipo de túnel:\n\
                - local: abre un puerto local y lo reenvía al destino remoto\n\
                - remoto: abre un puerto en el remoto y lo reenvía a tu equipo\n\
                - socks: crea un proxy SOCKS dinámico";
    let default = default.to_string();
    ask(io, &with_default("Modo (local/remoto/socks)", &default), help, |input| {
        let value = if input.is_empty() { default.as_str() } else { input };
        match value.parse() {
            Ok(mode) => Answer::Accept(mode),
            Err(_) => Answer::Retry("Modo inválido. Usa local, remoto o socks.".to_string()),
        }
    })
}

fn forward_help(mode: Mode) -> &'static str {
    match mode {
        Mode::Local => "Ejemplo local: 8080:127.0.0.1:80 o 0.0.0.0:8080:127.0.0.1:80",
        Mode::Remote => "Ejemplo remoto: 9090:127.0.0.1:22",
        Mode::Socks => "Ejemplo socks: 1080 o 127.0.0.1:1080",
    }
}

fn ask_forward(io: &mut dyn Prompter, mode: Mode, default: &str) -> Result<ForwardingRule> {
    ask(io, &with_default("Reenvío", default), forward_help(mode), |input| {
        let value = if input.is_empty() { default } else { input };
        if value.is_empty() {
            return Answer::Retry(REQUIRED.to_string());
        }
        match tunnel::validate(mode, value) {
            Ok(rule) => Answer::Accept(rule),
            Err(e) => Answer::Retry(e.to_string()),
        }
    })
}

// ─── Wizard ─────────────────────────────────────────────────

/// Everything needed to launch the tunnel the user described.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WizardOutcome {
    pub spec: TunnelSpec,
    pub rule: ForwardingRule,
    pub background: bool,
    pub command: Option<String>,
}

impl WizardOutcome {
    /// Snapshot of this run's answers, replacing whatever was stored before.
    pub fn profile(&self) -> PersistedProfile {
        PersistedProfile {
            mode: Some(self.rule.mode()),
            host: Some(self.spec.host.clone()),
            user: self.spec.user.clone(),
            port: Some(self.spec.port),
            identity_file: self.spec.identity_file.clone(),
            disable_pty: Some(self.spec.disable_pty),
            keepalive: Some(self.spec.keepalive_seconds),
            extra_args: Some(self.spec.extra_args.clone()),
            forward: Some(self.rule.as_str().to_string()),
            background: Some(self.background),
            command: self.command.clone(),
        }
    }
}

/// Run the prompts, prefilled from the stored profile, then persist the
/// answers. A failed save is reported but does not stop the tunnel.
pub fn run(io: &mut dyn Prompter, store: &ConfigStore) -> Result<WizardOutcome> {
    let saved = store.load();
    io.say(BANNER);

    let mode = ask_mode(io, saved.mode.unwrap_or(Mode::Local))?;

    let host = ask_text(
        io,
        "Host remoto",
        saved.host.as_deref().unwrap_or(""),
        true,
        "IP o nombre DNS del equipo remoto al que te conectarás por SSH.",
    )?;

    let user_help = format!(
        "Usuario del servidor SSH remoto (por ejemplo: ubuntu, debian, kali). \
         Si lo dejas vacío, ssh usará tu usuario actual ({}).",
        whoami::username()
    );
    let user = ask_optional(io, "Usuario SSH", saved.user.as_deref(), &user_help)?;

    let port = ask_int(
        io,
        "Puerto SSH",
        saved.port.unwrap_or(DEFAULT_PORT),
        "Puerto del servicio SSH en el remoto (normalmente 22).",
    )?;

    let identity_file = ask_optional(
        io,
        "Ruta a clave privada",
        saved.identity_file.as_deref(),
        "Ruta a tu clave privada (ej: ~/.ssh/id_rsa). Deja vacío si usas agente.",
    )?;

    let disable_pty = ask_bool(
        io,
        "Desactivar pseudo-TTY",
        saved.disable_pty.unwrap_or(false),
        "Recomendado para túneles: desactiva TTY. Usa s para sí, n para no.",
    )?;

    let keepalive_seconds = ask_int(
        io,
        "Intervalo keepalive (segundos)",
        saved.keepalive.unwrap_or(DEFAULT_KEEPALIVE),
        "Segundos entre pings para mantener viva la sesión (ej: 30).",
    )?;

    let extra_args = ask_list(
        io,
        "Argumentos extra ssh (separados por coma)",
        saved.extra_args.as_deref().unwrap_or(&[]),
        "Opcional: opciones extra para ssh. Ej: -v,-o,StrictHostKeyChecking=no",
    )?;

    let rule = ask_forward(io, mode, saved.forward.as_deref().unwrap_or(""))?;

    let background = ask_bool(
        io,
        "Ejecutar en segundo plano",
        saved.background.unwrap_or(false),
        "Si respondes s, el túnel queda en segundo plano (ssh -f -N).",
    )?;

    let command = ask_optional(
        io,
        "Comando remoto (vacío para -N)",
        saved.command.as_deref(),
        "Opcional: comando a ejecutar en el remoto. Vacío para solo túnel (-N).",
    )?;

    let outcome = WizardOutcome {
        spec: TunnelSpec {
            user,
            host,
            port,
            identity_file,
            disable_pty,
            keepalive_seconds,
            extra_args,
        },
        rule,
        background,
        command,
    };

    if let Err(e) = store.save(&outcome.profile()) {
        display::warn(&format!("{:#}", anyhow::Error::new(e)));
    }

    Ok(outcome)
}
