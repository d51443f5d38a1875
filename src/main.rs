mod cli;
mod command;
mod config;
mod display;
mod error;
mod process;
mod tunnel;
mod wizard;

use std::process::ExitCode;

use anyhow::Result;
use clap::CommandFactory;

use cli::{Action, Cli};
use config::ConfigStore;
use tunnel::{ForwardingRule, TunnelSpec};
use wizard::TerminalPrompter;

fn main() -> ExitCode {
    clap_complete::CompleteEnv::with_factory(Cli::command).complete();

    if let Err(e) = process::require_ssh() {
        display::error(&e.to_string());
        return ExitCode::FAILURE;
    }

    let cli = Cli::parse_args(std::env::args_os()).unwrap_or_else(|e| e.exit());

    if cli.no_color {
        colored::control::set_override(false);
    }

    match run(&cli) {
        Ok(code) => code,
        Err(e) => {
            display::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<ExitCode> {
    match &cli.action {
        Action::Interactivo => cmd_interactive(cli),
        Action::Ayuda => {
            display::print_guide();
            Ok(ExitCode::SUCCESS)
        }
        Action::Local { host, forward } | Action::Remoto { host, forward } | Action::Socks { host, forward } => {
            let spec = cli.tunnel_spec(host);
            launch(cli, &spec, forward, cli.background, cli.command.as_deref())
        }
    }
}

fn cmd_interactive(cli: &Cli) -> Result<ExitCode> {
    let store = ConfigStore::open_default();
    if cli.verbose {
        if let Some(path) = store.path() {
            display::note(&format!("perfil: {}", path.display()));
        }
    }
    let outcome = wizard::run(&mut TerminalPrompter, &store)?;
    launch(
        cli,
        &outcome.spec,
        &outcome.rule,
        outcome.background,
        outcome.command.as_deref(),
    )
}

fn launch(
    cli: &Cli,
    spec: &TunnelSpec,
    rule: &ForwardingRule,
    background: bool,
    remote_command: Option<&str>,
) -> Result<ExitCode> {
    let invocation = command::build(spec, rule, background, remote_command);

    if cli.dry_run {
        println!("{}", invocation);
        return Ok(ExitCode::SUCCESS);
    }
    if cli.verbose {
        display::show_invocation(&invocation);
    }

    let code = process::run(&invocation)?;
    Ok(ExitCode::from(process::exit_byte(code)))
}
