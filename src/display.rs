use colored::Colorize;
use console::Alignment;

use crate::command::Invocation;

/// Report a non-fatal problem on stderr.
pub fn warn(message: &str) {
    eprintln!("{} {}", "⚠".yellow(), message);
}

/// Report a fatal problem on stderr as a single line.
pub fn error(message: &str) {
    eprintln!("{} {}", "error:".red().bold(), message);
}

/// Dimmed progress line for --verbose.
pub fn note(message: &str) {
    eprintln!("{} {}", "→".dimmed(), message.dimmed());
}

/// Echo the ssh command about to run.
pub fn show_invocation(invocation: &Invocation) {
    note(&invocation.to_string());
}

/// Quick reference for the non-interactive mode.
pub fn print_guide() {
    println!("{}", "Guía rápida (modo no interactivo):".bold());
    println!("1) Elige el tipo de túnel: local, remoto o socks");
    println!("2) Indica el host remoto (IP o DNS)");
    println!("3) Define el reenvío con -L, -R o -D según el modo");
    println!("4) Opcional: usuario, puerto, clave, keepalive, etc.");
    println!();
    println!("{}", "Ejemplos:".bold());

    let examples = [
        ("Local", "tunelssh local 192.168.1.10 -L 8080:127.0.0.1:80"),
        ("Remoto", "tunelssh remoto 192.168.1.10 -R 9090:127.0.0.1:22"),
        ("SOCKS", "tunelssh socks 192.168.1.10 -D 1080"),
        ("Interactivo", "tunelssh"),
    ];
    let width = examples
        .iter()
        .map(|(label, _)| console::measure_text_width(label))
        .max()
        .unwrap_or(0);
    for (label, example) in examples {
        println!("  {} : {}", pad(label, width), example.green());
    }
}

fn pad(s: &str, width: usize) -> String {
    console::pad_str(s, width, Alignment::Left, None).to_string()
}
