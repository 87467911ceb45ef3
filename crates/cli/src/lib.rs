pub mod bootstrap;
pub mod commands;
pub mod logging;
pub mod speech;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::commands::chat::ChatOptions;

#[derive(Debug, Parser)]
#[command(
    name = "hrdesk",
    about = "HR assistant chat CLI",
    long_about = "Chat with the HR assistant, inspect effective configuration, and check runtime readiness.",
    after_help = "Examples:\n  hrdesk chat\n  hrdesk chat --employee-id EMP123 --voice\n  hrdesk config\n  hrdesk doctor --json"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to an hrdesk.toml config file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Log in and start an interactive HR chat session")]
    Chat {
        #[arg(long, help = "Employee ID to log in with; the password is still prompted")]
        employee_id: Option<String>,
        #[arg(long, help = "Read replies aloud with the configured voice command")]
        voice: bool,
        #[arg(long, help = "Route each question to the HR or IT specialist first")]
        routing: bool,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
    #[command(about = "Validate config, credential store, policy source, and memory directory")]
    Doctor {
        #[arg(long, help = "Emit machine-readable JSON output")]
        json: bool,
    },
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();
    let config_path = cli.config.as_deref();

    let result = match cli.command {
        Command::Chat { employee_id, voice, routing } => commands::chat::run(ChatOptions {
            config_path: cli.config.clone(),
            employee_id,
            voice,
            routing,
        }),
        Command::Config => commands::config::run(config_path),
        Command::Doctor { json } => commands::doctor::run(config_path, json),
    };

    if !result.output.is_empty() {
        println!("{}", result.output);
    }
    ExitCode::from(result.exit_code)
}
