use std::io::Write;
use std::path::PathBuf;

use anyhow::Result;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tracing::{error, warn};

use hrdesk_agent::session::AuthError;
use hrdesk_core::config::{AppConfig, ConfigOverrides, LoadOptions};
use hrdesk_core::domain::transcript::GREETING;

use crate::bootstrap::ChatServices;
use crate::commands::CommandResult;
use crate::logging::init_logging;
use crate::speech::Speaker;

pub const FAREWELL: &str = "Thank you for using HR services!";
pub const INVALID_CREDENTIALS: &str = "Invalid credentials. Exiting.";

pub const EXIT_OK: u8 = 0;
pub const EXIT_AUTH_FAILED: u8 = 1;
pub const EXIT_STARTUP_FAILED: u8 = 2;

#[derive(Clone, Debug, Default)]
pub struct ChatOptions {
    pub config_path: Option<PathBuf>,
    pub employee_id: Option<String>,
    pub voice: bool,
    pub routing: bool,
}

pub fn is_exit_keyword(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.eq_ignore_ascii_case("exit") || trimmed.eq_ignore_ascii_case("quit")
}

pub fn run(options: ChatOptions) -> CommandResult {
    let overrides = ConfigOverrides {
        voice_enabled: options.voice.then_some(true),
        routing: options.routing.then_some(true),
        ..ConfigOverrides::default()
    };
    let load = LoadOptions { config_path: options.config_path.clone(), overrides, ..LoadOptions::default() };
    let config = match AppConfig::load(load) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "config_validation",
                error.to_string(),
                EXIT_STARTUP_FAILED,
            )
        }
    };
    init_logging(&config);

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "chat",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                EXIT_STARTUP_FAILED,
            )
        }
    };

    runtime.block_on(async {
        let services = match ChatServices::from_config(&config).await {
            Ok(services) => services,
            Err(error) => {
                return CommandResult::failure(
                    "chat",
                    "bootstrap",
                    format!("{error:#}"),
                    EXIT_STARTUP_FAILED,
                )
            }
        };
        let speaker = Speaker::from_config(&config.voice);
        let mut input = BufReader::new(tokio::io::stdin()).lines();
        let mut output = std::io::stdout();

        match converse(&services, &speaker, options.employee_id.as_deref(), &mut input, &mut output)
            .await
        {
            Ok(exit_code) => CommandResult::finished(exit_code),
            Err(error) => CommandResult::failure("chat", "io", format!("{error:#}"), EXIT_STARTUP_FAILED),
        }
    })
}

/// Login followed by the prompt loop. Returns the process exit code.
pub async fn converse<R, W>(
    services: &ChatServices,
    speaker: &Speaker,
    preset_employee_id: Option<&str>,
    input: &mut Lines<R>,
    output: &mut W,
) -> Result<u8>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    writeln!(output, "Please log in to continue.")?;
    let raw_id = match preset_employee_id {
        Some(raw_id) => raw_id.to_string(),
        None => prompt(input, output, "Enter your employee ID: ").await?.unwrap_or_default(),
    };
    let password = prompt(input, output, "Enter your password: ").await?.unwrap_or_default();

    let authenticated = services
        .session
        .authenticate(services.employees.as_ref(), raw_id.trim(), password.trim())
        .await;
    let employee_id = match authenticated {
        Ok(employee_id) => employee_id,
        Err(AuthError::StoreUnavailable(detail)) => {
            error!(event_name = "hrdesk.chat.login_failed", error = %detail, "credential store unavailable");
            writeln!(output, "HR records are unavailable right now. Exiting.")?;
            return Ok(EXIT_STARTUP_FAILED);
        }
        Err(AuthError::InvalidCredentials | AuthError::AlreadyAuthenticated) => {
            writeln!(output, "{INVALID_CREDENTIALS}")?;
            return Ok(EXIT_AUTH_FAILED);
        }
    };
    writeln!(output, "Login successful.")?;

    // An unreadable transcript is left for the Clear Memory tool to repair.
    if let Err(error) = services.transcripts.initialize(&employee_id).await {
        warn!(
            event_name = "hrdesk.chat.memory_unavailable",
            employee_id = %employee_id,
            error = %error,
            "memory initialization failed, continuing"
        );
    }

    reply(output, speaker, GREETING).await?;

    loop {
        let Some(line) = prompt(input, output, "You: ").await? else {
            reply(output, speaker, FAREWELL).await?;
            break;
        };
        let utterance = line.trim();
        if utterance.is_empty() {
            continue;
        }
        if is_exit_keyword(utterance) {
            reply(output, speaker, FAREWELL).await?;
            break;
        }

        match services.runtime.handle_message(utterance).await {
            Ok(agent_reply) => reply(output, speaker, &agent_reply.text).await?,
            Err(error) => {
                warn!(
                    event_name = "hrdesk.chat.turn_failed",
                    error_class = error.error_class(),
                    error = %error,
                    "turn failed"
                );
                reply(output, speaker, error.user_message()).await?;
            }
        }
    }

    Ok(EXIT_OK)
}

async fn prompt<R, W>(input: &mut Lines<R>, output: &mut W, label: &str) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    W: Write,
{
    write!(output, "{label}")?;
    output.flush()?;
    Ok(input.next_line().await?)
}

async fn reply<W: Write>(output: &mut W, speaker: &Speaker, text: &str) -> Result<()> {
    writeln!(output, "HRBot: {text}")?;
    output.flush()?;
    speaker.speak(text).await;
    Ok(())
}
