use std::env;
use std::fs;
use std::path::Path;

use hrdesk_core::config::{resolve_config_path, AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

struct Field {
    key: &'static str,
    value: String,
    env_keys: &'static [&'static str],
}

impl Field {
    fn new(key: &'static str, value: impl Into<String>, env_keys: &'static [&'static str]) -> Self {
        Self { key, value: value.into(), env_keys }
    }
}

pub fn run(config_path: Option<&Path>) -> CommandResult {
    let options = LoadOptions { config_path: config_path.map(Path::to_path_buf), ..LoadOptions::default() };
    let config = match AppConfig::load(options) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let file_path = resolve_config_path(config_path);
    let file_doc = file_path.as_deref().and_then(load_config_file_doc);
    let file_label = file_path.as_deref().map(|path| path.display().to_string());

    let mut lines =
        vec!["effective config (source precedence: overrides > env > file > default):".to_string()];
    for field in fields(&config) {
        let source = field_source(&field, file_doc.as_ref(), file_label.as_deref());
        lines.push(format!("- {} = {} (source: {source})", field.key, field.value));
    }

    CommandResult::report(0, lines.join("\n"))
}

fn fields(config: &AppConfig) -> Vec<Field> {
    let api_key = config
        .llm
        .api_key
        .as_ref()
        .map(|secret| redact_secret(secret.expose_secret()))
        .unwrap_or_else(|| "<unset>".to_string());
    let policies_path = config
        .policies
        .path
        .as_ref()
        .map(|path| path.display().to_string())
        .unwrap_or_else(|| "<builtin>".to_string());

    vec![
        Field::new("database.url", config.database.url.clone(), &["HRDESK_DATABASE_URL"]),
        Field::new(
            "database.max_connections",
            config.database.max_connections.to_string(),
            &["HRDESK_DATABASE_MAX_CONNECTIONS"],
        ),
        Field::new(
            "database.timeout_secs",
            config.database.timeout_secs.to_string(),
            &["HRDESK_DATABASE_TIMEOUT_SECS"],
        ),
        Field::new(
            "database.seed_sample_employees",
            config.database.seed_sample_employees.to_string(),
            &["HRDESK_DATABASE_SEED_SAMPLE_EMPLOYEES"],
        ),
        Field::new("llm.provider", format!("{:?}", config.llm.provider), &["HRDESK_LLM_PROVIDER"]),
        Field::new("llm.model", config.llm.model.clone(), &["HRDESK_LLM_MODEL"]),
        Field::new("llm.base_url", config.llm.effective_base_url(), &["HRDESK_LLM_BASE_URL"]),
        Field::new("llm.api_key", api_key, &["HRDESK_LLM_API_KEY", "GROQ_API_KEY"]),
        Field::new(
            "llm.temperature",
            config.llm.temperature.to_string(),
            &["HRDESK_LLM_TEMPERATURE"],
        ),
        Field::new(
            "memory.directory",
            config.memory.directory.display().to_string(),
            &["HRDESK_MEMORY_DIRECTORY"],
        ),
        Field::new("policies.path", policies_path, &["HRDESK_POLICIES_PATH"]),
        Field::new(
            "agent.max_iterations",
            config.agent.max_iterations.to_string(),
            &["HRDESK_AGENT_MAX_ITERATIONS"],
        ),
        Field::new("agent.routing", config.agent.routing.to_string(), &["HRDESK_AGENT_ROUTING"]),
        Field::new("voice.enabled", config.voice.enabled.to_string(), &["HRDESK_VOICE_ENABLED"]),
        Field::new("voice.command", config.voice.command.clone(), &["HRDESK_VOICE_COMMAND"]),
        Field::new(
            "logging.level",
            config.logging.level.clone(),
            &["HRDESK_LOGGING_LEVEL", "HRDESK_LOG_LEVEL"],
        ),
        Field::new(
            "logging.format",
            format!("{:?}", config.logging.format),
            &["HRDESK_LOGGING_FORMAT", "HRDESK_LOG_FORMAT"],
        ),
    ]
}

fn load_config_file_doc(path: &Path) -> Option<Value> {
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(field: &Field, file_doc: Option<&Value>, file_label: Option<&str>) -> String {
    if let Some(env_key) = field.env_keys.iter().find(|key| env::var_os(key).is_some()) {
        return format!("env ({env_key})");
    }

    if let Some(doc) = file_doc {
        if contains_path(doc, field.key) {
            return format!("file ({})", file_label.unwrap_or("config file"));
        }
    }

    "default".to_string()
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

/// Keeps a recognisable prefix such as `gsk_` and hides the rest.
fn redact_secret(secret: &str) -> String {
    let trimmed = secret.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    match trimmed.split_once(['_', '-']) {
        Some((prefix, _)) if prefix.len() <= 4 => format!("{prefix}_***"),
        _ => "<redacted>".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::redact_secret;

    #[test]
    fn redaction_never_echoes_the_secret_body() {
        assert_eq!(redact_secret("gsk_abcdef123456"), "gsk_***");
        assert_eq!(redact_secret("sk-live-123"), "sk_***");
        assert_eq!(redact_secret("plainsecretvalue"), "<redacted>");
        assert_eq!(redact_secret("  "), "<empty>");
    }
}
