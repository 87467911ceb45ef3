use std::process::Stdio;

use tokio::process::Command;
use tracing::warn;

use hrdesk_core::config::VoiceConfig;

/// Reads replies aloud through an external text-to-speech command such as
/// `espeak`. Failures are logged and otherwise ignored.
#[derive(Clone, Debug, Default)]
pub struct Speaker {
    command: Option<String>,
}

impl Speaker {
    pub fn from_config(voice: &VoiceConfig) -> Self {
        let command = voice.command.trim();
        if voice.enabled && !command.is_empty() {
            Self { command: Some(command.to_string()) }
        } else {
            Self::disabled()
        }
    }

    pub fn disabled() -> Self {
        Self { command: None }
    }

    pub fn is_enabled(&self) -> bool {
        self.command.is_some()
    }

    pub async fn speak(&self, text: &str) {
        let Some(command) = &self.command else {
            return;
        };
        let status = Command::new(command)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;
        match status {
            Ok(status) if status.success() => {}
            Ok(status) => warn!(
                event_name = "hrdesk.voice.failed",
                command = %command,
                code = status.code().unwrap_or(-1),
                "speech command exited unsuccessfully"
            ),
            Err(error) => warn!(
                event_name = "hrdesk.voice.failed",
                command = %command,
                error = %error,
                "speech command could not be started"
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use hrdesk_core::config::VoiceConfig;

    use super::Speaker;

    #[test]
    fn disabled_voice_has_no_command() {
        let voice = VoiceConfig { enabled: false, command: "espeak".to_string() };
        assert!(!Speaker::from_config(&voice).is_enabled());
    }

    #[tokio::test]
    async fn missing_binary_is_not_fatal() {
        let voice = VoiceConfig { enabled: true, command: "hrdesk-no-such-tts-binary".to_string() };
        let speaker = Speaker::from_config(&voice);
        assert!(speaker.is_enabled());
        speaker.speak("hello").await;
    }
}
