//! Conversation transcript model and its persisted format.
//!
//! A transcript is the ordered turn history of one employee. On disk it is a
//! versioned JSON document that names its owner, so a file copied between
//! identities is rejected instead of leaking another employee's history.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use uuid::Uuid;

use super::employee::EmployeeId;

pub const TRANSCRIPT_FORMAT_VERSION: u32 = 1;
pub const HISTORY_FILE_PREFIX: &str = "chat_history_";
pub const HISTORY_FILE_SUFFIX: &str = ".txt";
pub const GREETING: &str = "Hello! I'm HRBot, your friendly HR assistant. How can I help you today?";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Human,
    Ai,
}

impl Role {
    pub fn label(self) -> &'static str {
        match self {
            Self::Human => "Human",
            Self::Ai => "AI",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOrigin {
    Conversation,
    StoredFact,
    Seed,
    Introduction,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnMetadata {
    pub id: Uuid,
    pub recorded_at: DateTime<Utc>,
    pub origin: TurnOrigin,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    #[serde(rename = "type")]
    pub role: Role,
    pub content: String,
    pub metadata: TurnMetadata,
}

impl Turn {
    pub fn new(role: Role, content: impl Into<String>, origin: TurnOrigin) -> Self {
        Self {
            role,
            content: content.into(),
            metadata: TurnMetadata { id: Uuid::new_v4(), recorded_at: Utc::now(), origin },
        }
    }

    pub fn human(content: impl Into<String>, origin: TurnOrigin) -> Self {
        Self::new(Role::Human, content, origin)
    }

    pub fn ai(content: impl Into<String>, origin: TurnOrigin) -> Self {
        Self::new(Role::Ai, content, origin)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Transcript {
    turns: Vec<Turn>,
}

impl Transcript {
    pub fn new(turns: Vec<Turn>) -> Self {
        Self { turns }
    }

    pub fn seed(employee_id: &EmployeeId) -> Self {
        Self::new(seed_turns(employee_id))
    }

    pub fn extend(&mut self, turns: impl IntoIterator<Item = Turn>) {
        self.turns.extend(turns);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// One `Human: ...` / `AI: ...` line per turn, in order.
    pub fn render(&self) -> String {
        self.turns
            .iter()
            .map(|turn| format!("{}: {}", turn.role.label(), turn.content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Contents only, ignoring ids and timestamps.
    pub fn contents(&self) -> Vec<(Role, &str)> {
        self.turns.iter().map(|turn| (turn.role, turn.content.as_str())).collect()
    }
}

/// The fixed four-turn reset target for an identity.
pub fn seed_turns(employee_id: &EmployeeId) -> Vec<Turn> {
    vec![
        Turn::human(format!("Employee id is {employee_id}"), TurnOrigin::Seed),
        Turn::ai(
            format!("Got it! I'll remember that: Employee id is {employee_id}"),
            TurnOrigin::Seed,
        ),
        Turn::human(introduction_prompt(employee_id), TurnOrigin::Seed),
        Turn::ai(GREETING, TurnOrigin::Seed),
    ]
}

/// Recorded the first time an identity opens a chat.
pub fn introduction_turns(employee_id: &EmployeeId) -> Vec<Turn> {
    vec![
        Turn::human(introduction_prompt(employee_id), TurnOrigin::Introduction),
        Turn::ai(GREETING, TurnOrigin::Introduction),
    ]
}

pub fn stored_fact_turns(fact: &str) -> Vec<Turn> {
    vec![
        Turn::human(fact, TurnOrigin::StoredFact),
        Turn::ai(format!("Got it! I'll remember that: {fact}"), TurnOrigin::StoredFact),
    ]
}

pub fn conversation_turns(utterance: &str, reply: &str) -> Vec<Turn> {
    vec![
        Turn::human(utterance, TurnOrigin::Conversation),
        Turn::ai(reply, TurnOrigin::Conversation),
    ]
}

fn introduction_prompt(employee_id: &EmployeeId) -> String {
    format!("Store the employee id if it's the first time you see this: Employee id: {employee_id}")
}

pub fn history_file_name(employee_id: &EmployeeId) -> String {
    format!("{HISTORY_FILE_PREFIX}{employee_id}{HISTORY_FILE_SUFFIX}")
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum HistoryTargetError {
    #[error("history target `{0}` does not follow chat_history_<ID>.txt")]
    Malformed(String),
}

/// Extracts the identity named by a history target such as
/// `chat_history_EMP123.txt`. Leading directories are ignored.
pub fn parse_history_target(target: &str) -> Result<EmployeeId, HistoryTargetError> {
    let trimmed = target.trim().trim_matches(|c| c == '"' || c == '\'' || c == '`');
    let file_name = trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed);
    let malformed = || HistoryTargetError::Malformed(target.trim().to_string());

    let raw_id = file_name
        .strip_prefix(HISTORY_FILE_PREFIX)
        .and_then(|rest| rest.strip_suffix(HISTORY_FILE_SUFFIX))
        .ok_or_else(malformed)?;
    EmployeeId::parse(raw_id).map_err(|_| malformed())
}

#[derive(Debug, Error)]
pub enum TranscriptFormatError {
    #[error("transcript is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported transcript version {found} (expected {TRANSCRIPT_FORMAT_VERSION})")]
    UnsupportedVersion { found: u32 },
    #[error("transcript belongs to `{found}`, not `{expected}`")]
    ForeignOwner { expected: String, found: String },
    #[error("transcript root must be an object or a legacy array")]
    UnexpectedShape,
}

#[derive(Debug, Serialize, Deserialize)]
struct TranscriptFile {
    version: u32,
    employee_id: EmployeeId,
    turns: Vec<Turn>,
}

#[derive(Debug, Deserialize)]
struct LegacyRecord {
    #[serde(rename = "type")]
    kind: String,
    data: LegacyData,
}

#[derive(Debug, Deserialize)]
struct LegacyData {
    content: String,
}

pub fn encode_transcript(
    employee_id: &EmployeeId,
    transcript: &Transcript,
) -> Result<String, TranscriptFormatError> {
    let file = TranscriptFile {
        version: TRANSCRIPT_FORMAT_VERSION,
        employee_id: employee_id.clone(),
        turns: transcript.turns.clone(),
    };
    Ok(serde_json::to_string_pretty(&file)?)
}

/// Decodes a persisted transcript owned by `expected_owner`. Blank input is an
/// empty transcript; the legacy bare-array layout is accepted and upgraded on
/// the next write.
pub fn decode_transcript(
    raw: &str,
    expected_owner: &EmployeeId,
) -> Result<Transcript, TranscriptFormatError> {
    if raw.trim().is_empty() {
        return Ok(Transcript::default());
    }

    match serde_json::from_str::<Value>(raw)? {
        Value::Object(map) => {
            let file: TranscriptFile = serde_json::from_value(Value::Object(map))?;
            if file.version != TRANSCRIPT_FORMAT_VERSION {
                return Err(TranscriptFormatError::UnsupportedVersion { found: file.version });
            }
            if &file.employee_id != expected_owner {
                return Err(TranscriptFormatError::ForeignOwner {
                    expected: expected_owner.to_string(),
                    found: file.employee_id.to_string(),
                });
            }
            Ok(Transcript::new(file.turns))
        }
        Value::Array(items) => {
            let records: Vec<LegacyRecord> = serde_json::from_value(Value::Array(items))?;
            let turns = records
                .into_iter()
                .map(|record| {
                    let role = if record.kind == "human" { Role::Human } else { Role::Ai };
                    Turn::new(role, record.data.content, TurnOrigin::Conversation)
                })
                .collect();
            Ok(Transcript::new(turns))
        }
        _ => Err(TranscriptFormatError::UnexpectedShape),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        decode_transcript, encode_transcript, history_file_name, parse_history_target,
        HistoryTargetError, Role, Transcript, TranscriptFormatError, TurnOrigin,
    };
    use crate::domain::employee::EmployeeId;

    fn emp(raw: &str) -> EmployeeId {
        EmployeeId::parse(raw).expect("valid employee id")
    }

    #[test]
    fn seed_has_four_turns_naming_the_employee() {
        let seed = Transcript::seed(&emp("EMP123"));
        assert_eq!(seed.len(), 4);
        assert_eq!(seed.contents()[0], (Role::Human, "Employee id is EMP123"));
        assert_eq!(seed.contents()[1].0, Role::Ai);
        assert!(seed.turns().iter().all(|turn| turn.metadata.origin == TurnOrigin::Seed));
    }

    #[test]
    fn history_target_parsing() {
        assert_eq!(parse_history_target("chat_history_EMP123.txt"), Ok(emp("EMP123")));
        assert_eq!(parse_history_target(" ./memory/chat_history_EMP456.txt "), Ok(emp("EMP456")));
        assert_eq!(parse_history_target("'chat_history_EMP123.txt'"), Ok(emp("EMP123")));
        assert!(matches!(
            parse_history_target("chat_history.txt"),
            Err(HistoryTargetError::Malformed(_))
        ));
        assert!(parse_history_target("EMP123").is_err());
        assert!(parse_history_target("chat_history_.txt").is_err());
        assert!(parse_history_target("").is_err());
        assert_eq!(history_file_name(&emp("EMP123")), "chat_history_EMP123.txt");
    }

    #[test]
    fn encoded_transcript_decodes_for_owner_only() {
        let owner = emp("EMP123");
        let raw = encode_transcript(&owner, &Transcript::seed(&owner)).expect("encode");

        let decoded = decode_transcript(&raw, &owner).expect("decode");
        assert_eq!(decoded.contents(), Transcript::seed(&owner).contents());

        let foreign = decode_transcript(&raw, &emp("EMP456"));
        assert!(matches!(foreign, Err(TranscriptFormatError::ForeignOwner { .. })));
    }

    #[test]
    fn unsupported_version_is_rejected() {
        let raw = r#"{"version": 9, "employee_id": "EMP123", "turns": []}"#;
        assert!(matches!(
            decode_transcript(raw, &emp("EMP123")),
            Err(TranscriptFormatError::UnsupportedVersion { found: 9 })
        ));
    }

    #[test]
    fn legacy_array_layout_is_accepted() {
        let raw = r#"[
            {"type": "human", "data": {"content": "my name is adi", "additional_kwargs": {}}},
            {"type": "ai", "data": {"content": "Nice to meet you", "tool_calls": []}}
        ]"#;
        let transcript = decode_transcript(raw, &emp("EMP123")).expect("legacy decode");
        assert_eq!(
            transcript.contents(),
            vec![(Role::Human, "my name is adi"), (Role::Ai, "Nice to meet you")]
        );
        assert!(decode_transcript("  ", &emp("EMP123")).expect("blank").is_empty());
    }
}
