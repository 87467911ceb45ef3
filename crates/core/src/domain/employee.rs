use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::errors::DomainError;

const MAX_EMPLOYEE_ID_LEN: usize = 64;

/// Employee identifier. Embedded in transcript file names, so only ASCII
/// alphanumerics, `-` and `_` are accepted.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmployeeId(String);

impl EmployeeId {
    pub fn parse(raw: &str) -> Result<Self, DomainError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(DomainError::InvalidEmployeeId("employee id is empty".to_string()));
        }
        if trimmed.len() > MAX_EMPLOYEE_ID_LEN {
            return Err(DomainError::InvalidEmployeeId(format!(
                "employee id exceeds {MAX_EMPLOYEE_ID_LEN} characters"
            )));
        }
        let valid = trimmed
            .chars()
            .all(|character| character.is_ascii_alphanumeric() || matches!(character, '-' | '_'));
        if !valid {
            return Err(DomainError::InvalidEmployeeId(format!(
                "employee id `{trimmed}` contains unsupported characters"
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EmployeeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for EmployeeId {
    type Error = DomainError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmployeeId> for String {
    fn from(value: EmployeeId) -> Self {
        value.0
    }
}

impl std::str::FromStr for EmployeeId {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::parse(value)
    }
}

/// Lowercase hex SHA-256 of an employee credential.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PasswordHash(String);

impl PasswordHash {
    pub fn from_plaintext(plaintext: &str) -> Self {
        Self(sha256_hex(plaintext.as_bytes()))
    }

    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into().to_ascii_lowercase())
    }

    pub fn as_hex(&self) -> &str {
        &self.0
    }

    /// Constant-time comparison against the hash of `candidate`.
    pub fn verify(&self, candidate: &str) -> bool {
        let expected = self.0.as_bytes();
        let actual = sha256_hex(candidate.as_bytes());
        let actual = actual.as_bytes();
        if expected.len() != actual.len() {
            return false;
        }
        expected.iter().zip(actual).fold(0u8, |diff, (left, right)| diff | (left ^ right)) == 0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmployeeRecord {
    pub id: EmployeeId,
    pub leave_balance: u32,
    pub name: Option<String>,
    pub email: Option<String>,
    pub age: Option<u32>,
    #[serde(skip_serializing)]
    pub password_hash: Option<PasswordHash>,
}

impl EmployeeRecord {
    pub fn new(id: EmployeeId, leave_balance: u32) -> Self {
        Self { id, leave_balance, name: None, email: None, age: None, password_hash: None }
    }

    pub fn credential_matches(&self, candidate: &str) -> bool {
        self.password_hash.as_ref().map(|hash| hash.verify(candidate)).unwrap_or(false)
    }

    /// Human-readable summary used by the details tool. Never includes the hash.
    pub fn describe(&self) -> String {
        let mut fields = Vec::new();
        if let Some(name) = &self.name {
            fields.push(format!("name: {name}"));
        }
        if let Some(email) = &self.email {
            fields.push(format!("email: {email}"));
        }
        if let Some(age) = self.age {
            fields.push(format!("age: {age}"));
        }
        fields.push(format!("leave balance: {} days", self.leave_balance));
        format!("Employee {} details: {}", self.id, fields.join(", "))
    }
}

fn sha256_hex(payload: &[u8]) -> String {
    let digest = Sha256::digest(payload);
    let mut output = String::with_capacity(digest.len() * 2);
    for byte in digest {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::{EmployeeId, EmployeeRecord, PasswordHash};

    #[test]
    fn employee_id_rejects_path_like_input() {
        assert!(EmployeeId::parse("EMP123").is_ok());
        assert!(EmployeeId::parse("  EMP-7_a ").is_ok());
        assert!(EmployeeId::parse("").is_err());
        assert!(EmployeeId::parse("../EMP123").is_err());
        assert!(EmployeeId::parse("EMP123.txt").is_err());
        assert!(EmployeeId::parse("EMP 123").is_err());
    }

    #[test]
    fn password_hash_verifies_only_matching_credential() {
        let hash = PasswordHash::from_plaintext("welcome123");
        assert!(hash.verify("welcome123"));
        assert!(!hash.verify("welcome124"));
        assert!(!hash.verify(""));
        assert_eq!(hash.as_hex().len(), 64);
    }

    #[test]
    fn details_never_include_password_hash() {
        let mut record = EmployeeRecord::new(EmployeeId::parse("EMP123").expect("id"), 15);
        record.name = Some("Alex Morgan".to_string());
        record.password_hash = Some(PasswordHash::from_plaintext("welcome123"));
        let hash_hex = record.password_hash.as_ref().map(|hash| hash.as_hex().to_string());

        let details = record.describe();
        assert!(details.contains("name: Alex Morgan"));
        assert!(details.contains("leave balance: 15 days"));
        assert!(!details.contains(hash_hex.as_deref().unwrap_or("unreachable")));

        let json = serde_json::to_string(&record).expect("serialize");
        assert!(!json.contains("password_hash"));
        assert!(!format!("{record:?}").contains(hash_hex.as_deref().unwrap_or("unreachable")));
    }

    #[test]
    fn record_without_hash_never_authenticates() {
        let record = EmployeeRecord::new(EmployeeId::parse("EMP456").expect("id"), 10);
        assert!(!record.credential_matches("anything"));
    }
}
