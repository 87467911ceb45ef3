use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

const BUILTIN_POLICIES: &[(&str, &str)] = &[
    ("vacation", "Employees accrue 1.5 vacation days per month."),
    ("healthcare", "Medical coverage starts after 30 days of employment."),
    ("promotion", "Promotion cycles occur biannually in Q1 and Q3."),
    (
        "onboarding",
        "New hires complete onboarding in 3 steps: 1) Orientation, 2) Training, 3) Team Integration.",
    ),
    ("benefits", "Benefits include healthcare, 401(k), and paid time off."),
];

#[derive(Debug, Error)]
pub enum PolicySourceError {
    #[error("policy file `{path}` could not be read: {source}")]
    Unreadable { path: PathBuf, source: std::io::Error },
}

/// Topic keyword to policy text. Topics are stored lowercased.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PolicyCatalog {
    entries: BTreeMap<String, String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyMatch<'a> {
    Found { topic: &'a str, description: &'a str },
    Missing { known_topics: Vec<&'a str> },
}

impl PolicyCatalog {
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for (topic, description) in BUILTIN_POLICIES {
            catalog.insert(topic, description);
        }
        catalog
    }

    /// Parses `topic: description` lines. Lines without a separator or with an
    /// empty topic are skipped.
    pub fn parse(raw: &str) -> Self {
        let mut catalog = Self::default();
        for line in raw.lines() {
            let Some((topic, description)) = line.split_once(':') else {
                continue;
            };
            let topic = topic.trim();
            if topic.is_empty() {
                continue;
            }
            catalog.insert(topic, description.trim());
        }
        catalog
    }

    pub fn insert(&mut self, topic: &str, description: &str) {
        self.entries.insert(topic.trim().to_lowercase(), description.to_string());
    }

    pub fn lookup(&self, keyword: &str) -> PolicyMatch<'_> {
        let key = keyword.trim().to_lowercase();
        match self.entries.get_key_value(&key) {
            Some((topic, description)) => PolicyMatch::Found { topic, description },
            None => PolicyMatch::Missing { known_topics: self.topics() },
        }
    }

    pub fn topics(&self) -> Vec<&str> {
        self.entries.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where policy text comes from. A file source is re-read on every load so
/// edits are picked up without a restart.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicySource {
    Builtin,
    File(PathBuf),
}

impl PolicySource {
    pub fn from_path(path: Option<&Path>) -> Self {
        match path {
            Some(path) => Self::File(path.to_path_buf()),
            None => Self::Builtin,
        }
    }

    pub fn load(&self) -> Result<PolicyCatalog, PolicySourceError> {
        match self {
            Self::Builtin => Ok(PolicyCatalog::builtin()),
            Self::File(path) => fs::read_to_string(path)
                .map(|raw| PolicyCatalog::parse(&raw))
                .map_err(|source| PolicySourceError::Unreadable { path: path.clone(), source }),
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Self::Builtin => "builtin".to_string(),
            Self::File(path) => format!("file ({})", path.display()),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{PolicyCatalog, PolicyMatch, PolicySource, PolicySourceError};

    #[test]
    fn builtin_catalog_is_case_insensitive() {
        let catalog = PolicyCatalog::builtin();
        for keyword in ["vacation", "HEALTHCARE", " Promotion ", "onBoarding", "benefits"] {
            assert!(
                matches!(catalog.lookup(keyword), PolicyMatch::Found { .. }),
                "expected `{keyword}` to resolve"
            );
        }
    }

    #[test]
    fn miss_lists_known_topics() {
        let catalog = PolicyCatalog::builtin();
        let PolicyMatch::Missing { known_topics } = catalog.lookup("parking") else {
            panic!("parking should not resolve");
        };
        assert_eq!(known_topics.len(), 5);
        assert!(known_topics.contains(&"vacation"));
    }

    #[test]
    fn parse_skips_malformed_lines() {
        let catalog = PolicyCatalog::parse(
            "vacation: Two weeks\nno separator here\n: empty topic\nRemote: Fridays: optional\n",
        );
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.lookup("remote"),
            PolicyMatch::Found { topic: "remote", description: "Fridays: optional" }
        );
    }

    #[test]
    fn file_source_reports_missing_file() {
        let dir = TempDir::new().expect("temp dir");
        let source = PolicySource::File(dir.path().join("policies.txt"));
        assert!(matches!(source.load(), Err(PolicySourceError::Unreadable { .. })));

        fs::write(dir.path().join("policies.txt"), "healthcare: Day one coverage\n")
            .expect("write policies");
        let catalog = source.load().expect("load policies");
        assert_eq!(
            catalog.lookup("Healthcare"),
            PolicyMatch::Found { topic: "healthcare", description: "Day one coverage" }
        );
    }
}
