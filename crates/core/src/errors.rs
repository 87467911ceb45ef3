use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("invalid employee id: {0}")]
    InvalidEmployeeId(String),
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Safe to show in the chat prompt; never echoes internal detail.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Domain(_) => "I could not process that request. Please rephrase and try again.",
            Self::Persistence(_) => {
                "I could not reach my records right now. Please try again shortly."
            }
            Self::Integration(_) => {
                "The assistant service is temporarily unavailable. Please retry shortly."
            }
            Self::Configuration(_) => "The assistant is misconfigured. Please contact IT support.",
        }
    }

    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "configuration",
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::errors::{ApplicationError, DomainError};

    #[test]
    fn domain_error_converts_into_application_error() {
        let error = ApplicationError::from(DomainError::InvalidEmployeeId("empty".to_owned()));
        assert_eq!(error.error_class(), "domain");
        assert_eq!(
            error.user_message(),
            "I could not process that request. Please rephrase and try again."
        );
    }

    #[test]
    fn integration_error_has_user_safe_message() {
        let error = ApplicationError::Integration("upstream returned 503: quota".to_owned());
        assert!(!error.user_message().contains("quota"));
        assert_eq!(error.error_class(), "integration");
    }

    #[test]
    fn persistence_and_configuration_map_to_distinct_classes() {
        assert_eq!(ApplicationError::Persistence("disk full".to_owned()).error_class(), "persistence");
        assert_eq!(
            ApplicationError::Configuration("missing key".to_owned()).user_message(),
            "The assistant is misconfigured. Please contact IT support."
        );
    }
}
