use std::sync::OnceLock;

use thiserror::Error;
use tracing::{info, warn};

use hrdesk_core::domain::employee::EmployeeId;
use hrdesk_db::repositories::EmployeeRepository;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("invalid credentials")]
    InvalidCredentials,
    #[error("a session is already authenticated in this process")]
    AlreadyAuthenticated,
    #[error("credential store unavailable: {0}")]
    StoreUnavailable(String),
}

/// Process-wide login. Bound at most once; there is no logout.
#[derive(Debug, Default)]
pub struct Session {
    authenticated: OnceLock<EmployeeId>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// Already bound, for tests and embedding callers that skip the login prompt.
    pub fn bound(employee_id: EmployeeId) -> Self {
        let session = Self::default();
        let _ = session.authenticated.set(employee_id);
        session
    }

    pub async fn authenticate(
        &self,
        repository: &dyn EmployeeRepository,
        raw_id: &str,
        credential: &str,
    ) -> Result<EmployeeId, AuthError> {
        if self.authenticated.get().is_some() {
            return Err(AuthError::AlreadyAuthenticated);
        }

        let Ok(employee_id) = EmployeeId::parse(raw_id) else {
            warn!(event_name = "hrdesk.session.rejected", reason = "malformed_id", "login rejected");
            return Err(AuthError::InvalidCredentials);
        };

        let record = repository
            .find(&employee_id, Some(credential))
            .await
            .map_err(|error| AuthError::StoreUnavailable(error.to_string()))?;
        if record.is_none() {
            warn!(
                event_name = "hrdesk.session.rejected",
                reason = "no_matching_record",
                "login rejected"
            );
            return Err(AuthError::InvalidCredentials);
        }

        self.authenticated
            .set(employee_id.clone())
            .map_err(|_| AuthError::AlreadyAuthenticated)?;
        info!(
            event_name = "hrdesk.session.authenticated",
            employee_id = %employee_id,
            "session authenticated"
        );
        Ok(employee_id)
    }

    pub fn current(&self) -> Option<&EmployeeId> {
        self.authenticated.get()
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated.get().is_some()
    }
}

#[cfg(test)]
mod tests {
    use hrdesk_core::domain::employee::{EmployeeId, EmployeeRecord, PasswordHash};
    use hrdesk_db::repositories::{EmployeeRepository, InMemoryEmployeeRepository, RepositoryError};

    use super::{AuthError, Session};

    fn directory() -> InMemoryEmployeeRepository {
        let mut record = EmployeeRecord::new(EmployeeId::parse("EMP123").expect("id"), 15);
        record.password_hash = Some(PasswordHash::from_plaintext("welcome123"));
        let unprotected = EmployeeRecord::new(EmployeeId::parse("EMP999").expect("id"), 3);
        InMemoryEmployeeRepository::with_records([record, unprotected])
    }

    struct BrokenStore;

    #[async_trait::async_trait]
    impl EmployeeRepository for BrokenStore {
        async fn find_by_id(
            &self,
            _id: &EmployeeId,
        ) -> Result<Option<EmployeeRecord>, RepositoryError> {
            Err(RepositoryError::Decode("store offline".to_string()))
        }

        async fn save(&self, _record: EmployeeRecord) -> Result<(), RepositoryError> {
            Ok(())
        }

        async fn count(&self) -> Result<u64, RepositoryError> {
            Ok(0)
        }
    }

    #[tokio::test]
    async fn valid_login_binds_session_once() {
        let repository = directory();
        let session = Session::new();

        let bound = session.authenticate(&repository, " EMP123 ", "welcome123").await;
        assert_eq!(bound.expect("login").as_str(), "EMP123");
        assert_eq!(session.current().map(EmployeeId::as_str), Some("EMP123"));

        let again = session.authenticate(&repository, "EMP123", "welcome123").await;
        assert_eq!(again, Err(AuthError::AlreadyAuthenticated));
        assert_eq!(session.current().map(EmployeeId::as_str), Some("EMP123"));
    }

    #[tokio::test]
    async fn wrong_password_unknown_id_and_missing_hash_are_rejected() {
        let repository = directory();
        let session = Session::new();

        for (id, credential) in
            [("EMP123", "nope"), ("EMP000", "welcome123"), ("EMP999", ""), ("../etc", "x")]
        {
            let outcome = session.authenticate(&repository, id, credential).await;
            assert_eq!(outcome, Err(AuthError::InvalidCredentials), "{id}");
        }
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn store_failure_is_not_reported_as_bad_credentials() {
        let session = Session::new();
        let outcome = session.authenticate(&BrokenStore, "EMP123", "welcome123").await;
        assert!(matches!(outcome, Err(AuthError::StoreUnavailable(_))));
        assert!(!session.is_authenticated());
    }
}
