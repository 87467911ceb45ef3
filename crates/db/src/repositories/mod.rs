use async_trait::async_trait;
use thiserror::Error;

use hrdesk_core::domain::employee::{EmployeeId, EmployeeRecord};

pub mod employee;
pub mod memory;

pub use employee::SqlEmployeeRepository;
pub use memory::InMemoryEmployeeRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

/// Credential store contract. Both the sqlite table and the in-memory
/// directory answer the same `find(id, credential?)` lookup.
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<EmployeeRecord>, RepositoryError>;

    async fn save(&self, record: EmployeeRecord) -> Result<(), RepositoryError>;

    async fn count(&self) -> Result<u64, RepositoryError>;

    /// With a credential, only a record whose stored hash matches is returned.
    async fn find(
        &self,
        id: &EmployeeId,
        credential: Option<&str>,
    ) -> Result<Option<EmployeeRecord>, RepositoryError> {
        let record = self.find_by_id(id).await?;
        Ok(match credential {
            Some(credential) => record.filter(|record| record.credential_matches(credential)),
            None => record,
        })
    }
}
