use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use hrdesk_core::domain::employee::{EmployeeId, EmployeeRecord};

use super::{EmployeeRepository, RepositoryError};

#[derive(Default)]
pub struct InMemoryEmployeeRepository {
    employees: RwLock<HashMap<EmployeeId, EmployeeRecord>>,
}

impl InMemoryEmployeeRepository {
    pub fn with_records(records: impl IntoIterator<Item = EmployeeRecord>) -> Self {
        let employees = records.into_iter().map(|record| (record.id.clone(), record)).collect();
        Self { employees: RwLock::new(employees) }
    }
}

#[async_trait]
impl EmployeeRepository for InMemoryEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<EmployeeRecord>, RepositoryError> {
        let employees = self.employees.read().await;
        Ok(employees.get(id).cloned())
    }

    async fn save(&self, record: EmployeeRecord) -> Result<(), RepositoryError> {
        let mut employees = self.employees.write().await;
        employees.insert(record.id.clone(), record);
        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        Ok(self.employees.read().await.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use hrdesk_core::domain::employee::{EmployeeId, EmployeeRecord};

    use crate::repositories::{EmployeeRepository, InMemoryEmployeeRepository};

    #[tokio::test]
    async fn in_memory_employee_repo_round_trip() {
        let repo = InMemoryEmployeeRepository::default();
        let record = EmployeeRecord::new(EmployeeId::parse("EMP321").expect("id"), 3);

        repo.save(record.clone()).await.expect("save employee");
        let found = repo.find_by_id(&record.id).await.expect("find employee");

        assert_eq!(found, Some(record));
    }

    #[tokio::test]
    async fn lookup_is_exact_on_identifier() {
        let repo = InMemoryEmployeeRepository::with_records([EmployeeRecord::new(
            EmployeeId::parse("EMP123").expect("id"),
            15,
        )]);
        let lowercase = EmployeeId::parse("emp123").expect("id");
        assert!(repo.find_by_id(&lowercase).await.expect("find").is_none());
    }
}
