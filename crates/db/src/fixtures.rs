use hrdesk_core::domain::employee::{EmployeeId, EmployeeRecord, PasswordHash};
use tracing::info;

use crate::repositories::{EmployeeRepository, RepositoryError};

struct SampleEmployee {
    id: &'static str,
    leave_balance: u32,
    name: &'static str,
    email: &'static str,
    age: u32,
    password: &'static str,
}

/// Deterministic sample directory loaded into a fresh database.
const SAMPLE_EMPLOYEES: &[SampleEmployee] = &[
    SampleEmployee {
        id: "EMP123",
        leave_balance: 15,
        name: "Alex Morgan",
        email: "alex.morgan@example.com",
        age: 29,
        password: "welcome123",
    },
    SampleEmployee {
        id: "EMP456",
        leave_balance: 10,
        name: "Priya Raman",
        email: "priya.raman@example.com",
        age: 34,
        password: "welcome456",
    },
];

pub fn sample_employees() -> Result<Vec<EmployeeRecord>, RepositoryError> {
    SAMPLE_EMPLOYEES
        .iter()
        .map(|sample| {
            let id = EmployeeId::parse(sample.id)
                .map_err(|error| RepositoryError::Decode(error.to_string()))?;
            Ok(EmployeeRecord {
                id,
                leave_balance: sample.leave_balance,
                name: Some(sample.name.to_string()),
                email: Some(sample.email.to_string()),
                age: Some(sample.age),
                password_hash: Some(PasswordHash::from_plaintext(sample.password)),
            })
        })
        .collect()
}

/// Inserts the sample directory. Re-running overwrites the same rows.
pub async fn seed_sample_employees(
    repository: &dyn EmployeeRepository,
) -> Result<usize, RepositoryError> {
    let records = sample_employees()?;
    let seeded = records.len();
    for record in records {
        repository.save(record).await?;
    }
    info!(event_name = "hrdesk.db.sample_employees_seeded", seeded, "sample employees seeded");
    Ok(seeded)
}
