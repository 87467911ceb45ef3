use async_trait::async_trait;
use sqlx::Row;

use hrdesk_core::domain::employee::{EmployeeId, EmployeeRecord, PasswordHash};

use super::{EmployeeRepository, RepositoryError};
use crate::DbPool;

pub struct SqlEmployeeRepository {
    pool: DbPool,
}

impl SqlEmployeeRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl EmployeeRepository for SqlEmployeeRepository {
    async fn find_by_id(&self, id: &EmployeeId) -> Result<Option<EmployeeRecord>, RepositoryError> {
        let row = sqlx::query(
            "SELECT employee_id, leave_balance, name, email, age, password_hash
             FROM employee WHERE employee_id = ?",
        )
        .bind(id.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(|row| decode_employee(&row)).transpose()
    }

    async fn save(&self, record: EmployeeRecord) -> Result<(), RepositoryError> {
        sqlx::query(
            "INSERT INTO employee (employee_id, leave_balance, name, email, age, password_hash)
             VALUES (?, ?, ?, ?, ?, ?)
             ON CONFLICT(employee_id) DO UPDATE SET
                leave_balance = excluded.leave_balance,
                name = excluded.name,
                email = excluded.email,
                age = excluded.age,
                password_hash = excluded.password_hash",
        )
        .bind(record.id.as_str())
        .bind(i64::from(record.leave_balance))
        .bind(record.name.as_deref())
        .bind(record.email.as_deref())
        .bind(record.age.map(i64::from))
        .bind(record.password_hash.as_ref().map(|hash| hash.as_hex().to_string()))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn count(&self) -> Result<u64, RepositoryError> {
        let (count,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM employee").fetch_one(&self.pool).await?;
        u64::try_from(count).map_err(|_| RepositoryError::Decode(format!("negative count {count}")))
    }
}

fn decode_employee(row: &sqlx::sqlite::SqliteRow) -> Result<EmployeeRecord, RepositoryError> {
    let raw_id: String = row.try_get("employee_id")?;
    let id = EmployeeId::parse(&raw_id)
        .map_err(|error| RepositoryError::Decode(format!("employee_id `{raw_id}`: {error}")))?;

    let leave_balance: i64 = row.try_get("leave_balance")?;
    let leave_balance = u32::try_from(leave_balance).map_err(|_| {
        RepositoryError::Decode(format!("leave_balance {leave_balance} for `{raw_id}` out of range"))
    })?;

    let age: Option<i64> = row.try_get("age")?;
    let age = age
        .map(|age| {
            u32::try_from(age).map_err(|_| {
                RepositoryError::Decode(format!("age {age} for `{raw_id}` out of range"))
            })
        })
        .transpose()?;

    let password_hash: Option<String> = row.try_get("password_hash")?;

    Ok(EmployeeRecord {
        id,
        leave_balance,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        age,
        password_hash: password_hash.map(PasswordHash::from_hex),
    })
}
