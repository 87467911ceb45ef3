pub mod config;
pub mod domain;
pub mod errors;

pub use domain::employee::{EmployeeId, EmployeeRecord, PasswordHash};
pub use domain::policy::{PolicyCatalog, PolicyMatch, PolicySource, PolicySourceError};
pub use domain::transcript::{Role, Transcript, Turn, TurnOrigin};
pub use errors::{ApplicationError, DomainError};
