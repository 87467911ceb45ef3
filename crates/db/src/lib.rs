pub mod connection;
pub mod fixtures;
pub mod migrations;
pub mod repositories;
pub mod transcripts;

pub use connection::{connect, connect_with_settings, DbPool};
pub use repositories::{
    EmployeeRepository, InMemoryEmployeeRepository, RepositoryError, SqlEmployeeRepository,
};
pub use transcripts::{FileTranscriptStore, MemoryState, TranscriptError, TranscriptStore};
