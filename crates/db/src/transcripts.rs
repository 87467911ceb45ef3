//! File-backed conversation memory, one file per employee.
//!
//! Every operation holds the store's lock across the full read-modify-write,
//! and writes land through a temp file plus rename, so repeated tool calls in
//! one agent round never interleave partial transcripts.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use thiserror::Error;
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, info};

use hrdesk_core::domain::employee::EmployeeId;
use hrdesk_core::domain::transcript::{
    decode_transcript, encode_transcript, history_file_name, introduction_turns,
    Transcript, TranscriptFormatError, Turn,
};

#[derive(Debug, Error)]
pub enum TranscriptError {
    #[error("transcript io failure at `{path}`: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("transcript at `{path}` is invalid: {source}")]
    Format { path: PathBuf, source: TranscriptFormatError },
}

/// `Uninitialized` means no transcript has ever been written for the identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MemoryState {
    Uninitialized,
    Active(Transcript),
}

impl MemoryState {
    pub fn into_transcript(self) -> Transcript {
        match self {
            Self::Uninitialized => Transcript::default(),
            Self::Active(transcript) => transcript,
        }
    }
}

#[async_trait]
pub trait TranscriptStore: Send + Sync {
    async fn state(&self, employee_id: &EmployeeId) -> Result<MemoryState, TranscriptError>;

    /// Appends in order and returns the resulting transcript.
    async fn append(
        &self,
        employee_id: &EmployeeId,
        turns: Vec<Turn>,
    ) -> Result<Transcript, TranscriptError>;

    /// Replaces the transcript with the fixed seed. Always lands `Active`.
    async fn reset_to_seed(&self, employee_id: &EmployeeId) -> Result<Transcript, TranscriptError>;

    /// Records the introduction pair when the identity is still uninitialized.
    /// Returns whether anything was written.
    async fn initialize(&self, employee_id: &EmployeeId) -> Result<bool, TranscriptError>;

    /// Where the identity's transcript lives, for diagnostics.
    fn location(&self, employee_id: &EmployeeId) -> String;

    async fn load(&self, employee_id: &EmployeeId) -> Result<Transcript, TranscriptError> {
        Ok(self.state(employee_id).await?.into_transcript())
    }
}

pub struct FileTranscriptStore {
    directory: PathBuf,
    lock: Mutex<()>,
}

impl FileTranscriptStore {
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self { directory: directory.into(), lock: Mutex::new(()) }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn path_for(&self, employee_id: &EmployeeId) -> PathBuf {
        self.directory.join(history_file_name(employee_id))
    }

    async fn read_state(&self, employee_id: &EmployeeId) -> Result<MemoryState, TranscriptError> {
        let path = self.path_for(employee_id);
        let raw = match fs::read_to_string(&path).await {
            Ok(raw) => raw,
            Err(error) if error.kind() == ErrorKind::NotFound => {
                return Ok(MemoryState::Uninitialized)
            }
            Err(source) => return Err(TranscriptError::Io { path, source }),
        };

        decode_transcript(&raw, employee_id)
            .map(MemoryState::Active)
            .map_err(|source| TranscriptError::Format { path, source })
    }

    async fn write(
        &self,
        employee_id: &EmployeeId,
        transcript: &Transcript,
    ) -> Result<(), TranscriptError> {
        let path = self.path_for(employee_id);
        let encoded = encode_transcript(employee_id, transcript)
            .map_err(|source| TranscriptError::Format { path: path.clone(), source })?;

        fs::create_dir_all(&self.directory)
            .await
            .map_err(|source| TranscriptError::Io { path: self.directory.clone(), source })?;

        let staging = path.with_extension("txt.tmp");
        fs::write(&staging, encoded)
            .await
            .map_err(|source| TranscriptError::Io { path: staging.clone(), source })?;
        fs::rename(&staging, &path)
            .await
            .map_err(|source| TranscriptError::Io { path: path.clone(), source })?;

        debug!(
            event_name = "hrdesk.memory.written",
            employee_id = %employee_id,
            turns = transcript.len(),
            "transcript persisted"
        );
        Ok(())
    }
}

#[async_trait]
impl TranscriptStore for FileTranscriptStore {
    async fn state(&self, employee_id: &EmployeeId) -> Result<MemoryState, TranscriptError> {
        let _guard = self.lock.lock().await;
        self.read_state(employee_id).await
    }

    async fn append(
        &self,
        employee_id: &EmployeeId,
        turns: Vec<Turn>,
    ) -> Result<Transcript, TranscriptError> {
        let _guard = self.lock.lock().await;
        let mut transcript = self.read_state(employee_id).await?.into_transcript();
        transcript.extend(turns);
        self.write(employee_id, &transcript).await?;
        Ok(transcript)
    }

    async fn reset_to_seed(&self, employee_id: &EmployeeId) -> Result<Transcript, TranscriptError> {
        let _guard = self.lock.lock().await;
        let seed = Transcript::seed(employee_id);
        self.write(employee_id, &seed).await?;
        info!(
            event_name = "hrdesk.memory.reset",
            employee_id = %employee_id,
            "transcript reset to seed"
        );
        Ok(seed)
    }

    async fn initialize(&self, employee_id: &EmployeeId) -> Result<bool, TranscriptError> {
        let _guard = self.lock.lock().await;
        match self.read_state(employee_id).await? {
            MemoryState::Active(_) => Ok(false),
            MemoryState::Uninitialized => {
                let transcript = Transcript::new(introduction_turns(employee_id));
                self.write(employee_id, &transcript).await?;
                info!(
                    event_name = "hrdesk.memory.initialized",
                    employee_id = %employee_id,
                    "transcript initialized with introduction"
                );
                Ok(true)
            }
        }
    }

    fn location(&self, employee_id: &EmployeeId) -> String {
        self.path_for(employee_id).display().to_string()
    }
}
