use thiserror::Error;

use crate::persistence::PersistError;
use crate::storage::StorageError;
use crate::transfer::TransferError;

/// A required field is missing or a value breaks a card invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("Card title cannot be empty")]
    EmptyTitle,
    #[error("Subtask text cannot be empty")]
    EmptySubtaskText,
    #[error("Tag cannot be empty")]
    EmptyTag,
    #[error("Tag already present: {0}")]
    DuplicateTag(String),
    #[error("Card id already in use: {0}")]
    DuplicateId(String),
    #[error("Unknown column: {0}")]
    UnknownColumn(String),
    #[error("Unknown theme: {0}")]
    UnknownTheme(String),
    #[error("Invalid import document: {0}")]
    InvalidDocument(String),
}

/// A command referenced something that does not exist.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NotFoundError {
    #[error("Card not found: {0}")]
    Card(String),
    #[error("Subtask {subtask_id} not found on card {card_id}")]
    Subtask { card_id: String, subtask_id: String },
    #[error("No backups available")]
    NoBackups,
    #[error("Backup index {index} out of range ({len} backups)")]
    BackupIndex { index: usize, len: usize },
}

#[derive(Debug, Error)]
pub enum BoardError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
    #[error("Corrupt data: {0}")]
    CorruptData(String),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

impl From<PersistError> for BoardError {
    fn from(err: PersistError) -> Self {
        match err {
            PersistError::Storage(e) => BoardError::Storage(e),
            PersistError::Corrupt { key, reason } => {
                BoardError::CorruptData(format!("{}: {}", key, reason))
            }
            PersistError::Encode(e) => BoardError::CorruptData(e.to_string()),
            PersistError::NotFound(e) => BoardError::NotFound(e),
        }
    }
}

impl From<TransferError> for BoardError {
    fn from(err: TransferError) -> Self {
        match err {
            TransferError::Validation(e) => BoardError::Validation(e),
            other => BoardError::CorruptData(other.to_string()),
        }
    }
}

pub type BoardResult<T> = Result<T, BoardError>;
