pub mod board;
pub mod cli;
pub mod config;
pub mod error;
pub mod history;
pub mod logging;
pub mod models;
pub mod persistence;
pub mod reminders;
pub mod storage;
pub mod store;
pub mod transfer;
pub mod ui;
pub mod utils;

pub use board::{Board, BoardSettings, Outcome};
pub use config::Config;
pub use error::{BoardError, BoardResult, NotFoundError, ValidationError};
pub use history::{History, HistoryState};
pub use models::{Card, CardDraft, CardId, CardPatch, Column, Priority, Subtask};
pub use persistence::{BackupRing, BackupSelector, PersistenceGateway};
pub use reminders::{Reminder, ReminderScheduler, ReminderSettings};
pub use storage::{KeyValueStore, MemoryStore, SqliteStore, StorageError};
pub use store::CardStore;
pub use ui::{BoardUi, BoardView, Severity};
pub use utils::{Clock, ManualClock, Profile, SystemClock};
