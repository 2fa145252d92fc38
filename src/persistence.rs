//! Board persistence on top of a [`KeyValueStore`].
//!
//! Layout (one JSON value per key):
//! - `lanes.cards`: array of cards
//! - `lanes.backups.auto`: ring of the last few saves
//! - `lanes.backups.manual`: ring of user-requested backups
//! - `lanes.backups.last`: RFC 3339 time of the last auto backup
//! - `lanes.theme`: active theme name
//! - `lanes.cards.rejected`: last unreadable `lanes.cards` value, copied
//!   aside at load

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use thiserror::Error;

use crate::error::NotFoundError;
use crate::models::{BackupSnapshot, Card};
use crate::storage::{KeyValueStore, StorageError};

pub const CARDS_KEY: &str = "lanes.cards";
pub const AUTO_BACKUPS_KEY: &str = "lanes.backups.auto";
pub const MANUAL_BACKUPS_KEY: &str = "lanes.backups.manual";
pub const LAST_BACKUP_KEY: &str = "lanes.backups.last";
pub const THEME_KEY: &str = "lanes.theme";
pub const REJECTED_CARDS_KEY: &str = "lanes.cards.rejected";

pub const DEFAULT_AUTO_BACKUP_LIMIT: usize = 5;
pub const DEFAULT_MANUAL_BACKUP_LIMIT: usize = 10;
pub const MANUAL_BACKUP_DESCRIPTION: &str = "Manual backup";
pub const SET_ASIDE_DESCRIPTION: &str = "Saved board rejected at load";

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("Stored value under '{key}' is corrupt: {reason}")]
    Corrupt { key: String, reason: String },
    #[error("Failed to encode board data: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    NotFound(#[from] NotFoundError),
}

/// Which backup list to use
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupRing {
    Auto,
    Manual,
}

impl BackupRing {
    fn key(self) -> &'static str {
        match self {
            BackupRing::Auto => AUTO_BACKUPS_KEY,
            BackupRing::Manual => MANUAL_BACKUPS_KEY,
        }
    }
}

/// Picks one backup out of a ring
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackupSelector {
    Latest,
    Index(usize),
}

pub struct PersistenceGateway<S: KeyValueStore> {
    store: S,
    auto_limit: usize,
    manual_limit: usize,
}

impl<S: KeyValueStore> PersistenceGateway<S> {
    pub fn new(store: S) -> Self {
        Self::with_limits(store, DEFAULT_AUTO_BACKUP_LIMIT, DEFAULT_MANUAL_BACKUP_LIMIT)
    }

    pub fn with_limits(store: S, auto_limit: usize, manual_limit: usize) -> Self {
        Self {
            store,
            auto_limit: auto_limit.max(1),
            manual_limit: manual_limit.max(1),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Read the saved collection. `Ok(None)` means nothing was ever saved.
    pub fn load(&self) -> Result<Option<Vec<Card>>, PersistError> {
        self.read_json(CARDS_KEY)
    }

    /// Write the collection, then append it to the auto-backup ring and
    /// stamp the last backup time.
    pub fn save(&mut self, cards: &[Card], now: DateTime<Utc>) -> Result<(), PersistError> {
        let encoded = serde_json::to_string(cards)?;
        self.store.set(CARDS_KEY, &encoded)?;

        self.append(BackupRing::Auto, BackupSnapshot::new(cards, now))?;
        self.store.set(LAST_BACKUP_KEY, &now.to_rfc3339())?;
        debug!(
            "event=board_save module=persistence status=ok cards={} bytes={}",
            cards.len(),
            encoded.len()
        );
        Ok(())
    }

    pub fn manual_backup(&mut self, cards: &[Card], now: DateTime<Utc>) -> Result<(), PersistError> {
        let mut snapshot = BackupSnapshot::new(cards, now);
        snapshot.description = Some(MANUAL_BACKUP_DESCRIPTION.to_string());
        self.append(BackupRing::Manual, snapshot)
    }

    /// Keep cards that could not be loaded in the manual ring
    pub fn set_aside(&mut self, cards: &[Card], now: DateTime<Utc>) -> Result<(), PersistError> {
        let mut snapshot = BackupSnapshot::new(cards, now);
        snapshot.description = Some(SET_ASIDE_DESCRIPTION.to_string());
        self.append(BackupRing::Manual, snapshot)
    }

    /// Copy the raw primary value to [`REJECTED_CARDS_KEY`]. Returns
    /// whether there was anything to copy.
    pub fn stash_unreadable_cards(&mut self) -> Result<bool, PersistError> {
        let Some(raw) = self.store.get(CARDS_KEY)? else {
            return Ok(false);
        };
        self.store.set(REJECTED_CARDS_KEY, &raw)?;
        warn!(
            "event=cards_stash module=persistence status=ok key={} bytes={}",
            REJECTED_CARDS_KEY,
            raw.len()
        );
        Ok(true)
    }

    /// All backups in a ring, oldest first
    pub fn backups(&self, ring: BackupRing) -> Result<Vec<BackupSnapshot>, PersistError> {
        Ok(self.read_json(ring.key())?.unwrap_or_default())
    }

    pub fn backup(&self, ring: BackupRing, selector: BackupSelector) -> Result<BackupSnapshot, PersistError> {
        let mut backups = self.backups(ring)?;
        if backups.is_empty() {
            return Err(NotFoundError::NoBackups.into());
        }
        let len = backups.len();
        let index = match selector {
            BackupSelector::Latest => len - 1,
            BackupSelector::Index(index) if index < len => index,
            BackupSelector::Index(index) => {
                return Err(NotFoundError::BackupIndex { index, len }.into());
            }
        };
        Ok(backups.swap_remove(index))
    }

    pub fn last_backup_time(&self) -> Result<Option<DateTime<Utc>>, PersistError> {
        let Some(raw) = self.store.get(LAST_BACKUP_KEY)? else {
            return Ok(None);
        };
        DateTime::parse_from_rfc3339(&raw)
            .map(|t| Some(t.with_timezone(&Utc)))
            .map_err(|e| PersistError::Corrupt {
                key: LAST_BACKUP_KEY.to_string(),
                reason: e.to_string(),
            })
    }

    pub fn load_theme(&self) -> Result<Option<String>, PersistError> {
        Ok(self.store.get(THEME_KEY)?)
    }

    pub fn save_theme(&mut self, theme: &str) -> Result<(), PersistError> {
        self.store.set(THEME_KEY, theme)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, PersistError> {
        let Some(raw) = self.store.get(key)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|e| PersistError::Corrupt {
                key: key.to_string(),
                reason: e.to_string(),
            })
    }

    fn append(&mut self, ring: BackupRing, snapshot: BackupSnapshot) -> Result<(), PersistError> {
        let mut backups = match self.backups(ring) {
            Ok(backups) => backups,
            Err(PersistError::Corrupt { key, reason }) => {
                warn!(
                    "event=backup_ring_reset module=persistence status=error key={} reason={}",
                    key, reason
                );
                Vec::new()
            }
            Err(e) => return Err(e),
        };
        let limit = match ring {
            BackupRing::Auto => self.auto_limit,
            BackupRing::Manual => self.manual_limit,
        };

        backups.push(snapshot);
        if backups.len() > limit {
            let excess = backups.len() - limit;
            backups.drain(..excess);
        }
        self.store.set(ring.key(), &serde_json::to_string(&backups)?)?;
        Ok(())
    }
}
