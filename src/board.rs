//! The board service.
//!
//! One object owns the live collection together with its history, storage,
//! reminder timers and UI, and every user action is one method on it.
//!
//! # Invariants
//! - A history snapshot is recorded only after the mutation succeeded, and
//!   it is always the collection as it was before the mutation.
//! - Every successful mutation is written to storage before the method
//!   returns. A failed write is reported as a warning and the in-memory
//!   change stays.
//! - Reminder timers are re-synced with the collection after every change.
//! - A declined confirmation changes nothing.

use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};

use crate::config::{Theme, DEFAULT_THEME};
use crate::error::{BoardError, BoardResult, NotFoundError, ValidationError};
use crate::history::{History, HistoryState, DEFAULT_HISTORY_LIMIT};
use crate::models::{
    normalize_tags, welcome_cards, BackupSnapshot, Card, CardDraft, CardId, CardPatch, Column,
    ExportDocument, IdGenerator, Subtask, SubtaskId,
};
use crate::persistence::{
    BackupRing, BackupSelector, PersistError, PersistenceGateway, DEFAULT_AUTO_BACKUP_LIMIT,
    DEFAULT_MANUAL_BACKUP_LIMIT,
};
use crate::reminders::{ReminderScheduler, ReminderSettings, TickReport};
use crate::storage::KeyValueStore;
use crate::store::CardStore;
use crate::transfer;
use crate::ui::{BoardUi, BoardView, Severity};
use crate::utils::Clock;

/// Everything the board needs from the configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardSettings {
    pub columns: Vec<Column>,
    pub themes: Vec<String>,
    pub history_limit: usize,
    pub auto_backup_limit: usize,
    pub manual_backup_limit: usize,
    pub reminders: ReminderSettings,
    pub seed_sample_cards: bool,
}

impl Default for BoardSettings {
    fn default() -> Self {
        let mut themes: Vec<String> = Theme::get_preset_themes().into_keys().collect();
        themes.sort();
        Self {
            columns: Column::defaults(),
            themes,
            history_limit: DEFAULT_HISTORY_LIMIT,
            auto_backup_limit: DEFAULT_AUTO_BACKUP_LIMIT,
            manual_backup_limit: DEFAULT_MANUAL_BACKUP_LIMIT,
            reminders: ReminderSettings::default(),
            seed_sample_cards: true,
        }
    }
}

/// Result of a command guarded by a confirmation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome<T = ()> {
    Applied(T),
    Declined,
}

impl<T> Outcome<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Outcome::Applied(_))
    }
}

pub struct Board<S: KeyValueStore, U: BoardUi> {
    store: CardStore,
    history: History,
    gateway: PersistenceGateway<S>,
    reminders: ReminderScheduler,
    ids: IdGenerator,
    ui: U,
    clock: Box<dyn Clock>,
    theme: String,
    settings: BoardSettings,
}

impl<S: KeyValueStore, U: BoardUi> Board<S, U> {
    /// Load the saved board (or start a new one), arm reminders and draw.
    ///
    /// Corrupt saved cards are not fatal: the board starts empty and the
    /// user is warned. Cards that decode but fail validation are copied to
    /// the manual ring; an unreadable value is copied aside under
    /// [`REJECTED_CARDS_KEY`](crate::persistence::REJECTED_CARDS_KEY).
    pub fn init(storage: S, ui: U, clock: Box<dyn Clock>, settings: BoardSettings) -> Self {
        let gateway = PersistenceGateway::with_limits(
            storage,
            settings.auto_backup_limit,
            settings.manual_backup_limit,
        );
        let mut board = Self {
            store: CardStore::new(settings.columns.clone()),
            history: History::new(settings.history_limit),
            gateway,
            reminders: ReminderScheduler::new(settings.reminders),
            ids: IdGenerator::new(),
            ui,
            clock,
            theme: DEFAULT_THEME.to_string(),
            settings,
        };
        let now = board.clock.now();

        match board.gateway.load() {
            Ok(Some(cards)) => {
                let count = cards.len();
                match board.store.check_all(&cards) {
                    Ok(()) => match board.store.replace_all(cards) {
                        Ok(()) => info!("event=board_load module=board status=ok cards={}", count),
                        Err(err) => board.recover_from_corrupt(&err.to_string()),
                    },
                    Err(err) => board.set_aside_rejected(&cards, &err, now),
                }
            }
            Ok(None) if board.settings.seed_sample_cards => {
                let seeded = welcome_cards(now)
                    .into_iter()
                    .filter(|card| board.store.columns().contains(&card.column))
                    .collect();
                match board.store.replace_all(seeded) {
                    Ok(()) => {
                        info!(
                            "event=board_seed module=board status=ok cards={}",
                            board.store.len()
                        );
                        board.persist(now);
                    }
                    Err(err) => warn!("event=board_seed module=board status=error error={}", err),
                }
            }
            Ok(None) => info!("event=board_load module=board status=ok cards=0 first_run=true"),
            Err(err @ PersistError::Corrupt { .. }) => {
                if let Err(stash_err) = board.gateway.stash_unreadable_cards() {
                    warn!(
                        "event=board_load module=board status=error action=stash error={}",
                        stash_err
                    );
                }
                board.recover_from_corrupt(&err.to_string());
            }
            Err(err) => {
                error!("event=board_load module=board status=error error={}", err);
                board
                    .ui
                    .notify(&format!("Could not read saved board: {}", err), Severity::Error);
            }
        }

        match board.gateway.load_theme() {
            Ok(Some(theme)) if board.knows_theme(&theme) => board.theme = theme,
            Ok(Some(theme)) => warn!(
                "event=theme_load module=board status=error reason=unknown theme={}",
                theme
            ),
            Ok(None) => {}
            Err(err) => warn!("event=theme_load module=board status=error error={}", err),
        }

        board.reminders.sync(board.store.cards(), now);
        board.render();
        board.ui.history_changed(board.history.state());
        board.tick();
        board
    }

    /// Cancel every reminder timer and hide whatever is on screen.
    pub fn teardown(&mut self) {
        let shown: Vec<CardId> = self.reminders.shown().map(|r| r.card_id.clone()).collect();
        self.reminders.disarm_all();
        for card_id in shown {
            self.ui.hide_reminder(&card_id);
        }
        info!("event=board_teardown module=board status=ok");
    }

    /// Saved cards that decode but no longer fit the board (a column was
    /// removed from the config) go to the manual ring so the next save
    /// cannot lose them.
    fn set_aside_rejected(
        &mut self,
        cards: &[Card],
        reason: &ValidationError,
        now: DateTime<Utc>,
    ) {
        match self.gateway.set_aside(cards, now) {
            Ok(()) => {
                warn!(
                    "event=board_load module=board status=error reason=rejected action=set_aside cards={} detail={}",
                    cards.len(),
                    reason
                );
                self.ui.notify(
                    &format!(
                        "Saved board does not fit the current columns ({}); starting empty. The saved cards were kept as a manual backup.",
                        reason
                    ),
                    Severity::Warning,
                );
            }
            Err(err) => {
                error!(
                    "event=board_load module=board status=error reason=rejected action=set_aside error={}",
                    err
                );
                self.recover_from_corrupt(&reason.to_string());
            }
        }
    }

    fn recover_from_corrupt(&mut self, reason: &str) {
        warn!(
            "event=board_load module=board status=error reason=corrupt detail={}",
            reason
        );
        self.ui.notify(
            &format!("Saved board could not be read, starting empty: {}", reason),
            Severity::Warning,
        );
    }

    // Accessors

    pub fn cards(&self) -> &[Card] {
        self.store.cards()
    }

    pub fn card(&self, id: &str) -> Option<&Card> {
        self.store.get(id)
    }

    pub fn store(&self) -> &CardStore {
        &self.store
    }

    pub fn gateway(&self) -> &PersistenceGateway<S> {
        &self.gateway
    }

    pub fn gateway_mut(&mut self) -> &mut PersistenceGateway<S> {
        &mut self.gateway
    }

    pub fn reminders(&self) -> &ReminderScheduler {
        &self.reminders
    }

    pub fn ui(&self) -> &U {
        &self.ui
    }

    pub fn ui_mut(&mut self) -> &mut U {
        &mut self.ui
    }

    pub fn theme(&self) -> &str {
        &self.theme
    }

    pub fn settings(&self) -> &BoardSettings {
        &self.settings
    }

    pub fn history_state(&self) -> HistoryState {
        self.history.state()
    }

    pub fn undo_depth(&self) -> usize {
        self.history.undo_len()
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// The board as the UI draws it
    pub fn view(&self) -> BoardView<'_> {
        BoardView {
            cards: self.store.display_order(),
            counts: self.store.column_counts(),
            theme: &self.theme,
        }
    }

    pub fn search(&self, query: &str) -> Vec<&Card> {
        self.store.search(query)
    }

    // Card commands

    pub fn add_card(&mut self, draft: CardDraft) -> BoardResult<CardId> {
        let now = self.clock.now();
        let id = self.fresh_card_id(now);
        let mut card = Card::new(id.clone(), &draft.title, draft.column, now);
        card.description = draft.description.trim().to_string();
        card.priority = draft.priority;
        card.due_date = draft.due_date;
        card.reminder_lead_minutes = draft.reminder_lead_minutes;
        card.tags = normalize_tags(&draft.tags);
        for text in &draft.subtasks {
            let subtask_id = self.ids.next_id(now);
            card.subtasks.push(Subtask::new(subtask_id, text, now));
        }

        self.apply("card_add", move |store, _| {
            store.add(card)?;
            Ok(((), true))
        })?;
        Ok(id)
    }

    pub fn update_card(&mut self, id: &str, patch: CardPatch) -> BoardResult<()> {
        if patch.is_empty() {
            return self.require(id);
        }
        self.apply("card_update", |store, now| {
            store.update(id, &patch, now)?;
            Ok(((), true))
        })
    }

    /// Returns `false` when the card was already in `column`.
    pub fn move_card(&mut self, id: &str, column: Column) -> BoardResult<bool> {
        self.apply("card_move", |store, now| {
            let moved = store.move_to_column(id, column, now)?;
            Ok((moved, moved))
        })
    }

    pub fn delete_card(&mut self, id: &str) -> BoardResult<Outcome> {
        self.require(id)?;
        if !self.ui.confirm("Are you sure you want to delete this card?") {
            debug!("event=card_delete module=board status=ok declined=true card_id={}", id);
            return Ok(Outcome::Declined);
        }
        self.reminders.disarm(id);
        self.apply("card_delete", |store, _| {
            store.remove(id)?;
            Ok(((), true))
        })?;
        Ok(Outcome::Applied(()))
    }

    /// Delete every listed card that exists, as one undo step. Unknown ids
    /// are skipped; with nothing to delete no confirmation is asked.
    pub fn delete_cards(&mut self, ids: &[CardId]) -> BoardResult<Outcome<usize>> {
        let existing: Vec<CardId> = ids
            .iter()
            .filter(|id| self.store.contains(id))
            .cloned()
            .collect();
        if existing.is_empty() {
            return Ok(Outcome::Applied(0));
        }
        let prompt = format!(
            "Are you sure you want to delete {} cards?",
            existing.len()
        );
        if !self.ui.confirm(&prompt) {
            return Ok(Outcome::Declined);
        }
        for id in &existing {
            self.reminders.disarm(id);
        }
        let removed = self.apply("card_delete_many", |store, _| {
            let removed = store.remove_many(&existing).len();
            Ok((removed, removed > 0))
        })?;
        Ok(Outcome::Applied(removed))
    }

    /// Copy a card under a new id with ` (Copy)` appended to its title.
    pub fn duplicate_card(&mut self, id: &str) -> BoardResult<CardId> {
        let now = self.clock.now();
        let source = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| NotFoundError::Card(id.to_string()))?;
        let new_id = self.fresh_card_id(now);
        let copy = Card {
            id: new_id.clone(),
            title: format!("{} (Copy)", source.title),
            created_at: now,
            updated_at: now,
            ..source
        };

        self.apply("card_duplicate", move |store, _| {
            store.add(copy)?;
            Ok(((), true))
        })?;
        self.ui.notify("Card duplicated successfully!", Severity::Success);
        Ok(new_id)
    }

    pub fn add_subtask(&mut self, card_id: &str, text: &str) -> BoardResult<SubtaskId> {
        let now = self.clock.now();
        let subtask = Subtask::new(self.ids.next_id(now), text, now);
        let subtask_id = subtask.id.clone();
        self.apply("subtask_add", move |store, now| {
            store.add_subtask(card_id, subtask, now)?;
            Ok(((), true))
        })?;
        Ok(subtask_id)
    }

    /// Returns the subtask's new completion state.
    pub fn toggle_subtask(&mut self, card_id: &str, subtask_id: &str) -> BoardResult<bool> {
        self.apply("subtask_toggle", |store, now| {
            let completed = store.toggle_subtask(card_id, subtask_id, now)?;
            Ok((completed, true))
        })
    }

    pub fn remove_subtask(&mut self, card_id: &str, subtask_id: &str) -> BoardResult<()> {
        self.apply("subtask_remove", |store, now| {
            store.remove_subtask(card_id, subtask_id, now)?;
            Ok(((), true))
        })
    }

    pub fn add_tag(&mut self, card_id: &str, tag: &str) -> BoardResult<()> {
        self.apply("tag_add", |store, now| {
            store.add_tag(card_id, tag, now)?;
            Ok(((), true))
        })
    }

    /// Returns `false` when the card did not carry the tag.
    pub fn remove_tag(&mut self, card_id: &str, tag: &str) -> BoardResult<bool> {
        self.apply("tag_remove", |store, now| {
            let removed = store.remove_tag(card_id, tag, now)?;
            Ok((removed, removed))
        })
    }

    // History

    /// Returns `false` when there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let current = self.store.snapshot();
        match self.history.undo(current) {
            Some(previous) => self.swap_in("undo", previous),
            None => {
                debug!("event=undo module=board status=ok empty=true");
                false
            }
        }
    }

    /// Returns `false` when there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let current = self.store.snapshot();
        match self.history.redo(current) {
            Some(next) => self.swap_in("redo", next),
            None => {
                debug!("event=redo module=board status=ok empty=true");
                false
            }
        }
    }

    fn swap_in(&mut self, event: &str, cards: Vec<Card>) -> bool {
        if let Err(err) = self.store.replace_all(cards) {
            error!("event={} module=board status=error error={}", event, err);
            self.ui.notify(&err.to_string(), Severity::Error);
            return false;
        }
        info!(
            "event={} module=board status=ok cards={} undo={} redo={}",
            event,
            self.store.len(),
            self.history.undo_len(),
            self.history.redo_len()
        );
        self.commit(self.clock.now());
        true
    }

    // Backups

    pub fn manual_backup(&mut self) -> BoardResult<()> {
        let now = self.clock.now();
        self.gateway.manual_backup(self.store.cards(), now)?;
        info!(
            "event=backup_manual module=board status=ok cards={}",
            self.store.len()
        );
        self.ui.notify("Backup created successfully!", Severity::Success);
        Ok(())
    }

    pub fn backups(&self, ring: BackupRing) -> BoardResult<Vec<BackupSnapshot>> {
        Ok(self.gateway.backups(ring)?)
    }

    pub fn last_backup_time(&self) -> BoardResult<Option<DateTime<Utc>>> {
        Ok(self.gateway.last_backup_time()?)
    }

    /// Replace the board with a backup after confirmation. The restore is
    /// itself one undo step.
    pub fn restore_backup(
        &mut self,
        ring: BackupRing,
        selector: BackupSelector,
    ) -> BoardResult<Outcome> {
        let backup = self.gateway.backup(ring, selector)?;
        if let Err(err) = self.store.check_all(&backup.cards) {
            warn!(
                "event=backup_restore module=board status=error ring={:?} error={}",
                ring, err
            );
            return Err(err.into());
        }
        let prompt = format!(
            "Are you sure you want to restore from backup created on {}? This will replace all current data.",
            backup.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
        );
        if !self.ui.confirm(&prompt) {
            return Ok(Outcome::Declined);
        }

        let count = backup.cards.len();
        self.apply("backup_restore", move |store, _| {
            store.replace_all(backup.cards)?;
            Ok(((), true))
        })?;
        info!(
            "event=backup_restore module=board status=ok ring={:?} cards={}",
            ring, count
        );
        self.ui
            .notify("Data restored from backup successfully!", Severity::Success);
        Ok(Outcome::Applied(()))
    }

    // Export / import

    pub fn export_document(&self) -> ExportDocument {
        transfer::export(self.store.cards(), &self.theme, self.clock.now())
    }

    /// Hand the export document to the UI as a download; returns the file name.
    pub fn export(&mut self) -> BoardResult<String> {
        let now = self.clock.now();
        let json = transfer::to_json(&self.export_document())?;
        let file_name = transfer::export_file_name(now);
        if let Err(err) = self.ui.trigger_download(&file_name, &json) {
            warn!("event=export module=board status=error error={}", err);
            self.ui
                .notify(&format!("Export failed: {}", err), Severity::Error);
            return Err(BoardError::Storage(err.into()));
        }
        info!(
            "event=export module=board status=ok cards={} file={}",
            self.store.len(),
            file_name
        );
        self.ui.notify("Data exported successfully!", Severity::Success);
        Ok(file_name)
    }

    /// Ask the UI for a document and import it.
    pub fn import(&mut self) -> BoardResult<Outcome<usize>> {
        match self.ui.prompt_import() {
            Some(text) => self.import_text(&text),
            None => Ok(Outcome::Declined),
        }
    }

    /// Replace the whole board with the cards of an export document. A
    /// document that fails to parse or validate changes nothing.
    pub fn import_text(&mut self, text: &str) -> BoardResult<Outcome<usize>> {
        let document = match transfer::parse_import(text) {
            Ok(document) => document,
            Err(err) => {
                warn!("event=import module=board status=error error={}", err);
                self.ui.notify("Invalid file format", Severity::Error);
                return Err(err.into());
            }
        };

        if let Err(err) = self.store.check_all(&document.cards) {
            warn!("event=import module=board status=error error={}", err);
            self.ui.notify(&format!("Import rejected: {}", err), Severity::Error);
            return Err(err.into());
        }

        let count = document.cards.len();
        if !self.ui.confirm(&format!(
            "Import {} cards? This will replace all current data.",
            count
        )) {
            return Ok(Outcome::Declined);
        }

        let cards = document.cards;
        self.apply("import", move |store, _| {
            store.replace_all(cards)?;
            Ok(((), true))
        })?;

        if let Some(theme) = document.theme {
            if self.knows_theme(&theme) {
                self.apply_theme(theme);
            } else {
                warn!(
                    "event=import module=board status=ok reason=unknown_theme theme={}",
                    theme
                );
            }
        }

        self.ui.notify("Data imported successfully!", Severity::Success);
        Ok(Outcome::Applied(count))
    }

    // Themes

    pub fn set_theme(&mut self, name: &str) -> BoardResult<()> {
        let name = name.trim();
        if !self.knows_theme(name) {
            return Err(ValidationError::UnknownTheme(name.to_string()).into());
        }
        self.apply_theme(name.to_string());
        Ok(())
    }

    fn knows_theme(&self, name: &str) -> bool {
        self.settings.themes.iter().any(|t| t == name)
    }

    fn apply_theme(&mut self, theme: String) {
        if let Err(err) = self.gateway.save_theme(&theme) {
            warn!("event=theme_save module=board status=error error={}", err);
            self.ui
                .notify(&format!("Could not save theme: {}", err), Severity::Warning);
        }
        info!("event=theme_set module=board status=ok theme={}", theme);
        self.theme = theme;
        self.render();
    }

    // Reminders

    /// Advance reminder timers to the clock's current time.
    pub fn tick(&mut self) -> TickReport {
        let now = self.clock.now();
        let report = self.reminders.tick(self.store.cards(), now);
        for card_id in &report.expired {
            self.ui.hide_reminder(card_id);
        }
        for reminder in &report.fired {
            self.ui.show_reminder(reminder);
        }
        report
    }

    pub fn dismiss_reminder(&mut self, card_id: &str) -> bool {
        let dismissed = self.reminders.dismiss(card_id);
        if dismissed {
            self.ui.hide_reminder(card_id);
        }
        dismissed
    }

    // Plumbing

    /// Snapshot, mutate, and on a change record the snapshot and commit.
    /// The closure returns its value plus whether anything changed.
    fn apply<T, F>(&mut self, event: &str, op: F) -> BoardResult<T>
    where
        F: FnOnce(&mut CardStore, DateTime<Utc>) -> BoardResult<(T, bool)>,
    {
        let now = self.clock.now();
        let before = self.store.snapshot();
        match op(&mut self.store, now) {
            Ok((value, changed)) => {
                if changed {
                    self.history.record(before);
                    self.commit(now);
                }
                info!(
                    "event={} module=board status=ok changed={} cards={}",
                    event,
                    changed,
                    self.store.len()
                );
                Ok(value)
            }
            Err(err) => {
                warn!("event={} module=board status=error error={}", event, err);
                Err(err)
            }
        }
    }

    fn commit(&mut self, now: DateTime<Utc>) {
        self.persist(now);
        self.reminders.sync(self.store.cards(), now);
        self.render();
        self.ui.history_changed(self.history.state());
    }

    fn persist(&mut self, now: DateTime<Utc>) {
        if let Err(err) = self.gateway.save(self.store.cards(), now) {
            warn!("event=board_save module=board status=error error={}", err);
            self.ui.notify(
                &format!("Changes kept in memory but not saved: {}", err),
                Severity::Warning,
            );
        }
    }

    fn render(&mut self) {
        let view = BoardView {
            cards: self.store.display_order(),
            counts: self.store.column_counts(),
            theme: &self.theme,
        };
        self.ui.render(&view);
    }

    fn require(&self, id: &str) -> BoardResult<()> {
        if self.store.contains(id) {
            Ok(())
        } else {
            Err(NotFoundError::Card(id.to_string()).into())
        }
    }

    fn fresh_card_id(&mut self, now: DateTime<Utc>) -> CardId {
        loop {
            let id = self.ids.next_id(now);
            if !self.store.contains(&id) {
                return id;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use crate::reminders::Reminder;
    use crate::storage::MemoryStore;
    use crate::utils::ManualClock;
    use chrono::TimeZone;
    use std::io;

    #[derive(Default)]
    struct QuietUi {
        renders: usize,
        decline: bool,
    }

    impl BoardUi for QuietUi {
        fn render(&mut self, _view: &BoardView<'_>) {
            self.renders += 1;
        }
        fn notify(&mut self, _message: &str, _severity: Severity) {}
        fn confirm(&mut self, _prompt: &str) -> bool {
            !self.decline
        }
        fn prompt_import(&mut self) -> Option<String> {
            None
        }
        fn trigger_download(&mut self, _file_name: &str, _content: &str) -> io::Result<()> {
            Ok(())
        }
        fn show_reminder(&mut self, _reminder: &Reminder) {}
    }

    fn board() -> (Board<MemoryStore, QuietUi>, ManualClock) {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap());
        let settings = BoardSettings {
            seed_sample_cards: false,
            ..BoardSettings::default()
        };
        let board = Board::init(
            MemoryStore::new(),
            QuietUi::default(),
            Box::new(clock.clone()),
            settings,
        );
        (board, clock)
    }

    #[test]
    fn ids_stay_unique_within_one_millisecond() {
        let (mut board, _clock) = board();
        let a = board.add_card(CardDraft::new("A")).unwrap();
        let b = board.add_card(CardDraft::new("B")).unwrap();
        assert_ne!(a, b);
        assert_eq!(board.cards().len(), 2);
    }

    #[test]
    fn failed_mutation_records_no_history() {
        let (mut board, _clock) = board();
        assert!(board.add_card(CardDraft::new("   ")).is_err());
        assert_eq!(board.undo_depth(), 0);
        assert!(board.move_card("missing", Column::Done).is_err());
        assert_eq!(board.undo_depth(), 0);
    }

    #[test]
    fn moving_to_the_same_column_is_not_an_undo_step() {
        let (mut board, _clock) = board();
        let id = board.add_card(CardDraft::new("A")).unwrap();
        assert!(!board.move_card(&id, Column::Todo).unwrap());
        assert_eq!(board.undo_depth(), 1);
        assert!(board.move_card(&id, Column::Done).unwrap());
        assert_eq!(board.undo_depth(), 2);
    }

    #[test]
    fn duplicate_gets_fresh_id_and_timestamps() {
        let (mut board, clock) = board();
        let id = board
            .add_card(CardDraft::new("Report").priority(Priority::High))
            .unwrap();
        clock.advance(chrono::Duration::minutes(5));
        let copy_id = board.duplicate_card(&id).unwrap();

        let copy = board.card(&copy_id).unwrap();
        assert_eq!(copy.title, "Report (Copy)");
        assert_eq!(copy.priority, Priority::High);
        assert_eq!(copy.created_at, clock.now());
        assert_ne!(copy.created_at, board.card(&id).unwrap().created_at);
    }

    #[test]
    fn declined_delete_keeps_the_card() {
        let (mut board, _clock) = board();
        let id = board.add_card(CardDraft::new("A")).unwrap();
        board.ui_mut().decline = true;
        assert_eq!(board.delete_card(&id).unwrap(), Outcome::Declined);
        assert!(board.card(&id).is_some());
        assert_eq!(board.undo_depth(), 1);
    }

    #[test]
    fn unknown_theme_is_rejected() {
        let (mut board, _clock) = board();
        let err = board.set_theme("neon").unwrap_err();
        assert!(matches!(
            err,
            BoardError::Validation(ValidationError::UnknownTheme(_))
        ));
        board.set_theme("dark").unwrap();
        assert_eq!(board.theme(), "dark");
        assert_eq!(board.undo_depth(), 0);
    }
}
