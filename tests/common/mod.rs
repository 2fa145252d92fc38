#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use lanes::history::HistoryState;
use lanes::reminders::Reminder;
use lanes::{Board, BoardSettings, BoardUi, BoardView, ManualClock, MemoryStore, Severity};
use std::io;

/// UI that answers prompts from canned values and keeps what it was shown
#[derive(Debug)]
pub struct RecordingUi {
    pub confirm_answer: bool,
    pub import_content: Option<String>,
    pub prompts: Vec<String>,
    pub notifications: Vec<(String, Severity)>,
    pub renders: usize,
    pub last_order: Vec<String>,
    pub downloads: Vec<(String, String)>,
    pub reminders: Vec<Reminder>,
    pub hidden: Vec<String>,
    pub history: Vec<HistoryState>,
}

impl Default for RecordingUi {
    fn default() -> Self {
        Self {
            confirm_answer: true,
            import_content: None,
            prompts: Vec::new(),
            notifications: Vec::new(),
            renders: 0,
            last_order: Vec::new(),
            downloads: Vec::new(),
            reminders: Vec::new(),
            hidden: Vec::new(),
            history: Vec::new(),
        }
    }
}

impl RecordingUi {
    pub fn warnings(&self) -> usize {
        self.notifications
            .iter()
            .filter(|(_, severity)| *severity == Severity::Warning)
            .count()
    }
}

impl BoardUi for RecordingUi {
    fn render(&mut self, view: &BoardView<'_>) {
        self.renders += 1;
        self.last_order = view.cards.iter().map(|c| c.title.clone()).collect();
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        self.notifications.push((message.to_string(), severity));
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        self.prompts.push(prompt.to_string());
        self.confirm_answer
    }

    fn prompt_import(&mut self) -> Option<String> {
        self.import_content.take()
    }

    fn trigger_download(&mut self, file_name: &str, content: &str) -> io::Result<()> {
        self.downloads
            .push((file_name.to_string(), content.to_string()));
        Ok(())
    }

    fn show_reminder(&mut self, reminder: &Reminder) {
        self.reminders.push(reminder.clone());
    }

    fn hide_reminder(&mut self, card_id: &str) {
        self.hidden.push(card_id.to_string());
    }

    fn history_changed(&mut self, state: HistoryState) {
        self.history.push(state);
    }
}

pub type TestBoard = Board<MemoryStore, RecordingUi>;

pub fn start() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 4, 14, 9, 0, 0).unwrap()
}

pub fn settings() -> BoardSettings {
    BoardSettings {
        seed_sample_cards: false,
        ..BoardSettings::default()
    }
}

/// Empty board on a fresh in-memory store
pub fn board() -> (TestBoard, ManualClock) {
    board_with(MemoryStore::new(), settings())
}

pub fn board_with(store: MemoryStore, settings: BoardSettings) -> (TestBoard, ManualClock) {
    let clock = ManualClock::new(start());
    let board = Board::init(
        store,
        RecordingUi::default(),
        Box::new(clock.clone()),
        settings,
    );
    (board, clock)
}
