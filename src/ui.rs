//! Presentation seam.
//!
//! The board never draws anything itself. It calls into a [`BoardUi`] after
//! every change and asks it for confirmations and file contents.

use std::io;

use crate::history::HistoryState;
use crate::models::{Card, Column};
use crate::reminders::Reminder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

/// What the UI needs to draw the board
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardView<'a> {
    /// Priority order (high first, stable)
    pub cards: Vec<&'a Card>,
    /// Card count per configured column, in column order
    pub counts: Vec<(Column, usize)>,
    pub theme: &'a str,
}

impl<'a> BoardView<'a> {
    pub fn column(&self, column: &Column) -> impl Iterator<Item = &&'a Card> {
        self.cards.iter().filter(move |c| &c.column == column)
    }
}

pub trait BoardUi {
    fn render(&mut self, view: &BoardView<'_>);

    fn notify(&mut self, message: &str, severity: Severity);

    /// Yes/no gate for destructive commands. `false` cancels.
    fn confirm(&mut self, prompt: &str) -> bool;

    /// Content of the document to import, or `None` if the user cancelled.
    fn prompt_import(&mut self) -> Option<String>;

    fn trigger_download(&mut self, file_name: &str, content: &str) -> io::Result<()>;

    fn show_reminder(&mut self, reminder: &Reminder);

    fn hide_reminder(&mut self, _card_id: &str) {}

    fn history_changed(&mut self, _state: HistoryState) {}
}
