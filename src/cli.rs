use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use log::{debug, warn};
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;

use crate::board::{Board, Outcome};
use crate::error::BoardError;
use crate::history::HistoryState;
use crate::models::{
    normalize_tags, parse_due_date, BackupSnapshot, Card, CardDraft, CardPatch, Column, Priority,
};
use crate::persistence::{BackupRing, BackupSelector};
use crate::reminders::Reminder;
use crate::storage::KeyValueStore;
use crate::ui::{BoardUi, BoardView, Severity};

/// How long the shell waits for input before advancing reminder timers
const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "lanes")]
#[command(about = "lanes - A local Kanban board with undo, backups and reminders")]
#[command(version)]
pub struct Cli {
    /// Custom config file path
    #[arg(short, long)]
    pub config: Option<String>,

    /// Use development mode (uses separate dev config/database)
    #[arg(long)]
    pub dev: bool,

    /// Answer yes to every confirmation prompt
    #[arg(short, long)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Interactive session with live undo/redo and reminders (default)
    Shell,
    /// Stay in the foreground and show reminders as they come due
    Watch,
    /// Add a new card
    Add {
        /// Card title
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// low, medium or high
        #[arg(short, long, default_value = "medium")]
        priority: String,
        #[arg(long, default_value = "todo")]
        column: String,
        /// Due date (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// Minutes before the due date to show a reminder
        #[arg(long, requires = "due")]
        remind: Option<u32>,
        /// Comma-separated tags
        #[arg(long)]
        tags: Option<String>,
        /// Subtask text (repeatable)
        #[arg(long = "subtask")]
        subtasks: Vec<String>,
    },
    /// Edit fields of an existing card
    Edit {
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        #[arg(short, long)]
        priority: Option<String>,
        /// Due date (YYYY-MM-DD); an empty value clears it
        #[arg(long)]
        due: Option<String>,
        #[arg(long, conflicts_with = "no_remind")]
        remind: Option<u32>,
        /// Remove the reminder
        #[arg(long)]
        no_remind: bool,
        /// Comma-separated tags, replacing the current ones
        #[arg(long)]
        tags: Option<String>,
    },
    /// Move a card to another column
    Move { id: String, column: String },
    /// Delete one or more cards
    Delete {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Copy a card
    Duplicate { id: String },
    /// Add or remove a tag
    Tag {
        #[command(subcommand)]
        action: TagAction,
    },
    /// Add, toggle or remove a subtask
    Subtask {
        #[command(subcommand)]
        action: SubtaskAction,
    },
    /// Show the board
    List {
        /// Only cards whose title or description contains this text
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Save a manual backup
    Backup,
    /// List backups
    Backups {
        /// Show manual backups instead of automatic ones
        #[arg(long)]
        manual: bool,
    },
    /// Replace the board with a backup (latest if no index is given)
    Restore {
        #[arg(long)]
        manual: bool,
        index: Option<usize>,
    },
    /// Write the board to a JSON file
    Export {
        #[arg(short, long)]
        output: Option<String>,
    },
    /// Replace the board with the cards of an exported JSON file
    Import { file: String },
    /// Show or change the theme
    Theme { name: Option<String> },
}

#[derive(Debug, Subcommand)]
pub enum TagAction {
    Add { id: String, tag: String },
    Remove { id: String, tag: String },
}

#[derive(Debug, Subcommand)]
pub enum SubtaskAction {
    Add { id: String, text: String },
    Toggle { id: String, subtask_id: String },
    Remove { id: String, subtask_id: String },
}

/// One line typed into the shell
#[derive(Parser)]
#[command(name = "lanes", no_binary_name = true, disable_version_flag = true)]
struct ShellLine {
    #[command(subcommand)]
    command: ShellCommand,
}

#[derive(Debug, Subcommand)]
enum ShellCommand {
    /// Undo the last change
    Undo,
    /// Redo the last undone change
    Redo,
    /// Hide a reminder
    Dismiss { id: String },
    /// Leave the shell
    #[command(alias = "exit")]
    Quit,
    #[command(flatten)]
    Board(Commands),
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Board(#[from] BoardError),
    #[error("Failed to parse date: {0}")]
    DateParseError(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

enum Input {
    Line(String),
    Idle,
    Closed,
}

/// Terminal front end: prints to stdout/stderr, reads confirmations from
/// stdin (or from the shell's input channel once one is attached).
#[derive(Default)]
pub struct TerminalUi {
    assume_yes: bool,
    show_board: bool,
    import_path: Option<PathBuf>,
    export_path: Option<PathBuf>,
    input: Option<Receiver<String>>,
}

impl TerminalUi {
    pub fn new(assume_yes: bool) -> Self {
        Self {
            assume_yes,
            ..Self::default()
        }
    }

    fn next_line(&mut self, timeout: Duration) -> Input {
        let Some(input) = &self.input else {
            return Input::Closed;
        };
        match input.recv_timeout(timeout) {
            Ok(line) => Input::Line(line),
            Err(RecvTimeoutError::Timeout) => Input::Idle,
            Err(RecvTimeoutError::Disconnected) => Input::Closed,
        }
    }

    fn read_answer(&mut self) -> Option<String> {
        match &self.input {
            Some(input) => input.recv().ok(),
            None => {
                let mut answer = String::new();
                match io::stdin().read_line(&mut answer) {
                    Ok(0) | Err(_) => None,
                    Ok(_) => Some(answer),
                }
            }
        }
    }
}

impl BoardUi for TerminalUi {
    fn render(&mut self, view: &BoardView<'_>) {
        if self.show_board {
            print!("{}", format_board(view, chrono::Utc::now().date_naive()));
        }
    }

    fn notify(&mut self, message: &str, severity: Severity) {
        match severity {
            Severity::Info | Severity::Success => println!("{}", message),
            Severity::Warning => eprintln!("Warning: {}", message),
            Severity::Error => eprintln!("Error: {}", message),
        }
    }

    fn confirm(&mut self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        print!("{} [y/N] ", prompt);
        let _ = io::stdout().flush();
        self.read_answer()
            .map(|answer| matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes"))
            .unwrap_or(false)
    }

    fn prompt_import(&mut self) -> Option<String> {
        let path = self.import_path.take()?;
        match fs::read_to_string(&path) {
            Ok(content) => Some(content),
            Err(err) => {
                warn!(
                    "event=import_read module=cli status=error path={} error={}",
                    path.display(),
                    err
                );
                eprintln!("Error reading file: {}", err);
                None
            }
        }
    }

    fn trigger_download(&mut self, file_name: &str, content: &str) -> io::Result<()> {
        let path = self
            .export_path
            .take()
            .unwrap_or_else(|| PathBuf::from(file_name));
        fs::write(&path, content)?;
        println!("Wrote {}", path.display());
        Ok(())
    }

    fn show_reminder(&mut self, reminder: &Reminder) {
        let due = reminder
            .due_date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_default();
        println!("\n⏰ Reminder: \"{}\" is due {}", reminder.title, due);
    }

    fn hide_reminder(&mut self, card_id: &str) {
        debug!("event=reminder_hidden module=cli status=ok card_id={}", card_id);
    }

    fn history_changed(&mut self, state: HistoryState) {
        if self.show_board {
            let mark = |on: bool| if on { "on" } else { "off" };
            println!("undo: {}  redo: {}", mark(state.can_undo), mark(state.can_redo));
        }
    }
}

/// Run a single command against the board
pub fn execute<S: KeyValueStore>(
    board: &mut Board<S, TerminalUi>,
    command: Commands,
) -> Result<(), CliError> {
    match command {
        Commands::Shell => run_shell(board)?,
        Commands::Watch => run_watch(board),
        Commands::Add {
            title,
            description,
            priority,
            column,
            due,
            remind,
            tags,
            subtasks,
        } => {
            let mut draft = CardDraft::new(title)
                .priority(parse_priority(&priority)?)
                .column(Column::from(column.trim()));
            if let Some(description) = description {
                draft.description = description;
            }
            if let Some(due) = due {
                draft = draft.due(parse_due(&due)?, remind);
            }
            if let Some(tags) = tags {
                draft.tags = split_tags(&tags);
            }
            draft.subtasks = subtasks;
            let id = board.add_card(draft)?;
            println!("Card created successfully (ID: {})", id);
        }
        Commands::Edit {
            id,
            title,
            description,
            priority,
            due,
            remind,
            no_remind,
            tags,
        } => {
            let patch = CardPatch {
                title,
                description,
                priority: priority.as_deref().map(parse_priority).transpose()?,
                column: None,
                due_date: match due.as_deref().map(str::trim) {
                    None => None,
                    Some("") => Some(None),
                    Some(value) => Some(Some(parse_due(value)?)),
                },
                reminder_lead_minutes: if no_remind {
                    Some(None)
                } else {
                    remind.map(Some)
                },
                tags: tags.as_deref().map(split_tags),
            };
            board.update_card(&id, patch)?;
            println!("Card {} updated", id);
        }
        Commands::Move { id, column } => {
            let column = Column::from(column.trim());
            if board.move_card(&id, column.clone())? {
                println!("Card {} moved to {}", id, column);
            } else {
                println!("Card {} is already in {}", id, column);
            }
        }
        Commands::Delete { ids } => {
            let outcome = if let [id] = ids.as_slice() {
                board.delete_card(id)?.is_applied().then_some(1)
            } else {
                match board.delete_cards(&ids)? {
                    Outcome::Applied(count) => Some(count),
                    Outcome::Declined => None,
                }
            };
            match outcome {
                Some(count) => println!("Deleted {} card(s)", count),
                None => println!("Cancelled"),
            }
        }
        Commands::Duplicate { id } => {
            let copy = board.duplicate_card(&id)?;
            println!("New card ID: {}", copy);
        }
        Commands::Tag { action } => match action {
            TagAction::Add { id, tag } => {
                board.add_tag(&id, &tag)?;
                println!("Tagged {} with #{}", id, tag.trim());
            }
            TagAction::Remove { id, tag } => {
                if !board.remove_tag(&id, &tag)? {
                    println!("Card {} has no tag #{}", id, tag.trim());
                }
            }
        },
        Commands::Subtask { action } => match action {
            SubtaskAction::Add { id, text } => {
                let subtask_id = board.add_subtask(&id, &text)?;
                println!("Subtask created (ID: {})", subtask_id);
            }
            SubtaskAction::Toggle { id, subtask_id } => {
                let done = board.toggle_subtask(&id, &subtask_id)?;
                println!("Subtask {} {}", subtask_id, if done { "done" } else { "open" });
            }
            SubtaskAction::Remove { id, subtask_id } => {
                board.remove_subtask(&id, &subtask_id)?;
            }
        },
        Commands::List { search } => {
            let today = board.now().date_naive();
            match search {
                Some(query) => {
                    for card in board.search(&query) {
                        println!("{}", format_card(card, today));
                    }
                }
                None => print!("{}", format_board(&board.view(), today)),
            }
        }
        Commands::Backup => board.manual_backup()?,
        Commands::Backups { manual } => {
            let backups = board.backups(ring(manual))?;
            if backups.is_empty() {
                println!("No backups available");
            }
            for (index, backup) in backups.iter().enumerate() {
                println!("{}", format_backup(index, backup));
            }
            if let Some(last) = board.last_backup_time()? {
                println!("Last backup: {}", last.format("%Y-%m-%d %H:%M:%S UTC"));
            }
        }
        Commands::Restore { manual, index } => {
            let selector = index.map_or(BackupSelector::Latest, BackupSelector::Index);
            if let Outcome::Declined = board.restore_backup(ring(manual), selector)? {
                println!("Cancelled");
            }
        }
        Commands::Export { output } => {
            board.ui_mut().export_path = output.map(PathBuf::from);
            board.export()?;
        }
        Commands::Import { file } => {
            board.ui_mut().import_path = Some(PathBuf::from(file));
            match board.import()? {
                Outcome::Applied(count) => println!("Imported {} cards", count),
                Outcome::Declined => println!("Cancelled"),
            }
        }
        Commands::Theme { name } => match name {
            Some(name) => {
                board.set_theme(&name)?;
                println!("Theme set to {}", board.theme());
            }
            None => {
                for theme in &board.settings().themes {
                    let marker = if theme == board.theme() { "*" } else { " " };
                    println!("{} {}", marker, theme);
                }
            }
        },
    }
    Ok(())
}

/// Interactive loop. Stdin is read on its own thread so reminder timers
/// keep ticking while the prompt waits.
pub fn run_shell<S: KeyValueStore>(board: &mut Board<S, TerminalUi>) -> Result<(), CliError> {
    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        for line in io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if tx.send(line).is_err() {
                break;
            }
        }
    });

    board.ui_mut().input = Some(rx);
    board.ui_mut().show_board = true;
    let today = board.now().date_naive();
    print!("{}", format_board(&board.view(), today));
    println!("Type `help` for commands, `quit` to leave.");
    prompt()?;

    loop {
        match board.ui_mut().next_line(TICK_INTERVAL) {
            Input::Line(line) => {
                if line.trim().is_empty() {
                    prompt()?;
                    continue;
                }
                match run_shell_line(board, &line) {
                    Ok(true) => break,
                    Ok(false) => {}
                    Err(err) => eprintln!("Error: {}", err),
                }
                board.tick();
                prompt()?;
            }
            Input::Idle => {
                board.tick();
            }
            Input::Closed => break,
        }
    }

    board.ui_mut().input = None;
    board.ui_mut().show_board = false;
    Ok(())
}

/// Returns `true` when the user asked to leave.
fn run_shell_line<S: KeyValueStore>(
    board: &mut Board<S, TerminalUi>,
    line: &str,
) -> Result<bool, CliError> {
    let tokens = split_line(line)?;
    let parsed = match ShellLine::try_parse_from(tokens) {
        Ok(parsed) => parsed,
        Err(err) => {
            // Help output also arrives here
            println!("{}", err);
            return Ok(false);
        }
    };

    match parsed.command {
        ShellCommand::Quit => return Ok(true),
        ShellCommand::Undo => {
            if !board.undo() {
                println!("Nothing to undo");
            }
        }
        ShellCommand::Redo => {
            if !board.redo() {
                println!("Nothing to redo");
            }
        }
        ShellCommand::Dismiss { id } => {
            board.dismiss_reminder(&id);
        }
        ShellCommand::Board(Commands::Shell) => println!("Already in the shell"),
        ShellCommand::Board(Commands::Watch) => println!("The shell already shows reminders"),
        ShellCommand::Board(command) => execute(board, command)?,
    }
    Ok(false)
}

/// Tick reminders once a second until the process is stopped.
pub fn run_watch<S: KeyValueStore>(board: &mut Board<S, TerminalUi>) {
    println!(
        "Watching {} card(s) for reminders. Press Ctrl+C to stop.",
        board.cards().len()
    );
    loop {
        board.tick();
        thread::sleep(TICK_INTERVAL);
    }
}

fn prompt() -> io::Result<()> {
    print!("lanes> ");
    io::stdout().flush()
}

fn ring(manual: bool) -> BackupRing {
    if manual {
        BackupRing::Manual
    } else {
        BackupRing::Auto
    }
}

fn parse_priority(value: &str) -> Result<Priority, CliError> {
    value.parse().map_err(CliError::InvalidArgument)
}

fn parse_due(value: &str) -> Result<NaiveDate, CliError> {
    parse_due_date(value).map_err(CliError::DateParseError)
}

fn split_tags(value: &str) -> Vec<String> {
    normalize_tags(value.split(','))
}

/// Split a shell line into words. Single or double quotes group words.
fn split_line(line: &str) -> Result<Vec<String>, CliError> {
    let mut words = Vec::new();
    let mut current = String::new();
    let mut in_word = false;
    let mut quote: Option<char> = None;

    for ch in line.chars() {
        match quote {
            Some(q) if ch == q => quote = None,
            Some(_) => current.push(ch),
            None if ch == '"' || ch == '\'' => {
                quote = Some(ch);
                in_word = true;
            }
            None if ch.is_whitespace() => {
                if in_word {
                    words.push(std::mem::take(&mut current));
                    in_word = false;
                }
            }
            None => {
                current.push(ch);
                in_word = true;
            }
        }
    }

    if quote.is_some() {
        return Err(CliError::InvalidArgument("unterminated quote".to_string()));
    }
    if in_word {
        words.push(current);
    }
    Ok(words)
}

fn priority_marker(priority: Priority) -> &'static str {
    match priority {
        Priority::High => "!!!",
        Priority::Medium => "!! ",
        Priority::Low => "!  ",
    }
}

/// One card as a single line
pub fn format_card(card: &Card, today: NaiveDate) -> String {
    let mut line = format!(
        "  [{}] {} {}",
        card.id,
        priority_marker(card.priority),
        card.title
    );
    for tag in &card.tags {
        line.push_str(&format!(" #{}", tag));
    }
    let (done, total) = card.progress();
    if total > 0 {
        line.push_str(&format!(" ({}/{})", done, total));
    }
    if let Some(status) = card.due_status(today) {
        line.push_str(&format!(" - {}", status));
    }
    line
}

/// The whole board, one section per column
pub fn format_board(view: &BoardView<'_>, today: NaiveDate) -> String {
    let mut out = String::new();
    for (column, count) in &view.counts {
        out.push_str(&format!("{} ({})\n", column.as_str().to_uppercase(), count));
        for card in view.column(column) {
            out.push_str(&format_card(card, today));
            out.push('\n');
        }
    }
    out
}

fn format_backup(index: usize, backup: &BackupSnapshot) -> String {
    format!(
        "[{}] {}  {} cards{}",
        index,
        backup.timestamp.format("%Y-%m-%d %H:%M:%S UTC"),
        backup.cards.len(),
        backup
            .description
            .as_deref()
            .map(|d| format!("  ({})", d))
            .unwrap_or_default()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    #[test]
    fn split_line_honors_quotes() {
        let words = split_line(r#"add "Write report" --tags 'work,q3'"#).unwrap();
        assert_eq!(words, vec!["add", "Write report", "--tags", "work,q3"]);
        assert_eq!(split_line("  undo  ").unwrap(), vec!["undo"]);
        assert_eq!(split_line(r#"edit 1 --due """#).unwrap(), vec!["edit", "1", "--due", ""]);
        assert!(split_line("add \"open").is_err());
    }

    #[test]
    fn shell_line_accepts_board_and_shell_commands() {
        let parsed = ShellLine::try_parse_from(["undo"]).unwrap();
        assert!(matches!(parsed.command, ShellCommand::Undo));

        let parsed = ShellLine::try_parse_from(["move", "42", "done"]).unwrap();
        assert!(matches!(
            parsed.command,
            ShellCommand::Board(Commands::Move { ref id, ref column }) if id == "42" && column == "done"
        ));

        let parsed = ShellLine::try_parse_from(["exit"]).unwrap();
        assert!(matches!(parsed.command, ShellCommand::Quit));
    }

    #[test]
    fn cli_parses_global_flags() {
        let cli = Cli::try_parse_from(["lanes", "--dev", "-y", "delete", "1", "2"]).unwrap();
        assert!(cli.dev);
        assert!(cli.yes);
        assert!(matches!(cli.command, Some(Commands::Delete { ref ids }) if ids.len() == 2));

        let cli = Cli::try_parse_from(["lanes"]).unwrap();
        assert!(cli.command.is_none());
    }

    #[test]
    fn remind_requires_a_due_date() {
        assert!(Cli::try_parse_from(["lanes", "add", "A", "--remind", "30"]).is_err());
        assert!(Cli::try_parse_from(["lanes", "add", "A", "--due", "2026-01-02", "--remind", "30"]).is_ok());
    }

    #[test]
    fn card_line_shows_tags_progress_and_due_status() {
        let now = Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap();
        let mut card = Card::new("7".to_string(), "Plan trip", Column::Todo, now);
        card.priority = Priority::High;
        card.tags = vec!["personal".to_string()];
        card.due_date = Some(NaiveDate::from_ymd_opt(2026, 5, 2).unwrap());
        card.subtasks.push(crate::models::Subtask::new("s1".to_string(), "Book hotel", now));

        let line = format_card(&card, now.date_naive());
        assert_eq!(line, "  [7] !!! Plan trip #personal (0/1) - Due tomorrow");
    }

    #[test]
    fn split_tags_trims_and_dedupes() {
        assert_eq!(split_tags("work, urgent,,work"), vec!["work", "urgent"]);
    }
}
