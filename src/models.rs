use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;
use crate::utils::parse_date;

pub type CardId = String;
pub type SubtaskId = String;

/// Version tag written into backups and export documents
pub const FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    /// Sort rank used by the display order (higher first)
    pub fn rank(self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Medium => 2,
            Priority::High => 3,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::Low => "low",
            Priority::Medium => "medium",
            Priority::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "medium" => Ok(Priority::Medium),
            "high" => Ok(Priority::High),
            other => Err(format!("unknown priority '{}', expected low|medium|high", other)),
        }
    }
}

/// A lane on the board. The four built-in lanes have their own variants;
/// anything else is a custom key that must appear in the configured set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Column {
    Todo,
    Doing,
    Done,
    Review,
    Custom(String),
}

impl Column {
    pub fn as_str(&self) -> &str {
        match self {
            Column::Todo => "todo",
            Column::Doing => "doing",
            Column::Done => "done",
            Column::Review => "review",
            Column::Custom(key) => key.as_str(),
        }
    }

    /// The built-in column set, in board order
    pub fn defaults() -> Vec<Column> {
        vec![Column::Todo, Column::Doing, Column::Done, Column::Review]
    }
}

impl From<String> for Column {
    fn from(value: String) -> Self {
        match value.as_str() {
            "todo" => Column::Todo,
            "doing" => Column::Doing,
            "done" => Column::Done,
            "review" => Column::Review,
            _ => Column::Custom(value),
        }
    }
}

impl From<&str> for Column {
    fn from(value: &str) -> Self {
        Column::from(value.to_string())
    }
}

impl From<Column> for String {
    fn from(value: Column) -> Self {
        match value {
            Column::Custom(key) => key,
            other => other.as_str().to_string(),
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    pub id: SubtaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl Subtask {
    pub fn new(id: SubtaskId, text: &str, now: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.trim().to_string(),
            completed: false,
            created_at: now,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: CardId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub priority: Priority,
    pub column: Column,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_due_date"
    )]
    pub due_date: Option<NaiveDate>,
    // Older documents store this as `reminder`, often as a string
    #[serde(
        default,
        alias = "reminder",
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_minutes"
    )]
    pub reminder_lead_minutes: Option<u32>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub subtasks: Vec<Subtask>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Card {
    pub fn new(id: CardId, title: &str, column: Column, now: DateTime<Utc>) -> Self {
        Self {
            id,
            title: title.trim().to_string(),
            description: String::new(),
            priority: Priority::default(),
            column,
            due_date: None,
            reminder_lead_minutes: None,
            tags: Vec::new(),
            subtasks: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Stamp a visible change, keeping `updated_at >= created_at`
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = now.max(self.created_at);
    }

    /// Midnight UTC of the due date
    pub fn due_instant(&self) -> Option<DateTime<Utc>> {
        self.due_date
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| naive.and_utc())
    }

    /// Due instant minus the lead time; `None` unless both are set, or
    /// when the result falls outside the representable range.
    pub fn reminder_instant(&self) -> Option<DateTime<Utc>> {
        let due = self.due_instant()?;
        let lead = self.reminder_lead_minutes?;
        due.checked_sub_signed(Duration::try_minutes(i64::from(lead))?)
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.iter().any(|t| t == tag)
    }

    pub fn subtask_mut(&mut self, subtask_id: &str) -> Option<&mut Subtask> {
        self.subtasks.iter_mut().find(|s| s.id == subtask_id)
    }

    /// Completed / total subtasks
    pub fn progress(&self) -> (usize, usize) {
        let done = self.subtasks.iter().filter(|s| s.completed).count();
        (done, self.subtasks.len())
    }

    pub fn due_status(&self, today: NaiveDate) -> Option<DueStatus> {
        self.due_date.map(|due| DueStatus::of(due, today))
    }

    /// Check the invariants a stored card must satisfy (column membership
    /// is checked by the store, which knows the configured set).
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.title.trim().is_empty() {
            return Err(ValidationError::EmptyTitle);
        }
        for (i, tag) in self.tags.iter().enumerate() {
            if tag.trim().is_empty() {
                return Err(ValidationError::EmptyTag);
            }
            if self.tags[..i].contains(tag) {
                return Err(ValidationError::DuplicateTag(tag.clone()));
            }
        }
        for (i, subtask) in self.subtasks.iter().enumerate() {
            if subtask.text.trim().is_empty() {
                return Err(ValidationError::EmptySubtaskText);
            }
            if self.subtasks[..i].iter().any(|s| s.id == subtask.id) {
                return Err(ValidationError::DuplicateId(subtask.id.clone()));
            }
        }
        Ok(())
    }
}

/// User-authored input for a new card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardDraft {
    pub title: String,
    pub description: String,
    pub priority: Priority,
    pub column: Column,
    pub due_date: Option<NaiveDate>,
    pub reminder_lead_minutes: Option<u32>,
    pub tags: Vec<String>,
    pub subtasks: Vec<String>,
}

impl CardDraft {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: String::new(),
            priority: Priority::default(),
            column: Column::Todo,
            due_date: None,
            reminder_lead_minutes: None,
            tags: Vec::new(),
            subtasks: Vec::new(),
        }
    }

    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn column(mut self, column: Column) -> Self {
        self.column = column;
        self
    }

    pub fn due(mut self, date: NaiveDate, lead_minutes: Option<u32>) -> Self {
        self.due_date = Some(date);
        self.reminder_lead_minutes = lead_minutes;
        self
    }
}

/// Field edits for an existing card; `None` leaves a field untouched.
/// The doubly optional fields use `Some(None)` to clear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    pub column: Option<Column>,
    pub due_date: Option<Option<NaiveDate>>,
    pub reminder_lead_minutes: Option<Option<u32>>,
    pub tags: Option<Vec<String>>,
}

impl CardPatch {
    pub fn is_empty(&self) -> bool {
        *self == CardPatch::default()
    }
}

/// Trim tags, drop empties and keep the first occurrence of each
pub fn normalize_tags<I, S>(tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for tag in tags {
        let tag = tag.as_ref().trim();
        if !tag.is_empty() && !out.iter().any(|t| t == tag) {
            out.push(tag.to_string());
        }
    }
    out
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupSnapshot {
    pub cards: Vec<Card>,
    pub timestamp: DateTime<Utc>,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl BackupSnapshot {
    pub fn new(cards: &[Card], now: DateTime<Utc>) -> Self {
        Self {
            cards: cards.to_vec(),
            timestamp: now,
            version: FORMAT_VERSION.to_string(),
            description: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportDocument {
    pub cards: Vec<Card>,
    pub export_date: DateTime<Utc>,
    pub version: String,
    pub theme: String,
}

/// How a due date relates to today, for presentation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DueStatus {
    Overdue(i64),
    Today,
    Tomorrow,
    Upcoming(i64),
}

impl DueStatus {
    pub fn of(due: NaiveDate, today: NaiveDate) -> Self {
        let days = (due - today).num_days();
        match days {
            d if d < 0 => DueStatus::Overdue(-d),
            0 => DueStatus::Today,
            1 => DueStatus::Tomorrow,
            d => DueStatus::Upcoming(d),
        }
    }
}

impl fmt::Display for DueStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DueStatus::Overdue(days) => write!(f, "Overdue by {} days", days),
            DueStatus::Today => f.write_str("Due today"),
            DueStatus::Tomorrow => f.write_str("Due tomorrow"),
            DueStatus::Upcoming(days) => write!(f, "Due in {} days", days),
        }
    }
}

/// Mints card and subtask ids from the clock: `<millis>`, or
/// `<millis>-<n>` when several ids land in the same millisecond.
#[derive(Debug, Default)]
pub struct IdGenerator {
    last_millis: Option<i64>,
    seq: u32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, now: DateTime<Utc>) -> String {
        let millis = now.timestamp_millis();
        match self.last_millis {
            // Clock went backwards or stood still: stay on the last millisecond
            Some(last) if millis <= last => {
                self.seq += 1;
                format!("{}-{}", last, self.seq)
            }
            _ => {
                self.last_millis = Some(millis);
                self.seq = 0;
                millis.to_string()
            }
        }
    }
}

/// Cards shown on a brand new board
pub fn welcome_cards(now: DateTime<Utc>) -> Vec<Card> {
    let today = now.date_naive();

    let mut welcome = Card::new("welcome-1".to_string(), "Welcome to lanes!", Column::Todo, now);
    welcome.description =
        "This is your new Kanban board. Try the themes, tags and subtasks.".to_string();
    welcome.priority = Priority::High;
    welcome.due_date = Some(today + Duration::days(7));
    welcome.reminder_lead_minutes = Some(1440);
    welcome.tags = vec!["work".to_string(), "idea".to_string()];

    let mut features = Card::new("welcome-2".to_string(), "Try the new features", Column::Doing, now);
    features.description =
        "Move cards between columns, delete a few at once, then undo and redo.".to_string();
    features.priority = Priority::Medium;
    features.due_date = Some(today + Duration::days(2));
    features.reminder_lead_minutes = Some(60);
    features.tags = vec!["personal".to_string(), "urgent".to_string()];

    let mut themes = Card::new("welcome-3".to_string(), "Explore the themes", Column::Done, now);
    themes.description = "Switch between the light, dark and reading themes.".to_string();
    themes.priority = Priority::Low;
    themes.tags = vec!["idea".to_string()];

    vec![welcome, features, themes]
}

/// Parse a due date given as `YYYY-MM-DD` or as a full RFC 3339 timestamp
pub fn parse_due_date(value: &str) -> Result<NaiveDate, String> {
    let value = value.trim();
    if let Ok(date) = parse_date(value) {
        return Ok(date);
    }
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc).date_naive())
        .map_err(|_| format!("invalid due date '{}'", value))
}

fn lenient_due_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => parse_due_date(value)
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawMinutes {
    Number(u64),
    Text(String),
}

fn lenient_minutes<'de, D>(deserializer: D) -> Result<Option<u32>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawMinutes> = Option::deserialize(deserializer)?;
    match raw {
        None => Ok(None),
        Some(RawMinutes::Number(n)) => u32::try_from(n).map(Some).map_err(|_| {
            serde::de::Error::custom(format!("reminder lead time out of range: {}", n))
        }),
        Some(RawMinutes::Text(text)) => {
            let text = text.trim();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<u32>().map(Some).map_err(|_| {
                serde::de::Error::custom(format!("invalid reminder lead time '{}'", text))
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 10, h, m, 0).unwrap()
    }

    #[test]
    fn priority_rank_orders_high_first() {
        assert!(Priority::High.rank() > Priority::Medium.rank());
        assert!(Priority::Medium.rank() > Priority::Low.rank());
        assert_eq!("HIGH".parse::<Priority>().unwrap(), Priority::High);
        assert!("urgent".parse::<Priority>().is_err());
    }

    #[test]
    fn column_keys_map_to_builtin_variants() {
        assert_eq!(Column::from("review"), Column::Review);
        assert_eq!(Column::from("blocked"), Column::Custom("blocked".to_string()));
        assert_eq!(String::from(Column::Doing), "doing");
    }

    #[test]
    fn reminder_instant_subtracts_lead_from_midnight_utc() {
        let mut card = Card::new("1".into(), "Pay rent", Column::Todo, at(9, 0));
        assert_eq!(card.reminder_instant(), None);

        card.due_date = NaiveDate::from_ymd_opt(2026, 3, 12);
        assert_eq!(card.reminder_instant(), None);

        card.reminder_lead_minutes = Some(90);
        let expected = Utc.with_ymd_and_hms(2026, 3, 11, 22, 30, 0).unwrap();
        assert_eq!(card.reminder_instant(), Some(expected));
    }

    #[test]
    fn reminder_instant_before_the_earliest_date_is_none() {
        let mut card = Card::new("1".into(), "Ancient", Column::Todo, at(9, 0));
        card.due_date = Some(NaiveDate::MIN);
        card.reminder_lead_minutes = Some(u32::MAX);
        assert!(card.due_instant().is_some());
        assert_eq!(card.reminder_instant(), None);
        assert_eq!(card.reminder_lead_minutes, Some(u32::MAX));
    }

    #[test]
    fn touch_never_goes_before_creation() {
        let mut card = Card::new("1".into(), "A", Column::Todo, at(10, 0));
        card.touch(at(9, 0));
        assert_eq!(card.updated_at, card.created_at);
        card.touch(at(11, 0));
        assert_eq!(card.updated_at, at(11, 0));
    }

    #[test]
    fn validate_rejects_blank_title_and_duplicate_tags() {
        let mut card = Card::new("1".into(), "   ", Column::Todo, at(10, 0));
        assert_eq!(card.validate(), Err(ValidationError::EmptyTitle));

        card.title = "ok".into();
        card.tags = vec!["a".into(), "a".into()];
        assert_eq!(card.validate(), Err(ValidationError::DuplicateTag("a".into())));
    }

    #[test]
    fn id_generator_disambiguates_same_millisecond() {
        let mut ids = IdGenerator::new();
        let now = at(10, 0);
        let first = ids.next_id(now);
        let second = ids.next_id(now);
        let third = ids.next_id(now + Duration::milliseconds(1));
        assert_eq!(first, now.timestamp_millis().to_string());
        assert_eq!(second, format!("{}-1", first));
        assert_ne!(third, first);
        assert_ne!(third, second);
    }

    #[test]
    fn legacy_card_fields_are_accepted() {
        let json = r#"{
            "id": "1700000000000",
            "title": "Legacy",
            "priority": "high",
            "column": "doing",
            "dueDate": "",
            "reminder": "",
            "createdAt": "2024-01-01T10:00:00.000Z",
            "updatedAt": "2024-01-01T10:00:00.000Z"
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.due_date, None);
        assert_eq!(card.reminder_lead_minutes, None);
        assert!(card.tags.is_empty());
        assert!(card.subtasks.is_empty());

        let json = r#"{
            "id": "2", "title": "Dated", "column": "todo",
            "dueDate": "2024-02-01", "reminder": "60",
            "createdAt": "2024-01-01T10:00:00Z", "updatedAt": "2024-01-01T10:00:00Z"
        }"#;
        let card: Card = serde_json::from_str(json).unwrap();
        assert_eq!(card.due_date, NaiveDate::from_ymd_opt(2024, 2, 1));
        assert_eq!(card.reminder_lead_minutes, Some(60));
        assert_eq!(card.priority, Priority::Medium);
    }

    #[test]
    fn negative_reminder_is_rejected() {
        let json = r#"{
            "id": "3", "title": "Bad", "column": "todo", "reminderLeadMinutes": -5,
            "createdAt": "2024-01-01T10:00:00Z", "updatedAt": "2024-01-01T10:00:00Z"
        }"#;
        assert!(serde_json::from_str::<Card>(json).is_err());
    }

    #[test]
    fn due_status_labels() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 10).unwrap();
        let day = |d: u32| NaiveDate::from_ymd_opt(2026, 3, d).unwrap();
        assert_eq!(DueStatus::of(day(8), today), DueStatus::Overdue(2));
        assert_eq!(DueStatus::of(day(10), today), DueStatus::Today);
        assert_eq!(DueStatus::of(day(11), today), DueStatus::Tomorrow);
        assert_eq!(DueStatus::of(day(15), today).to_string(), "Due in 5 days");
    }

    #[test]
    fn normalize_tags_trims_and_dedupes() {
        assert_eq!(normalize_tags([" work", "", "work", "idea"]), vec!["work", "idea"]);
    }
}
