//! In-memory card collection.
//!
//! Every mutation either applies completely or returns an error with the
//! collection untouched. Stored order is insertion order; the priority
//! order shown on the board is computed by [`CardStore::display_order`].

use chrono::{DateTime, Utc};

use crate::error::{BoardError, NotFoundError, ValidationError};
use crate::models::{normalize_tags, Card, CardId, CardPatch, Column, Subtask};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardStore {
    cards: Vec<Card>,
    columns: Vec<Column>,
}

impl CardStore {
    pub fn new(columns: Vec<Column>) -> Self {
        Self {
            cards: Vec::new(),
            columns,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Card> {
        self.cards.iter().find(|c| c.id == id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Value copy of the whole collection
    pub fn snapshot(&self) -> Vec<Card> {
        self.cards.clone()
    }

    fn card_mut(&mut self, id: &str) -> Result<&mut Card, NotFoundError> {
        self.cards
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| NotFoundError::Card(id.to_string()))
    }

    fn check_column(&self, column: &Column) -> Result<(), ValidationError> {
        if self.columns.contains(column) {
            Ok(())
        } else {
            Err(ValidationError::UnknownColumn(column.to_string()))
        }
    }

    fn check_card(&self, card: &Card) -> Result<(), ValidationError> {
        card.validate()?;
        self.check_column(&card.column)
    }

    pub fn add(&mut self, card: Card) -> Result<(), BoardError> {
        self.check_card(&card)?;
        if self.contains(&card.id) {
            return Err(ValidationError::DuplicateId(card.id).into());
        }
        self.cards.push(card);
        Ok(())
    }

    /// Apply field edits. The patch is applied to a copy and only written
    /// back once the result validates.
    pub fn update(&mut self, id: &str, patch: &CardPatch, now: DateTime<Utc>) -> Result<(), BoardError> {
        let current = self
            .get(id)
            .ok_or_else(|| NotFoundError::Card(id.to_string()))?;
        let mut edited = current.clone();

        if let Some(title) = &patch.title {
            edited.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            edited.description = description.trim().to_string();
        }
        if let Some(priority) = patch.priority {
            edited.priority = priority;
        }
        if let Some(column) = &patch.column {
            edited.column = column.clone();
        }
        if let Some(due_date) = patch.due_date {
            edited.due_date = due_date;
        }
        if let Some(lead) = patch.reminder_lead_minutes {
            edited.reminder_lead_minutes = lead;
        }
        if let Some(tags) = &patch.tags {
            edited.tags = normalize_tags(tags);
        }

        self.check_card(&edited)?;
        edited.touch(now);
        *self.card_mut(id)? = edited;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Card, NotFoundError> {
        let index = self
            .cards
            .iter()
            .position(|c| c.id == id)
            .ok_or_else(|| NotFoundError::Card(id.to_string()))?;
        Ok(self.cards.remove(index))
    }

    /// Remove every listed card that exists; unknown ids are skipped.
    pub fn remove_many(&mut self, ids: &[CardId]) -> Vec<Card> {
        let (removed, kept): (Vec<Card>, Vec<Card>) = std::mem::take(&mut self.cards)
            .into_iter()
            .partition(|c| ids.contains(&c.id));
        self.cards = kept;
        removed
    }

    /// Returns `false` when the card already sits in `column`.
    pub fn move_to_column(&mut self, id: &str, column: Column, now: DateTime<Utc>) -> Result<bool, BoardError> {
        self.check_column(&column)?;
        let card = self.card_mut(id)?;
        if card.column == column {
            return Ok(false);
        }
        card.column = column;
        card.touch(now);
        Ok(true)
    }

    pub fn add_subtask(&mut self, card_id: &str, subtask: Subtask, now: DateTime<Utc>) -> Result<(), BoardError> {
        if subtask.text.trim().is_empty() {
            return Err(ValidationError::EmptySubtaskText.into());
        }
        let card = self.card_mut(card_id)?;
        if card.subtasks.iter().any(|s| s.id == subtask.id) {
            return Err(ValidationError::DuplicateId(subtask.id).into());
        }
        card.subtasks.push(subtask);
        card.touch(now);
        Ok(())
    }

    pub fn remove_subtask(&mut self, card_id: &str, subtask_id: &str, now: DateTime<Utc>) -> Result<Subtask, NotFoundError> {
        let card = self.card_mut(card_id)?;
        let index = card
            .subtasks
            .iter()
            .position(|s| s.id == subtask_id)
            .ok_or_else(|| NotFoundError::Subtask {
                card_id: card_id.to_string(),
                subtask_id: subtask_id.to_string(),
            })?;
        let removed = card.subtasks.remove(index);
        card.touch(now);
        Ok(removed)
    }

    /// Flip a subtask's completion; returns the new state.
    pub fn toggle_subtask(&mut self, card_id: &str, subtask_id: &str, now: DateTime<Utc>) -> Result<bool, NotFoundError> {
        let card = self.card_mut(card_id)?;
        let subtask = card
            .subtask_mut(subtask_id)
            .ok_or_else(|| NotFoundError::Subtask {
                card_id: card_id.to_string(),
                subtask_id: subtask_id.to_string(),
            })?;
        subtask.completed = !subtask.completed;
        let completed = subtask.completed;
        card.touch(now);
        Ok(completed)
    }

    pub fn add_tag(&mut self, card_id: &str, tag: &str, now: DateTime<Utc>) -> Result<(), BoardError> {
        let tag = tag.trim();
        if tag.is_empty() {
            return Err(ValidationError::EmptyTag.into());
        }
        let card = self.card_mut(card_id)?;
        if card.has_tag(tag) {
            return Err(ValidationError::DuplicateTag(tag.to_string()).into());
        }
        card.tags.push(tag.to_string());
        card.touch(now);
        Ok(())
    }

    /// Returns `false` when the card did not carry the tag.
    pub fn remove_tag(&mut self, card_id: &str, tag: &str, now: DateTime<Utc>) -> Result<bool, NotFoundError> {
        let tag = tag.trim();
        let card = self.card_mut(card_id)?;
        let before = card.tags.len();
        card.tags.retain(|t| t != tag);
        if card.tags.len() == before {
            return Ok(false);
        }
        card.touch(now);
        Ok(true)
    }

    /// Check a whole collection against this store's columns without
    /// touching the current cards.
    pub fn check_all(&self, cards: &[Card]) -> Result<(), ValidationError> {
        for (i, card) in cards.iter().enumerate() {
            self.check_card(card)?;
            if cards[..i].iter().any(|c| c.id == card.id) {
                return Err(ValidationError::DuplicateId(card.id.clone()));
            }
        }
        Ok(())
    }

    /// Swap in a whole collection (undo/redo, restore, import) after
    /// [`check_all`](Self::check_all). An `updated_at` earlier than
    /// `created_at` is raised to `created_at`.
    pub fn replace_all(&mut self, mut cards: Vec<Card>) -> Result<(), ValidationError> {
        self.check_all(&cards)?;
        for card in &mut cards {
            card.updated_at = card.updated_at.max(card.created_at);
        }
        self.cards = cards;
        Ok(())
    }

    /// Cards sorted by priority, high first; equal priorities keep
    /// insertion order.
    pub fn display_order(&self) -> Vec<&Card> {
        let mut ordered: Vec<&Card> = self.cards.iter().collect();
        ordered.sort_by(|a, b| b.priority.rank().cmp(&a.priority.rank()));
        ordered
    }

    /// Display-ordered cards whose title or description contains `query`,
    /// ignoring case. An empty query matches everything.
    pub fn search(&self, query: &str) -> Vec<&Card> {
        let needle = query.trim().to_lowercase();
        self.display_order()
            .into_iter()
            .filter(|card| {
                needle.is_empty()
                    || card.title.to_lowercase().contains(&needle)
                    || card.description.to_lowercase().contains(&needle)
            })
            .collect()
    }

    pub fn column_counts(&self) -> Vec<(Column, usize)> {
        self.columns
            .iter()
            .map(|column| {
                let count = self.cards.iter().filter(|c| &c.column == column).count();
                (column.clone(), count)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Priority;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 8, 0, 0).unwrap()
    }

    fn card(id: &str, title: &str, priority: Priority) -> Card {
        let mut card = Card::new(id.to_string(), title, Column::Todo, t0());
        card.priority = priority;
        card
    }

    fn store_with(cards: Vec<Card>) -> CardStore {
        let mut store = CardStore::new(Column::defaults());
        for c in cards {
            store.add(c).unwrap();
        }
        store
    }

    #[test]
    fn display_order_is_priority_then_insertion() {
        let store = store_with(vec![
            card("1", "A", Priority::Low),
            card("2", "B", Priority::High),
            card("3", "C", Priority::Low),
            card("4", "D", Priority::Medium),
            card("5", "E", Priority::High),
        ]);
        let titles: Vec<&str> = store.display_order().iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["B", "E", "D", "A", "C"]);
        // Stored order is untouched
        assert_eq!(store.cards()[0].title, "A");
    }

    #[test]
    fn add_rejects_blank_title_duplicate_id_and_unknown_column() {
        let mut store = store_with(vec![card("1", "A", Priority::Low)]);

        let err = store.add(card("2", "  ", Priority::Low)).unwrap_err();
        assert!(matches!(err, BoardError::Validation(ValidationError::EmptyTitle)));

        let err = store.add(card("1", "Again", Priority::Low)).unwrap_err();
        assert!(matches!(err, BoardError::Validation(ValidationError::DuplicateId(_))));

        let mut odd = card("3", "Odd", Priority::Low);
        odd.column = Column::from("blocked");
        assert!(store.add(odd).is_err());
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn update_is_all_or_nothing() {
        let mut store = store_with(vec![card("1", "A", Priority::Low)]);
        let later = t0() + Duration::minutes(5);

        let patch = CardPatch {
            description: Some("changed".into()),
            title: Some(" ".into()),
            ..CardPatch::default()
        };
        assert!(store.update("1", &patch, later).is_err());
        assert_eq!(store.get("1").unwrap().description, "");
        assert_eq!(store.get("1").unwrap().updated_at, t0());

        let patch = CardPatch {
            title: Some(" Renamed ".into()),
            priority: Some(Priority::High),
            tags: Some(vec!["x".into(), "x".into(), "y".into()]),
            ..CardPatch::default()
        };
        store.update("1", &patch, later).unwrap();
        let updated = store.get("1").unwrap();
        assert_eq!(updated.title, "Renamed");
        assert_eq!(updated.priority, Priority::High);
        assert_eq!(updated.tags, vec!["x", "y"]);
        assert_eq!(updated.updated_at, later);
    }

    #[test]
    fn missing_ids_report_not_found() {
        let mut store = store_with(vec![card("1", "A", Priority::Low)]);
        assert!(matches!(
            store.update("nope", &CardPatch::default(), t0()),
            Err(BoardError::NotFound(NotFoundError::Card(_)))
        ));
        assert_eq!(store.remove("nope"), Err(NotFoundError::Card("nope".into())));
        assert!(matches!(
            store.toggle_subtask("1", "missing", t0()),
            Err(NotFoundError::Subtask { .. })
        ));
    }

    #[test]
    fn remove_many_skips_unknown_ids() {
        let mut store = store_with(vec![
            card("1", "A", Priority::Low),
            card("2", "B", Priority::Low),
            card("3", "C", Priority::Low),
        ]);
        let removed = store.remove_many(&["1".into(), "3".into(), "9".into()]);
        assert_eq!(removed.len(), 2);
        assert_eq!(store.cards().len(), 1);
        assert_eq!(store.cards()[0].id, "2");
    }

    #[test]
    fn move_to_same_column_is_unchanged() {
        let mut store = store_with(vec![card("1", "A", Priority::Low)]);
        let later = t0() + Duration::minutes(1);
        assert!(!store.move_to_column("1", Column::Todo, later).unwrap());
        assert_eq!(store.get("1").unwrap().updated_at, t0());
        assert!(store.move_to_column("1", Column::Review, later).unwrap());
        assert_eq!(store.get("1").unwrap().column, Column::Review);
        assert_eq!(store.get("1").unwrap().updated_at, later);
    }

    #[test]
    fn tags_and_subtasks_round_out_a_card() {
        let mut store = store_with(vec![card("1", "A", Priority::Low)]);
        store.add_tag("1", "work", t0()).unwrap();
        assert!(matches!(
            store.add_tag("1", "work", t0()),
            Err(BoardError::Validation(ValidationError::DuplicateTag(_)))
        ));
        assert!(store.remove_tag("1", "work", t0()).unwrap());
        assert!(!store.remove_tag("1", "work", t0()).unwrap());

        store
            .add_subtask("1", Subtask::new("s1".into(), "write tests", t0()), t0())
            .unwrap();
        assert!(store.toggle_subtask("1", "s1", t0()).unwrap());
        assert_eq!(store.get("1").unwrap().progress(), (1, 1));
        store.remove_subtask("1", "s1", t0()).unwrap();
        assert!(store.get("1").unwrap().subtasks.is_empty());
    }

    #[test]
    fn search_matches_title_or_description_case_insensitively() {
        let mut b = card("2", "Groceries", Priority::High);
        b.description = "Buy MILK".into();
        let store = store_with(vec![card("1", "Milk run", Priority::Low), b, card("3", "Other", Priority::Low)]);
        let found: Vec<&str> = store.search("milk").iter().map(|c| c.id.as_str()).collect();
        assert_eq!(found, vec!["2", "1"]);
        assert_eq!(store.search("").len(), 3);
    }

    #[test]
    fn column_counts_follow_configured_order() {
        let mut done = card("2", "B", Priority::Low);
        done.column = Column::Done;
        let store = store_with(vec![card("1", "A", Priority::Low), done]);
        assert_eq!(
            store.column_counts(),
            vec![
                (Column::Todo, 1),
                (Column::Doing, 0),
                (Column::Done, 1),
                (Column::Review, 0)
            ]
        );
    }

    #[test]
    fn replace_all_rejects_duplicate_ids() {
        let mut store = store_with(vec![card("1", "A", Priority::Low)]);
        let result = store.replace_all(vec![card("x", "X", Priority::Low), card("x", "Y", Priority::Low)]);
        assert_eq!(result, Err(ValidationError::DuplicateId("x".into())));
        assert_eq!(store.cards()[0].id, "1");
    }

    #[test]
    fn replace_all_raises_updated_at_to_created_at() {
        let mut store = CardStore::new(Column::defaults());
        let mut stale = card("1", "A", Priority::Low);
        stale.updated_at = t0() - Duration::days(30);
        store.replace_all(vec![stale]).unwrap();
        assert_eq!(store.cards()[0].updated_at, t0());
    }

    #[test]
    fn check_all_leaves_the_store_untouched() {
        let store = store_with(vec![card("1", "A", Priority::Low)]);
        let mut lost = card("2", "B", Priority::Low);
        lost.column = Column::Custom("archive".into());
        assert_eq!(
            store.check_all(&[lost]),
            Err(ValidationError::UnknownColumn("archive".into()))
        );
        assert!(store.check_all(&[card("3", "C", Priority::High)]).is_ok());
        assert_eq!(store.len(), 1);
    }
}
