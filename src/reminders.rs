//! Due-date reminders.
//!
//! Two delivery paths feed the same notification: a one-shot timer per card
//! armed for the exact reminder instant, and a periodic sweep that catches
//! reminders whose timer never ran (armed before start-up, process asleep).
//! Neither path owns a thread; the event loop calls [`ReminderScheduler::tick`].
//!
//! # Invariants
//! - At most one pending timer per card id.
//! - A reminder is delivered at most once per (card id, reminder instant).
//! - Timers whose card was deleted or rescheduled fire nothing.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use log::{debug, info};
use std::collections::HashMap;

use crate::models::{Card, CardId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReminderSettings {
    pub sweep_interval: Duration,
    pub tolerance: Duration,
    pub display_for: Duration,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            sweep_interval: Duration::seconds(60),
            tolerance: Duration::seconds(60),
            display_for: Duration::seconds(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReminderSource {
    Timer,
    Sweep,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reminder {
    pub card_id: CardId,
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub instant: DateTime<Utc>,
    pub source: ReminderSource,
}

/// What one tick changed
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TickReport {
    pub fired: Vec<Reminder>,
    pub expired: Vec<CardId>,
}

impl TickReport {
    pub fn is_empty(&self) -> bool {
        self.fired.is_empty() && self.expired.is_empty()
    }
}

#[derive(Debug, Clone)]
struct Shown {
    reminder: Reminder,
    shown_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
pub struct ReminderScheduler {
    settings: ReminderSettings,
    pending: HashMap<CardId, DateTime<Utc>>,
    notified: HashMap<CardId, DateTime<Utc>>,
    shown: Vec<Shown>,
    last_sweep: Option<DateTime<Utc>>,
}

impl ReminderScheduler {
    pub fn new(settings: ReminderSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// (Re)arm the card's one-shot timer. Replaces any earlier timer for
    /// the card; drops it when the card has no future, undelivered instant.
    pub fn arm(&mut self, card: &Card, now: DateTime<Utc>) -> bool {
        match card.reminder_instant() {
            Some(instant) if instant > now && self.notified.get(&card.id) != Some(&instant) => {
                self.pending.insert(card.id.clone(), instant);
                true
            }
            _ => {
                self.pending.remove(&card.id);
                false
            }
        }
    }

    pub fn disarm(&mut self, card_id: &str) -> bool {
        self.pending.remove(card_id).is_some()
    }

    /// Cancel every timer and hide everything on screen
    pub fn disarm_all(&mut self) {
        self.pending.clear();
        self.shown.clear();
    }

    /// Re-arm every card and drop timers for cards that are gone.
    ///
    /// Delivery records of gone cards are kept while the sweep could still
    /// match their instant, so undoing a delete cannot fire a reminder twice.
    pub fn sync(&mut self, cards: &[Card], now: DateTime<Utc>) {
        self.pending
            .retain(|id, _| cards.iter().any(|card| &card.id == id));
        let horizon = now
            .checked_sub_signed(self.settings.tolerance)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);
        self.notified.retain(|id, instant| {
            *instant > horizon || cards.iter().any(|card| &card.id == id)
        });
        for card in cards {
            self.arm(card, now);
        }
    }

    pub fn pending_instant(&self, card_id: &str) -> Option<DateTime<Utc>> {
        self.pending.get(card_id).copied()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn shown(&self) -> impl Iterator<Item = &Reminder> {
        self.shown.iter().map(|s| &s.reminder)
    }

    /// Hide a reminder before its display time runs out
    pub fn dismiss(&mut self, card_id: &str) -> bool {
        let before = self.shown.len();
        self.shown.retain(|s| s.reminder.card_id != card_id);
        self.shown.len() != before
    }

    pub fn tick(&mut self, cards: &[Card], now: DateTime<Utc>) -> TickReport {
        let mut report = TickReport::default();

        let display_for = self.settings.display_for;
        self.shown.retain(|s| {
            let keep = now - s.shown_at < display_for;
            if !keep {
                report.expired.push(s.reminder.card_id.clone());
            }
            keep
        });

        let due: Vec<(CardId, DateTime<Utc>)> = self
            .pending
            .iter()
            .filter(|(_, instant)| **instant <= now)
            .map(|(id, instant)| (id.clone(), *instant))
            .collect();
        for (card_id, instant) in due {
            self.pending.remove(&card_id);
            match cards.iter().find(|c| c.id == card_id) {
                Some(card) if card.reminder_instant() == Some(instant) => {
                    self.deliver(card, instant, ReminderSource::Timer, now, &mut report);
                }
                _ => debug!(
                    "event=reminder_stale module=reminders status=ok card_id={}",
                    card_id
                ),
            }
        }

        let sweep_due = self
            .last_sweep
            .is_none_or(|last| now - last >= self.settings.sweep_interval);
        if sweep_due {
            self.last_sweep = Some(now);
            let tolerance_ms = self.settings.tolerance.num_milliseconds();
            for card in cards {
                let Some(instant) = card.reminder_instant() else {
                    continue;
                };
                if (instant - now).num_milliseconds().abs() < tolerance_ms {
                    self.deliver(card, instant, ReminderSource::Sweep, now, &mut report);
                }
            }
        }

        report
    }

    fn deliver(
        &mut self,
        card: &Card,
        instant: DateTime<Utc>,
        source: ReminderSource,
        now: DateTime<Utc>,
        report: &mut TickReport,
    ) {
        if self.notified.get(&card.id) == Some(&instant) {
            return;
        }
        self.notified.insert(card.id.clone(), instant);
        self.pending.remove(&card.id);

        let reminder = Reminder {
            card_id: card.id.clone(),
            title: card.title.clone(),
            due_date: card.due_date,
            instant,
            source,
        };
        info!(
            "event=reminder_fired module=reminders status=ok card_id={} source={:?}",
            card.id, source
        );
        self.shown.retain(|s| s.reminder.card_id != card.id);
        self.shown.push(Shown {
            reminder: reminder.clone(),
            shown_at: now,
        });
        report.fired.push(reminder);
    }
}
