use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::error::ValidationError;
use crate::models::{Card, ExportDocument, FORMAT_VERSION};

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("Error reading file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("Card {index} in import is invalid: {reason}")]
    InvalidCard { index: usize, reason: String },
}

/// The parts of an import document the board acts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportDocument {
    pub cards: Vec<Card>,
    pub theme: Option<String>,
}

pub fn export(cards: &[Card], theme: &str, now: DateTime<Utc>) -> ExportDocument {
    ExportDocument {
        cards: cards.to_vec(),
        export_date: now,
        version: FORMAT_VERSION.to_string(),
        theme: theme.to_string(),
    }
}

pub fn to_json(document: &ExportDocument) -> Result<String, TransferError> {
    Ok(serde_json::to_string_pretty(document)?)
}

/// Download name, e.g. `lanes-export-2026-10-16.json`
pub fn export_file_name(now: DateTime<Utc>) -> String {
    format!("lanes-export-{}.json", now.format("%Y-%m-%d"))
}

/// Parse an import document. Only `cards` is required; `theme` is kept
/// when present and non-empty, every other field is ignored.
pub fn parse_import(text: &str) -> Result<ImportDocument, TransferError> {
    let mut root: Value = serde_json::from_str(text)?;

    let cards = match root.get_mut("cards").map(Value::take) {
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ValidationError::InvalidDocument("'cards' is not a list".to_string()).into());
        }
        None => {
            return Err(ValidationError::InvalidDocument("missing 'cards'".to_string()).into());
        }
    };

    let cards = cards
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value::<Card>(item).map_err(|e| TransferError::InvalidCard {
                index,
                reason: e.to_string(),
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let theme = root
        .get("theme")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string);

    Ok(ImportDocument { cards, theme })
}
