//! Flashcard is a pair <front, back>. Only text is used on both sides
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{CardId, DeckId, UserId};

/// Where a card came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    #[default]
    Manual,
    Quiz,
    Ai,
}

impl SourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceType::Manual => "manual",
            SourceType::Quiz => "quiz",
            SourceType::Ai => "ai",
        }
    }

    /// Unknown values read back as manual.
    pub fn parse(value: &str) -> Self {
        match value {
            "quiz" => SourceType::Quiz,
            "ai" => SourceType::Ai,
            _ => SourceType::Manual,
        }
    }
}

impl fmt::Display for SourceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Flashcard {
    pub id: CardId,
    pub deck_id: DeckId,
    pub user_id: UserId,
    pub front: String,
    pub back: String,
    pub source_type: SourceType,
    pub source_ref_id: Option<String>,
    /// Archived cards keep their history but are left out of study.
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Card content without storage identity, as written to export files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardContent {
    pub front: String,
    pub back: String,
    #[serde(default)]
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_ref_id: Option<String>,
}

impl CardContent {
    pub fn manual(front: impl Into<String>, back: impl Into<String>) -> Self {
        Self {
            front: front.into(),
            back: back.into(),
            source_type: SourceType::Manual,
            source_ref_id: None,
        }
    }
}

impl From<&Flashcard> for CardContent {
    fn from(card: &Flashcard) -> Self {
        Self {
            front: card.front.clone(),
            back: card.back.clone(),
            source_type: card.source_type,
            source_ref_id: card.source_ref_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_type_parse() {
        assert_eq!(SourceType::parse("quiz"), SourceType::Quiz);
        assert_eq!(SourceType::parse("ai"), SourceType::Ai);
        assert_eq!(SourceType::parse("pdf"), SourceType::Manual);
    }

    #[test]
    fn test_card_content_defaults_to_manual() {
        let content: CardContent =
            serde_json::from_str(r#"{"front": "cześć", "back": "hello"}"#).unwrap();
        assert_eq!(content, CardContent::manual("cześć", "hello"));
    }
}
