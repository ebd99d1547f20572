//! Quiz question import.
//!
//! Questions come either from the quiz service over HTTP or from a JSON file
//! with the same `{ "items": [...] }` shape.

use reqwest::blocking::Client;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::config::Config;
use crate::error::{FlashnoteError, Result};
use crate::models::{CardContent, SourceType};

pub const MAX_IMPORT_LIMIT: u32 = 200;
const QUESTIONS_PATH: &str = "/api/flashnote/questions";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub question_id: String,
    pub question_text: String,
    pub answer_text: String,
    #[serde(default)]
    pub explanation: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub subject_id: Option<String>,
    #[serde(default)]
    pub difficulty: Option<String>,
}

impl QuizQuestion {
    /// Card built from the question. The explanation, when present, goes
    /// under the answer after a blank line. `None` if either side is empty.
    pub fn to_card(&self) -> Option<CardContent> {
        let front = self.question_text.trim();
        let answer = self.answer_text.trim();
        let explanation = self.explanation.as_deref().unwrap_or("").trim();
        let back = if explanation.is_empty() {
            answer.to_string()
        } else {
            format!("{answer}\n\n{explanation}")
        };

        if front.is_empty() || back.is_empty() {
            return None;
        }
        Some(CardContent {
            front: front.to_string(),
            back,
            source_type: SourceType::Quiz,
            source_ref_id: Some(self.question_id.clone()),
        })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuizQuestionsResponse {
    pub items: Vec<QuizQuestion>,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QuizQuery {
    pub quiz_id: Option<String>,
    pub topic_id: Option<String>,
    pub limit: Option<u32>,
}

impl QuizQuery {
    pub fn validate(&self) -> Result<()> {
        match self.limit {
            Some(limit) if !(1..=MAX_IMPORT_LIMIT).contains(&limit) => Err(
                FlashnoteError::Validation(format!("Limit must be between 1 and {MAX_IMPORT_LIMIT}.")),
            ),
            _ => Ok(()),
        }
    }

    fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(quiz_id) = self.quiz_id.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(("quizId", quiz_id.to_string()));
        }
        if let Some(topic_id) = self.topic_id.as_deref().filter(|v| !v.is_empty()) {
            pairs.push(("topicId", topic_id.to_string()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

/// Client of the quiz service.
pub struct QuizClient {
    client: Client,
    base_url: Url,
    token: String,
}

impl QuizClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| FlashnoteError::QuizApi(format!("Invalid base URL {base_url}: {e}")))?;
        let token = token.into();
        if token.trim().is_empty() {
            return Err(FlashnoteError::QuizApi(
                "Quiz import requires a session token.".to_string(),
            ));
        }
        Ok(Self {
            client: Client::new(),
            base_url,
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let base_url = config
            .quiz_api_base_url
            .as_deref()
            .ok_or_else(|| FlashnoteError::QuizApi("Quiz API base URL is not configured.".to_string()))?;
        Self::new(base_url, config.quiz_api_token.clone().unwrap_or_default())
    }

    pub fn questions_url(&self, query: &QuizQuery) -> Result<Url> {
        let mut url = self
            .base_url
            .join(QUESTIONS_PATH)
            .map_err(|e| FlashnoteError::QuizApi(e.to_string()))?;
        url.query_pairs_mut().extend_pairs(query.pairs());
        Ok(url)
    }

    pub fn fetch(&self, query: &QuizQuery) -> Result<QuizQuestionsResponse> {
        query.validate()?;
        let url = self.questions_url(query)?;
        log::info!("Fetching quiz questions from {}", url);

        let response = self.client.get(url).bearer_auth(&self.token).send()?;
        if !response.status().is_success() {
            return Err(FlashnoteError::QuizApi(format!(
                "Unable to fetch quiz questions ({}).",
                response.status()
            )));
        }
        let body = response.text()?;
        parse_response(&body)
    }
}

pub fn parse_response(body: &str) -> Result<QuizQuestionsResponse> {
    serde_json::from_str(body)
        .map_err(|e| FlashnoteError::QuizApi(format!("Quiz API returned an invalid response: {e}")))
}

/// Loads questions from a JSON file saved from the quiz service.
pub fn load_quiz_file(path: &Path) -> Result<QuizQuestionsResponse> {
    let contents = fs::read_to_string(path)?;
    parse_response(&contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(id: &str, q: &str, a: &str, explanation: Option<&str>) -> QuizQuestion {
        QuizQuestion {
            question_id: id.to_string(),
            question_text: q.to_string(),
            answer_text: a.to_string(),
            explanation: explanation.map(str::to_string),
            topic_id: None,
            subject_id: None,
            difficulty: None,
        }
    }

    #[test]
    fn test_card_with_explanation() {
        let card = question("q1", " Speed of light? ", "c", Some("About 3e8 m/s"))
            .to_card()
            .unwrap();
        assert_eq!(card.front, "Speed of light?");
        assert_eq!(card.back, "c\n\nAbout 3e8 m/s");
        assert_eq!(card.source_type, SourceType::Quiz);
        assert_eq!(card.source_ref_id.as_deref(), Some("q1"));
    }

    #[test]
    fn test_empty_question_is_skipped() {
        assert!(question("q2", "  ", "answer", None).to_card().is_none());
        assert!(question("q3", "question", "", None).to_card().is_none());
    }

    #[test]
    fn test_parse_response() {
        let body = r#"{"items": [{"questionId": "q1", "questionText": "2+2", "answerText": "4",
                       "explanation": null, "difficulty": "easy"}]}"#;
        let parsed = parse_response(body).unwrap();
        assert_eq!(parsed.items.len(), 1);
        assert_eq!(parsed.items[0].difficulty.as_deref(), Some("easy"));

        assert!(matches!(
            parse_response(r#"{"questions": []}"#),
            Err(FlashnoteError::QuizApi(_))
        ));
    }

    #[test]
    fn test_limit_bounds() {
        let ok = QuizQuery { limit: Some(200), ..QuizQuery::default() };
        assert!(ok.validate().is_ok());
        let too_big = QuizQuery { limit: Some(201), ..QuizQuery::default() };
        assert!(matches!(too_big.validate(), Err(FlashnoteError::Validation(_))));
        let zero = QuizQuery { limit: Some(0), ..QuizQuery::default() };
        assert!(zero.validate().is_err());
    }

    #[test]
    fn test_questions_url() {
        let client = QuizClient::new("https://quiz.example/app/", "token").unwrap();
        let query = QuizQuery {
            quiz_id: Some("42".to_string()),
            topic_id: None,
            limit: Some(10),
        };
        let url = client.questions_url(&query).unwrap();
        assert_eq!(
            url.as_str(),
            "https://quiz.example/api/flashnote/questions?quizId=42&limit=10"
        );
    }

    #[test]
    fn test_client_requires_configuration() {
        assert!(matches!(
            QuizClient::from_config(&Config::default()),
            Err(FlashnoteError::QuizApi(_))
        ));
        assert!(QuizClient::new("https://quiz.example", " ").is_err());
    }

    #[test]
    fn test_load_quiz_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("questions.json");
        fs::write(
            &path,
            r#"{"items": [{"questionId": "q9", "questionText": "Capital of Poland?", "answerText": "Warsaw"}]}"#,
        )
        .unwrap();

        let parsed = load_quiz_file(&path).unwrap();
        assert_eq!(parsed.items[0].question_id, "q9");
    }
}
