//! Recall ratings.
//!
//! The canonical scale is the SM-2 quality grade 0-5, which is what gets stored
//! with every review. The four buttons shown to learners (again, hard, good,
//! easy) map onto it through a fixed table:
//!
//! | rating | quality |
//! |--------|---------|
//! | again  | 0       |
//! | hard   | 3       |
//! | good   | 4       |
//! | easy   | 5       |
//!
//! Going back from a stored quality, 0-2 read as "again".

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{FlashnoteError, Result};

/// Lowest grade that counts as "remembered".
pub const PASSING_QUALITY: u8 = 3;

/// SM-2 quality grade, always within 0..=5.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "u8")]
pub struct Quality(u8);

impl Quality {
    pub const MAX: u8 = 5;

    /// Rejects anything outside 0..=5. Out-of-range input is never clamped.
    pub fn new(value: i64) -> Result<Self> {
        if (0..=Self::MAX as i64).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(FlashnoteError::InvalidRating(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    pub fn is_passing(self) -> bool {
        self.0 >= PASSING_QUALITY
    }
}

impl TryFrom<i64> for Quality {
    type Error = FlashnoteError;

    fn try_from(value: i64) -> Result<Self> {
        Self::new(value)
    }
}

impl From<Quality> for u8 {
    fn from(q: Quality) -> u8 {
        q.0
    }
}

/// The four-level scale shown on the study screen.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rating {
    Again,
    Hard,
    Good,
    Easy,
}

impl Rating {
    pub const ALL: [Rating; 4] = [Rating::Again, Rating::Hard, Rating::Good, Rating::Easy];

    pub fn quality(self) -> Quality {
        match self {
            Rating::Again => Quality(0),
            Rating::Hard => Quality(3),
            Rating::Good => Quality(4),
            Rating::Easy => Quality(5),
        }
    }

    pub fn from_quality(quality: Quality) -> Self {
        match quality.value() {
            0..=2 => Rating::Again,
            3 => Rating::Hard,
            4 => Rating::Good,
            _ => Rating::Easy,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Rating::Again => "again",
            Rating::Hard => "hard",
            Rating::Good => "good",
            Rating::Easy => "easy",
        }
    }
}

impl From<Rating> for Quality {
    fn from(rating: Rating) -> Self {
        rating.quality()
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Rating {
    type Err = FlashnoteError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "again" => Ok(Rating::Again),
            "hard" => Ok(Rating::Hard),
            "good" => Ok(Rating::Good),
            "easy" => Ok(Rating::Easy),
            other => Err(FlashnoteError::InvalidRatingLabel(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quality_bounds() {
        assert!(Quality::new(0).is_ok());
        assert!(Quality::new(5).is_ok());
        assert!(matches!(Quality::new(6), Err(FlashnoteError::InvalidRating(6))));
        assert!(matches!(Quality::new(-1), Err(FlashnoteError::InvalidRating(-1))));
    }

    #[test]
    fn test_rating_table() {
        let grades: Vec<u8> = Rating::ALL.iter().map(|r| r.quality().value()).collect();
        assert_eq!(grades, vec![0, 3, 4, 5]);
    }

    #[test]
    fn test_low_grades_read_as_again() {
        for q in 0..=2 {
            assert_eq!(Rating::from_quality(Quality::new(q).unwrap()), Rating::Again);
        }
        assert_eq!(Rating::from_quality(Quality::new(3).unwrap()), Rating::Hard);
    }

    #[test]
    fn test_parse_labels() {
        assert_eq!("Easy".parse::<Rating>().unwrap(), Rating::Easy);
        assert_eq!(" again ".parse::<Rating>().unwrap(), Rating::Again);
        assert!(matches!(
            "meh".parse::<Rating>(),
            Err(FlashnoteError::InvalidRatingLabel(_))
        ));
    }

    #[test]
    fn test_quality_deserialize_rejects_out_of_range() {
        assert!(serde_json::from_str::<Quality>("4").is_ok());
        assert!(serde_json::from_str::<Quality>("9").is_err());
    }
}
