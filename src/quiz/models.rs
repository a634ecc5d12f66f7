//! Quiz data model
//!
//! The chapter set is closed: fifteen chapters plus the final quiz. An
//! identifier outside this set is a validation error, not a silent no-op.

use serde::Serialize;
use sqlx::FromRow;

use crate::validation::ValidationError;

/// The closed set of scorable chapters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Chapter {
    One,
    Two,
    Three,
    Four,
    Five,
    Six,
    Seven,
    Eight,
    Nine,
    Ten,
    Eleven,
    Twelve,
    Thirteen,
    Fourteen,
    Fifteen,
    FinalQuiz,
}

impl Chapter {
    pub const ALL: [Chapter; 16] = [
        Chapter::One,
        Chapter::Two,
        Chapter::Three,
        Chapter::Four,
        Chapter::Five,
        Chapter::Six,
        Chapter::Seven,
        Chapter::Eight,
        Chapter::Nine,
        Chapter::Ten,
        Chapter::Eleven,
        Chapter::Twelve,
        Chapter::Thirteen,
        Chapter::Fourteen,
        Chapter::Fifteen,
        Chapter::FinalQuiz,
    ];

    /// Column name in the `scores` table.
    ///
    /// The enum being closed is what makes interpolating this into SQL safe:
    /// every value comes from this fixed list, never from the request.
    pub fn column(&self) -> &'static str {
        match self {
            Chapter::One => "chapterone",
            Chapter::Two => "chaptertwo",
            Chapter::Three => "chapterthree",
            Chapter::Four => "chapterfour",
            Chapter::Five => "chapterfive",
            Chapter::Six => "chaptersix",
            Chapter::Seven => "chapterseven",
            Chapter::Eight => "chaptereight",
            Chapter::Nine => "chapternine",
            Chapter::Ten => "chapterten",
            Chapter::Eleven => "chaptereleven",
            Chapter::Twelve => "chaptertwelve",
            Chapter::Thirteen => "chapterthirteen",
            Chapter::Fourteen => "chapterfourteen",
            Chapter::Fifteen => "chapterfifteen",
            Chapter::FinalQuiz => "finalquiz",
        }
    }
}

impl std::str::FromStr for Chapter {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Chapter::ALL
            .into_iter()
            .find(|chapter| chapter.column() == s)
            .ok_or_else(|| {
                ValidationError::for_field("chapter", format!("Unknown chapter '{s}'"))
            })
    }
}

impl std::fmt::Display for Chapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.column())
    }
}

/// One aggregate score row per user.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ScoreRecord {
    pub user_id: String,
    pub chapterone: i64,
    pub chaptertwo: i64,
    pub chapterthree: i64,
    pub chapterfour: i64,
    pub chapterfive: i64,
    pub chaptersix: i64,
    pub chapterseven: i64,
    pub chaptereight: i64,
    pub chapternine: i64,
    pub chapterten: i64,
    pub chaptereleven: i64,
    pub chaptertwelve: i64,
    pub chapterthirteen: i64,
    pub chapterfourteen: i64,
    pub chapterfifteen: i64,
    pub finalquiz: i64,
    pub updated_at: i64,
}

impl ScoreRecord {
    /// Counter value for a chapter.
    pub fn get(&self, chapter: Chapter) -> i64 {
        match chapter {
            Chapter::One => self.chapterone,
            Chapter::Two => self.chaptertwo,
            Chapter::Three => self.chapterthree,
            Chapter::Four => self.chapterfour,
            Chapter::Five => self.chapterfive,
            Chapter::Six => self.chaptersix,
            Chapter::Seven => self.chapterseven,
            Chapter::Eight => self.chaptereight,
            Chapter::Nine => self.chapternine,
            Chapter::Ten => self.chapterten,
            Chapter::Eleven => self.chaptereleven,
            Chapter::Twelve => self.chaptertwelve,
            Chapter::Thirteen => self.chapterthirteen,
            Chapter::Fourteen => self.chapterfourteen,
            Chapter::Fifteen => self.chapterfifteen,
            Chapter::FinalQuiz => self.finalquiz,
        }
    }
}
