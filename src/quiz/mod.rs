//! Quiz scoring
//!
//! Per-chapter score counters and the submission rate guard. Counters are
//! accumulators: repeated submissions for the same chapter add, never
//! replace. The rate limit is a sliding window per user, independent of
//! which chapter was submitted.

pub mod handlers;
pub mod models;
pub mod scores;

pub use models::{Chapter, ScoreRecord};
pub use scores::{ScoreLedger, SubmissionError, SubmissionPolicy};
