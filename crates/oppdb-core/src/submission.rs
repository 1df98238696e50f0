use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One text record collected from a discussion source.
///
/// Engagement metrics are optional because some sources omit them; consumers
/// treat a missing value as zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub subreddit: String,
    #[serde(default)]
    pub score: Option<i64>,
    #[serde(default)]
    pub num_comments: Option<i64>,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub created_utc: Option<DateTime<Utc>>,
}

impl Submission {
    /// Upvote count, with a missing value read as zero.
    #[must_use]
    pub fn score_or_zero(&self) -> i64 {
        self.score.unwrap_or(0)
    }

    /// Reply count, with a missing value read as zero.
    #[must_use]
    pub fn comments_or_zero(&self) -> i64 {
        self.num_comments.unwrap_or(0)
    }

    /// Title and body joined the way analysis services see them.
    #[must_use]
    pub fn full_text(&self) -> String {
        let body = self.body.trim();
        if body.is_empty() {
            self.title.trim().to_string()
        } else {
            format!("{}\n\n{body}", self.title.trim())
        }
    }
}

/// A known business concept a submission maps to, plus which analyses already
/// exist for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConcept {
    pub concept_id: i64,
    pub has_monetization: bool,
    pub has_profile: bool,
}
