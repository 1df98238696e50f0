//! Listing payloads and their mapping onto [`Submission`].

use chrono::{DateTime, Utc};
use oppdb_core::Submission;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub(crate) struct Listing {
    pub(crate) data: ListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ListingData {
    #[serde(default)]
    pub(crate) children: Vec<Post>,
    pub(crate) after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Post {
    pub(crate) data: PostData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PostData {
    pub(crate) id: Option<String>,
    pub(crate) name: Option<String>,
    pub(crate) title: Option<String>,
    pub(crate) selftext: Option<String>,
    pub(crate) subreddit: Option<String>,
    pub(crate) score: Option<i64>,
    pub(crate) num_comments: Option<i64>,
    pub(crate) author: Option<String>,
    pub(crate) permalink: Option<String>,
    pub(crate) created_utc: Option<f64>,
    #[serde(default)]
    pub(crate) stickied: bool,
    pub(crate) removed_by_category: Option<String>,
}

fn is_removed(data: &PostData) -> bool {
    data.removed_by_category.is_some()
        || matches!(data.selftext.as_deref().map(str::trim), Some("[removed]"))
}

/// Map a listing child onto a [`Submission`].
///
/// Stickied and moderator-removed posts, and posts without an id or title,
/// yield `None`.
pub(crate) fn to_submission(post: &Post, fallback_subreddit: &str) -> Option<Submission> {
    let data = &post.data;
    if data.stickied || is_removed(data) {
        return None;
    }

    let id = match (&data.name, &data.id) {
        (Some(name), _) if !name.is_empty() => name.clone(),
        (_, Some(id)) if !id.is_empty() => format!("t3_{id}"),
        _ => return None,
    };
    let title = data.title.as_deref().map(str::trim).filter(|t| !t.is_empty())?;

    let body = data
        .selftext
        .as_deref()
        .map(str::trim)
        .filter(|body| *body != "[deleted]")
        .unwrap_or_default();

    #[allow(clippy::cast_possible_truncation)]
    let created_utc = data
        .created_utc
        .filter(|ts| ts.is_finite())
        .and_then(|ts| DateTime::<Utc>::from_timestamp(ts as i64, 0));

    Some(Submission {
        id,
        title: title.to_string(),
        body: body.to_string(),
        subreddit: data
            .subreddit
            .clone()
            .unwrap_or_else(|| fallback_subreddit.to_string()),
        score: data.score,
        num_comments: data.num_comments,
        author: data.author.clone().filter(|a| a != "[deleted]"),
        url: data
            .permalink
            .as_ref()
            .map(|permalink| format!("https://reddit.com{permalink}")),
        created_utc,
    })
}
