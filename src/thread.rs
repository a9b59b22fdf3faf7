//! Reddit thread details from the `<post>.json` listing pair

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{Result, ScrapeError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThreadInfo {
    pub post_body: String,
    pub post_user: String,
    pub post_time: f64,
    pub comments: Vec<Comment>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub body: String,
    pub user: String,
    pub time: f64,
    pub replies: Vec<Reply>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    pub body: String,
    pub user: String,
    pub time: f64,
}

#[derive(Deserialize)]
struct Listing<T> {
    data: ListingData<T>,
}

#[derive(Deserialize)]
struct ListingData<T> {
    children: Vec<Thing<T>>,
}

#[derive(Deserialize)]
struct Thing<T> {
    kind: String,
    data: T,
}

#[derive(Deserialize)]
struct RawPost {
    title: String,
    author: String,
    created_utc: f64,
}

#[derive(Deserialize)]
struct RawComment {
    body: Option<String>,
    author: Option<String>,
    created_utc: Option<f64>,
    #[serde(default, deserialize_with = "replies_listing")]
    replies: Vec<Thing<RawComment>>,
}

/// Reddit sends `""` for a comment with no replies, a listing otherwise.
fn replies_listing<'de, D: Deserializer<'de>>(
    d: D,
) -> std::result::Result<Vec<Thing<RawComment>>, D::Error> {
    match Value::deserialize(d)? {
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::Null => Ok(Vec::new()),
        other => serde_json::from_value::<Listing<RawComment>>(other)
            .map(|listing| listing.data.children)
            .map_err(serde::de::Error::custom),
    }
}

/// `more` stubs and deleted comments carry no body.
fn comment_parts(
    thing: Thing<RawComment>,
) -> Option<(String, String, f64, Vec<Thing<RawComment>>)> {
    if thing.kind == "more" {
        return None;
    }
    let RawComment {
        body,
        author,
        created_utc,
        replies,
    } = thing.data;
    Some((
        body?,
        author.unwrap_or_default(),
        created_utc.unwrap_or_default(),
        replies,
    ))
}

pub fn parse_thread(json: &str) -> Result<ThreadInfo> {
    let (post, comments): (Listing<RawPost>, Listing<RawComment>) = serde_json::from_str(json)?;

    let post = post
        .data
        .children
        .into_iter()
        .next()
        .ok_or_else(|| ScrapeError::Parse("thread listing has no post".to_string()))?
        .data;

    let comments = comments
        .data
        .children
        .into_iter()
        .filter_map(comment_parts)
        .map(|(body, user, time, replies)| Comment {
            body,
            user,
            time,
            replies: replies
                .into_iter()
                .filter_map(comment_parts)
                .map(|(body, user, time, _)| Reply { body, user, time })
                .collect(),
        })
        .collect();

    Ok(ThreadInfo {
        post_body: post.title,
        post_user: post.author,
        post_time: post.created_utc,
        comments,
    })
}

/// `https://reddit.com/<post_id>.json`, with any `t3_` prefix stripped
pub fn thread_url(base: &str, post_id: &str) -> Result<String> {
    let id = post_id.strip_prefix("t3_").unwrap_or(post_id);
    let base = Url::parse(base).map_err(|e| ScrapeError::Parse(format!("Bad base URL {base}: {e}")))?;
    let url = base
        .join(&format!("{id}.json"))
        .map_err(|e| ScrapeError::Parse(format!("Bad post id {post_id}: {e}")))?;
    Ok(url.to_string())
}
