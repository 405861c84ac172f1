//! Subreddit post stream backed by the Pushshift submission-search API.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use super::extract::extract_urls;
use super::{CrawlError, PostInfo, PostSource};

const PUSHSHIFT_URL: &str = "https://api.pushshift.io/reddit/search/submission";

/// Posters opting out of bots get skipped.
const OPT_OUT_MARKER: &str = "!BOTOPTOUT";

const FIELDS: &str = "permalink,link_flair_text,id,created_utc,url,is_self,selftext,title";

/// Streams posts of one subreddit newest-first, paging with a
/// `before`-timestamp cursor.
pub struct SubredditStream {
    client: Client,
    subreddit: String,
    page_size: usize,
    before: Option<i64>,
    done: bool,
}

impl SubredditStream {
    pub fn new(client: Client, subreddit: impl Into<String>, page_size: usize) -> Self {
        Self {
            client,
            subreddit: subreddit.into(),
            page_size,
            before: None,
            done: false,
        }
    }

    async fn request_page(&self) -> Result<Value, CrawlError> {
        let mut query: Vec<(&str, String)> = vec![
            ("subreddit", self.subreddit.clone()),
            ("fields", FIELDS.to_string()),
            ("size", self.page_size.to_string()),
            // Request posts are asks for scores, not scores.
            ("title:not", "request".to_string()),
        ];
        if let Some(before) = self.before {
            query.push(("before", before.to_string()));
        }

        let response = self
            .client
            .get(PUSHSHIFT_URL)
            .query(&query)
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 429 {
            return Err(CrawlError::RateLimited);
        }
        if !status.is_success() {
            return Err(CrawlError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

#[async_trait]
impl PostSource for SubredditStream {
    async fn next_page(&mut self) -> Result<Vec<PostInfo>, CrawlError> {
        let payload = self.request_page().await?;
        let posts = parse_page(&payload)?;

        match posts.last() {
            Some(oldest) => self.before = Some(oldest.created_utc - 1),
            None => self.done = true,
        }

        Ok(posts)
    }

    fn is_done(&self) -> bool {
        self.done
    }

    fn reset(&mut self) {
        self.before = None;
        self.done = false;
    }
}

/// Parses one API payload into valid posts, dropping entries with missing
/// fields, the wrong flair, or the bot opt-out marker.
fn parse_page(payload: &Value) -> Result<Vec<PostInfo>, CrawlError> {
    let data = payload
        .get("data")
        .and_then(Value::as_array)
        .ok_or_else(|| CrawlError::Decode("missing data array".to_string()))?;

    let mut posts = Vec::new();
    for entry in data {
        if let Some(post) = parse_post(entry) {
            posts.push(post);
        }
    }
    Ok(posts)
}

fn parse_post(entry: &Value) -> Option<PostInfo> {
    let id = entry.get("id")?.as_str()?;
    let title = entry.get("title")?.as_str()?;
    let created_utc = entry.get("created_utc")?.as_i64()?;
    let permalink = entry.get("permalink")?.as_str()?;
    let is_self = entry.get("is_self")?.as_bool()?;

    let flair = entry.get("link_flair_text").and_then(Value::as_str);
    if flair != Some("Submission") {
        return None;
    }

    let selftext = entry.get("selftext").and_then(Value::as_str).unwrap_or("");
    if is_self && entry.get("selftext").and_then(Value::as_str).is_none() {
        return None;
    }
    if title.to_uppercase().contains(OPT_OUT_MARKER)
        || selftext.to_uppercase().contains(OPT_OUT_MARKER)
    {
        return None;
    }

    let score_urls = if is_self {
        extract_urls(selftext)
    } else {
        let url = entry.get("url")?.as_str()?;
        extract_urls(url)
    };

    Some(PostInfo {
        id: id.to_string(),
        created_utc,
        permalink: permalink.to_string(),
        title: title.to_string(),
        score_urls,
    })
}
