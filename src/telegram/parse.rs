//! HTML extraction for channel preview pages
//!
//! A `t.me/s/<handle>` page lists recent messages oldest-first. Each message
//! block carries a `data-post` attribute (`handle/id`), an optional text
//! body, and a `<time datetime="...">` element with an RFC 3339 timestamp.

use chrono::{DateTime, Utc};
use scraper::{Html, Selector};

use crate::models::ChannelPost;
use crate::utils::error::FetchError;
use crate::utils::normalize_whitespace;

/// Compiled selectors for message extraction
pub struct MessageSelectors {
    message: Selector,
    text: Selector,
    time: Selector,
}

impl MessageSelectors {
    pub fn new() -> Self {
        Self {
            message: Selector::parse("div.tgme_widget_message").expect("Invalid selector"),
            text: Selector::parse("div.tgme_widget_message_text").expect("Invalid selector"),
            time: Selector::parse("time[datetime]").expect("Invalid selector"),
        }
    }
}

impl Default for MessageSelectors {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a channel preview page into posts, newest first, up to `limit`
///
/// Messages without a `data-post` attribute or timestamp (pinned banners,
/// service rows) are dropped. Media-only messages come through with blank
/// text; the engine counts and skips those itself.
pub fn parse_channel_page(
    selectors: &MessageSelectors,
    html: &str,
    channel: &str,
    limit: usize,
) -> Result<Vec<ChannelPost>, FetchError> {
    let document = Html::parse_document(html);

    let mut posts: Vec<ChannelPost> = Vec::new();

    for message in document.select(&selectors.message) {
        let Some(data_post) = message.value().attr("data-post") else {
            continue;
        };

        let Some(posted_at) = message
            .select(&selectors.time)
            .next()
            .and_then(|t| t.value().attr("datetime"))
            .and_then(parse_timestamp)
        else {
            continue;
        };

        let text = message
            .select(&selectors.text)
            .next()
            .map(|node| normalize_whitespace(&node.text().collect::<Vec<_>>().join(" ")))
            .unwrap_or_default();

        posts.push(ChannelPost {
            channel: channel.to_string(),
            link: format!("https://t.me/{data_post}"),
            text,
            posted_at,
        });
    }

    if posts.is_empty() {
        return Err(FetchError::NoMessages(channel.to_string()));
    }

    // Page order is oldest-first; the engine expects newest-first
    posts.reverse();
    posts.truncate(limit);

    Ok(posts)
}

/// Parse an RFC 3339 timestamp into UTC
fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
