//! Reddit post cards

use serde::Serialize;

use super::{attr_of, count_of, joined_text, text_of, Extractor, Required};
use crate::error::Result;
use crate::locator::Locator;
use crate::page::Page;
use crate::record::{Field, Record};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RedditPost {
    pub post_id: Field,
    pub user: Field,
    pub title: Field,
    pub content: Field,
    pub vote_count: String,
    pub comment_count: String,
    pub timestamp: Field,
    pub error: bool,
}

impl Record for RedditPost {
    const HEADERS: &'static [&'static str] = &[
        "user",
        "title",
        "content",
        "voteCount",
        "commentCount",
        "timestamp",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.user.to_string(),
            self.title.to_string(),
            self.content.to_string(),
            self.vote_count.clone(),
            self.comment_count.clone(),
            self.timestamp.to_string(),
        ]
    }

    fn has_error(&self) -> bool {
        self.error
    }
}

#[derive(Debug, Clone)]
pub struct PostLocators {
    pub cards: Locator,
    pub post: Locator,
    pub user: Locator,
    pub title: Locator,
    pub paragraphs: Locator,
    pub fallback_link: Locator,
    pub votes: Locator,
    pub comments: Locator,
    pub time: Locator,
}

impl PostLocators {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cards: Locator::css(r#"article[class="w-full m-0"]"#)?,
            post: Locator::css("shreddit-post")?,
            user: Locator::css(r#"a[href*="/user/"] span[class*="whitespace-nowrap"]"#)?,
            title: Locator::css(r#"a[slot="title"]"#)?,
            paragraphs: Locator::css(r#"div[data-post-click-location="text-body"] p"#)?,
            fallback_link: Locator::css(r#"a[target="_blank"]"#)?,
            votes: Locator::css(r#"span[data-post-click-location="vote"] faceplate-number"#)?,
            comments: Locator::css(
                r#"a[data-post-click-location="comments-button"] faceplate-number"#,
            )?,
            time: Locator::css("time")?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct PostExtractor {
    locators: PostLocators,
}

impl PostExtractor {
    pub fn new() -> Result<Self> {
        Ok(Self::with_locators(PostLocators::new()?))
    }

    pub fn with_locators(locators: PostLocators) -> Self {
        Self { locators }
    }
}

impl Extractor for PostExtractor {
    type Output = RedditPost;

    fn cards(&self) -> &Locator {
        &self.locators.cards
    }

    fn extract<'a, P: Page>(&self, card: P::Node<'a>, page: &'a P) -> RedditPost {
        let loc = &self.locators;
        let mut required = Required::default();

        let post_id = attr_of(page, card, &loc.post, "id");
        let user = text_of(page, card, &loc.user);
        let title = text_of(page, card, &loc.title);

        // Paragraphs win; the outbound link only stands in when there are none
        let content = joined_text(page, card, &loc.paragraphs)
            .or_else(|| text_of(page, card, &loc.fallback_link));

        // Counts live in the post's shadow root, addressed by its id
        let shadow = post_id.as_deref().and_then(|id| page.shadow_root(id));
        let vote_count = count_of(page, shadow, &loc.votes);
        let comment_count = count_of(page, shadow, &loc.comments);

        let timestamp = attr_of(page, card, &loc.time, "datetime");

        let post_id = required.field("post_id", post_id);
        let user = required.field("user", user);
        let title = required.field("title", title);
        let content = required.field("content", content);
        let timestamp = required.field("timestamp", timestamp);

        RedditPost {
            post_id,
            user,
            title,
            content,
            vote_count,
            comment_count,
            timestamp,
            error: required.error,
        }
    }
}

/// Extract one Reddit post card with the default locators
pub fn extract_post<'a, P: Page>(card: P::Node<'a>, page: &'a P) -> Result<RedditPost> {
    Ok(PostExtractor::new()?.extract(card, page))
}
