//! X (Twitter) tweet cards

use serde::Serialize;
use tracing::debug;

use super::poster::{poster_details, HoverLocators};
use super::{attr_of, count_of, text_of, Extractor, Required};
use crate::error::Result;
use crate::locator::Locator;
use crate::page::Page;
use crate::record::{Field, Record};
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Tweet {
    pub user: Field,
    pub handle: Field,
    pub timestamp: Field,
    pub verified: bool,
    pub content: Field,
    pub reply_count: Field,
    pub retweet_count: Field,
    pub like_count: Field,
    pub view_count: Field,
    pub tags: Vec<String>,
    pub mentions: Vec<String>,
    pub emojis: Vec<String>,
    pub profile_image: Field,
    pub tweet_link: Field,
    pub tweet_id: Field,
    pub user_id: Option<String>,
    pub following_count: String,
    pub followers_count: String,
    pub promoted: bool,
    pub error: bool,
}

impl Record for Tweet {
    const HEADERS: &'static [&'static str] = &[
        "Name",
        "Handle",
        "Timestamp",
        "Content",
        "Retweets",
        "Likes",
        "Views",
        "Tweet Link",
    ];

    fn row(&self) -> Vec<String> {
        vec![
            self.user.to_string(),
            self.handle.to_string(),
            self.timestamp.to_string(),
            self.content.to_string(),
            self.retweet_count.to_string(),
            self.like_count.to_string(),
            self.view_count.to_string(),
            self.tweet_link.to_string(),
        ]
    }

    fn has_error(&self) -> bool {
        self.error
    }

    /// No timestamp is taken to mean an ad. A genuine tweet whose `time`
    /// element failed to render is classified the same way.
    fn is_promoted(&self) -> bool {
        self.promoted
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TweetOptions {
    /// Hover the author's name to read user id and follow counts
    pub poster_details: bool,
    pub hover: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct TweetLocators {
    pub cards: Locator,
    pub user: Locator,
    pub handle: Locator,
    pub time: Locator,
    pub verified: Locator,
    pub text_block: Locator,
    pub text_parts: Locator,
    pub replies: Locator,
    pub retweets: Locator,
    pub likes: Locator,
    pub views: Locator,
    pub tags: Locator,
    pub mentions: Locator,
    pub emojis: Locator,
    pub avatar: Locator,
    pub link: Locator,
    pub hover: HoverLocators,
}

impl TweetLocators {
    pub fn new() -> Result<Self> {
        Ok(Self {
            cards: Locator::css(r#"article[data-testid="tweet"]"#)?,
            user: Locator::css(r#"div[data-testid="User-Name"] span"#)?,
            handle: Locator::css("span")?.containing("@"),
            time: Locator::css("time[datetime]")?,
            verified: Locator::css(r#"svg[data-testid="icon-verified"]"#)?,
            text_block: Locator::css(r#"div[data-testid="tweetText"]"#)?,
            // Scoped to the first text block, so quoted tweets are left out
            text_parts: Locator::css(
                r#"[data-testid="tweetText"] > span, [data-testid="tweetText"] > a"#,
            )?,
            replies: Locator::css(r#"button[data-testid="reply"] span"#)?,
            retweets: Locator::css(r#"button[data-testid="retweet"] span"#)?,
            likes: Locator::css(r#"button[data-testid="like"] span"#)?,
            views: Locator::css(r#"a[href*="/analytics"] span"#)?,
            tags: Locator::css(r#"a[href*="src=hashtag_click"]"#)?,
            mentions: Locator::css("a")?.containing("@"),
            emojis: Locator::css(r#"[data-testid="tweetText"] > img[src*="emoji"]"#)?,
            avatar: Locator::css(r#"div[data-testid="Tweet-User-Avatar"] img"#)?,
            link: Locator::css(r#"a[href*="/status/"]"#)?,
            hover: HoverLocators::new()?,
        })
    }
}

#[derive(Debug, Clone)]
pub struct TweetExtractor {
    locators: TweetLocators,
    options: TweetOptions,
}

impl TweetExtractor {
    pub fn new(options: TweetOptions) -> Result<Self> {
        Ok(Self {
            locators: TweetLocators::new()?,
            options,
        })
    }

    pub fn options(&self) -> &TweetOptions {
        &self.options
    }
}

/// ASCII-only escaping of `alt` text. Printable ASCII is untouched, control
/// characters and `\\` are escaped, and everything else becomes `\xNN`,
/// `\uNNNN` or `\UNNNNNNNN` depending on the code point.
pub fn escape_unicode(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        let code = ch as u32;
        match ch {
            '\\' => out.push_str("\\\\"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ' '..='~' => out.push(ch),
            _ if code <= 0xFF => out.push_str(&format!("\\x{code:02x}")),
            _ if code <= 0xFFFF => out.push_str(&format!("\\u{code:04x}")),
            _ => out.push_str(&format!("\\U{code:08x}")),
        }
    }
    out
}

/// Trailing path segment of a status link
fn tweet_id_from_link(link: &str) -> String {
    link.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or_default()
        .to_string()
}

impl Extractor for TweetExtractor {
    type Output = Tweet;

    fn cards(&self) -> &Locator {
        &self.locators.cards
    }

    fn extract<'a, P: Page>(&self, card: P::Node<'a>, page: &'a P) -> Tweet {
        let loc = &self.locators;
        let mut required = Required::default();

        let user = required.field("user", text_of(page, card, &loc.user));
        let handle = required.field("handle", text_of(page, card, &loc.handle));
        let date_time = attr_of(page, card, &loc.time, "datetime");
        let promoted = date_time.is_none();
        let timestamp = required.field("timestamp", date_time);

        let mut tweet = Tweet {
            user,
            handle,
            timestamp,
            verified: false,
            content: Field::Missing,
            reply_count: Field::Missing,
            retweet_count: Field::Missing,
            like_count: Field::Missing,
            view_count: Field::Missing,
            tags: Vec::new(),
            mentions: Vec::new(),
            emojis: Vec::new(),
            profile_image: Field::Missing,
            tweet_link: Field::Missing,
            tweet_id: Field::Missing,
            user_id: None,
            following_count: "0".to_string(),
            followers_count: "0".to_string(),
            promoted,
            error: required.error,
        };

        if promoted {
            debug!("no timestamp, treating card as promoted");
            return tweet;
        }

        tweet.verified = page.find_one(card, &loc.verified).is_some();

        let text_block = page.find_one(card, &loc.text_block);
        tweet.content = Field::Value(
            text_block
                .map(|block| {
                    page.find_many(block, &loc.text_parts)
                        .into_iter()
                        .map(|part| page.text(part))
                        .collect()
                })
                .unwrap_or_default(),
        );

        tweet.reply_count = Field::Value(count_of(page, Some(card), &loc.replies));
        tweet.retweet_count = Field::Value(count_of(page, Some(card), &loc.retweets));
        tweet.like_count = Field::Value(count_of(page, Some(card), &loc.likes));
        tweet.view_count = Field::Value(count_of(page, Some(card), &loc.views));

        tweet.tags = page
            .find_many(card, &loc.tags)
            .into_iter()
            .map(|tag| page.text(tag))
            .collect();

        if let Some(block) = text_block {
            tweet.mentions = page
                .find_many(block, &loc.mentions)
                .into_iter()
                .map(|mention| page.text(mention))
                .collect();
            tweet.emojis = page
                .find_many(block, &loc.emojis)
                .into_iter()
                .filter_map(|emoji| page.attr(emoji, "alt"))
                .map(|alt| escape_unicode(&alt))
                .collect();
        }

        tweet.profile_image =
            Field::Value(attr_of(page, card, &loc.avatar, "src").unwrap_or_default());

        let link = attr_of(page, card, &loc.link, "href").map(|href| match page.base_url() {
            Some(base) => base.join(&href).map(|u| u.to_string()).unwrap_or(href),
            None => href,
        });
        tweet.tweet_id = Field::Value(link.as_deref().map(tweet_id_from_link).unwrap_or_default());
        tweet.tweet_link = Field::Value(link.unwrap_or_default());

        if self.options.poster_details {
            if let Some(name) = page.find_one(card, &loc.user) {
                let details = poster_details(page, name, &loc.hover, &self.options.hover);
                tweet.user_id = details.user_id;
                tweet.following_count = details.following_count;
                tweet.followers_count = details.followers_count;
            }
        }

        tweet
    }
}

/// Extract one tweet card
pub fn extract_tweet<'a, P: Page>(
    card: P::Node<'a>,
    page: &'a P,
    options: &TweetOptions,
) -> Result<Tweet> {
    Ok(TweetExtractor::new(*options)?.extract(card, page))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::page::{CardId, HtmlPage};
    use std::cell::Cell;
    use std::time::Duration;
    use url::Url;

    const FULL: &str = r#"
    <html><body>
    <article data-testid="tweet">
        <div data-testid="Tweet-User-Avatar"><img src="https://pbs.twimg.com/alice.jpg"></div>
        <div data-testid="User-Name">
            <a href="/alice"><span>Alice</span></a>
            <svg data-testid="icon-verified"></svg>
            <span>@alice</span>
        </div>
        <a href="/alice/status/1740000000000000001"><time datetime="2024-01-01T00:00:00.000Z">Jan 1</time></a>
        <div data-testid="tweetText"><span>Hello world</span><a href="/hashtag/rust?src=hashtag_click">#rust</a><a href="/bob">@bob</a><img src="https://abs-0.twimg.com/emoji/v2/svg/1f600.svg" alt="😀"></div>
        <button data-testid="reply"><span></span></button>
        <button data-testid="retweet"><span>12</span></button>
        <button data-testid="like"><span>1.2K</span></button>
        <a href="/alice/status/1740000000000000001/analytics"><span>45K</span></a>
    </article>
    </body></html>
    "#;

    fn first_card(page: &HtmlPage, extractor: &TweetExtractor) -> Tweet {
        let cards = page.find_many(page.root(), extractor.cards());
        extractor.extract(cards[0], page)
    }

    #[test]
    fn test_full_tweet() {
        let page = HtmlPage::parse(FULL).with_base_url(Url::parse("https://x.com/search").unwrap());
        let tweet = first_card(&page, &TweetExtractor::new(TweetOptions::default()).unwrap());

        assert!(!tweet.error);
        assert!(!tweet.promoted);
        assert_eq!(tweet.user, "Alice");
        assert_eq!(tweet.handle, "@alice");
        assert_eq!(tweet.timestamp, "2024-01-01T00:00:00.000Z");
        assert!(tweet.verified);
        assert_eq!(tweet.content, "Hello world#rust@bob");
        assert_eq!(tweet.reply_count, "0");
        assert_eq!(tweet.retweet_count, "12");
        assert_eq!(tweet.like_count, "1.2K");
        assert_eq!(tweet.view_count, "45K");
        assert_eq!(tweet.tags, vec!["#rust"]);
        assert_eq!(tweet.mentions, vec!["@bob"]);
        assert_eq!(tweet.emojis, vec!["\\U0001f600"]);
        assert_eq!(tweet.profile_image, "https://pbs.twimg.com/alice.jpg");
        assert_eq!(
            tweet.tweet_link,
            "https://x.com/alice/status/1740000000000000001"
        );
        assert_eq!(tweet.tweet_id, "1740000000000000001");
        assert_eq!(tweet.following_count, "0");
        assert_eq!(tweet.user_id, None);
    }

    #[test]
    fn test_missing_timestamp_is_promoted() {
        let html = FULL.replace(r#"<time datetime="2024-01-01T00:00:00.000Z">Jan 1</time>"#, "Ad");
        let page = HtmlPage::parse(&html);
        let tweet = first_card(&page, &TweetExtractor::new(TweetOptions::default()).unwrap());

        assert!(tweet.promoted);
        assert!(tweet.is_promoted());
        assert!(tweet.error);
        assert_eq!(tweet.timestamp, "skip");
        assert_eq!(tweet.user, "Alice");
        // Remaining extraction is skipped
        assert_eq!(tweet.content, "skip");
        assert_eq!(tweet.like_count, "skip");
        assert!(tweet.tags.is_empty());
        assert!(!tweet.verified);
    }

    #[test]
    fn test_missing_handle_still_extracts() {
        let html = FULL.replace("<span>@alice</span>", "");
        let page = HtmlPage::parse(&html);
        let tweet = first_card(&page, &TweetExtractor::new(TweetOptions::default()).unwrap());

        assert!(tweet.error);
        assert!(!tweet.promoted);
        assert_eq!(tweet.handle, "skip");
        assert_eq!(tweet.like_count, "1.2K");
    }

    #[test]
    fn test_escape_unicode() {
        assert_eq!(escape_unicode("abc"), "abc");
        assert_eq!(escape_unicode("é"), "\\xe9");
        assert_eq!(escape_unicode("🔥"), "\\U0001f525");
        assert_eq!(escape_unicode("❤"), "\\u2764");
        assert_eq!(escape_unicode("©\u{fe0f}"), "\\xa9\\ufe0f");
        assert_eq!(escape_unicode("é😀©\u{fe0f}❤"), "\\xe9\\U0001f600\\xa9\\ufe0f\\u2764");
    }

    #[test]
    fn test_escape_unicode_ascii_controls() {
        assert_eq!(escape_unicode("a\\b"), "a\\\\b");
        assert_eq!(escape_unicode("\t\n\r"), "\\t\\n\\r");
        assert_eq!(escape_unicode("\u{1}\u{7f}"), "\\x01\\x7f");
        assert_eq!(escape_unicode("\"it's\""), "\"it's\"");
    }

    #[test]
    fn test_tweet_id_from_link() {
        assert_eq!(tweet_id_from_link("/alice/status/42"), "42");
        assert_eq!(tweet_id_from_link("https://x.com/alice/status/42/"), "42");
        assert_eq!(tweet_id_from_link(""), "");
    }

    /// Snapshot whose hover card only shows up after a few hovers
    struct LateHoverPage {
        inner: HtmlPage,
        hovers: Cell<u32>,
        ready_after: u32,
    }

    impl Page for LateHoverPage {
        type Node<'a> = scraper::ElementRef<'a>;

        fn root(&self) -> Self::Node<'_> {
            self.inner.root()
        }

        fn find_many<'a>(&'a self, scope: Self::Node<'a>, locator: &Locator) -> Vec<Self::Node<'a>> {
            let found = self.inner.find_many(scope, locator);
            let hover_card = found
                .iter()
                .any(|el| el.value().attr("data-testid") == Some("hoverCardParent"));
            if hover_card && self.hovers.get() < self.ready_after {
                return Vec::new();
            }
            found
        }

        fn text<'a>(&'a self, node: Self::Node<'a>) -> String {
            self.inner.text(node)
        }

        fn attr<'a>(&'a self, node: Self::Node<'a>, name: &str) -> Option<String> {
            self.inner.attr(node, name)
        }

        fn card_id<'a>(&'a self, node: Self::Node<'a>) -> CardId {
            self.inner.card_id(node)
        }

        fn shadow_root(&self, id: &str) -> Option<Self::Node<'_>> {
            self.inner.shadow_root(id)
        }

        fn hover<'a>(&'a self, _node: Self::Node<'a>) -> std::result::Result<(), PageError> {
            self.hovers.set(self.hovers.get() + 1);
            Ok(())
        }
    }

    fn with_hover_card(ready_after: u32) -> LateHoverPage {
        let hover = r#"
        <div data-testid="hoverCardParent">
            <div data-testid="1234-follow">Follow</div>
            <a href="/alice/following"><span>321</span></a>
            <a href="/alice/verified_followers"><span>9.8M</span></a>
        </div>
        "#;
        LateHoverPage {
            inner: HtmlPage::parse(&FULL.replace("</body>", &format!("{hover}</body>"))),
            hovers: Cell::new(0),
            ready_after,
        }
    }

    fn poster_options() -> TweetOptions {
        TweetOptions {
            poster_details: true,
            hover: RetryPolicy::new(3, Duration::ZERO),
        }
    }

    #[test]
    fn test_poster_details_after_retries() {
        let page = with_hover_card(3);
        let extractor = TweetExtractor::new(poster_options()).unwrap();
        let cards = page.find_many(page.root(), extractor.cards());
        let tweet = extractor.extract(cards[0], &page);

        assert_eq!(page.hovers.get(), 3);
        assert_eq!(tweet.user_id.as_deref(), Some("1234"));
        assert_eq!(tweet.following_count, "321");
        assert_eq!(tweet.followers_count, "9.8M");
        assert!(!tweet.error);
    }

    #[test]
    fn test_poster_details_give_up() {
        let page = with_hover_card(10);
        let extractor = TweetExtractor::new(poster_options()).unwrap();
        let cards = page.find_many(page.root(), extractor.cards());
        let tweet = extractor.extract(cards[0], &page);

        assert_eq!(page.hovers.get(), 3);
        assert_eq!(tweet.user_id, None);
        assert_eq!(tweet.following_count, "0");
        assert_eq!(tweet.followers_count, "0");
        assert!(!tweet.error);
    }
}
