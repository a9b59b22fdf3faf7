//! Batch driver
//!
//! Polls a feed for cards, extracts the ones not seen yet this session,
//! and asks the feed to reveal more until the target is reached or the
//! feed stops producing anything new.

use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::error::Result;
use crate::extract::Extractor;
use crate::feed::Feed;
use crate::page::Page;
use crate::record::Record;
use crate::seen::SeenSet;
use crate::sink::Sink;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DriveOptions {
    /// Stop once this many records were written
    pub target: usize,
    /// Reveal after this many new cards since the last reveal
    pub reveal_threshold: usize,
    /// Only look at the last N cards of each query
    pub window: Option<usize>,
    pub reveal_delay: Duration,
    pub card_delay: Duration,
    pub max_passes: usize,
}

impl Default for DriveOptions {
    fn default() -> Self {
        Self {
            target: 50,
            reveal_threshold: 20,
            window: None,
            reveal_delay: Duration::from_secs(2),
            card_delay: Duration::ZERO,
            max_passes: 500,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriveSummary {
    pub emitted: usize,
    pub promoted: usize,
    pub with_errors: usize,
    pub passes: usize,
    pub reveals: usize,
    /// The session ran out of passes instead of stopping on its own
    pub pass_limit_hit: bool,
}

pub struct Driver<E> {
    extractor: E,
    options: DriveOptions,
}

impl<E: Extractor> Driver<E> {
    pub fn new(extractor: E, options: DriveOptions) -> Self {
        Self { extractor, options }
    }

    pub fn options(&self) -> &DriveOptions {
        &self.options
    }

    /// Run one scrape session. The seen-set lives exactly as long as this call.
    pub fn run<F, S>(&self, feed: &mut F, sink: &mut S) -> Result<DriveSummary>
    where
        F: Feed,
        S: Sink<E::Output>,
    {
        let mut seen = SeenSet::new();
        let mut summary = DriveSummary::default();
        let mut since_reveal = 0;
        let mut just_revealed = false;

        loop {
            if summary.passes >= self.options.max_passes {
                warn!(max_passes = self.options.max_passes, "pass limit reached");
                summary.pass_limit_hit = true;
                break;
            }
            summary.passes += 1;
            let fresh = self.pass(feed.page(), &mut seen, sink, &mut summary)?;
            debug!(pass = summary.passes, fresh, emitted = summary.emitted, "pass done");

            if summary.emitted >= self.options.target {
                break;
            }
            if fresh == 0 && just_revealed {
                info!("no new cards after reveal, stopping");
                break;
            }

            since_reveal += fresh;
            just_revealed = false;
            if fresh > 0 && since_reveal < self.options.reveal_threshold {
                continue;
            }

            match feed.reveal() {
                Ok(true) => {
                    summary.reveals += 1;
                    since_reveal = 0;
                    just_revealed = true;
                    if !self.options.reveal_delay.is_zero() {
                        thread::sleep(self.options.reveal_delay);
                    }
                }
                Ok(false) => {
                    info!("feed exhausted");
                    break;
                }
                Err(e) => {
                    warn!(error = %e, "reveal failed, ending session");
                    break;
                }
            }
        }

        sink.flush()?;
        info!(
            emitted = summary.emitted,
            promoted = summary.promoted,
            with_errors = summary.with_errors,
            reveals = summary.reveals,
            "session finished"
        );
        Ok(summary)
    }

    /// Extract every unseen card currently on the page. Returns how many
    /// cards were new, promoted ones included.
    fn pass<P, S>(
        &self,
        page: &P,
        seen: &mut SeenSet,
        sink: &mut S,
        summary: &mut DriveSummary,
    ) -> Result<usize>
    where
        P: Page,
        S: Sink<E::Output>,
    {
        let mut cards = page.find_many(page.root(), self.extractor.cards());
        if let Some(window) = self.options.window {
            let skip = cards.len().saturating_sub(window);
            cards.drain(..skip);
        }

        let mut fresh = 0;
        for card in cards {
            if summary.emitted >= self.options.target {
                break;
            }
            if !seen.mark(page.card_id(card)) {
                continue;
            }
            fresh += 1;

            let record = self.extractor.extract(card, page);
            if record.is_promoted() {
                summary.promoted += 1;
                continue;
            }
            if record.has_error() {
                summary.with_errors += 1;
            }

            sink.write(record)?;
            summary.emitted += 1;
            if summary.emitted < self.options.target && !self.options.card_delay.is_zero() {
                thread::sleep(self.options.card_delay);
            }
        }

        Ok(fresh)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PageError;
    use crate::extract::{PostExtractor, RedditPost, TweetExtractor, TweetOptions};
    use crate::page::HtmlPage;
    use crate::sink::MemorySink;

    /// In-memory snapshots; each reveal appends the next batch of cards.
    struct Scroll {
        batches: Vec<Vec<&'static str>>,
        shown: usize,
        page: HtmlPage,
        reveals_fail: bool,
    }

    fn post_card(id: &str) -> String {
        format!(
            r#"<article class="w-full m-0"><shreddit-post id="{id}"><a href="/user/u{id}/"><span class="whitespace-nowrap">u{id}</span></a><a slot="title">Title {id}</a><a target="_blank">link</a><time datetime="2024-01-01T00:00:00Z"></time></shreddit-post></article>"#
        )
    }

    impl Scroll {
        fn new(batches: Vec<Vec<&'static str>>) -> Self {
            let mut scroll = Self {
                batches,
                shown: 1,
                page: HtmlPage::parse(""),
                reveals_fail: false,
            };
            scroll.render();
            scroll
        }

        fn render(&mut self) {
            let body: String = self.batches[..self.shown]
                .iter()
                .flatten()
                .map(|id| post_card(id))
                .collect();
            self.page = HtmlPage::parse(&format!("<html><body>{body}</body></html>"));
        }
    }

    impl Feed for Scroll {
        type Page = HtmlPage;

        fn page(&self) -> &HtmlPage {
            &self.page
        }

        fn reveal(&mut self) -> std::result::Result<bool, PageError> {
            if self.reveals_fail {
                return Err(PageError::Stale);
            }
            if self.shown == self.batches.len() {
                return Ok(false);
            }
            self.shown += 1;
            self.render();
            Ok(true)
        }
    }

    fn options(target: usize, reveal_threshold: usize) -> DriveOptions {
        DriveOptions {
            target,
            reveal_threshold,
            reveal_delay: Duration::ZERO,
            ..DriveOptions::default()
        }
    }

    fn ids(sink: &MemorySink<RedditPost>) -> Vec<String> {
        sink.records().iter().map(|p| p.post_id.to_string()).collect()
    }

    #[test]
    fn test_each_card_extracted_once() {
        // Cards re-surface in later batches alongside new ones
        let mut feed = Scroll::new(vec![vec!["a", "b"], vec!["b", "c"], vec!["a", "d"]]);
        let driver = Driver::new(PostExtractor::new().unwrap(), options(50, 1));
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(ids(&sink), vec!["a", "b", "c", "d"]);
        assert_eq!(summary.emitted, 4);
        assert_eq!(summary.reveals, 2);
        assert_eq!(summary.with_errors, 0);
    }

    #[test]
    fn test_stops_at_target() {
        let mut feed = Scroll::new(vec![vec!["a", "b", "c"], vec!["d"]]);
        let driver = Driver::new(PostExtractor::new().unwrap(), options(2, 1));
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(ids(&sink), vec!["a", "b"]);
        assert_eq!(summary.reveals, 0);
    }

    #[test]
    fn test_stops_when_reveal_brings_nothing_new() {
        let mut feed = Scroll::new(vec![vec!["a"], vec!["a"], vec!["b"]]);
        let driver = Driver::new(PostExtractor::new().unwrap(), options(50, 1));
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(ids(&sink), vec!["a"]);
        assert_eq!(summary.reveals, 1);
        assert_eq!(summary.passes, 2);
    }

    #[test]
    fn test_below_threshold_requeries_before_revealing() {
        let mut feed = Scroll::new(vec![vec!["a"], vec!["b"]]);
        let driver = Driver::new(PostExtractor::new().unwrap(), options(50, 5));
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        // pass 1 finds "a", pass 2 finds nothing and reveals, pass 3 finds "b",
        // pass 4 finds nothing and the feed is exhausted
        assert_eq!(ids(&sink), vec!["a", "b"]);
        assert_eq!(summary.passes, 4);
        assert_eq!(summary.reveals, 1);
    }

    #[test]
    fn test_window_limits_cards_per_pass() {
        let mut feed = Scroll::new(vec![vec!["a", "b", "c"]]);
        let driver = Driver::new(
            PostExtractor::new().unwrap(),
            DriveOptions {
                window: Some(2),
                ..options(50, 1)
            },
        );
        let mut sink = MemorySink::new();

        driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(ids(&sink), vec!["b", "c"]);
    }

    #[test]
    fn test_failed_reveal_ends_session_with_what_was_written() {
        let mut feed = Scroll::new(vec![vec!["a"], vec!["b"]]);
        feed.reveals_fail = true;
        let driver = Driver::new(PostExtractor::new().unwrap(), options(50, 1));
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(ids(&sink), vec!["a"]);
        assert_eq!(summary.reveals, 0);
    }

    #[test]
    fn test_max_passes_bounds_the_loop() {
        let mut feed = Scroll::new(vec![vec!["a"], vec!["b"], vec!["c"]]);
        let driver = Driver::new(
            PostExtractor::new().unwrap(),
            DriveOptions {
                max_passes: 2,
                ..options(50, 1)
            },
        );
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(summary.passes, 2);
        assert!(summary.pass_limit_hit);
        assert_eq!(ids(&sink), vec!["a", "b"]);
    }

    #[test]
    fn test_stopping_on_last_allowed_pass_is_not_a_pass_limit() {
        let mut feed = Scroll::new(vec![vec!["a"]]);
        let driver = Driver::new(
            PostExtractor::new().unwrap(),
            DriveOptions {
                max_passes: 1,
                ..options(50, 1)
            },
        );
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(summary.passes, 1);
        assert!(!summary.pass_limit_hit);
        assert_eq!(ids(&sink), vec!["a"]);
    }

    #[test]
    fn test_zero_target_writes_nothing() {
        let mut feed = Scroll::new(vec![vec!["a", "b"]]);
        let driver = Driver::new(PostExtractor::new().unwrap(), options(0, 1));
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(summary.emitted, 0);
        assert_eq!(summary.passes, 1);
        assert!(sink.records().is_empty());
    }

    #[test]
    fn test_promoted_cards_are_counted_not_written() {
        let html = r#"<html><body>
            <article data-testid="tweet"><div data-testid="User-Name"><span>Ad Co</span></div><span>@adco</span></article>
            <article data-testid="tweet"><div data-testid="User-Name"><span>Alice</span></div><span>@alice</span><time datetime="2024-01-01T00:00:00Z"></time></article>
        </body></html>"#;
        let mut feed = HtmlPage::parse(html);
        let driver = Driver::new(
            TweetExtractor::new(TweetOptions::default()).unwrap(),
            options(50, 1),
        );
        let mut sink = MemorySink::new();

        let summary = driver.run(&mut feed, &mut sink).unwrap();

        assert_eq!(summary.promoted, 1);
        assert_eq!(summary.emitted, 1);
        assert_eq!(sink.records()[0].handle, "@alice");
    }
}
