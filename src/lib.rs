//! Feed scrapers for Reddit search results and X timelines
//!
//! Turns rendered feed pages into flat records:
//! - Reddit posts (user, title, content, votes, comments, timestamp)
//! - Tweets, with optional poster details from the author's hover card
//! - Reddit thread details from the `.json` listing
//!
//! A [`driver::Driver`] walks a [`feed::Feed`], extracts each card once
//! per session and hands the records to a [`sink::Sink`]. Fields that
//! cannot be found render as the `"skip"` sentinel.

pub mod config;
pub mod driver;
pub mod error;
pub mod extract;
pub mod feed;
pub mod fetch;
pub mod locator;
pub mod page;
pub mod record;
pub mod retry;
pub mod seen;
pub mod sink;
pub mod thread;

pub use error::{PageError, Result, ScrapeError};
pub use page::{CardId, HtmlPage, Page};
pub use record::{Field, Record, SENTINEL};
