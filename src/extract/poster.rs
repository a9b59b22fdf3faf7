//! Poster details pulled from the profile hover card
//!
//! Hovering is a side effect on a live page and the card may take a while
//! to render, so every lookup here goes through the same bounded retry.

use tracing::debug;

use crate::error::{PageError, Result};
use crate::locator::Locator;
use crate::page::Page;
use crate::retry::RetryPolicy;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PosterDetails {
    pub user_id: Option<String>,
    pub following_count: String,
    pub followers_count: String,
}

impl Default for PosterDetails {
    fn default() -> Self {
        Self {
            user_id: None,
            following_count: "0".to_string(),
            followers_count: "0".to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HoverLocators {
    pub hover_card: Locator,
    pub follow_button: Locator,
    pub following: Locator,
    pub followers: Locator,
}

impl HoverLocators {
    pub fn new() -> Result<Self> {
        Ok(Self {
            hover_card: Locator::css(r#"div[data-testid="hoverCardParent"]"#)?,
            follow_button: Locator::css(
                r#"div[data-testid*="-follow"], div[data-testid*="-unfollow"]"#,
            )?,
            following: Locator::css(r#"a[href*="/following"] span"#)?,
            followers: Locator::css(r#"a[href*="/verified_followers"] span"#)?,
        })
    }
}

/// `"12345-follow"` -> `Some("12345")`
fn user_id_from_testid(testid: &str) -> Option<String> {
    if testid.is_empty() {
        return None;
    }
    testid.split('-').next().map(String::from)
}

/// Hover over `name` and read the poster's id and follow counts.
///
/// Anything that cannot be read within `policy` keeps its default; a stale
/// node or unsupported hover gives up on the remaining fields.
pub fn poster_details<'a, P: Page>(
    page: &'a P,
    name: P::Node<'a>,
    locators: &HoverLocators,
    policy: &RetryPolicy,
) -> PosterDetails {
    let mut details = PosterDetails::default();

    let hover_card = policy.run(|attempt| {
        match page.hover(name) {
            Ok(()) => {}
            Err(PageError::Interaction(message)) => {
                debug!(attempt, %message, "hover failed, retrying");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }
        Ok(page.find_one(page.root(), &locators.hover_card))
    });

    let hover_card = match hover_card {
        Ok(Some(card)) => card,
        Ok(None) => {
            debug!(attempts = policy.attempts, "hover card never appeared");
            return details;
        }
        Err(e) => {
            debug!(error = %e, "giving up on poster details");
            return details;
        }
    };

    let lookup = |locator: &Locator| -> Option<P::Node<'a>> {
        policy
            .run(|_| Ok::<_, PageError>(page.find_one(hover_card, locator)))
            .ok()
            .flatten()
    };

    if let Some(button) = lookup(&locators.follow_button) {
        details.user_id = page
            .attr(button, "data-testid")
            .as_deref()
            .and_then(user_id_from_testid);
    }

    if let Some(node) = lookup(&locators.following) {
        let text = page.text(node);
        if !text.is_empty() {
            details.following_count = text;
        }
    }

    if let Some(node) = lookup(&locators.followers) {
        let text = page.text(node);
        if !text.is_empty() {
            details.followers_count = text;
        }
    }

    details
}
