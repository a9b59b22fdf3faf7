//! Field locators
//!
//! A locator is a compiled CSS selector plus an optional filter on the
//! element's own text, which covers the `contains(text(), ...)` lookups
//! that plain CSS cannot express.

use scraper::Selector;

use crate::error::{Result, ScrapeError};

#[derive(Debug, Clone)]
pub struct Locator {
    source: String,
    selector: Selector,
    contains_text: Option<String>,
}

impl Locator {
    /// Compile a CSS selector
    pub fn css(selector_str: &str) -> Result<Self> {
        let selector = Selector::parse(selector_str).map_err(|e| ScrapeError::Selector {
            selector: selector_str.to_string(),
            message: e.to_string(),
        })?;

        Ok(Self {
            source: selector_str.to_string(),
            selector,
            contains_text: None,
        })
    }

    /// Only match elements whose own text contains `needle`
    pub fn containing(mut self, needle: &str) -> Self {
        self.contains_text = Some(needle.to_string());
        self
    }

    pub fn selector(&self) -> &Selector {
        &self.selector
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether an element with the given own text passes the text filter
    pub fn accepts_text(&self, own_text: &str) -> bool {
        match &self.contains_text {
            Some(needle) => own_text.contains(needle.as_str()),
            None => true,
        }
    }

    pub fn has_text_filter(&self) -> bool {
        self.contains_text.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_selector() {
        let err = Locator::css("div[").unwrap_err();
        assert!(matches!(err, ScrapeError::Selector { .. }));
    }

    #[test]
    fn test_text_filter() {
        let plain = Locator::css("span").unwrap();
        assert!(plain.accepts_text("anything"));
        assert!(!plain.has_text_filter());

        let handle = Locator::css("span").unwrap().containing("@");
        assert!(handle.accepts_text("@alice"));
        assert!(!handle.accepts_text("Alice"));
        assert_eq!(handle.as_str(), "span");
    }
}
