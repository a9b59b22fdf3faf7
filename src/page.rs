//! The page collaborator
//!
//! Extraction never talks to a browser directly. It goes through [`Page`],
//! which exposes the handful of DOM queries the extractors need. The crate
//! ships [`HtmlPage`], a parsed snapshot of rendered HTML; a live driver
//! can implement the same trait.

use std::fmt;
use std::path::Path;

use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use sha2::{Digest, Sha256};
use url::Url;

use crate::error::{PageError, Result};
use crate::locator::Locator;

/// Identity of a card within one scrape session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CardId(String);

impl CardId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CardId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A queryable DOM.
///
/// Implementations must bound every lookup: a lookup that cannot be
/// answered in time returns `None`, never blocks.
pub trait Page {
    type Node<'a>: Copy
    where
        Self: 'a;

    fn root(&self) -> Self::Node<'_>;

    /// All descendants of `scope` matching `locator`, in document order
    fn find_many<'a>(&'a self, scope: Self::Node<'a>, locator: &Locator) -> Vec<Self::Node<'a>>;

    /// First descendant of `scope` matching `locator`
    fn find_one<'a>(&'a self, scope: Self::Node<'a>, locator: &Locator) -> Option<Self::Node<'a>> {
        self.find_many(scope, locator).into_iter().next()
    }

    fn text<'a>(&'a self, node: Self::Node<'a>) -> String;

    fn attr<'a>(&'a self, node: Self::Node<'a>, name: &str) -> Option<String>;

    /// Session-stable identity of a node
    fn card_id<'a>(&'a self, node: Self::Node<'a>) -> CardId;

    /// Page-level lookup of the shadow root hosted by the element with `id`
    fn shadow_root(&self, id: &str) -> Option<Self::Node<'_>>;

    /// Move the pointer over `node`
    fn hover<'a>(&'a self, _node: Self::Node<'a>) -> std::result::Result<(), PageError> {
        Err(PageError::Unsupported("hover"))
    }

    /// Script escape hatch used by live pages for scrolling
    fn execute_script(&self, _script: &str) -> std::result::Result<Value, PageError> {
        Err(PageError::Unsupported("execute_script"))
    }

    /// URL the page was loaded from, used to resolve relative links
    fn base_url(&self) -> Option<&Url> {
        None
    }
}

/// A parsed HTML snapshot.
///
/// Hovering is a no-op: whatever hover card was rendered when the
/// snapshot was taken is already part of the document.
pub struct HtmlPage {
    document: Html,
    base_url: Option<Url>,
}

impl HtmlPage {
    pub fn parse(html: &str) -> Self {
        Self {
            document: Html::parse_document(html),
            base_url: None,
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let html = std::fs::read_to_string(path)?;
        Ok(Self::parse(&html))
    }

    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    pub fn document(&self) -> &Html {
        &self.document
    }
}

impl fmt::Debug for HtmlPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HtmlPage")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

/// Text of the element's direct text children only
fn own_text(el: ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text().map(|t| String::from(&**t)))
        .collect()
}

impl Page for HtmlPage {
    type Node<'a> = ElementRef<'a>;

    fn root(&self) -> ElementRef<'_> {
        self.document.root_element()
    }

    fn find_many<'a>(&'a self, scope: ElementRef<'a>, locator: &Locator) -> Vec<ElementRef<'a>> {
        scope
            .select(locator.selector())
            .filter(|el| !locator.has_text_filter() || locator.accepts_text(&own_text(*el)))
            .collect()
    }

    fn find_one<'a>(&'a self, scope: ElementRef<'a>, locator: &Locator) -> Option<ElementRef<'a>> {
        scope
            .select(locator.selector())
            .find(|el| !locator.has_text_filter() || locator.accepts_text(&own_text(*el)))
    }

    fn text<'a>(&'a self, node: ElementRef<'a>) -> String {
        node.text().collect::<String>().trim().to_string()
    }

    fn attr<'a>(&'a self, node: ElementRef<'a>, name: &str) -> Option<String> {
        node.value().attr(name).map(String::from)
    }

    fn card_id<'a>(&'a self, node: ElementRef<'a>) -> CardId {
        let mut hasher = Sha256::new();
        hasher.update(node.html().as_bytes());
        CardId(hex::encode(hasher.finalize()))
    }

    fn shadow_root(&self, id: &str) -> Option<ElementRef<'_>> {
        let host_selector = format!(r#"[id="{}"]"#, id.replace('\\', "\\\\").replace('"', "\\\""));
        let host_selector = Selector::parse(&host_selector).ok()?;
        let host = self.document.select(&host_selector).next()?;

        // Declarative shadow DOM serialises the root as a template child
        let template = Selector::parse("template[shadowrootmode]").ok()?;
        let shadow = host
            .children()
            .filter_map(ElementRef::wrap)
            .find(|child| template.matches(child));

        Some(shadow.unwrap_or(host))
    }

    fn hover<'a>(&'a self, _node: ElementRef<'a>) -> std::result::Result<(), PageError> {
        Ok(())
    }

    fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }
}
