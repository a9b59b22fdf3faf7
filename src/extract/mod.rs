//! Per-card record extraction
//!
//! Each extractor owns its compiled locators and turns one card into one
//! complete record. Lookups return `Option`; a miss on a required field
//! flips the record's `error` flag, a miss anywhere else falls back to a
//! default. Extraction never fails the caller.

mod poster;
mod reddit;
mod x;

pub use poster::*;
pub use reddit::*;
pub use x::*;

use tracing::debug;

use crate::locator::Locator;
use crate::page::Page;
use crate::record::{Field, Record};

/// Turns cards of one kind into records.
pub trait Extractor {
    type Output: Record;

    /// Locator for the cards this extractor understands
    fn cards(&self) -> &Locator;

    fn extract<'a, P: Page>(&self, card: P::Node<'a>, page: &'a P) -> Self::Output;
}

/// Trimmed text of the first match
fn text_of<'a, P: Page>(page: &'a P, scope: P::Node<'a>, locator: &Locator) -> Option<String> {
    page.find_one(scope, locator).map(|node| page.text(node))
}

fn attr_of<'a, P: Page>(
    page: &'a P,
    scope: P::Node<'a>,
    locator: &Locator,
    name: &str,
) -> Option<String> {
    page.find_one(scope, locator)
        .and_then(|node| page.attr(node, name))
}

/// Raw display count, "0" when the node is absent or blank
fn count_of<'a, P: Page>(page: &'a P, scope: Option<P::Node<'a>>, locator: &Locator) -> String {
    scope
        .and_then(|scope| text_of(page, scope, locator))
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| "0".to_string())
}

/// Texts of every match concatenated in encounter order, `None` if nothing matched
fn joined_text<'a, P: Page>(page: &'a P, scope: P::Node<'a>, locator: &Locator) -> Option<String> {
    let nodes = page.find_many(scope, locator);
    if nodes.is_empty() {
        return None;
    }
    Some(nodes.into_iter().map(|node| page.text(node)).collect())
}

/// Tracks required-field misses for one record
#[derive(Debug, Default)]
struct Required {
    error: bool,
}

impl Required {
    fn field(&mut self, name: &str, value: Option<String>) -> Field {
        if value.is_none() {
            debug!(field = name, "required field missing");
            self.error = true;
        }
        Field::from(value)
    }
}
