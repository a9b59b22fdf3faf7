//! Feeds: pages that can reveal more cards

use std::path::{Path, PathBuf};

use tracing::debug;
use url::Url;

use crate::error::{PageError, Result};
use crate::page::{HtmlPage, Page};

pub trait Feed {
    type Page: Page;

    fn page(&self) -> &Self::Page;

    /// Make more cards queryable. `Ok(false)` once nothing more can appear.
    fn reveal(&mut self) -> std::result::Result<bool, PageError>;
}

/// A single snapshot never grows.
impl Feed for HtmlPage {
    type Page = HtmlPage;

    fn page(&self) -> &HtmlPage {
        self
    }

    fn reveal(&mut self) -> std::result::Result<bool, PageError> {
        Ok(false)
    }
}

/// Successive snapshots of one scrolling page; each reveal moves to the next.
#[derive(Debug)]
pub struct SnapshotFeed {
    paths: Vec<PathBuf>,
    index: usize,
    current: HtmlPage,
    base_url: Option<Url>,
}

impl SnapshotFeed {
    pub fn open(paths: Vec<PathBuf>, base_url: Option<Url>) -> Result<Self> {
        let current = match paths.first() {
            Some(path) => load(path, base_url.as_ref())?,
            None => HtmlPage::parse(""),
        };
        Ok(Self {
            paths,
            index: 0,
            current,
            base_url,
        })
    }

    pub fn position(&self) -> usize {
        self.index
    }
}

fn load(path: &Path, base_url: Option<&Url>) -> Result<HtmlPage> {
    let page = HtmlPage::from_file(path)?;
    Ok(match base_url {
        Some(url) => page.with_base_url(url.clone()),
        None => page,
    })
}

impl Feed for SnapshotFeed {
    type Page = HtmlPage;

    fn page(&self) -> &HtmlPage {
        &self.current
    }

    fn reveal(&mut self) -> std::result::Result<bool, PageError> {
        let Some(path) = self.paths.get(self.index + 1) else {
            return Ok(false);
        };
        debug!(path = %path.display(), "loading next snapshot");
        self.current = load(path, self.base_url.as_ref())
            .map_err(|e| PageError::Interaction(format!("{}: {e}", path.display())))?;
        self.index += 1;
        Ok(true)
    }
}
