//! Blocking page fetches
//!
//! Every request runs under the agent's global timeout, so a stalled
//! server costs one skipped URL, never a hung session.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::config::FetchConfig;
use crate::error::{Result, ScrapeError};
use crate::page::HtmlPage;

pub struct Fetcher {
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(config: &FetchConfig) -> Self {
        let agent = ureq::Agent::new_with_config(
            ureq::Agent::config_builder()
                .timeout_global(Some(Duration::from_secs(config.timeout_secs)))
                .user_agent(config.user_agent.as_str())
                .build(),
        );
        Self { agent }
    }

    pub fn fetch_text(&self, url: &str) -> Result<String> {
        debug!(url, "fetching");
        let resp = match self.agent.get(url).call() {
            Ok(resp) => resp,
            Err(ureq::Error::StatusCode(status)) => {
                return Err(ScrapeError::Http {
                    status,
                    url: url.to_string(),
                })
            }
            Err(e) => return Err(ScrapeError::Network(format!("Failed to fetch {url}: {e}"))),
        };

        if !resp.status().is_success() {
            return Err(ScrapeError::Http {
                status: resp.status().as_u16(),
                url: url.to_string(),
            });
        }

        Ok(resp.into_body().read_to_string()?)
    }

    /// Fetch a URL into a snapshot that resolves links against it
    pub fn fetch_page(&self, url: &str) -> Result<HtmlPage> {
        let base = Url::parse(url).map_err(|e| ScrapeError::Network(format!("Bad URL {url}: {e}")))?;
        let html = self.fetch_text(url)?;
        Ok(HtmlPage::parse(&html).with_base_url(base))
    }
}

/// X search results URL for a free-text query
pub fn search_url(query: &str) -> Result<String> {
    let url = Url::parse_with_params(
        "https://twitter.com/search",
        &[("q", query), ("src", "typed_query")],
    )
    .map_err(|e| ScrapeError::Network(e.to_string()))?;
    Ok(url.to_string())
}
