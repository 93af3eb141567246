//! Browserless sessions: plain HTTP fetches parsed with `scraper`.
//!
//! No JavaScript runs, so this backend only finds elements that are present
//! in the server-rendered markup. Lookups never poll; a missing element is
//! reported as not found immediately.

use super::chrome::user_agent_for;
use super::{BrowserError, BrowserSession, Probe, SessionProvider, Wait};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// Default ceiling for one page request, connection through body.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Opens [`HttpSession`]s.
#[derive(Debug, Clone)]
pub struct HttpProvider {
    user_agent: &'static str,
    timeout: Duration,
}

impl HttpProvider {
    /// `timeout` bounds each request as a whole; it is unrelated to how long
    /// extractors wait for elements.
    pub fn new(timeout: Duration) -> Self {
        Self {
            user_agent: user_agent_for(std::env::consts::OS),
            timeout,
        }
    }
}

impl SessionProvider for HttpProvider {
    type Session = HttpSession;

    async fn create(&self) -> Result<HttpSession, BrowserError> {
        let client = Client::builder()
            .user_agent(self.user_agent)
            .timeout(self.timeout)
            .build()
            .map_err(|e| BrowserError::Startup(e.to_string()))?;
        debug!("HTTP session ready");
        Ok(HttpSession { client, page: None })
    }
}

/// The most recently fetched page.
pub struct HttpSession {
    client: Client,
    page: Option<String>,
}

impl HttpSession {
    fn page(&self) -> Result<&str, BrowserError> {
        self.page
            .as_deref()
            .ok_or_else(|| BrowserError::Command("no page has been loaded".to_string()))
    }
}

impl BrowserSession for HttpSession {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        let navigation_error = |e: reqwest::Error| BrowserError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        };

        self.page = None;
        let body = self
            .client
            .get(url)
            .send()
            .await
            .and_then(|res| res.error_for_status())
            .map_err(navigation_error)?
            .text()
            .await
            .map_err(navigation_error)?;

        info!(bytes = body.len(), "Fetched page");
        self.page = Some(body);
        Ok(())
    }

    async fn probe_text(&mut self, probe: &Probe, _wait: Wait) -> Result<String, BrowserError> {
        let document = Html::parse_document(self.page()?);
        evaluate_probe(&document, probe)?.ok_or_else(|| BrowserError::NotFound {
            selector: probe.describe(),
        })
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.page().map(str::to_string)
    }

    async fn close(self) -> Result<(), BrowserError> {
        Ok(())
    }
}

/// Run `probe` against a parsed document.
///
/// Returns the trimmed text of the first element that matches the selector,
/// passes the `contains` filter and (when `inner` is set) has a matching
/// descendant. `Ok(None)` means nothing qualified.
pub fn evaluate_probe(document: &Html, probe: &Probe) -> Result<Option<String>, BrowserError> {
    let selector = parse_selector(probe.selector)?;
    let inner = probe.inner.map(parse_selector).transpose()?;

    for element in document.select(&selector) {
        if !probe.accepts(&visible_text(element)) {
            continue;
        }
        match &inner {
            None => return Ok(Some(visible_text(element).trim().to_string())),
            Some(inner) => {
                if let Some(child) = element.select(inner).next() {
                    return Ok(Some(visible_text(child).trim().to_string()));
                }
            }
        }
    }
    Ok(None)
}

fn visible_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>()
}

fn parse_selector(css: &str) -> Result<Selector, BrowserError> {
    Selector::parse(css).map_err(|_| BrowserError::Command(format!("invalid selector `{css}`")))
}
