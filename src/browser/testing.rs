//! Scripted sessions for tests.
//!
//! [`FakeBrowser`] serves canned pages keyed by URL and records every
//! session it creates and closes. Probes are evaluated with the same
//! `scraper` logic as the HTTP backend.

use super::http::evaluate_probe;
use super::{BrowserError, BrowserSession, Probe, SessionProvider, Wait};
use scraper::Html;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// What happens when a session navigates to a URL.
#[derive(Debug, Clone)]
pub enum Page {
    /// Serve this markup.
    Html(String),
    /// The navigation itself fails (DNS, HTTP error).
    Unreachable,
    /// The session dies; it stays dead for every later call.
    Crash,
}

#[derive(Debug, Default)]
pub struct Journal {
    pub created: usize,
    pub closed: usize,
    /// (session generation, url) for every navigation attempt.
    pub visits: Vec<(usize, String)>,
}

#[derive(Clone, Default)]
pub struct FakeBrowser {
    pages: Rc<HashMap<String, Page>>,
    journal: Rc<RefCell<Journal>>,
    fail_after: Option<usize>,
}

impl FakeBrowser {
    pub fn new(pages: impl IntoIterator<Item = (String, Page)>) -> Self {
        Self {
            pages: Rc::new(pages.into_iter().collect()),
            ..Self::default()
        }
    }

    /// Refuse to create more than `n` sessions.
    pub fn failing_after(mut self, n: usize) -> Self {
        self.fail_after = Some(n);
        self
    }

    pub fn journal(&self) -> std::cell::Ref<'_, Journal> {
        self.journal.borrow()
    }
}

impl SessionProvider for FakeBrowser {
    type Session = FakeSession;

    async fn create(&self) -> Result<FakeSession, BrowserError> {
        let mut journal = self.journal.borrow_mut();
        if self.fail_after.is_some_and(|n| journal.created >= n) {
            return Err(BrowserError::Startup("driver refused".to_string()));
        }
        journal.created += 1;
        Ok(FakeSession {
            generation: journal.created,
            pages: Rc::clone(&self.pages),
            journal: Rc::clone(&self.journal),
            current: None,
            crashed: false,
        })
    }
}

pub struct FakeSession {
    generation: usize,
    pages: Rc<HashMap<String, Page>>,
    journal: Rc<RefCell<Journal>>,
    current: Option<String>,
    crashed: bool,
}

impl FakeSession {
    fn alive(&self) -> Result<(), BrowserError> {
        if self.crashed {
            Err(BrowserError::Session("invalid session id".to_string()))
        } else {
            Ok(())
        }
    }
}

impl BrowserSession for FakeSession {
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.alive()?;
        self.journal
            .borrow_mut()
            .visits
            .push((self.generation, url.to_string()));

        match self.pages.get(url) {
            Some(Page::Html(html)) => {
                self.current = Some(html.clone());
                Ok(())
            }
            Some(Page::Crash) => {
                self.crashed = true;
                Err(BrowserError::Session("chrome not reachable".to_string()))
            }
            Some(Page::Unreachable) | None => Err(BrowserError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_string(),
            }),
        }
    }

    async fn probe_text(&mut self, probe: &Probe, wait: Wait) -> Result<String, BrowserError> {
        self.alive()?;
        let html = self.current.clone().unwrap_or_default();
        let found = evaluate_probe(&Html::parse_document(&html), probe)?;
        found.ok_or_else(|| match wait {
            Wait::Poll(timeout) => BrowserError::Timeout {
                selector: probe.describe(),
                secs: timeout.as_secs(),
            },
            Wait::Once => BrowserError::NotFound {
                selector: probe.describe(),
            },
        })
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.alive()?;
        Ok(self.current.clone().unwrap_or_default())
    }

    async fn close(self) -> Result<(), BrowserError> {
        self.journal.borrow_mut().closed += 1;
        if self.crashed {
            return Err(BrowserError::Session("already gone".to_string()));
        }
        Ok(())
    }
}
