//! Browser sessions used by the page extractors.
//!
//! A session is a live handle that can navigate to a URL and look elements up
//! on the loaded page. Two backends implement it:
//!
//! | Backend | Module | Notes |
//! |---------|--------|-------|
//! | Chrome via WebDriver | [`chrome`] | Headless Chrome driven through chromedriver; pages run JavaScript |
//! | Plain HTTP | [`http`] | One GET per page, parsed with `scraper`; only for server-rendered pages |
//!
//! # Ownership
//!
//! A run owns exactly one session at a time. Extractors receive it through a
//! [`SessionHandle`]: a borrowed handle is left open for the next target, an
//! owned handle is closed by the extractor before it returns.
//!
//! # Errors
//!
//! Element lookups that fail in expected ways (timeout, no match) and
//! navigation failures are ordinary [`BrowserError`] values. Only
//! [`BrowserError::Session`] and [`BrowserError::Startup`] mean the handle is
//! unusable and must be replaced.

pub mod chrome;
pub mod http;
#[cfg(test)]
pub mod testing;

use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BrowserError {
    #[error("failed to start browser session: {0}")]
    Startup(String),

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("timed out after {secs}s waiting for `{selector}`")]
    Timeout { selector: String, secs: u64 },

    #[error("no element matches `{selector}`")]
    NotFound { selector: String },

    #[error("driver command failed: {0}")]
    Command(String),

    #[error("browser session lost: {0}")]
    Session(String),
}

impl BrowserError {
    /// Whether the session that produced this error can no longer be used.
    pub fn is_session_fault(&self) -> bool {
        matches!(self, BrowserError::Session(_) | BrowserError::Startup(_))
    }
}

/// A CSS lookup for one piece of text on a page.
///
/// The element matched by `selector` must contain every string in `contains`
/// in its visible text. When `inner` is set, the text is read from the first
/// descendant matching `inner` instead of from the element itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub selector: &'static str,
    pub contains: &'static [&'static str],
    pub inner: Option<&'static str>,
}

impl Probe {
    pub const fn css(selector: &'static str) -> Self {
        Self {
            selector,
            contains: &[],
            inner: None,
        }
    }

    pub const fn containing(self, contains: &'static [&'static str]) -> Self {
        Self { contains, ..self }
    }

    pub const fn within(self, inner: &'static str) -> Self {
        Self {
            inner: Some(inner),
            ..self
        }
    }

    /// Whether an element with this visible text passes the `contains` filter.
    pub fn accepts(&self, text: &str) -> bool {
        self.contains.iter().all(|needle| text.contains(needle))
    }

    /// Selector description used in log lines and errors.
    pub fn describe(&self) -> String {
        match self.inner {
            Some(inner) => format!("{} {}", self.selector, inner),
            None => self.selector.to_string(),
        }
    }
}

/// How long a probe may wait for its element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wait {
    /// Poll until the element shows up or the duration elapses.
    Poll(Duration),
    /// Look once.
    Once,
}

/// A live browsing session.
pub trait BrowserSession {
    /// Load `url` in the session.
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError>;

    /// Trimmed text located by `probe` on the current page.
    ///
    /// With [`Wait::Poll`] a missing element is reported as
    /// [`BrowserError::Timeout`], with [`Wait::Once`] as
    /// [`BrowserError::NotFound`].
    async fn probe_text(&mut self, probe: &Probe, wait: Wait) -> Result<String, BrowserError>;

    /// Raw markup of the current page.
    async fn page_source(&mut self) -> Result<String, BrowserError>;

    /// Tear the session down.
    async fn close(self) -> Result<(), BrowserError>;
}

/// Something that can open new sessions.
pub trait SessionProvider {
    type Session: BrowserSession;

    async fn create(&self) -> Result<Self::Session, BrowserError>;
}

/// A session passed to an extractor, together with who is responsible for
/// closing it.
pub enum SessionHandle<'a, S> {
    /// The caller keeps the session and closes it later.
    Borrowed(&'a mut S),
    /// The extractor owns the session and closes it when done.
    Owned(S),
}

impl<S: BrowserSession> SessionHandle<'_, S> {
    pub fn session(&mut self) -> &mut S {
        match self {
            SessionHandle::Borrowed(session) => &mut **session,
            SessionHandle::Owned(session) => session,
        }
    }

    /// Close the session if this handle owns it; a borrowed session is left
    /// untouched.
    pub async fn release(self) {
        if let SessionHandle::Owned(session) = self {
            close_quietly(session).await;
        }
    }
}

/// Close a session, ignoring any failure.
pub async fn close_quietly<S: BrowserSession>(session: S) {
    if let Err(e) = session.close().await {
        debug!(error = %e, "Ignoring error while closing browser session");
    }
}
