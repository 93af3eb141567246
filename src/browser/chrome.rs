//! Headless Chrome sessions over WebDriver.
//!
//! Each session talks to a chromedriver server. By default a private
//! chromedriver process is started per session on a free local port and
//! stopped when the session closes; with an explicit WebDriver URL the session
//! connects to an already running server instead.
//!
//! # Browser profile
//!
//! Every session is started with the same flags (headless, no sandbox, no
//! `/dev/shm`, no GPU, 1920x1080 window) and a user agent chosen for the host
//! operating system. On Linux the Chromium and chromedriver binaries are
//! expected under `/usr/bin` and chromedriver logs to
//! `/tmp/chromedriver_shared.log`.

use super::{BrowserError, BrowserSession, Probe, SessionProvider, Wait};
use std::net::TcpListener;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use thirtyfour::ChromiumLikeCapabilities;
use thirtyfour::prelude::*;
use tokio::net::TcpStream;
use tokio::process::{Child, Command};
use tokio::time::{Instant, sleep};
use tracing::{debug, info, instrument, warn};

const WINDOWS_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const LINUX_USER_AGENT: &str = "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MACOS_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const LINUX_BROWSER_BINARY: &str = "/usr/bin/chromium-browser";
const LINUX_DRIVER_BINARY: &str = "/usr/bin/chromedriver";
const LINUX_DRIVER_LOG: &str = "/tmp/chromedriver_shared.log";

const WINDOW_SIZE: (u32, u32) = (1920, 1080);
const DRIVER_STARTUP_TIMEOUT: Duration = Duration::from_secs(10);
const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Fragments of WebDriver error messages that mean the session itself is
/// gone, as opposed to a lookup or page problem.
const SESSION_FAULT_MARKERS: &[&str] = &[
    "invalid session id",
    "no such window",
    "session deleted",
    "session not created",
    "target window already closed",
    "chrome not reachable",
    "disconnected: not connected to devtools",
    "connection refused",
    "error sending request",
];

/// User agent reported for the given `std::env::consts::OS` value.
///
/// Unknown systems get the Linux user agent.
pub fn user_agent_for(os: &str) -> &'static str {
    match os {
        "windows" => WINDOWS_USER_AGENT,
        "macos" => MACOS_USER_AGENT,
        _ => LINUX_USER_AGENT,
    }
}

/// How Chrome and chromedriver are launched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChromeProfile {
    pub user_agent: &'static str,
    /// Chrome/Chromium executable; `None` lets chromedriver find one.
    pub browser_binary: Option<PathBuf>,
    /// chromedriver executable, a bare name is looked up on `PATH`.
    pub driver_binary: PathBuf,
    pub driver_log: Option<PathBuf>,
    pub window: (u32, u32),
}

impl ChromeProfile {
    /// Profile for the operating system this binary runs on.
    pub fn detect() -> Self {
        Self::for_os(std::env::consts::OS)
    }

    pub fn for_os(os: &str) -> Self {
        if os == "linux" {
            Self {
                user_agent: user_agent_for(os),
                browser_binary: Some(PathBuf::from(LINUX_BROWSER_BINARY)),
                driver_binary: PathBuf::from(LINUX_DRIVER_BINARY),
                driver_log: Some(PathBuf::from(LINUX_DRIVER_LOG)),
                window: WINDOW_SIZE,
            }
        } else {
            Self {
                user_agent: user_agent_for(os),
                browser_binary: None,
                driver_binary: PathBuf::from("chromedriver"),
                driver_log: None,
                window: WINDOW_SIZE,
            }
        }
    }

    /// Command-line switches passed to Chrome.
    pub fn arguments(&self) -> Vec<String> {
        vec![
            "--headless".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            "--disable-gpu".to_string(),
            format!("--window-size={},{}", self.window.0, self.window.1),
            format!("user-agent={}", self.user_agent),
        ]
    }
}

/// Opens [`ChromeSession`]s.
#[derive(Debug, Clone)]
pub struct ChromeProvider {
    profile: ChromeProfile,
    webdriver_url: Option<String>,
}

impl ChromeProvider {
    pub fn new(profile: ChromeProfile, webdriver_url: Option<String>) -> Self {
        Self {
            profile,
            webdriver_url,
        }
    }
}

impl SessionProvider for ChromeProvider {
    type Session = ChromeSession;

    #[instrument(level = "info", skip_all)]
    async fn create(&self) -> Result<ChromeSession, BrowserError> {
        let (server_url, service) = match &self.webdriver_url {
            Some(url) => (url.clone(), None),
            None => {
                let service = DriverService::start(&self.profile).await?;
                (service.url(), Some(service))
            }
        };

        let mut caps = DesiredCapabilities::chrome();
        for arg in self.profile.arguments() {
            caps.add_arg(&arg).map_err(startup_error)?;
        }
        if let Some(binary) = &self.profile.browser_binary {
            caps.set_binary(&binary.to_string_lossy())
                .map_err(startup_error)?;
        }

        let driver = match WebDriver::new(server_url.as_str(), caps).await {
            Ok(driver) => driver,
            Err(e) => {
                if let Some(service) = service {
                    service.stop().await;
                }
                return Err(startup_error(e));
            }
        };

        info!(%server_url, "Chrome driver started successfully");
        Ok(ChromeSession { driver, service })
    }
}

/// A Chrome window driven through WebDriver.
pub struct ChromeSession {
    driver: WebDriver,
    service: Option<DriverService>,
}

impl ChromeSession {
    /// One lookup attempt. `Ok(None)` means nothing matched yet.
    async fn try_probe(&self, probe: &Probe) -> Result<Option<String>, BrowserError> {
        let elements = match self.driver.find_all(By::Css(probe.selector)).await {
            Ok(elements) => elements,
            Err(e) => {
                triage(e)?;
                return Ok(None);
            }
        };

        for element in elements {
            let text = match element.text().await {
                Ok(text) => text,
                Err(e) => {
                    triage(e)?;
                    continue;
                }
            };
            if !probe.accepts(&text) {
                continue;
            }

            let Some(inner) = probe.inner else {
                return Ok(Some(text.trim().to_string()));
            };
            match element.find(By::Css(inner)).await {
                Ok(child) => match child.text().await {
                    Ok(text) => return Ok(Some(text.trim().to_string())),
                    Err(e) => triage(e)?,
                },
                Err(e) => triage(e)?,
            }
        }

        Ok(None)
    }
}

impl BrowserSession for ChromeSession {
    #[instrument(level = "debug", skip(self))]
    async fn navigate(&mut self, url: &str) -> Result<(), BrowserError> {
        self.driver.goto(url).await.map_err(|e| {
            classify(e, |reason| BrowserError::Navigation {
                url: url.to_string(),
                reason,
            })
        })
    }

    async fn probe_text(&mut self, probe: &Probe, wait: Wait) -> Result<String, BrowserError> {
        let deadline = match wait {
            Wait::Poll(timeout) => Some((Instant::now() + timeout, timeout)),
            Wait::Once => None,
        };

        loop {
            if let Some(text) = self.try_probe(probe).await? {
                return Ok(text);
            }
            match deadline {
                Some((deadline, _)) if Instant::now() < deadline => sleep(POLL_INTERVAL).await,
                Some((_, timeout)) => {
                    return Err(BrowserError::Timeout {
                        selector: probe.describe(),
                        secs: timeout.as_secs(),
                    });
                }
                None => {
                    return Err(BrowserError::NotFound {
                        selector: probe.describe(),
                    });
                }
            }
        }
    }

    async fn page_source(&mut self) -> Result<String, BrowserError> {
        self.driver
            .source()
            .await
            .map_err(|e| classify(e, BrowserError::Command))
    }

    async fn close(self) -> Result<(), BrowserError> {
        let result = self
            .driver
            .quit()
            .await
            .map_err(|e| BrowserError::Session(e.to_string()));
        if let Some(service) = self.service {
            service.stop().await;
        }
        result
    }
}

/// A chromedriver child process serving one session.
struct DriverService {
    child: Child,
    port: u16,
}

impl DriverService {
    #[instrument(level = "info", skip_all, fields(driver = %profile.driver_binary.display()))]
    async fn start(profile: &ChromeProfile) -> Result<Self, BrowserError> {
        let port = free_port()?;

        let mut command = Command::new(&profile.driver_binary);
        command
            .arg(format!("--port={port}"))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true);
        if let Some(log) = &profile.driver_log {
            command.arg(format!("--log-path={}", log.display()));
        }

        info!(port, "Starting chromedriver");
        let child = command.spawn().map_err(|e| {
            BrowserError::Startup(format!(
                "could not launch {}: {e}",
                profile.driver_binary.display()
            ))
        })?;
        let service = Self { child, port };

        if let Err(e) = wait_for_port(port, DRIVER_STARTUP_TIMEOUT).await {
            service.stop().await;
            return Err(e);
        }
        Ok(service)
    }

    fn url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    async fn stop(mut self) {
        if let Err(e) = self.child.kill().await {
            debug!(error = %e, "chromedriver already exited");
        }
    }
}

fn free_port() -> Result<u16, BrowserError> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|e| BrowserError::Startup(format!("no free local port: {e}")))?;
    let port = listener
        .local_addr()
        .map_err(|e| BrowserError::Startup(format!("no free local port: {e}")))?
        .port();
    Ok(port)
}

async fn wait_for_port(port: u16, timeout: Duration) -> Result<(), BrowserError> {
    let deadline = Instant::now() + timeout;
    loop {
        if TcpStream::connect(("127.0.0.1", port)).await.is_ok() {
            return Ok(());
        }
        if Instant::now() >= deadline {
            warn!(port, "chromedriver did not start listening");
            return Err(BrowserError::Startup(format!(
                "chromedriver did not listen on port {port} within {}s",
                timeout.as_secs()
            )));
        }
        sleep(Duration::from_millis(100)).await;
    }
}

/// Whether a WebDriver error message means the session is unusable.
pub fn looks_like_session_fault(message: &str) -> bool {
    let message = message.to_lowercase();
    SESSION_FAULT_MARKERS
        .iter()
        .any(|marker| message.contains(marker))
}

/// Map a WebDriver error to [`BrowserError::Session`] when the session is
/// gone, otherwise to whatever `otherwise` builds from the message.
fn classify(e: WebDriverError, otherwise: impl FnOnce(String) -> BrowserError) -> BrowserError {
    classify_message(&e.to_string(), otherwise)
}

fn classify_message(message: &str, otherwise: impl FnOnce(String) -> BrowserError) -> BrowserError {
    if looks_like_session_fault(message) {
        BrowserError::Session(message.to_string())
    } else {
        otherwise(message.to_string())
    }
}

/// `Err` for session faults, `Ok` for errors a lookup can shrug off.
fn triage(e: WebDriverError) -> Result<(), BrowserError> {
    let message = e.to_string();
    if looks_like_session_fault(&message) {
        Err(BrowserError::Session(message))
    } else {
        debug!(error = %message, "Lookup attempt failed");
        Ok(())
    }
}

fn startup_error(e: WebDriverError) -> BrowserError {
    BrowserError::Startup(e.to_string())
}
