use std::sync::Arc;
use std::time::Duration;

use headless_chrome::{Browser, LaunchOptions, Tab};
use tracing::debug;

use crate::error::ScrapeError;

/// Browser-automation handle the orchestrator drives. One session is a single
/// shared, stateful resource: all navigation against it is strictly
/// sequential. Mockable seam for orchestrator tests.
pub trait BrowserSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError>;
    fn body_text(&mut self) -> Result<String, ScrapeError>;
    fn close(&mut self);
}

/// Acquires fresh sessions, one per query in batch mode. Acquisition failure
/// is fatal to the query it was meant for and must not leak resources.
pub trait SessionProvider {
    type Session: BrowserSession;
    fn acquire(&self) -> Result<Self::Session, ScrapeError>;
}

#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    pub nav_timeout: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            nav_timeout: Duration::from_secs(30),
        }
    }
}

/// A headless Chrome tab. The browser process is killed when the session is
/// dropped, so an acquisition that fails partway leaves nothing behind.
pub struct ChromeSession {
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(options: &SessionOptions) -> Result<Self, ScrapeError> {
        let launch = LaunchOptions::default_builder()
            .headless(options.headless)
            .build()
            .map_err(|e| ScrapeError::SessionInitFailure(e.to_string()))?;
        let browser =
            Browser::new(launch).map_err(|e| ScrapeError::SessionInitFailure(e.to_string()))?;
        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::SessionInitFailure(e.to_string()))?;
        tab.set_default_timeout(options.nav_timeout);
        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

impl BrowserSession for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), ScrapeError> {
        self.tab
            .navigate_to(url)
            .and_then(|tab| tab.wait_until_navigated())
            .map(|_| ())
            .map_err(|e| ScrapeError::Navigation(e.to_string()))
    }

    fn body_text(&mut self) -> Result<String, ScrapeError> {
        self.tab
            .find_element("body")
            .and_then(|body| body.get_inner_text())
            .map_err(|e| ScrapeError::Navigation(e.to_string()))
    }

    fn close(&mut self) {
        // the browser process itself dies when `_browser` drops
        if let Err(e) = self.tab.close(true) {
            debug!(error = %e, "tab close failed, relying on browser teardown");
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ChromeSessionProvider {
    pub options: SessionOptions,
}

impl SessionProvider for ChromeSessionProvider {
    type Session = ChromeSession;

    fn acquire(&self) -> Result<ChromeSession, ScrapeError> {
        ChromeSession::launch(&self.options)
    }
}
