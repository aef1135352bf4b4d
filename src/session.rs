//! Browser session adapter.
//!
//! [`BrowserControl`] is the primitive contract the interpreter runs
//! against: navigate, click, fill, query text, screenshot, close. The
//! production implementation is [`ChromeSession`], which drives Chrome over
//! the DevTools protocol via `headless_chrome`. Tests substitute a scripted
//! fake.

use std::ffi::OsStr;
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Page::CaptureScreenshotFormatOption;
use headless_chrome::{Browser, LaunchOptions, Tab};

use crate::error::{ActionError, LaunchError};

/// How a session is opened.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    pub headless: bool,
    /// Default timeout applied to every DevTools call on the tab. `None`
    /// keeps the protocol client's own default.
    pub step_timeout: Option<Duration>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            headless: true,
            step_timeout: None,
        }
    }
}

/// The primitive operations a run needs from a browser. One implementor per
/// remote-control protocol; the interpreter assumes nothing beyond this
/// contract.
pub trait BrowserControl {
    fn navigate(&mut self, url: &str) -> Result<(), ActionError>;
    fn click(&mut self, selector: &str) -> Result<(), ActionError>;
    fn fill(&mut self, selector: &str, value: &str) -> Result<(), ActionError>;
    /// Inner text of the first element matching `selector`, or
    /// [`ActionError::SelectorNotFound`].
    fn query_text(&mut self, selector: &str) -> Result<String, ActionError>;
    fn screenshot(&mut self, path: &str) -> Result<(), ActionError>;
    /// Release the underlying browser. The interpreter calls this on every
    /// exit path after a successful open.
    fn close(self);
}

/// A live Chrome instance plus the tab the run executes in.
pub struct ChromeSession {
    // Dropping the Browser tears down the child process, so even a panicked
    // run cannot leak a Chrome instance.
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    /// Launch a fresh Chrome and open one tab. This is the single point
    /// where a [`LaunchError`] is fatal to a run before any step executes.
    pub fn launch(options: &SessionOptions) -> Result<Self, LaunchError> {
        let launch = LaunchOptions {
            headless: options.headless,
            args: vec![
                OsStr::new("--no-first-run"),
                OsStr::new("--no-default-browser-check"),
            ],
            idle_browser_timeout: Duration::from_secs(120),
            ..Default::default()
        };

        let browser = Browser::new(launch).map_err(|e| LaunchError(e.to_string()))?;
        let tab = browser.new_tab().map_err(|e| LaunchError(e.to_string()))?;
        if let Some(timeout) = options.step_timeout {
            tab.set_default_timeout(timeout);
        }

        Ok(Self {
            _browser: browser,
            tab,
        })
    }
}

impl BrowserControl for ChromeSession {
    fn navigate(&mut self, url: &str) -> Result<(), ActionError> {
        let nav = |reason: anyhow::Error| ActionError::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        };
        self.tab.navigate_to(url).map_err(nav)?;
        self.tab.wait_until_navigated().map_err(nav)?;
        Ok(())
    }

    fn click(&mut self, selector: &str) -> Result<(), ActionError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| ActionError::SelectorNotFound(selector.to_string()))?;
        element
            .click()
            .map_err(|e| ActionError::Protocol(e.to_string()))?;
        Ok(())
    }

    fn fill(&mut self, selector: &str, value: &str) -> Result<(), ActionError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| ActionError::SelectorNotFound(selector.to_string()))?;
        element
            .click()
            .map_err(|e| ActionError::Protocol(e.to_string()))?;

        // Clear any existing value before typing; type_str only appends.
        let escaped = selector.replace('\'', "\\'");
        self.tab
            .evaluate(
                &format!("document.querySelector('{escaped}').value = ''"),
                false,
            )
            .map_err(|e| ActionError::Protocol(e.to_string()))?;
        self.tab
            .type_str(value)
            .map_err(|e| ActionError::Protocol(e.to_string()))?;
        Ok(())
    }

    fn query_text(&mut self, selector: &str) -> Result<String, ActionError> {
        let element = self
            .tab
            .find_element(selector)
            .map_err(|_| ActionError::SelectorNotFound(selector.to_string()))?;
        element
            .get_inner_text()
            .map_err(|e| ActionError::Protocol(e.to_string()))
    }

    fn screenshot(&mut self, path: &str) -> Result<(), ActionError> {
        let png = self
            .tab
            .capture_screenshot(CaptureScreenshotFormatOption::Png, None, None, true)
            .map_err(|e| ActionError::Protocol(e.to_string()))?;
        std::fs::write(path, png).map_err(|e| ActionError::Capture {
            path: path.to_string(),
            reason: e.to_string(),
        })
    }

    fn close(self) {
        // Browser::drop kills the child process and reaps it.
        drop(self);
    }
}
