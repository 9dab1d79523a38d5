//! Browser driver module
//!
//! The harvest loop talks to the browser only through [`PageDriver`], which
//! covers exactly what the loop needs from a browser session:
//! - navigating to the entrypoint
//! - waiting for the listing panels to render
//! - taking a DOM snapshot
//! - checking for and clicking the "next page" anchor
//! - closing the session

mod chromium;

pub use chromium::ChromiumDriver;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors raised by a browser session
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Browser protocol error: {0}")]
    Cdp(#[from] chromiumoxide::error::CdpError),

    #[error("Timed out after {timeout:?} waiting for selector '{selector}'")]
    SelectorTimeout { selector: String, timeout: Duration },

    #[error("No element matches selector '{0}'")]
    ElementNotFound(String),

    #[error("Browser session already closed")]
    Closed,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for driver operations
pub type DriverResult<T> = Result<T, DriverError>;

/// A single-tab browser session
#[async_trait]
pub trait PageDriver: Send {
    /// Navigates the tab to `url`
    async fn navigate(&mut self, url: &str) -> DriverResult<()>;

    /// Waits until at least one element matches `selector`
    ///
    /// Fails with [`DriverError::SelectorTimeout`] once `timeout` elapses.
    async fn wait_for_selector(&mut self, selector: &str, timeout: Duration) -> DriverResult<()>;

    /// Returns the current DOM serialized as HTML
    async fn content(&mut self) -> DriverResult<String>;

    /// Returns true if any element matches `selector`
    async fn elements_exist(&mut self, selector: &str) -> DriverResult<bool>;

    /// Clicks the first element matching `selector`
    ///
    /// Does not wait for whatever navigation the click triggers.
    async fn click(&mut self, selector: &str) -> DriverResult<()>;

    /// Closes the browser session
    async fn close(&mut self) -> DriverResult<()>;
}
