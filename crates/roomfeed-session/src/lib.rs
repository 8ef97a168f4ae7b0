//! Authenticated posting session for the social feed.
//!
//! The publishing scheduler only sees [`PostingSession`]; the Chromium
//! implementation drives a real browser through the login and post dialogs.

pub mod chromium;
pub mod script;

use async_trait::async_trait;
use thiserror::Error;

pub use chromium::{ChromiumSession, SessionConfig};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("failed to launch browser: {0}")]
    Launch(String),

    #[error("login failed: {0}")]
    Login(String),

    #[error("session is not logged in")]
    NotLoggedIn,

    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("element not found: {0}")]
    ElementNotFound(String),

    #[error("timed out after {secs}s waiting for {what}")]
    Timeout { what: String, secs: u64 },

    #[error("page script failed: {0}")]
    Script(String),

    #[error("browser protocol error: {0}")]
    Browser(#[from] chromiumoxide::error::CdpError),
}

/// One item to publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRequest {
    pub product_url: String,
    pub caption: String,
    pub image_url: Option<String>,
}

/// A logged-in session able to publish items one at a time.
///
/// `login` is called once before the first `post`; a login error is fatal
/// for the run. A `post` error affects only that item.
#[async_trait]
pub trait PostingSession: Send {
    async fn login(&mut self) -> Result<(), SessionError>;

    async fn post(&mut self, request: &PostRequest) -> Result<(), SessionError>;

    /// Releases browser resources. Safe to call when never logged in.
    async fn close(&mut self) -> Result<(), SessionError>;
}
