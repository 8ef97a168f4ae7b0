//! Chromium-backed posting session using chromiumoxide.

use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::page::Page;
use futures::StreamExt;
use rand::Rng;
use roomfeed_core::{AppConfig, PostingCredentials};
use tokio::task::JoinHandle;

use crate::script;
use crate::{PostRequest, PostingSession, SessionError};

const NAVIGATION_TIMEOUT_SECS: u64 = 30;
const LOGIN_REDIRECT_TIMEOUT_SECS: u64 = 15;
const FORM_TIMEOUT_SECS: u64 = 10;
const POLL_INTERVAL: Duration = Duration::from_millis(250);

const LOGIN_LINK_SELECTOR: &str = r#"a[href*="login"]"#;
const EMAIL_SELECTOR: &str = r#"input[type="email"]"#;
const PASSWORD_SELECTOR: &str = r#"input[type="password"]"#;
const SUBMIT_SELECTOR: &str = r#"button[type="submit"]"#;

const POST_BUTTON_TEXT: &str = "ROOMに投稿";
const POST_BUTTON_FALLBACKS: &[&str] = &[r#"[data-testid="post-to-room"]"#, ".post-to-room-btn"];
const CAPTION_FIELDS: &[&str] = &["textarea", r#"input[type="text"]"#];
const CAPTION_FORM_READY: &str = r#"textarea, input[type="text"]"#;
const SUBMIT_BUTTON_TEXT: &str = "投稿";
// Scoped to the dialog so the page's own "ROOMに投稿" button is not matched.
const SUBMIT_SCOPES: &[&str] = &[r#"[role="dialog"] button"#, "form button"];
const SUBMIT_FALLBACKS: &[&str] = &[r#"button[type="submit"]"#, r#"input[type="submit"]"#];

/// Browser settings for [`ChromiumSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub room_base_url: String,
    pub chromium_path: Option<PathBuf>,
    pub headless: bool,
    pub user_agent: String,
}

impl SessionConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            room_base_url: config.room_base_url.clone(),
            chromium_path: config.chromium_path.clone(),
            headless: config.browser_headless,
            user_agent: config.user_agent.clone(),
        }
    }

    /// Host part of the base URL, used to confirm the post-login redirect.
    fn room_host(&self) -> &str {
        let rest = self
            .room_base_url
            .split_once("://")
            .map_or(self.room_base_url.as_str(), |(_, r)| r);
        rest.split('/').next().unwrap_or(rest)
    }
}

struct LiveBrowser {
    browser: Browser,
    page: Page,
    handler: JoinHandle<()>,
}

/// Posting session that launches Chromium on first login.
///
/// Constructing the session is cheap; no browser process exists until
/// [`PostingSession::login`] is called.
pub struct ChromiumSession {
    config: SessionConfig,
    credentials: PostingCredentials,
    live: Option<LiveBrowser>,
}

impl ChromiumSession {
    #[must_use]
    pub fn new(config: SessionConfig, credentials: PostingCredentials) -> Self {
        Self {
            config,
            credentials,
            live: None,
        }
    }

    async fn launch(&self) -> Result<LiveBrowser, SessionError> {
        let mut builder = BrowserConfig::builder()
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-extensions")
            .arg(format!("--user-agent={}", self.config.user_agent));
        if let Some(path) = &self.config.chromium_path {
            builder = builder.chrome_executable(path);
        }
        if !self.config.headless {
            builder = builder.with_head();
        }
        let browser_config = builder.build().map_err(SessionError::Launch)?;

        let (browser, mut handler) = Browser::launch(browser_config)
            .await
            .map_err(|e| SessionError::Launch(e.to_string()))?;

        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "browser handler event error");
                }
            }
        });

        let page = browser.new_page("about:blank").await?;
        Ok(LiveBrowser {
            browser,
            page,
            handler,
        })
    }

    fn page(&self) -> Result<&Page, SessionError> {
        self.live
            .as_ref()
            .map(|l| &l.page)
            .ok_or(SessionError::NotLoggedIn)
    }

    async fn sign_in(&self, page: &Page) -> Result<(), SessionError> {
        goto(page, &self.config.room_base_url).await?;
        human_pause(2_000, 4_000).await;

        page.find_element(LOGIN_LINK_SELECTOR)
            .await
            .map_err(|_| SessionError::ElementNotFound(LOGIN_LINK_SELECTOR.to_string()))?
            .click()
            .await?;
        human_pause(1_000, 3_000).await;
        wait_for(page, &script::exists(EMAIL_SELECTOR), "login form", FORM_TIMEOUT_SECS).await?;

        type_into(page, EMAIL_SELECTOR, &self.credentials.email).await?;
        human_pause(500, 1_500).await;
        type_into(page, PASSWORD_SELECTOR, &self.credentials.password).await?;
        human_pause(500, 1_500).await;

        page.find_element(SUBMIT_SELECTOR)
            .await
            .map_err(|_| SessionError::ElementNotFound(SUBMIT_SELECTOR.to_string()))?
            .click()
            .await?;

        let host = self.config.room_host();
        let check = format!(
            "location.host === {}",
            serde_json::Value::String(host.to_string())
        );
        wait_for(page, &check, "post-login redirect", LOGIN_REDIRECT_TIMEOUT_SECS).await?;
        human_pause(2_000, 4_000).await;
        Ok(())
    }
}

#[async_trait]
impl PostingSession for ChromiumSession {
    async fn login(&mut self) -> Result<(), SessionError> {
        if self.live.is_none() {
            self.live = Some(self.launch().await?);
        }
        let page = self.page()?;

        tracing::info!("logging in to posting session");
        match self.sign_in(page).await {
            Ok(()) => {
                tracing::info!("login succeeded");
                Ok(())
            }
            Err(e) => Err(SessionError::Login(e.to_string())),
        }
    }

    async fn post(&mut self, request: &PostRequest) -> Result<(), SessionError> {
        let page = self.page()?;

        goto(page, &request.product_url).await?;
        human_pause(2_000, 4_000).await;

        let clicked: bool = evaluate(
            page,
            &script::click_by_text(&["button", "a"], POST_BUTTON_TEXT, POST_BUTTON_FALLBACKS),
        )
        .await?;
        if !clicked {
            return Err(SessionError::ElementNotFound(format!(
                "\"{POST_BUTTON_TEXT}\" button"
            )));
        }
        human_pause(1_000, 3_000).await;

        wait_for(
            page,
            &script::exists(CAPTION_FORM_READY),
            "post form",
            FORM_TIMEOUT_SECS,
        )
        .await?;
        human_pause(1_000, 2_000).await;

        let filled: bool =
            evaluate(page, &script::fill_first(CAPTION_FIELDS, &request.caption)).await?;
        if !filled {
            return Err(SessionError::ElementNotFound("caption field".to_string()));
        }
        human_pause(1_000, 2_000).await;

        let submitted: bool = evaluate(
            page,
            &script::click_by_text(SUBMIT_SCOPES, SUBMIT_BUTTON_TEXT, SUBMIT_FALLBACKS),
        )
        .await?;
        if !submitted {
            return Err(SessionError::ElementNotFound("submit button".to_string()));
        }

        tokio::time::sleep(Duration::from_secs(3)).await;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), SessionError> {
        let Some(mut live) = self.live.take() else {
            return Ok(());
        };
        if let Err(e) = live.page.close().await {
            tracing::debug!(error = %e, "page close failed");
        }
        let result = live.browser.close().await;
        if let Err(e) = live.browser.wait().await {
            tracing::debug!(error = %e, "waiting for browser exit failed");
        }
        live.handler.abort();
        result.map(|_| ()).map_err(SessionError::from)
    }
}

async fn goto(page: &Page, url: &str) -> Result<(), SessionError> {
    match tokio::time::timeout(Duration::from_secs(NAVIGATION_TIMEOUT_SECS), page.goto(url)).await
    {
        Ok(Ok(_)) => Ok(()),
        Ok(Err(e)) => Err(SessionError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        }),
        Err(_) => Err(SessionError::Timeout {
            what: format!("navigation to {url}"),
            secs: NAVIGATION_TIMEOUT_SECS,
        }),
    }
}

async fn evaluate<T: serde::de::DeserializeOwned>(
    page: &Page,
    js: &str,
) -> Result<T, SessionError> {
    page.evaluate(js)
        .await?
        .into_value()
        .map_err(|e| SessionError::Script(e.to_string()))
}

async fn type_into(page: &Page, selector: &str, text: &str) -> Result<(), SessionError> {
    page.find_element(selector)
        .await
        .map_err(|_| SessionError::ElementNotFound(selector.to_string()))?
        .click()
        .await?
        .type_str(text)
        .await?;
    Ok(())
}

/// Polls `check` until it evaluates to `true` or `secs` elapse.
async fn wait_for(page: &Page, check: &str, what: &str, secs: u64) -> Result<(), SessionError> {
    let poll = async {
        loop {
            if evaluate::<bool>(page, check).await.unwrap_or(false) {
                return;
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    };
    tokio::time::timeout(Duration::from_secs(secs), poll)
        .await
        .map_err(|_| SessionError::Timeout {
            what: what.to_string(),
            secs,
        })
}

async fn human_pause(min_ms: u64, max_ms: u64) {
    let ms = rand::rng().random_range(min_ms..=max_ms);
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(base: &str) -> SessionConfig {
        SessionConfig {
            room_base_url: base.to_string(),
            chromium_path: None,
            headless: true,
            user_agent: "ua".to_string(),
        }
    }

    #[test]
    fn room_host_strips_scheme_and_path() {
        assert_eq!(config("https://room.rakuten.co.jp/").room_host(), "room.rakuten.co.jp");
        assert_eq!(config("http://127.0.0.1:8080/room").room_host(), "127.0.0.1:8080");
    }

    #[tokio::test]
    async fn post_before_login_is_rejected() {
        let mut session = ChromiumSession::new(
            config("https://room.rakuten.co.jp/"),
            PostingCredentials {
                email: "a@example.com".to_string(),
                password: "pw".to_string(),
            },
        );
        let request = PostRequest {
            product_url: "https://item.rakuten.co.jp/a/b/".to_string(),
            caption: "c".to_string(),
            image_url: None,
        };

        let err = session.post(&request).await.expect_err("no browser yet");
        assert!(matches!(err, SessionError::NotLoggedIn));
        session.close().await.expect("closing an idle session is a no-op");
    }

    #[tokio::test]
    #[ignore = "requires Chromium to be installed"]
    async fn launches_and_closes_browser() {
        let session = ChromiumSession::new(
            config("https://room.rakuten.co.jp/"),
            PostingCredentials {
                email: "a@example.com".to_string(),
                password: "pw".to_string(),
            },
        );
        let mut live = session.launch().await.expect("launch");
        let ready: bool = evaluate(&live.page, "document.readyState !== ''")
            .await
            .expect("evaluate");
        assert!(ready);
        live.browser.close().await.expect("close");
    }
}
