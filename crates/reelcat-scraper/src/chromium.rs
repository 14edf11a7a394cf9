//! Headless Chromium backend for [`crate::render`], driven over CDP by
//! `chromiumoxide`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::js_protocol::runtime::EvaluateParams;
use chromiumoxide::element::Element;
use chromiumoxide::Page;
use futures::StreamExt;
use reelcat_core::AppConfig;
use tempfile::TempDir;
use tokio::task::JoinHandle;

use crate::error::ScraperError;
use crate::render::{BrowserSession, ElementHandle, PageHandle, Renderer};

const WINDOW_WIDTH: u32 = 1280;
const WINDOW_HEIGHT: u32 = 800;

#[derive(Debug, Clone)]
pub struct ChromiumOptions {
    /// Explicit Chrome/Chromium binary; auto-detected when `None`.
    pub executable: Option<PathBuf>,
    pub headless: bool,
}

impl ChromiumOptions {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            executable: config.chrome_path.clone(),
            headless: config.headless,
        }
    }
}

impl Default for ChromiumOptions {
    fn default() -> Self {
        Self {
            executable: None,
            headless: true,
        }
    }
}

/// Launches one Chromium process per [`Renderer::launch`] call. Each process
/// gets a throwaway profile directory so concurrent sessions never share
/// browser state or contend for the profile lock.
#[derive(Debug, Clone, Default)]
pub struct ChromiumRenderer {
    options: ChromiumOptions,
}

impl ChromiumRenderer {
    #[must_use]
    pub fn new(options: ChromiumOptions) -> Self {
        Self { options }
    }

    fn browser_config(&self, profile_dir: &Path) -> Result<BrowserConfig, ScraperError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .user_data_dir(profile_dir)
            .arg("--disable-dev-shm-usage")
            .window_size(WINDOW_WIDTH, WINDOW_HEIGHT);
        if !self.options.headless {
            builder = builder.with_head();
        }
        if let Some(path) = &self.options.executable {
            builder = builder.chrome_executable(path);
        }
        builder.build().map_err(ScraperError::BrowserLaunch)
    }
}

fn new_profile_dir() -> Result<TempDir, ScraperError> {
    tempfile::Builder::new()
        .prefix("reelcat-chromium-")
        .tempdir()
        .map_err(|e| ScraperError::BrowserLaunch(format!("failed to create profile dir: {e}")))
}

#[async_trait]
impl Renderer for ChromiumRenderer {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        let profile_dir = new_profile_dir()?;
        let config = self.browser_config(profile_dir.path())?;
        let (browser, mut handler) = Browser::launch(config)
            .await
            .map_err(|e| ScraperError::BrowserLaunch(e.to_string()))?;

        // The CDP connection only makes progress while its handler is polled.
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::debug!(error = %e, "chromium handler stopped");
                    break;
                }
            }
        });

        Ok(Box::new(ChromiumSession {
            browser,
            handler_task,
            profile_dir,
        }))
    }
}

struct ChromiumSession {
    browser: Browser,
    handler_task: JoinHandle<()>,
    profile_dir: TempDir,
}

#[async_trait]
impl BrowserSession for ChromiumSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, ScraperError> {
        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(ScraperError::render)?;
        Ok(Box::new(ChromiumPage { page }))
    }

    async fn close(self: Box<Self>) {
        let ChromiumSession {
            mut browser,
            handler_task,
            profile_dir,
        } = *self;
        if let Err(e) = browser.close().await {
            tracing::debug!(error = %e, "failed to close chromium cleanly");
        }
        if let Err(e) = browser.wait().await {
            tracing::debug!(error = %e, "failed to reap chromium process");
        }
        handler_task.abort();
        // The process must be gone before its profile can be removed.
        if let Err(e) = profile_dir.close() {
            tracing::debug!(error = %e, "failed to remove chromium profile dir");
        }
    }
}

struct ChromiumPage {
    page: Page,
}

#[async_trait]
impl PageHandle for ChromiumPage {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        match tokio::time::timeout(timeout, self.page.goto(url)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) => Err(ScraperError::Navigation {
                url: url.to_owned(),
                reason: e.to_string(),
            }),
            Err(_) => Err(ScraperError::NavigationTimeout {
                url: url.to_owned(),
                timeout_secs: timeout.as_secs(),
            }),
        }
    }

    async fn query_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn ElementHandle>>, ScraperError> {
        let elements = self
            .page
            .find_elements(selector)
            .await
            .map_err(ScraperError::render)?;
        Ok(wrap_elements(elements))
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value, ScraperError> {
        let params = EvaluateParams::builder()
            .expression(script)
            .return_by_value(true)
            .await_promise(true)
            .build()
            .map_err(|reason| ScraperError::Script { reason })?;
        let result = self
            .page
            .evaluate_expression(params)
            .await
            .map_err(|e| ScraperError::Script {
                reason: e.to_string(),
            })?;
        result
            .into_value::<serde_json::Value>()
            .map_err(|e| ScraperError::Script {
                reason: e.to_string(),
            })
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.page.close().await {
            tracing::debug!(error = %e, "failed to close chromium page");
        }
    }
}

struct ChromiumElement {
    element: Element,
}

fn wrap_elements(elements: Vec<Element>) -> Vec<Box<dyn ElementHandle>> {
    elements
        .into_iter()
        .map(|element| Box::new(ChromiumElement { element }) as Box<dyn ElementHandle>)
        .collect()
}

#[async_trait]
impl ElementHandle for ChromiumElement {
    async fn inner_text(&self) -> Result<Option<String>, ScraperError> {
        self.element.inner_text().await.map_err(ScraperError::render)
    }

    async fn text_content(&self) -> Result<Option<String>, ScraperError> {
        let returns = self
            .element
            .call_js_fn("function() { return this.textContent; }", false)
            .await
            .map_err(ScraperError::render)?;
        Ok(returns
            .result
            .value
            .and_then(|value| value.as_str().map(str::to_owned)))
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        self.element
            .attribute(name)
            .await
            .map_err(ScraperError::render)
    }

    async fn query_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn ElementHandle>>, ScraperError> {
        let elements = self
            .element
            .find_elements(selector)
            .await
            .map_err(ScraperError::render)?;
        Ok(wrap_elements(elements))
    }
}
