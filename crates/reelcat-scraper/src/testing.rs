//! In-memory rendering engine for unit tests.
//!
//! Pages are keyed by URL; navigating to a URL swaps in that page's scripted
//! DOM. Selectors are matched by exact string, so fixtures register elements
//! under the same selector text the extractors query.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::ScraperError;
use crate::render::{BrowserSession, ElementHandle, PageHandle, Renderer};

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeElement {
    inner_text: Option<String>,
    text_content: Option<String>,
    attributes: HashMap<String, String>,
    children: HashMap<String, Vec<FakeElement>>,
    broken: bool,
}

impl FakeElement {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// An element whose inner text and text content are both `text`.
    pub(crate) fn text(text: &str) -> Self {
        Self {
            inner_text: Some(text.to_owned()),
            text_content: Some(text.to_owned()),
            ..Self::default()
        }
    }

    pub(crate) fn attr(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_owned(), value.to_owned());
        self
    }

    pub(crate) fn child(mut self, selector: &str, child: FakeElement) -> Self {
        self.children
            .entry(selector.to_owned())
            .or_default()
            .push(child);
        self
    }

    /// Every read on this element fails, as if it detached mid-read.
    pub(crate) fn broken(mut self) -> Self {
        self.broken = true;
        self
    }

    fn check(&self) -> Result<(), ScraperError> {
        if self.broken {
            Err(ScraperError::Render("node is detached from document".to_owned()))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone)]
enum Navigation {
    Loads,
    TimesOut,
    Fails(String),
}

#[derive(Debug, Clone)]
pub(crate) struct FakePage {
    navigation: Navigation,
    selectors: HashMap<String, Vec<FakeElement>>,
    script: Result<serde_json::Value, String>,
}

impl Default for FakePage {
    fn default() -> Self {
        Self {
            navigation: Navigation::Loads,
            selectors: HashMap::new(),
            script: Ok(serde_json::json!({})),
        }
    }
}

impl FakePage {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn times_out(mut self) -> Self {
        self.navigation = Navigation::TimesOut;
        self
    }

    pub(crate) fn fails(mut self, reason: &str) -> Self {
        self.navigation = Navigation::Fails(reason.to_owned());
        self
    }

    pub(crate) fn with(mut self, selector: &str, element: FakeElement) -> Self {
        self.selectors
            .entry(selector.to_owned())
            .or_default()
            .push(element);
        self
    }

    pub(crate) fn script_returns(mut self, value: serde_json::Value) -> Self {
        self.script = Ok(value);
        self
    }

    pub(crate) fn script_fails(mut self, reason: &str) -> Self {
        self.script = Err(reason.to_owned());
        self
    }
}

/// Counters shared by a [`FakeRenderer`] and every session it launches.
#[derive(Debug, Default)]
pub(crate) struct FakeStats {
    pub(crate) launched: AtomicUsize,
    pub(crate) sessions_closed: AtomicUsize,
    pub(crate) pages_opened: AtomicUsize,
    pub(crate) pages_closed: AtomicUsize,
    pub(crate) scripts_run: AtomicUsize,
    pub(crate) visited: Mutex<Vec<String>>,
}

impl FakeStats {
    pub(crate) fn count(counter: &AtomicUsize) -> usize {
        counter.load(Ordering::SeqCst)
    }

    pub(crate) fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct FakeRenderer {
    pages: Arc<HashMap<String, FakePage>>,
    launch_error: Option<String>,
    page_error: Option<String>,
    pub(crate) stats: Arc<FakeStats>,
}

impl FakeRenderer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn page(mut self, url: &str, page: FakePage) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_owned(), page);
        self
    }

    pub(crate) fn launch_fails(mut self, reason: &str) -> Self {
        self.launch_error = Some(reason.to_owned());
        self
    }

    pub(crate) fn new_page_fails(mut self, reason: &str) -> Self {
        self.page_error = Some(reason.to_owned());
        self
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn launch(&self) -> Result<Box<dyn BrowserSession>, ScraperError> {
        if let Some(reason) = &self.launch_error {
            return Err(ScraperError::BrowserLaunch(reason.clone()));
        }
        self.stats.launched.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            renderer: self.clone(),
        }))
    }
}

struct FakeSession {
    renderer: FakeRenderer,
}

#[async_trait]
impl BrowserSession for FakeSession {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, ScraperError> {
        if let Some(reason) = &self.renderer.page_error {
            return Err(ScraperError::Render(reason.clone()));
        }
        self.renderer
            .stats
            .pages_opened
            .fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePageHandle {
            pages: Arc::clone(&self.renderer.pages),
            stats: Arc::clone(&self.renderer.stats),
            current: Mutex::new(None),
        }))
    }

    async fn close(self: Box<Self>) {
        self.renderer
            .stats
            .sessions_closed
            .fetch_add(1, Ordering::SeqCst);
    }
}

struct FakePageHandle {
    pages: Arc<HashMap<String, FakePage>>,
    stats: Arc<FakeStats>,
    current: Mutex<Option<FakePage>>,
}

impl FakePageHandle {
    fn loaded(&self) -> Result<FakePage, ScraperError> {
        self.current
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ScraperError::Render("no document loaded".to_owned()))
    }
}

fn boxed(elements: &[FakeElement]) -> Vec<Box<dyn ElementHandle>> {
    elements
        .iter()
        .cloned()
        .map(|element| Box::new(element) as Box<dyn ElementHandle>)
        .collect()
}

#[async_trait]
impl PageHandle for FakePageHandle {
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), ScraperError> {
        self.stats.visited.lock().unwrap().push(url.to_owned());
        let Some(page) = self.pages.get(url) else {
            return Err(ScraperError::Navigation {
                url: url.to_owned(),
                reason: "net::ERR_NAME_NOT_RESOLVED".to_owned(),
            });
        };
        match &page.navigation {
            Navigation::Loads => {
                *self.current.lock().unwrap() = Some(page.clone());
                Ok(())
            }
            Navigation::TimesOut => Err(ScraperError::NavigationTimeout {
                url: url.to_owned(),
                timeout_secs: timeout.as_secs(),
            }),
            Navigation::Fails(reason) => Err(ScraperError::Navigation {
                url: url.to_owned(),
                reason: reason.clone(),
            }),
        }
    }

    async fn query_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn ElementHandle>>, ScraperError> {
        let page = self.loaded()?;
        Ok(page
            .selectors
            .get(selector)
            .map(|elements| boxed(elements))
            .unwrap_or_default())
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value, ScraperError> {
        self.stats.scripts_run.fetch_add(1, Ordering::SeqCst);
        self.loaded()?
            .script
            .map_err(|reason| ScraperError::Script { reason })
    }

    async fn close(self: Box<Self>) {
        self.stats.pages_closed.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl ElementHandle for FakeElement {
    async fn inner_text(&self) -> Result<Option<String>, ScraperError> {
        self.check()?;
        Ok(self.inner_text.clone())
    }

    async fn text_content(&self) -> Result<Option<String>, ScraperError> {
        self.check()?;
        Ok(self.text_content.clone())
    }

    async fn attribute(&self, name: &str) -> Result<Option<String>, ScraperError> {
        self.check()?;
        Ok(self.attributes.get(name).cloned())
    }

    async fn query_all(
        &self,
        selector: &str,
    ) -> Result<Vec<Box<dyn ElementHandle>>, ScraperError> {
        self.check()?;
        Ok(self
            .children
            .get(selector)
            .map(|elements| boxed(elements))
            .unwrap_or_default())
    }
}
