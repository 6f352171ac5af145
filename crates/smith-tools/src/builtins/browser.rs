//! Browser category: navigate, get_dom, click, fill, fetch_content,
//! screenshot (spec.md §4.4). `search` lives in [`super::search`] since its
//! scoring pipeline is large enough to want its own module.
//!
//! Real browser automation is an external collaborator's concern (spec.md
//! §1 Non-goals), so the driving is hidden behind [`BrowserDriver`], a
//! narrow trait a real engine (e.g. a CDP client) plugs into. What lives
//! here — the shared singleton, idle eviction, and the tool surface atop
//! it — is testable against [`NullBrowserDriver`] without a real browser.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Mutex;

use crate::context::ToolContext;
use crate::error::ToolError;
use crate::schema::{ArgSpec, ArgType};
use crate::tool::{Tool, ToolCategory};

pub const BROWSER_IDLE_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[async_trait]
pub trait BrowserDriver: Send + Sync {
    async fn navigate(&self, url: &str) -> Result<String, ToolError>;
    async fn get_dom(&self) -> Result<String, ToolError>;
    async fn click(&self, selector: &str) -> Result<(), ToolError>;
    async fn fill(&self, selector: &str, value: &str) -> Result<(), ToolError>;
    async fn fetch_content(&self, url: &str) -> Result<String, ToolError>;
    async fn screenshot(&self) -> Result<Vec<u8>, ToolError>;
    async fn close(&self);
}

/// Stands in until a real engine is wired in. Tracks the last navigated
/// URL so `get_dom`/`click`/`fill`/`screenshot` have something coherent to
/// report against in tests.
#[derive(Default)]
pub struct NullBrowserDriver {
    current_url: Mutex<Option<String>>,
}

#[async_trait]
impl BrowserDriver for NullBrowserDriver {
    async fn navigate(&self, url: &str) -> Result<String, ToolError> {
        *self.current_url.lock().await = Some(url.to_string());
        Ok(format!("<html><head><title>{url}</title></head><body></body></html>"))
    }

    async fn get_dom(&self) -> Result<String, ToolError> {
        match self.current_url.lock().await.as_ref() {
            Some(url) => Ok(format!("<html><head><title>{url}</title></head><body></body></html>")),
            None => Err(ToolError::ToolFailure("no page loaded".into())),
        }
    }

    async fn click(&self, _selector: &str) -> Result<(), ToolError> {
        if self.current_url.lock().await.is_none() {
            return Err(ToolError::ToolFailure("no page loaded".into()));
        }
        Ok(())
    }

    async fn fill(&self, _selector: &str, _value: &str) -> Result<(), ToolError> {
        if self.current_url.lock().await.is_none() {
            return Err(ToolError::ToolFailure("no page loaded".into()));
        }
        Ok(())
    }

    async fn fetch_content(&self, url: &str) -> Result<String, ToolError> {
        Ok(format!("content of {url}"))
    }

    async fn screenshot(&self) -> Result<Vec<u8>, ToolError> {
        if self.current_url.lock().await.is_none() {
            return Err(ToolError::ToolFailure("no page loaded".into()));
        }
        Ok(Vec::new())
    }

    async fn close(&self) {
        *self.current_url.lock().await = None;
    }
}

struct SessionState {
    driver: Arc<dyn BrowserDriver>,
    last_used: Instant,
}

/// Shared browser handle: one driver instance is opened lazily on first
/// use and kept warm across calls; [`BrowserSingleton::reap_if_idle`] closes
/// it once nothing has touched it for [`BROWSER_IDLE_TIMEOUT`].
pub struct BrowserSingleton {
    state: Mutex<Option<SessionState>>,
    factory: Box<dyn Fn() -> Arc<dyn BrowserDriver> + Send + Sync>,
}

impl BrowserSingleton {
    pub fn new(factory: impl Fn() -> Arc<dyn BrowserDriver> + Send + Sync + 'static) -> Self {
        Self {
            state: Mutex::new(None),
            factory: Box::new(factory),
        }
    }

    pub fn with_null_driver() -> Self {
        Self::new(|| Arc::new(NullBrowserDriver::default()))
    }

    async fn acquire(&self) -> Arc<dyn BrowserDriver> {
        let mut guard = self.state.lock().await;
        let driver = match guard.as_mut() {
            Some(session) => {
                session.last_used = Instant::now();
                session.driver.clone()
            }
            None => {
                let driver = (self.factory)();
                *guard = Some(SessionState {
                    driver: driver.clone(),
                    last_used: Instant::now(),
                });
                driver
            }
        };
        driver
    }

    /// Closes the session if it has been idle past [`BROWSER_IDLE_TIMEOUT`].
    /// Intended to be polled from a periodic reaper task in the server
    /// runtime; returns whether a close happened.
    pub async fn reap_if_idle(&self) -> bool {
        let mut guard = self.state.lock().await;
        let expired = guard
            .as_ref()
            .is_some_and(|s| s.last_used.elapsed() >= BROWSER_IDLE_TIMEOUT);
        if expired {
            if let Some(session) = guard.take() {
                session.driver.close().await;
            }
        }
        expired
    }

    #[cfg(test)]
    async fn is_open(&self) -> bool {
        self.state.lock().await.is_some()
    }
}

pub struct NavigateTool {
    pub browser: Arc<BrowserSingleton>,
}
#[async_trait]
impl Tool for NavigateTool {
    fn name(&self) -> &'static str {
        "navigate"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("url", ArgType::String)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = args["url"].as_str().unwrap();
        let driver = self.browser.acquire().await;
        let html = driver.navigate(url).await?;
        Ok(json!({ "url": url, "dom_preview": truncate_preview(&html) }))
    }
}

pub struct GetDomTool {
    pub browser: Arc<BrowserSingleton>,
}
#[async_trait]
impl Tool for GetDomTool {
    fn name(&self) -> &'static str {
        "get_dom"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[]
    }
    async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let driver = self.browser.acquire().await;
        let dom = driver.get_dom().await?;
        Ok(json!({ "dom": dom }))
    }
}

pub struct ClickTool {
    pub browser: Arc<BrowserSingleton>,
}
#[async_trait]
impl Tool for ClickTool {
    fn name(&self) -> &'static str {
        "click"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("selector", ArgType::String)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let selector = args["selector"].as_str().unwrap();
        let driver = self.browser.acquire().await;
        driver.click(selector).await?;
        Ok(json!({ "clicked": true }))
    }
}

pub struct FillTool {
    pub browser: Arc<BrowserSingleton>,
}
#[async_trait]
impl Tool for FillTool {
    fn name(&self) -> &'static str {
        "fill"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[
            ArgSpec::required("selector", ArgType::String),
            ArgSpec::required("value", ArgType::String),
        ]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let selector = args["selector"].as_str().unwrap();
        let value = args["value"].as_str().unwrap();
        let driver = self.browser.acquire().await;
        driver.fill(selector, value).await?;
        Ok(json!({ "filled": true }))
    }
}

pub struct FetchContentTool {
    pub browser: Arc<BrowserSingleton>,
}
#[async_trait]
impl Tool for FetchContentTool {
    fn name(&self) -> &'static str {
        "fetch_content"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[ArgSpec::required("url", ArgType::String)]
    }
    async fn call(&self, args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let url = args["url"].as_str().unwrap();
        let driver = self.browser.acquire().await;
        let content = driver.fetch_content(url).await?;
        Ok(json!({ "content": content }))
    }
}

pub struct ScreenshotTool {
    pub browser: Arc<BrowserSingleton>,
}
#[async_trait]
impl Tool for ScreenshotTool {
    fn name(&self) -> &'static str {
        "screenshot"
    }
    fn category(&self) -> ToolCategory {
        ToolCategory::Browser
    }
    fn args_schema(&self) -> &'static [ArgSpec] {
        &[]
    }
    async fn call(&self, _args: Value, _ctx: &ToolContext) -> Result<Value, ToolError> {
        let driver = self.browser.acquire().await;
        let bytes = driver.screenshot().await?;
        Ok(json!({ "png_base64": base64_encode(&bytes) }))
    }
}

fn truncate_preview(html: &str) -> String {
    html.chars().take(500).collect()
}

fn base64_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    const ALPHABET: &[u8; 64] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";
    let mut out = String::new();
    for chunk in bytes.chunks(3) {
        let b0 = chunk[0];
        let b1 = *chunk.get(1).unwrap_or(&0);
        let b2 = *chunk.get(2).unwrap_or(&0);
        let n = ((b0 as u32) << 16) | ((b1 as u32) << 8) | b2 as u32;
        let _ = write!(
            out,
            "{}{}{}{}",
            ALPHABET[(n >> 18) as usize & 0x3f] as char,
            ALPHABET[(n >> 12) as usize & 0x3f] as char,
            if chunk.len() > 1 { ALPHABET[(n >> 6) as usize & 0x3f] as char } else { '=' },
            if chunk.len() > 2 { ALPHABET[n as usize & 0x3f] as char } else { '=' },
        );
    }
    out
}
