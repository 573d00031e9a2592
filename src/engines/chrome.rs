// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use chromiumoxide::{Browser, BrowserConfig, Page};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::settings::BrowserSettings;
use crate::engines::markdown::html_to_markdown;
use crate::engines::traits::{
    BrowserLauncher, BrowserSession, ContentRenderer, EngineError, MarkdownMode, PageFactory,
    PageHandle,
};

/// Chrome 启动器
///
/// 配置了 `remote_debugging_url` 时连接已有的 Chrome 实例，否则在本地启动一个无头浏览器。
pub struct ChromeLauncher {
    settings: BrowserSettings,
}

impl ChromeLauncher {
    pub fn new(settings: BrowserSettings) -> Self {
        Self { settings }
    }
}

#[async_trait]
impl BrowserLauncher for ChromeLauncher {
    async fn launch(&self) -> Result<BrowserSession, EngineError> {
        let timeout = Duration::from_secs(self.settings.request_timeout_secs);

        let (browser, mut handler) = if let Some(ref url) = self.settings.remote_debugging_url {
            info!("Connecting to remote Chrome instance at: {}", url);
            Browser::connect(url)
                .await
                .map_err(|e| EngineError::Launch(format!("Failed to connect to remote Chrome: {}", e)))?
        } else {
            let config = BrowserConfig::builder()
                .no_sandbox()
                .request_timeout(timeout)
                .arg("--disable-gpu")
                .arg("--disable-dev-shm-usage")
                .build()
                .map_err(EngineError::Launch)?;

            Browser::launch(config)
                .await
                .map_err(|e| EngineError::Launch(e.to_string()))?
        };

        // Browser events must be polled for any CDP call to complete.
        let handler_task = tokio::spawn(async move {
            while let Some(h) = handler.next().await {
                if h.is_err() {
                    break;
                }
            }
        });

        let chrome = Arc::new(ChromeBrowser {
            browser: Mutex::new(Some(browser)),
            handler_task: parking_lot::Mutex::new(Some(handler_task)),
            user_agent: self.settings.user_agent.clone(),
            timeout,
            owned: self.settings.remote_debugging_url.is_none(),
        });

        Ok(BrowserSession {
            renderer: chrome.clone(),
            pages: chrome,
        })
    }
}

/// 一个已启动的 Chrome 实例
pub struct ChromeBrowser {
    browser: Mutex<Option<Browser>>,
    handler_task: parking_lot::Mutex<Option<JoinHandle<()>>>,
    user_agent: Option<String>,
    timeout: Duration,
    /// 本地启动的浏览器在关闭时需要结束进程，远程实例只断开连接
    owned: bool,
}

impl ChromeBrowser {
    async fn open_page(&self) -> Result<Page, EngineError> {
        let guard = self.browser.lock().await;
        let browser = guard
            .as_ref()
            .ok_or_else(|| EngineError::Other("Browser already shut down".to_string()))?;

        let page = browser
            .new_page("about:blank")
            .await
            .map_err(|e| EngineError::Other(e.to_string()))?;

        if let Some(ref ua) = self.user_agent {
            page.set_user_agent(ua)
                .await
                .map_err(|e| EngineError::Other(e.to_string()))?;
        }

        Ok(page)
    }

    async fn render(&self, page: &Page, url: &str, mode: MarkdownMode) -> Result<Option<String>, EngineError> {
        navigate(page, url, self.timeout).await?;

        let html = page
            .content()
            .await
            .map_err(|e| EngineError::Render(e.to_string()))?;

        let markdown = html_to_markdown(&html, mode);
        if markdown.trim().is_empty() {
            Ok(None)
        } else {
            Ok(Some(markdown))
        }
    }
}

async fn navigate(page: &Page, url: &str, timeout: Duration) -> Result<(), EngineError> {
    tokio::time::timeout(timeout, page.goto(url))
        .await
        .map_err(|_| EngineError::Timeout)?
        .map_err(|e| EngineError::Navigation {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
    Ok(())
}

#[async_trait]
impl ContentRenderer for ChromeBrowser {
    async fn render_markdown(&self, url: &str, mode: MarkdownMode) -> Result<Option<String>, EngineError> {
        let page = self.open_page().await?;
        let result = self.render(&page, url, mode).await;

        if let Err(e) = page.close().await {
            debug!("Failed to close render page: {}", e);
        }

        result
    }
}

#[async_trait]
impl PageFactory for ChromeBrowser {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, EngineError> {
        let page = self.open_page().await?;
        Ok(Box::new(ChromePage {
            page,
            timeout: self.timeout,
        }))
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        let browser = self.browser.lock().await.take();

        let result = match browser {
            Some(mut browser) if self.owned => {
                let closed = browser
                    .close()
                    .await
                    .map(|_| ())
                    .map_err(|e| EngineError::Other(format!("Failed to close browser: {}", e)));
                if let Err(e) = browser.wait().await {
                    warn!("Failed to wait for browser process: {}", e);
                }
                closed
            }
            _ => Ok(()),
        };

        if let Some(task) = self.handler_task.lock().take() {
            task.abort();
        }

        result
    }
}

/// 池中的 Chrome 页面
pub struct ChromePage {
    page: Page,
    timeout: Duration,
}

#[async_trait]
impl PageHandle for ChromePage {
    async fn goto(&self, url: &str) -> Result<(), EngineError> {
        navigate(&self.page, url, self.timeout).await
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>, EngineError> {
        // chromiumoxide reports "no node found" as an error; an empty match is not a failure here.
        let elements = match self.page.find_elements(selector).await {
            Ok(elements) => elements,
            Err(e) => {
                debug!("No elements for selector {}: {}", selector, e);
                return Ok(Vec::new());
            }
        };

        let mut texts = Vec::with_capacity(elements.len());
        for element in elements {
            let text = element
                .inner_text()
                .await
                .map_err(|e| EngineError::Render(e.to_string()))?;
            if let Some(text) = text {
                let text = text.trim();
                if !text.is_empty() {
                    texts.push(text.to_string());
                }
            }
        }
        Ok(texts)
    }

    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, EngineError> {
        let element = match self.page.find_element(selector).await {
            Ok(element) => element,
            Err(_) => return Ok(None),
        };

        element
            .attribute(name)
            .await
            .map_err(|e| EngineError::Render(e.to_string()))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.page
            .clone()
            .close()
            .await
            .map_err(|e| EngineError::Other(e.to_string()))
    }
}
