// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// 引擎错误类型
#[derive(Error, Debug)]
pub enum EngineError {
    /// 浏览器启动或连接失败
    #[error("Browser launch failed: {0}")]
    Launch(String),
    /// 页面导航失败
    #[error("Navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },
    /// 渲染失败
    #[error("Render failed: {0}")]
    Render(String),
    /// 超时
    #[error("Timeout")]
    Timeout,
    /// 其他错误
    #[error("Other error: {0}")]
    Other(String),
}

/// Markdown 生成模式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkdownMode {
    /// 完整页面，保留链接（列表页需要从中提取职位链接）
    Full,
    /// 去掉导航、页眉页脚和链接，只保留正文（职位详情）
    Pruned,
}

/// 内容渲染协作方
#[async_trait]
pub trait ContentRenderer: Send + Sync {
    /// 渲染 URL 并返回 markdown
    ///
    /// * `Ok(Some(markdown))` - 渲染成功
    /// * `Ok(None)` - 页面可达但没有可用内容
    /// * `Err(EngineError)` - 渲染失败，可以重试
    async fn render_markdown(&self, url: &str, mode: MarkdownMode) -> Result<Option<String>, EngineError>;
}

/// 可复用的浏览器页面
#[async_trait]
pub trait PageHandle: Send + Sync {
    /// 导航到指定 URL
    async fn goto(&self, url: &str) -> Result<(), EngineError>;

    /// 返回匹配选择器的所有元素的文本
    async fn texts(&self, selector: &str) -> Result<Vec<String>, EngineError>;

    /// 返回第一个匹配元素的属性值
    async fn attribute(&self, selector: &str, name: &str) -> Result<Option<String>, EngineError>;

    /// 关闭页面
    async fn close(&self) -> Result<(), EngineError>;

    /// 返回第一个匹配元素的文本
    async fn text(&self, selector: &str) -> Result<Option<String>, EngineError> {
        Ok(self.texts(selector).await?.into_iter().next())
    }
}

/// 页面工厂
#[async_trait]
pub trait PageFactory: Send + Sync {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, EngineError>;

    /// 关闭浏览器本身
    async fn shutdown(&self) -> Result<(), EngineError>;
}

/// 一次抓取运行使用的浏览器会话
#[derive(Clone)]
pub struct BrowserSession {
    pub renderer: Arc<dyn ContentRenderer>,
    pub pages: Arc<dyn PageFactory>,
}

/// 浏览器启动器
#[async_trait]
pub trait BrowserLauncher: Send + Sync {
    async fn launch(&self) -> Result<BrowserSession, EngineError>;
}
