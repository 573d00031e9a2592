// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use parking_lot::Mutex;
use std::collections::VecDeque;
use std::ops::Deref;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

use crate::engines::traits::{EngineError, PageFactory, PageHandle};

/// 页面池错误
#[derive(Error, Debug)]
pub enum PoolError {
    #[error("Page pool is closed")]
    Closed,

    #[error("Page pool has a permit but no idle page")]
    Empty,

    #[error("Failed to create page: {0}")]
    Create(#[from] EngineError),
}

/// 固定容量的资源池
///
/// 容量在创建时确定，之后只复用不新建。[`PagePool::acquire`] 没有超时：
/// 容量为 0 的池会让调用方永远等待，调用方需要保证容量至少为 1。
pub struct PagePool<T: Send + 'static> {
    semaphore: Arc<Semaphore>,
    idle: Arc<Mutex<VecDeque<T>>>,
}

/// 租借中的资源
///
/// 租借期间由持有者独占，`Drop` 时归还到池中（包括出错和 panic 的路径）。
pub struct PooledPage<T: Send + 'static> {
    handle: Option<T>,
    idle: Arc<Mutex<VecDeque<T>>>,
    _permit: OwnedSemaphorePermit,
}

impl<T: Send + 'static> PagePool<T> {
    pub fn new(items: Vec<T>) -> Self {
        let capacity = items.len();
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            idle: Arc::new(Mutex::new(items.into_iter().collect())),
        }
    }

    /// 当前空闲的资源数
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// 租借一个资源，没有空闲资源时等待
    pub async fn acquire(&self) -> Result<PooledPage<T>, PoolError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PoolError::Closed)?;

        let handle = self.idle.lock().pop_front().ok_or(PoolError::Empty)?;

        Ok(PooledPage {
            handle: Some(handle),
            idle: self.idle.clone(),
            _permit: permit,
        })
    }

    /// 关闭池并取出所有空闲资源
    ///
    /// 关闭后新的 `acquire` 立即返回 [`PoolError::Closed`]。
    pub fn drain(&self) -> Vec<T> {
        self.semaphore.close();
        self.idle.lock().drain(..).collect()
    }
}

impl PagePool<Box<dyn PageHandle>> {
    /// 创建 `size` 个页面并放入池中
    pub async fn init_pages(factory: &dyn PageFactory, size: usize) -> Result<Self, PoolError> {
        let mut pages = Vec::with_capacity(size);
        for _ in 0..size {
            match factory.new_page().await {
                Ok(page) => pages.push(page),
                Err(e) => {
                    // Pages opened so far would leak with the browser otherwise.
                    for page in pages {
                        let _ = page.close().await;
                    }
                    return Err(PoolError::Create(e));
                }
            }
        }
        debug!("Page pool initialized with {} pages", size);
        Ok(Self::new(pages))
    }

    /// 关闭所有页面，单个页面关闭失败只记录日志
    pub async fn close_all(&self) {
        for page in self.drain() {
            if let Err(e) = page.close().await {
                warn!(component = "page_pool", "Failed to close page: {}", e);
            }
        }
    }
}

impl<T: Send + 'static> Deref for PooledPage<T> {
    type Target = T;

    fn deref(&self) -> &T {
        self.handle
            .as_ref()
            .expect("pooled handle is present until drop")
    }
}

impl<T: Send + 'static> Drop for PooledPage<T> {
    fn drop(&mut self) {
        // The handle goes back before the permit is released.
        if let Some(handle) = self.handle.take() {
            self.idle.lock().push_back(handle);
        }
    }
}
