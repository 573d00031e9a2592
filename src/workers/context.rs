// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::domain::services::enricher::JobEnricher;
use crate::domain::services::llm_service::FieldInference;
use crate::engines::metadata::MetadataExtractor;
use crate::engines::page_pool::PagePool;
use crate::engines::traits::{ContentRenderer, PageHandle};
use crate::utils::retry::RetryPolicy;
use crate::utils::throttle::{LoadThrottle, Pacing};

/// 提前终止信号
///
/// 每个列表页一个，只能从未设置变为已设置，不会被清除。
/// 正在执行的任务不会被中断，只有尚未获得许可的任务会直接返回。
#[derive(Debug, Clone, Default)]
pub struct TerminationSignal(Arc<AtomicBool>);

impl TerminationSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_set(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// 一次抓取运行共享的依赖和参数
pub struct ScrapeContext {
    pub renderer: Arc<dyn ContentRenderer>,
    pub pages: Arc<PagePool<Box<dyn PageHandle>>>,
    pub inference: Arc<dyn FieldInference>,
    pub metadata: MetadataExtractor,
    pub enricher: JobEnricher,
    pub throttle: LoadThrottle,
    pub retry: RetryPolicy,
    /// 单个职位各步骤之间的抖动休眠
    pub pacing: Pacing,
    /// 每页同时处理的职位数
    pub concurrency: usize,
    pub location_search: String,
    pub day_range_limit: u32,
    /// 计算发布天数使用的日期，整次运行固定
    pub today: NaiveDate,
}

impl ScrapeContext {
    pub fn is_recent(&self, posted: Option<NaiveDate>) -> bool {
        is_recent_job(posted, self.today, self.day_range_limit)
    }
}

/// 发布日期是否在截止天数内
///
/// 正好 `day_range_limit` 天前的职位仍然算在内，未来的日期也算在内；没有日期时不算。
pub fn is_recent_job(posted: Option<NaiveDate>, today: NaiveDate, day_range_limit: u32) -> bool {
    match posted {
        Some(date) => (today - date).num_days() <= i64::from(day_range_limit),
        None => false,
    }
}
