// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::domain::models::job::{JobDraft, JobMetadata};
use crate::domain::services::job_parser::parse_job_draft;
use crate::engines::page_pool::PoolError;
use crate::engines::traits::{MarkdownMode, PageHandle};
use crate::utils::retry::retry_with_backoff;
use crate::workers::context::{ScrapeContext, TerminationSignal};

/// 单个职位处理中的意外错误
#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("Page pool unavailable: {0}")]
    Pool(#[from] PoolError),

    #[error("Task failed: {0}")]
    Task(String),
}

/// 单个职位的提取结果
#[derive(Debug, Clone, PartialEq)]
pub enum Extraction {
    /// LLM 解析出的原始记录和页面元数据，尚未补全
    Found { job: JobDraft, metadata: JobMetadata },
    Skipped(String),
    /// 职位超出截止天数，信号已经设置
    Terminate,
}

/// 单个职位的提取流水线
///
/// 获取正文 -> 获取元数据 -> 检查发布时间 -> 结构化解析。
/// 可预期的失败通过 [`Extraction::Skipped`] 返回，只有意外错误才返回 `Err`。
pub struct JobExtractor {
    ctx: Arc<ScrapeContext>,
}

impl JobExtractor {
    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    pub async fn extract(
        &self,
        job_url: &str,
        index: usize,
        signal: &TerminationSignal,
    ) -> Result<Extraction, ScrapeError> {
        let markdown = match self.fetch_job_markdown(job_url).await {
            Some(markdown) => markdown,
            None => return Ok(Extraction::Skipped("no content".to_string())),
        };

        let metadata = match self.fetch_metadata(job_url).await? {
            Some(metadata) => metadata,
            None => return Ok(Extraction::Skipped("no metadata".to_string())),
        };
        self.ctx.pacing.pause().await;

        if !self.ctx.is_recent(metadata.posted_date) {
            info!(
                "Job {} posted {:?} is older than {} days, terminating page",
                job_url, metadata.posted_date, self.ctx.day_range_limit
            );
            signal.set();
            return Ok(Extraction::Terminate);
        }

        let raw = match self.ctx.inference.parse_job_posting(&markdown, index).await {
            Ok(raw) => raw,
            Err(e) => {
                error!(
                    component = "parse_job_data_from_markdown",
                    job_url = job_url,
                    input_markdown = %markdown.chars().take(1000).collect::<String>(),
                    "{}",
                    e
                );
                return Ok(Extraction::Skipped("no structured data".to_string()));
            }
        };

        match parse_job_draft(&raw) {
            Some(job) => Ok(Extraction::Found { job, metadata }),
            None => Ok(Extraction::Skipped("no structured data".to_string())),
        }
    }

    /// 获取去掉导航和链接后的职位正文
    async fn fetch_job_markdown(&self, job_url: &str) -> Option<String> {
        let ctx = &*self.ctx;
        let label = format!("fetch_job_markdown: {}", job_url);

        debug!("Starting crawl for job URL: {}", job_url);
        let rendered = retry_with_backoff(&ctx.retry, &label, || async move {
            let result = ctx.renderer.render_markdown(job_url, MarkdownMode::Pruned).await;
            ctx.pacing.pause().await;
            ctx.throttle.maybe_pause().await;
            result
        })
        .await;

        rendered.flatten().filter(|markdown| !markdown.trim().is_empty())
    }

    /// 租借一个页面，导航到职位详情并提取元数据
    ///
    /// 导航重试耗尽时返回 `Ok(None)`；页面在所有路径上都会归还。
    async fn fetch_metadata(&self, job_url: &str) -> Result<Option<JobMetadata>, ScrapeError> {
        let ctx = &*self.ctx;
        let page = ctx.pages.acquire().await?;
        let handle: &dyn PageHandle = &**page;
        let label = format!("page.goto({})", job_url);

        let navigated = retry_with_backoff(&ctx.retry, &label, || async move {
            ctx.throttle.maybe_pause().await;
            let result = handle.goto(job_url).await;
            ctx.pacing.pause().await;
            result
        })
        .await;

        let metadata = match navigated {
            Some(()) => Some(ctx.metadata.extract(handle, job_url, ctx.today).await),
            None => None,
        };

        drop(page);
        Ok(metadata)
    }
}
