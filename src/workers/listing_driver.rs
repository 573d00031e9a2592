// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Local, NaiveDate};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::config::settings::Settings;
use crate::domain::models::outcome::{PageResult, ScrapeSummary};
use crate::domain::services::enricher::JobEnricher;
use crate::domain::services::llm_service::FieldInference;
use crate::domain::services::validator::Validator;
use crate::engines::metadata::MetadataExtractor;
use crate::engines::page_pool::PagePool;
use crate::engines::traits::{BrowserLauncher, BrowserSession, EngineError, MarkdownMode, PageHandle};
use crate::infrastructure::downstream::DownstreamSender;
use crate::utils::listing::{page_url, total_job_count, total_pages, JobUrlExtractor};
use crate::utils::retry::{retry_with_backoff, RetryPolicy};
use crate::utils::throttle::{LoadThrottle, Pacing, SysinfoCpuSampler};
use crate::workers::batch::BatchOrchestrator;
use crate::workers::context::ScrapeContext;

type SessionPool = PagePool<Box<dyn PageHandle>>;

/// 列表页驱动
///
/// 一次运行的顶层循环：建立浏览器会话，读取第一页得到职位总数，逐页处理，
/// 最后无论成功与否都生成并上报 [`ScrapeSummary`]。
pub struct ListingDriver {
    launcher: Arc<dyn BrowserLauncher>,
    inference: Arc<dyn FieldInference>,
    sender: Arc<dyn DownstreamSender>,
    validator: Validator,
    url_extractor: JobUrlExtractor,
    throttle: LoadThrottle,
    retry: RetryPolicy,
    setup_retry: RetryPolicy,
    task_pacing: Pacing,
    listing_pacing: Pacing,
    concurrency: usize,
    posted_within_days: u32,
    /// 固定的当天日期，未设置时使用本地日期
    today: Option<NaiveDate>,
}

impl ListingDriver {
    /// 创建新的列表页驱动
    ///
    /// # Arguments
    ///
    /// * `launcher` - 浏览器启动器
    /// * `inference` - LLM 协作方，同时用于解析和校验
    /// * `sender` - 下游存储协作方
    /// * `settings` - 应用配置
    pub fn new(
        launcher: Arc<dyn BrowserLauncher>,
        inference: Arc<dyn FieldInference>,
        sender: Arc<dyn DownstreamSender>,
        settings: &Settings,
    ) -> Result<Self, regex::Error> {
        let scraper = &settings.scraper;
        Ok(Self {
            launcher,
            validator: Validator::new(inference.clone(), scraper.posted_within_days),
            inference,
            sender,
            url_extractor: JobUrlExtractor::new(&scraper.job_url_pattern)?,
            throttle: LoadThrottle::new(Arc::new(SysinfoCpuSampler::new()), scraper.throttle_limits()),
            retry: scraper.retry_policy(),
            setup_retry: RetryPolicy::new(3, Duration::from_secs(1)),
            task_pacing: settings.pacing.task(),
            listing_pacing: settings.pacing.listing(),
            concurrency: scraper.concurrency.max(1) as usize,
            posted_within_days: scraper.posted_within_days,
            today: None,
        })
    }

    pub fn with_throttle(mut self, throttle: LoadThrottle) -> Self {
        self.throttle = throttle;
        self
    }

    pub fn with_pacing(mut self, task: Pacing, listing: Pacing) -> Self {
        self.task_pacing = task;
        self.listing_pacing = listing;
        self
    }

    /// 设置单个职位操作和浏览器会话建立的重试策略
    pub fn with_retry(mut self, retry: RetryPolicy, setup_retry: RetryPolicy) -> Self {
        self.retry = retry;
        self.setup_retry = setup_retry;
        self
    }

    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    /// 抓取一个搜索结果列表
    ///
    /// 永远返回一个汇总，不会返回错误；汇总会尽力发送给下游，发送失败不影响返回值。
    ///
    /// # Arguments
    ///
    /// * `base_url` - 不带页码的列表链接
    /// * `location_search` - 写入每个职位的搜索地点
    /// * `page_size` - 列表页每页职位数
    /// * `max_pages` - 最多处理的页数
    /// * `day_range_limit` - 截止天数，遇到更早的职位时提前终止
    #[instrument(skip(self), fields(run_id = %Uuid::new_v4()))]
    pub async fn scrape_job_listing(
        &self,
        base_url: &str,
        location_search: &str,
        page_size: u32,
        max_pages: Option<u32>,
        day_range_limit: u32,
    ) -> ScrapeSummary {
        let summary = match self.setup().await {
            Some((session, pool)) => {
                info!("Browser context initialized successfully!");
                let pool = Arc::new(pool);
                let ctx = Arc::new(self.build_context(&session, pool.clone(), location_search, day_range_limit));

                let summary = self.scrape_pages(&ctx, base_url, page_size, max_pages).await;

                drop(ctx);
                teardown(&session, &pool).await;
                summary
            }
            None => {
                error!(
                    component = "scrape_job_listing",
                    base_url = base_url,
                    "Failed initializing browser context"
                );
                let reason = format!(
                    "failed to create browser context after {} attempts",
                    self.setup_retry.max_retries
                );
                ScrapeSummary {
                    errors: Some(vec![reason.clone()]),
                    ..ScrapeSummary::new(format!("Fatal error during job scrape: {}", reason))
                }
            }
        };

        self.report(summary).await
    }

    /// 启动浏览器并填满页面池，整体重试
    async fn setup(&self) -> Option<(BrowserSession, SessionPool)> {
        let launcher = &self.launcher;
        let size = self.concurrency;

        retry_with_backoff(&self.setup_retry, "create_browser_context", || async move {
            let session = launcher.launch().await?;
            match PagePool::init_pages(session.pages.as_ref(), size).await {
                Ok(pool) => Ok::<_, EngineError>((session, pool)),
                Err(e) => {
                    if let Err(shutdown_err) = session.pages.shutdown().await {
                        warn!("Failed to shut down browser after page pool error: {}", shutdown_err);
                    }
                    Err(EngineError::Other(e.to_string()))
                }
            }
        })
        .await
    }

    fn build_context(
        &self,
        session: &BrowserSession,
        pages: Arc<SessionPool>,
        location_search: &str,
        day_range_limit: u32,
    ) -> ScrapeContext {
        ScrapeContext {
            renderer: session.renderer.clone(),
            pages,
            inference: self.inference.clone(),
            metadata: MetadataExtractor::new(self.throttle.clone(), self.task_pacing),
            enricher: JobEnricher::new(self.posted_within_days),
            throttle: self.throttle.clone(),
            retry: self.retry.clone(),
            pacing: self.task_pacing,
            concurrency: self.concurrency,
            location_search: location_search.to_string(),
            day_range_limit,
            today: self.today.unwrap_or_else(|| Local::now().date_naive()),
        }
    }

    async fn scrape_pages(
        &self,
        ctx: &Arc<ScrapeContext>,
        base_url: &str,
        page_size: u32,
        max_pages: Option<u32>,
    ) -> ScrapeSummary {
        let first_page = match self.fetch_listing_markdown(ctx, base_url, 1).await {
            Some(markdown) => markdown,
            None => return ScrapeSummary::new("No job search markdown found. Scraped 0 jobs."),
        };

        let total_jobs = total_job_count(&first_page);
        if total_jobs == 0 {
            return ScrapeSummary::new("No jobs found. Scraped 0 jobs.");
        }

        let total_pages = total_pages(total_jobs, page_size, max_pages);
        info!("Detected {} jobs, scraping {} pages.", total_jobs, total_pages);

        let mut first_page = Some(first_page);
        let mut job_count = 0;
        let mut errors = Vec::new();
        let mut invalid_jobs = Vec::new();
        let mut terminated_page = None;

        for page_num in 1..=total_pages {
            let markdown = match first_page.take() {
                Some(markdown) => Some(markdown),
                None => self.fetch_listing_markdown(ctx, base_url, page_num).await,
            };

            let result = self.process_listing_page(ctx, markdown, page_num).await;
            metrics::counter!("jobharvest_pages_total").increment(1);

            job_count += result.job_count;
            errors.extend(result.errors);
            invalid_jobs.extend(result.invalid_jobs);
            if result.terminated_early {
                terminated_page = Some(page_num);
                break;
            }
        }

        let mut message = format!("Scraped and inserted {} jobs.", job_count);
        if let Some(page_num) = terminated_page {
            message.push_str(&format!(
                " Early termination triggered on page {} due to day range limit of {} days.",
                page_num, ctx.day_range_limit
            ));
        }

        ScrapeSummary {
            message,
            terminated_early: terminated_page.is_some(),
            job_count,
            errors: (!errors.is_empty()).then_some(errors),
            invalid_jobs,
        }
    }

    /// 获取完整的列表页 markdown，只尝试一次
    async fn fetch_listing_markdown(&self, ctx: &ScrapeContext, base_url: &str, page_num: u32) -> Option<String> {
        let url = page_url(base_url, page_num);
        self.listing_pacing.pause().await;

        let rendered = ctx.renderer.render_markdown(&url, MarkdownMode::Full).await;
        self.throttle.maybe_pause().await;

        match rendered {
            Ok(Some(markdown)) if !markdown.trim().is_empty() => Some(markdown),
            Ok(_) => {
                warn!(
                    component = "fetch_page_markdown",
                    page_num = page_num,
                    page_url = %url,
                    "No markdown found on page {}",
                    page_num
                );
                None
            }
            Err(e) => {
                error!(
                    component = "fetch_page_markdown",
                    page_num = page_num,
                    page_url = %url,
                    "Crawl failed on page {}: {}",
                    page_num,
                    e
                );
                None
            }
        }
    }

    /// 处理一个列表页：提取链接、并发抓取、校验、发送
    #[instrument(skip(self, ctx, markdown))]
    async fn process_listing_page(
        &self,
        ctx: &Arc<ScrapeContext>,
        markdown: Option<String>,
        page_num: u32,
    ) -> PageResult {
        let markdown = match markdown {
            Some(markdown) => markdown,
            None => return PageResult::default(),
        };

        let job_urls = self.url_extractor.extract(&markdown);
        if job_urls.is_empty() {
            warn!(
                component = "process_job_listing_page",
                page_num = page_num,
                markdown_preview = %markdown.chars().take(500).collect::<String>(),
                "No job urls found in markdown on page {}",
                page_num
            );
            return PageResult::default();
        }
        for url in &job_urls {
            info!("Scraping: {}", url);
        }

        let batch = BatchOrchestrator::new(ctx.clone()).run(job_urls, page_num).await;
        let mut result = PageResult {
            terminated_early: batch.terminated_early,
            errors: batch.diagnostics,
            ..PageResult::default()
        };

        if !batch.jobs.is_empty() {
            let (jobs, invalid_jobs) = self.validator.validate_batch(&batch.jobs, ctx.today).await;
            for invalid in &invalid_jobs {
                warn!(
                    component = "validate_jobs",
                    page_num = page_num,
                    job_url = invalid.job_url.as_str(),
                    fields = ?invalid.fields,
                    original = %serde_json::to_string(&invalid.original).unwrap_or_default(),
                    "Job required repairs during validation"
                );
            }
            result.invalid_jobs = invalid_jobs;

            match self.sender.send_batch(&jobs).await {
                Ok(()) => {
                    info!("Inserted {} jobs from page {}", jobs.len(), page_num);
                    result.job_count = jobs.len();
                }
                Err(e) => {
                    error!(
                        component = "insert_jobs_into_database",
                        page_num = page_num,
                        job_count = jobs.len(),
                        "Failed to send job batch: {}",
                        e
                    );
                    result.errors.push(format!("page {}: failed to send job batch: {}", page_num, e));
                }
            }
        }

        ctx.pacing.pause().await;
        self.throttle.maybe_pause().await;

        result
    }

    async fn report(&self, summary: ScrapeSummary) -> ScrapeSummary {
        if let Err(e) = self.sender.send_summary(&summary).await {
            error!(component = "send_scrape_summary", "Failed to send scrape summary: {}", e);
        }
        summary
    }
}

/// 关闭页面池和浏览器，每一步的失败只记录日志
async fn teardown(session: &BrowserSession, pool: &SessionPool) {
    pool.close_all().await;
    if let Err(e) = session.pages.shutdown().await {
        error!(
            component = "teardown_scraping_context",
            stage = "browser.close",
            "Failed to close browser: {}",
            e
        );
    }
}
