// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

//! 测试用的内存协作方

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::NaiveDate;
use jobharvest::config::settings::Settings;
use jobharvest::domain::models::job::{ExperienceLevel, JobPosting, WorkModel};
use jobharvest::domain::models::outcome::ScrapeSummary;
use jobharvest::domain::services::enricher::JobEnricher;
use jobharvest::domain::services::llm_service::{FieldInference, InferenceError};
use jobharvest::engines::metadata::MetadataExtractor;
use jobharvest::engines::page_pool::PagePool;
use jobharvest::engines::traits::{
    BrowserLauncher, BrowserSession, ContentRenderer, EngineError, MarkdownMode, PageFactory, PageHandle,
};
use jobharvest::infrastructure::downstream::{DownstreamSender, SenderError};
use jobharvest::utils::retry::RetryPolicy;
use jobharvest::utils::throttle::{FixedCpuSampler, LoadThrottle, Pacing, ThrottleLimits};
use jobharvest::workers::context::ScrapeContext;
use jobharvest::workers::ListingDriver;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use url::Url;

pub const LISTING_BASE: &str = "https://www.seek.com.au/software-engineer-jobs/in-Sydney?sortmode=ListedDate";
pub const LOGO_SRC: &str = "https://images.example.com/logo.png";

/// 渲染一个页面的模拟耗时，让同一批的任务都能在任何一个任务完成前通过准入检查
const RENDER_DELAY: Duration = Duration::from_millis(10);

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 10).unwrap()
}

pub fn job_url(id: u32) -> String {
    format!("https://www.seek.com.au/job/{}?type=standard&origin=cardTitle", id)
}

pub fn canonical_url(id: u32) -> String {
    format!("https://www.seek.com.au/job/{}", id)
}

pub fn listing_markdown(total_jobs: u64, ids: &[u32]) -> String {
    let mut markdown = format!("# {} software engineer jobs in Sydney NSW\n\n", total_jobs);
    for id in ids {
        markdown.push_str(&format!("* [Software Engineer {}]({})\n", id, job_url(*id)));
    }
    markdown
}

/// 一个职位详情页
#[derive(Debug, Clone)]
pub struct JobFixture {
    pub age_days: Option<u64>,
    pub content: Option<String>,
    pub navigable: bool,
}

impl JobFixture {
    pub fn aged(days: u64) -> Self {
        Self {
            age_days: Some(days),
            content: Some(format!("# Software Engineer\n\nPosted {}d ago. Build reliable services.", days)),
            navigable: true,
        }
    }

    pub fn without_content() -> Self {
        Self {
            content: None,
            ..Self::aged(1)
        }
    }

    pub fn unreachable() -> Self {
        Self {
            navigable: false,
            ..Self::aged(1)
        }
    }

    pub fn undated() -> Self {
        Self {
            age_days: None,
            ..Self::aged(1)
        }
    }
}

/// 模拟站点：列表页按页码索引，职位详情按链接索引
#[derive(Debug, Default)]
pub struct FakeSite {
    listing_pages: Vec<String>,
    jobs: HashMap<String, JobFixture>,
    listing_fetches: AtomicUsize,
    job_renders: AtomicUsize,
    navigations: AtomicUsize,
}

impl FakeSite {
    pub fn new(listing_pages: Vec<String>) -> Self {
        Self {
            listing_pages,
            ..Self::default()
        }
    }

    pub fn with_job(mut self, id: u32, fixture: JobFixture) -> Self {
        self.jobs.insert(job_url(id), fixture);
        self
    }

    pub fn listing_fetches(&self) -> usize {
        self.listing_fetches.load(Ordering::SeqCst)
    }

    pub fn job_renders(&self) -> usize {
        self.job_renders.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> usize {
        self.navigations.load(Ordering::SeqCst)
    }

    fn listing_page(&self, url: &str) -> Option<String> {
        let page_num: usize = Url::parse(url)
            .ok()
            .and_then(|url| {
                url.query_pairs()
                    .find(|(key, _)| key == "page")
                    .and_then(|(_, value)| value.parse().ok())
            })
            .unwrap_or(1);
        page_num
            .checked_sub(1)
            .and_then(|index| self.listing_pages.get(index))
            .cloned()
    }
}

pub struct FakeRenderer {
    site: Arc<FakeSite>,
}

impl FakeRenderer {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self { site }
    }
}

#[async_trait]
impl ContentRenderer for FakeRenderer {
    async fn render_markdown(&self, url: &str, mode: MarkdownMode) -> Result<Option<String>, EngineError> {
        tokio::time::sleep(RENDER_DELAY).await;
        match mode {
            MarkdownMode::Full => {
                self.site.listing_fetches.fetch_add(1, Ordering::SeqCst);
                Ok(self.site.listing_page(url))
            }
            MarkdownMode::Pruned => {
                self.site.job_renders.fetch_add(1, Ordering::SeqCst);
                match self.site.jobs.get(url) {
                    Some(fixture) => Ok(fixture.content.clone()),
                    None => Err(EngineError::Render(format!("404 for {}", url))),
                }
            }
        }
    }
}

pub struct FakePage {
    site: Arc<FakeSite>,
    current: Mutex<Option<String>>,
    closed: Arc<AtomicUsize>,
}

impl FakePage {
    fn fixture(&self) -> Option<JobFixture> {
        let current = self.current.lock().unwrap().clone()?;
        self.site.jobs.get(&current).cloned()
    }
}

#[async_trait]
impl PageHandle for FakePage {
    async fn goto(&self, url: &str) -> Result<(), EngineError> {
        self.site.navigations.fetch_add(1, Ordering::SeqCst);
        match self.site.jobs.get(url) {
            Some(fixture) if fixture.navigable => {
                *self.current.lock().unwrap() = Some(url.to_string());
                Ok(())
            }
            _ => Err(EngineError::Navigation {
                url: url.to_string(),
                reason: "net::ERR_CONNECTION_RESET".to_string(),
            }),
        }
    }

    async fn texts(&self, selector: &str) -> Result<Vec<String>, EngineError> {
        let fixture = match self.fixture() {
            Some(fixture) => fixture,
            None => return Ok(Vec::new()),
        };

        if selector.starts_with("span.") {
            return Ok(fixture
                .age_days
                .map(|days| vec!["Listed".to_string(), format!("Posted {}d ago", days)])
                .unwrap_or_default());
        }

        let text = match selector {
            r#"[data-automation="job-detail-title"]"# => "Software Engineer",
            r#"[data-automation="advertiser-name"]"# => "Acme Pty Ltd",
            r#"[data-automation="job-detail-location"]"# => "Sydney NSW",
            r#"[data-automation="job-detail-classifications"]"# => {
                "Engineering - Software (Information & Communication Technology)"
            }
            r#"[data-automation="job-detail-work-type"]"# => "Full time",
            r#"[data-automation="job-detail-salary"]"# => "$150,000 - $170,000",
            _ => return Ok(Vec::new()),
        };
        Ok(vec![format!(" {} ", text)])
    }

    async fn attribute(&self, _selector: &str, name: &str) -> Result<Option<String>, EngineError> {
        Ok((name == "src").then(|| LOGO_SRC.to_string()))
    }

    async fn close(&self) -> Result<(), EngineError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

pub struct FakeFactory {
    site: Arc<FakeSite>,
    created: AtomicUsize,
    closed: Arc<AtomicUsize>,
    shutdowns: AtomicUsize,
}

impl FakeFactory {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self {
            site,
            created: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            shutdowns: AtomicUsize::new(0),
        }
    }

    pub fn created(&self) -> usize {
        self.created.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PageFactory for FakeFactory {
    async fn new_page(&self) -> Result<Box<dyn PageHandle>, EngineError> {
        self.created.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakePage {
            site: self.site.clone(),
            current: Mutex::new(None),
            closed: self.closed.clone(),
        }))
    }

    async fn shutdown(&self) -> Result<(), EngineError> {
        self.shutdowns.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// 启动器，前 `failures` 次启动失败
pub struct FakeLauncher {
    site: Arc<FakeSite>,
    factory: Arc<FakeFactory>,
    failures: AtomicUsize,
    attempts: AtomicUsize,
}

impl FakeLauncher {
    pub fn new(site: Arc<FakeSite>) -> Self {
        Self::failing(site, 0)
    }

    pub fn failing(site: Arc<FakeSite>, failures: usize) -> Self {
        Self {
            factory: Arc::new(FakeFactory::new(site.clone())),
            site,
            failures: AtomicUsize::new(failures),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn factory(&self) -> &FakeFactory {
        &self.factory
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BrowserLauncher for FakeLauncher {
    async fn launch(&self) -> Result<BrowserSession, EngineError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let remaining = self.failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.failures.store(remaining - 1, Ordering::SeqCst);
            return Err(EngineError::Launch("chrome executable not found".to_string()));
        }

        Ok(BrowserSession {
            renderer: Arc::new(FakeRenderer::new(self.site.clone())),
            pages: self.factory.clone(),
        })
    }
}

/// LLM 协作方，解析结果固定，推断结果可配置
pub struct FakeInference {
    work_model: Option<WorkModel>,
    experience_level: Option<ExperienceLevel>,
    fail: bool,
    parse_calls: AtomicUsize,
    inference_calls: AtomicUsize,
}

impl Default for FakeInference {
    fn default() -> Self {
        Self {
            work_model: Some(WorkModel::Remote),
            experience_level: Some(ExperienceLevel::Junior),
            fail: false,
            parse_calls: AtomicUsize::new(0),
            inference_calls: AtomicUsize::new(0),
        }
    }
}

impl FakeInference {
    pub fn answering(work_model: Option<WorkModel>, experience_level: Option<ExperienceLevel>) -> Self {
        Self {
            work_model,
            experience_level,
            ..Self::default()
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn parse_calls(&self) -> usize {
        self.parse_calls.load(Ordering::SeqCst)
    }

    pub fn inference_calls(&self) -> usize {
        self.inference_calls.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<(), InferenceError> {
        if self.fail {
            Err(InferenceError::Api {
                status: 429,
                body: "rate limited".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl FieldInference for FakeInference {
    async fn parse_job_posting(&self, _markdown: &str, _index: usize) -> Result<String, InferenceError> {
        self.parse_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(r#"Here is the extracted job:
{"description": "Build reliable services.", "responsibilities": ["Design services", "Review code",],
 "requirements": ["Rust"], "experience_level": "Senior", "work_model": "Hybrid", "other": []}"#
            .to_string())
    }

    async fn infer_work_model(&self, _text: &str) -> Result<Option<WorkModel>, InferenceError> {
        self.inference_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.work_model)
    }

    async fn infer_experience_level(
        &self,
        _title: &str,
        _text: &str,
    ) -> Result<Option<ExperienceLevel>, InferenceError> {
        self.inference_calls.fetch_add(1, Ordering::SeqCst);
        self.check()?;
        Ok(self.experience_level)
    }
}

/// 记录所有发送内容的下游
#[derive(Default)]
pub struct RecordingSender {
    fail_batches: bool,
    fail_summary: bool,
    batches: Mutex<Vec<Vec<JobPosting>>>,
    summaries: Mutex<Vec<ScrapeSummary>>,
}

impl RecordingSender {
    pub fn failing_batches() -> Self {
        Self {
            fail_batches: true,
            ..Self::default()
        }
    }

    pub fn failing_summary() -> Self {
        Self {
            fail_summary: true,
            ..Self::default()
        }
    }

    pub fn batches(&self) -> Vec<Vec<JobPosting>> {
        self.batches.lock().unwrap().clone()
    }

    pub fn summaries(&self) -> Vec<ScrapeSummary> {
        self.summaries.lock().unwrap().clone()
    }
}

#[async_trait]
impl DownstreamSender for RecordingSender {
    async fn send_batch(&self, jobs: &[JobPosting]) -> Result<(), SenderError> {
        if self.fail_batches {
            return Err(SenderError::Status {
                status: 502,
                body: "bad gateway".to_string(),
            });
        }
        self.batches.lock().unwrap().push(jobs.to_vec());
        Ok(())
    }

    async fn send_summary(&self, summary: &ScrapeSummary) -> Result<(), SenderError> {
        self.summaries.lock().unwrap().push(summary.clone());
        if self.fail_summary {
            return Err(SenderError::Status {
                status: 500,
                body: "internal error".to_string(),
            });
        }
        Ok(())
    }
}

pub fn quiet_throttle() -> LoadThrottle {
    LoadThrottle::new(Arc::new(FixedCpuSampler(0.0)), ThrottleLimits::default())
}

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy::new(3, Duration::from_millis(1))
}

/// 所有休眠都关闭、日期固定的驱动
pub fn driver(
    launcher: Arc<FakeLauncher>,
    inference: Arc<FakeInference>,
    sender: Arc<RecordingSender>,
) -> ListingDriver {
    let settings = Settings::defaults().unwrap();
    ListingDriver::new(launcher, inference, sender, &settings)
        .unwrap()
        .with_throttle(quiet_throttle())
        .with_pacing(Pacing::none(), Pacing::none())
        .with_retry(fast_retry(), fast_retry())
        .with_today(today())
}

/// 直接驱动批次时使用的上下文
pub async fn scrape_context(
    site: Arc<FakeSite>,
    inference: Arc<FakeInference>,
    concurrency: usize,
    day_range_limit: u32,
) -> (Arc<ScrapeContext>, Arc<FakeFactory>) {
    let factory = Arc::new(FakeFactory::new(site.clone()));
    let pages = PagePool::init_pages(factory.as_ref(), concurrency).await.unwrap();
    let throttle = quiet_throttle();

    let ctx = ScrapeContext {
        renderer: Arc::new(FakeRenderer::new(site)),
        pages: Arc::new(pages),
        inference,
        metadata: MetadataExtractor::new(throttle.clone(), Pacing::none()),
        enricher: JobEnricher::new(7),
        throttle,
        retry: fast_retry(),
        pacing: Pacing::none(),
        concurrency,
        location_search: "Sydney".to_string(),
        day_range_limit,
        today: today(),
    };
    (Arc::new(ctx), factory)
}
