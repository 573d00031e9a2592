// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use futures::future::join_all;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{info, instrument};

use crate::domain::models::job::JobDraft;
use crate::domain::models::outcome::ScrapeOutcome;
use crate::workers::context::{ScrapeContext, TerminationSignal};
use crate::workers::job_extractor::ScrapeError;
use crate::workers::job_runner::BoundedJobRunner;

/// 一批职位的统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub attempted: usize,
    pub successful: usize,
    pub skipped: usize,
    pub terminated: usize,
    pub errored: usize,
}

/// 一个列表页所有职位的汇总结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchResult {
    /// 成功的职位，保持链接在页面中的顺序
    pub jobs: Vec<JobDraft>,
    pub terminated_early: bool,
    /// 跳过和出错的原因
    pub diagnostics: Vec<String>,
    pub stats: BatchStats,
}

impl BatchResult {
    /// 在所有任务结束后单线程汇总结果
    pub fn from_outcomes(outcomes: Vec<ScrapeOutcome>) -> Self {
        let mut result = BatchResult {
            stats: BatchStats {
                attempted: outcomes.len(),
                ..BatchStats::default()
            },
            ..BatchResult::default()
        };

        for outcome in outcomes {
            match outcome {
                ScrapeOutcome::Success { job } => {
                    result.stats.successful += 1;
                    result.jobs.push(job);
                }
                ScrapeOutcome::Skipped { reason } => {
                    result.stats.skipped += 1;
                    result.diagnostics.push(format!("skipped: {}", reason));
                }
                ScrapeOutcome::Terminate => {
                    result.stats.terminated += 1;
                    result.terminated_early = true;
                }
                ScrapeOutcome::Error { reason } => {
                    result.stats.errored += 1;
                    result.diagnostics.push(format!("error: {}", reason));
                }
            }
        }

        result
    }
}

/// 批次编排器
///
/// 为页面上的每个职位链接启动一个任务，不等待前面的任务完成，全部结束后再汇总。
/// 终止信号只影响尚未获得许可的任务，已经在执行的任务会正常完成。
pub struct BatchOrchestrator {
    ctx: Arc<ScrapeContext>,
}

impl BatchOrchestrator {
    pub fn new(ctx: Arc<ScrapeContext>) -> Self {
        Self { ctx }
    }

    #[instrument(skip(self, job_urls), fields(jobs = job_urls.len()))]
    pub async fn run(&self, job_urls: Vec<String>, page_num: u32) -> BatchResult {
        let started = Instant::now();
        let runner = BoundedJobRunner::new(
            self.ctx.clone(),
            Arc::new(Semaphore::new(self.ctx.concurrency)),
            TerminationSignal::new(),
        );

        let mut handles = Vec::with_capacity(job_urls.len());
        for (index, job_url) in job_urls.into_iter().enumerate() {
            self.ctx.throttle.maybe_pause().await;
            let runner = runner.clone();
            handles.push(tokio::spawn(async move { runner.run(job_url, index).await }));
            self.ctx.pacing.pause().await;
        }

        let outcomes: Vec<ScrapeOutcome> = join_all(handles)
            .await
            .into_iter()
            .map(|joined| {
                joined.unwrap_or_else(|e| ScrapeOutcome::error(ScrapeError::Task(e.to_string()).to_string()))
            })
            .collect();

        let result = BatchResult::from_outcomes(outcomes);
        let stats = result.stats;

        metrics::histogram!("jobharvest_batch_duration_seconds").record(started.elapsed().as_secs_f64());
        info!(
            component = "process_jobs_concurrently",
            page_num = page_num,
            total_jobs_attempted = stats.attempted,
            jobs_successful = stats.successful,
            jobs_skipped = stats.skipped,
            jobs_terminated_early = stats.terminated,
            jobs_errored = stats.errored,
            early_termination = result.terminated_early,
            "Scraping job batch completed"
        );

        result
    }
}
