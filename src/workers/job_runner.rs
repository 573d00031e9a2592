// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, instrument, warn};

use crate::domain::models::outcome::ScrapeOutcome;
use crate::workers::context::{ScrapeContext, TerminationSignal};
use crate::workers::job_extractor::{Extraction, JobExtractor};

/// 有界的单职位执行器
///
/// 同一页的所有任务共享一个信号量和一个终止信号。任务在获取许可之前检查信号，
/// 已设置时直接返回 [`ScrapeOutcome::Terminate`]，不做任何工作。
#[derive(Clone)]
pub struct BoundedJobRunner {
    ctx: Arc<ScrapeContext>,
    semaphore: Arc<Semaphore>,
    signal: TerminationSignal,
}

impl BoundedJobRunner {
    pub fn new(ctx: Arc<ScrapeContext>, semaphore: Arc<Semaphore>, signal: TerminationSignal) -> Self {
        Self {
            ctx,
            semaphore,
            signal,
        }
    }

    #[instrument(skip(self))]
    pub async fn run(&self, job_url: String, index: usize) -> ScrapeOutcome {
        if self.signal.is_set() {
            debug!("Termination already signalled, skipping {}", job_url);
            return record(ScrapeOutcome::Terminate);
        }

        let _permit = match self.semaphore.acquire().await {
            Ok(permit) => permit,
            Err(_) => return record(ScrapeOutcome::error("job semaphore closed")),
        };

        self.ctx.throttle.maybe_pause().await;
        self.ctx.pacing.pause().await;

        let outcome = self.process(&job_url, index).await;
        if let ScrapeOutcome::Skipped { ref reason } = outcome {
            warn!("Skipped {}: {}", job_url, reason);
        }
        record(outcome)
    }

    async fn process(&self, job_url: &str, index: usize) -> ScrapeOutcome {
        self.ctx.throttle.maybe_pause().await;
        let extraction = JobExtractor::new(self.ctx.clone())
            .extract(job_url, index, &self.signal)
            .await;
        self.ctx.pacing.pause().await;

        match extraction {
            Ok(Extraction::Found { job, metadata }) => {
                let job = self.ctx.enricher.enrich(
                    job,
                    job_url,
                    &self.ctx.location_search,
                    &metadata,
                    self.ctx.today,
                );
                self.ctx.pacing.pause().await;
                ScrapeOutcome::Success { job }
            }
            Ok(Extraction::Skipped(reason)) => ScrapeOutcome::Skipped { reason },
            Ok(Extraction::Terminate) => ScrapeOutcome::Terminate,
            Err(e) => ScrapeOutcome::error(format!("{}: {}", job_url, e)),
        }
    }
}

fn record(outcome: ScrapeOutcome) -> ScrapeOutcome {
    metrics::counter!("jobharvest_jobs_total", "outcome" => outcome.label()).increment(1);
    outcome
}
