// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use thiserror::Error;
use tracing::info;

use crate::config::settings::DownstreamSettings;
use crate::domain::models::job::JobPosting;
use crate::domain::models::outcome::ScrapeSummary;

/// 下游发送错误
#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("Downstream returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// 下游存储协作方
#[async_trait]
pub trait DownstreamSender: Send + Sync {
    /// 发送一页校验后的职位
    async fn send_batch(&self, jobs: &[JobPosting]) -> Result<(), SenderError>;

    /// 发送运行汇总，调用方不会因为它失败而改变运行结果
    async fn send_summary(&self, summary: &ScrapeSummary) -> Result<(), SenderError>;
}

/// 基于 HTTP 的下游发送实现
pub struct HttpDownstreamSender {
    /// HTTP 客户端
    client: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

impl HttpDownstreamSender {
    pub fn new(settings: &DownstreamSettings) -> Result<Self, SenderError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_token: settings.api_token.clone().filter(|t| !t.is_empty()),
        })
    }

    async fn post(&self, path: &str, body: &serde_json::Value) -> Result<(), SenderError> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .json(body);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            Err(SenderError::Status { status, body })
        }
    }
}

#[async_trait]
impl DownstreamSender for HttpDownstreamSender {
    async fn send_batch(&self, jobs: &[JobPosting]) -> Result<(), SenderError> {
        self.post("/jobs/page-batch", &json!({ "jobs": jobs })).await?;
        info!("Successfully sent {} jobs downstream", jobs.len());
        Ok(())
    }

    async fn send_summary(&self, summary: &ScrapeSummary) -> Result<(), SenderError> {
        self.post("/jobs/scrape-summary", &json!(summary)).await?;
        info!("Successfully sent scrape summary downstream");
        Ok(())
    }
}
