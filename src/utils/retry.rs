// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{error, warn};

/// 重试策略配置
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// 最大尝试次数
    pub max_retries: u32,
    /// 初始退避时间
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
        }
    }

    /// 计算第 `attempt` 次失败之后的退避时间
    ///
    /// `base_delay * 2^(attempt-1)`，attempt 从 1 开始
    pub fn calculate_backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base_delay.saturating_mul(1u32 << exponent)
    }

    /// 是否还有剩余尝试次数
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_retries
    }
}

/// 带指数退避的重试执行器
///
/// 最多执行 `policy.max_retries` 次 `op`。每次失败后（最后一次除外）休眠
/// [`RetryPolicy::calculate_backoff`]。全部失败时记录带 `label` 的诊断事件并返回 `None`，
/// 调用方把 `None` 当作"无法完成"处理，而不是向上传播错误。
pub async fn retry_with_backoff<T, E, F, Fut>(policy: &RetryPolicy, label: &str, mut op: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let mut attempt = 0;
    let mut last_error: Option<String> = None;

    while policy.should_retry(attempt) {
        match op().await {
            Ok(value) => return Some(value),
            Err(e) => {
                attempt += 1;
                warn!("[Attempt {}] {} failed: {}", attempt, label, e);
                last_error = Some(e.to_string());

                if policy.should_retry(attempt) {
                    tokio::time::sleep(policy.calculate_backoff(attempt)).await;
                }
            }
        }
    }

    error!(
        component = "retry_with_backoff",
        operation_label = label,
        attempts = attempt,
        last_error = last_error.as_deref().unwrap_or("none"),
        "Operation exhausted all retries"
    );
    metrics::counter!("jobharvest_retry_exhausted_total", "label" => label_family(label)).increment(1);

    None
}

/// Labels carry URLs; only the prefix before the first `(` or `:` goes into metrics.
fn label_family(label: &str) -> String {
    label
        .split(['(', ':'])
        .next()
        .unwrap_or(label)
        .trim()
        .to_string()
}
