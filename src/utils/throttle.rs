// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use sysinfo::{CpuRefreshKind, RefreshKind, System};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, warn};

/// CPU 采样错误
#[derive(Error, Debug)]
pub enum ThrottleError {
    #[error("CPU sampling is not supported on this platform")]
    Unsupported,

    #[error("Invalid CPU reading: {0}")]
    InvalidReading(f32),
}

/// 随机休眠 `[min, max)` 之间的时长
///
/// 区间为空时直接休眠 `min`，两者都为零时立即返回。
pub async fn pause_briefly(min: Duration, max: Duration) {
    let delay = if max > min {
        Duration::from_secs_f64(rand::random_range(min.as_secs_f64()..max.as_secs_f64()))
    } else {
        min
    };

    if delay.is_zero() {
        return;
    }

    debug!("Pausing for {:.2} seconds...", delay.as_secs_f64());
    tokio::time::sleep(delay).await;
}

/// 抖动休眠区间
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pacing {
    pub min: Duration,
    pub max: Duration,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self { min, max }
    }

    pub fn from_millis(min_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(min_ms), Duration::from_millis(max_ms))
    }

    /// 不休眠
    pub fn none() -> Self {
        Self::new(Duration::ZERO, Duration::ZERO)
    }

    pub async fn pause(&self) {
        pause_briefly(self.min, self.max).await;
    }
}

/// CPU 使用率采样器
#[async_trait]
pub trait CpuSampler: Send + Sync {
    /// 返回当前 CPU 使用率（百分比，0-100）
    async fn sample(&self) -> Result<f32, ThrottleError>;
}

/// 基于 sysinfo 的 CPU 采样器
///
/// 所有调用方共享一个缓存读数。距上次刷新不足 `MINIMUM_CPU_UPDATE_INTERVAL` 时直接返回缓存，
/// 因此采样不会等待，每个采样窗口也不会被并发调用缩短。第一个窗口结束前读数为 0。
pub struct SysinfoCpuSampler {
    state: Mutex<CpuState>,
}

struct CpuState {
    system: System,
    refreshed_at: Instant,
    usage: f32,
}

impl Default for SysinfoCpuSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl SysinfoCpuSampler {
    pub fn new() -> Self {
        let system = System::new_with_specifics(
            RefreshKind::nothing().with_cpu(CpuRefreshKind::nothing().with_cpu_usage()),
        );
        Self {
            state: Mutex::new(CpuState {
                system,
                refreshed_at: Instant::now(),
                usage: 0.0,
            }),
        }
    }
}

#[async_trait]
impl CpuSampler for SysinfoCpuSampler {
    async fn sample(&self) -> Result<f32, ThrottleError> {
        if !sysinfo::IS_SUPPORTED_SYSTEM {
            return Err(ThrottleError::Unsupported);
        }

        let usage = {
            let mut state = self.state.lock();
            if state.refreshed_at.elapsed() >= sysinfo::MINIMUM_CPU_UPDATE_INTERVAL {
                state.system.refresh_cpu_usage();
                state.usage = state.system.global_cpu_usage();
                state.refreshed_at = Instant::now();
            }
            state.usage
        };

        if usage.is_finite() {
            Ok(usage)
        } else {
            Err(ThrottleError::InvalidReading(usage))
        }
    }
}

/// 负载节流阈值
#[derive(Debug, Clone, Copy)]
pub struct ThrottleLimits {
    /// 软限制（百分比）
    pub soft_limit: f32,
    /// 硬限制（百分比）
    pub hard_limit: f32,
    /// 超过软限制时的休眠区间
    pub soft_pause: Pacing,
    /// 超过硬限制时的休眠区间
    pub hard_pause: Pacing,
}

impl Default for ThrottleLimits {
    fn default() -> Self {
        Self {
            soft_limit: 70.0,
            hard_limit: 90.0,
            soft_pause: Pacing::from_millis(250, 750),
            hard_pause: Pacing::from_millis(1000, 3000),
        }
    }
}

/// 负载节流器
///
/// 在每个网络操作前后调用 [`LoadThrottle::maybe_pause`]，CPU 饱和时让整个流水线放慢。
/// 采样失败只记录日志，不会中断流水线。
#[derive(Clone)]
pub struct LoadThrottle {
    sampler: Arc<dyn CpuSampler>,
    limits: ThrottleLimits,
}

impl LoadThrottle {
    pub fn new(sampler: Arc<dyn CpuSampler>, limits: ThrottleLimits) -> Self {
        Self { sampler, limits }
    }

    /// 按当前 CPU 负载决定是否休眠
    pub async fn maybe_pause(&self) {
        let cpu = match self.sampler.sample().await {
            Ok(cpu) => cpu,
            Err(e) => {
                warn!(
                    component = "backoff_if_high_cpu",
                    soft_limit = self.limits.soft_limit,
                    hard_limit = self.limits.hard_limit,
                    "Failed to measure CPU usage: {}",
                    e
                );
                return;
            }
        };

        if cpu >= self.limits.hard_limit {
            warn!("CPU usage at {:.1}%. Hard backoff...", cpu);
            metrics::counter!("jobharvest_throttle_pauses_total", "level" => "hard").increment(1);
            self.limits.hard_pause.pause().await;
        } else if cpu >= self.limits.soft_limit {
            warn!("CPU usage at {:.1}%. Soft backoff...", cpu);
            metrics::counter!("jobharvest_throttle_pauses_total", "level" => "soft").increment(1);
            self.limits.soft_pause.pause().await;
        }
    }
}

/// 返回固定读数的采样器
pub struct FixedCpuSampler(pub f32);

#[async_trait]
impl CpuSampler for FixedCpuSampler {
    async fn sample(&self) -> Result<f32, ThrottleError> {
        Ok(self.0)
    }
}
