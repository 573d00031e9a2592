// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;
use std::time::Duration;

use crate::utils::listing::DEFAULT_JOB_URL_PATTERN;
use crate::utils::retry::RetryPolicy;
use crate::utils::throttle::{Pacing, ThrottleLimits};

/// 应用程序配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// 抓取流水线配置
    pub scraper: ScraperSettings,
    /// 抖动休眠配置
    pub pacing: PacingSettings,
    /// 浏览器配置
    pub browser: BrowserSettings,
    /// LLM配置
    pub llm: LlmSettings,
    /// 下游存储服务配置
    pub downstream: DownstreamSettings,
    /// 默认搜索配置
    pub search: SearchSettings,
    /// 指标配置
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// 抓取流水线配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct ScraperSettings {
    /// 每页同时处理的职位数，同时也是页面池容量
    pub concurrency: u32,
    /// 列表页每页职位数
    pub page_size: u32,
    /// 抓取截止天数，超过即提前终止
    pub day_range_limit: u32,
    /// `posted_within` 显示 "N days ago" 的最大天数
    pub posted_within_days: u32,
    /// 重试次数
    pub max_retries: u32,
    /// 重试初始退避（毫秒）
    pub retry_base_delay_ms: u64,
    /// CPU 软限制（百分比）
    pub cpu_soft_limit: f32,
    /// CPU 硬限制（百分比）
    pub cpu_hard_limit: f32,
    /// 从列表页提取职位链接的正则
    pub job_url_pattern: String,
}

/// 抖动休眠配置设置（毫秒）
#[derive(Debug, Clone, Deserialize)]
pub struct PacingSettings {
    pub task_min_ms: u64,
    pub task_max_ms: u64,
    pub listing_min_ms: u64,
    pub listing_max_ms: u64,
}

/// 浏览器配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct BrowserSettings {
    /// 远程 Chrome 调试地址，未设置时在本地启动
    pub remote_debugging_url: Option<String>,
    pub user_agent: Option<String>,
    /// 单次 CDP 请求和页面导航超时（秒）
    pub request_timeout_secs: u64,
}

/// LLM配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    /// OpenAI 兼容接口的基础 URL
    pub api_base_url: String,
    /// 结构化解析按职位序号轮换使用的模型
    pub parse_models: Vec<String>,
    /// 工作模式和经验级别推断使用的模型
    pub inference_model: String,
    pub timeout_secs: u64,
}

/// 下游存储服务配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct DownstreamSettings {
    pub base_url: String,
    pub timeout_secs: u64,
    pub api_token: Option<String>,
}

/// 默认搜索配置设置
#[derive(Debug, Clone, Deserialize)]
pub struct SearchSettings {
    pub job_title: String,
    pub location: String,
    pub max_pages: Option<u32>,
    /// 列表链接模板，`{keywords}` 和 `{location}` 会被替换
    pub listing_url: String,
}

/// 指标配置设置
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetricsSettings {
    /// Prometheus 导出地址，例如 `0.0.0.0:9000`；未设置时不导出
    pub listen_addr: Option<String>,
}

impl Settings {
    /// 创建新的配置实例
    ///
    /// 按以下顺序叠加：代码默认值、`config/default`、`config/{APP_ENVIRONMENT}`、
    /// `JOBHARVEST_` 前缀的环境变量（层级分隔符 `__`）。
    ///
    /// # Returns
    ///
    /// * `Ok(Settings)` - 成功加载并通过校验的配置
    /// * `Err(ConfigError)` - 配置加载或校验失败
    pub fn new() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "default".to_string());
        let builder = Self::builder_with_defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(
                Environment::with_prefix("JOBHARVEST")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("llm.parse_models")
                    .try_parsing(true),
            );

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// 只包含代码默认值的配置
    pub fn defaults() -> Result<Self, ConfigError> {
        Self::builder_with_defaults()?.build()?.try_deserialize()
    }

    pub fn builder_with_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("scraper.concurrency", 3)?
            .set_default("scraper.page_size", 22)?
            .set_default("scraper.day_range_limit", 7)?
            .set_default("scraper.posted_within_days", 7)?
            .set_default("scraper.max_retries", 3)?
            .set_default("scraper.retry_base_delay_ms", 1000)?
            .set_default("scraper.cpu_soft_limit", 70.0)?
            .set_default("scraper.cpu_hard_limit", 90.0)?
            .set_default("scraper.job_url_pattern", DEFAULT_JOB_URL_PATTERN)?
            .set_default("pacing.task_min_ms", 50)?
            .set_default("pacing.task_max_ms", 250)?
            .set_default("pacing.listing_min_ms", 1000)?
            .set_default("pacing.listing_max_ms", 2500)?
            .set_default("browser.request_timeout_secs", 60)?
            .set_default("llm.api_base_url", "https://api.groq.com/openai/v1")?
            .set_default(
                "llm.parse_models",
                vec!["llama-3.1-8b-instant", "llama-3.3-70b-versatile", "gemma2-9b-it"],
            )?
            .set_default("llm.inference_model", "llama-3.3-70b-versatile")?
            .set_default("llm.timeout_secs", 60)?
            .set_default("downstream.base_url", "http://localhost:3000/api")?
            .set_default("downstream.timeout_secs", 15)?
            .set_default("search.job_title", "software engineer")?
            .set_default("search.location", "sydney")?
            .set_default("search.max_pages", 1)?
            .set_default(
                "search.listing_url",
                "https://www.seek.com.au/jobs?keywords={keywords}&where={location}&sortmode=ListedDate",
            )
    }

    /// 校验配置
    ///
    /// 页面池容量等于并发数，容量为 0 时获取页面会永远等待，因此在这里拒绝。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let scraper = &self.scraper;
        if scraper.concurrency == 0 {
            return Err(ConfigError::Message("scraper.concurrency must be at least 1".into()));
        }
        if scraper.page_size == 0 {
            return Err(ConfigError::Message("scraper.page_size must be at least 1".into()));
        }
        if scraper.max_retries == 0 {
            return Err(ConfigError::Message("scraper.max_retries must be at least 1".into()));
        }
        if scraper.cpu_soft_limit > scraper.cpu_hard_limit {
            return Err(ConfigError::Message(format!(
                "scraper.cpu_soft_limit ({}) must not exceed scraper.cpu_hard_limit ({})",
                scraper.cpu_soft_limit, scraper.cpu_hard_limit
            )));
        }
        if self.llm.parse_models.is_empty() {
            return Err(ConfigError::Message("llm.parse_models must not be empty".into()));
        }
        if regex::Regex::new(&scraper.job_url_pattern).is_err() {
            return Err(ConfigError::Message("scraper.job_url_pattern is not a valid regex".into()));
        }
        Ok(())
    }
}

impl ScraperSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, Duration::from_millis(self.retry_base_delay_ms))
    }

    pub fn throttle_limits(&self) -> ThrottleLimits {
        ThrottleLimits {
            soft_limit: self.cpu_soft_limit,
            hard_limit: self.cpu_hard_limit,
            ..ThrottleLimits::default()
        }
    }
}

impl PacingSettings {
    pub fn task(&self) -> Pacing {
        Pacing::from_millis(self.task_min_ms, self.task_max_ms)
    }

    pub fn listing(&self) -> Pacing {
        Pacing::from_millis(self.listing_min_ms, self.listing_max_ms)
    }
}
