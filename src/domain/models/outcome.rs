// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::job::JobDraft;

/// 单个职位链接的处理结果
#[derive(Debug, Clone, PartialEq)]
pub enum ScrapeOutcome {
    /// 抓取、解析、补全都成功
    Success { job: JobDraft },
    /// 可恢复的跳过（无内容、无元数据、无法解析）
    Skipped { reason: String },
    /// 职位超出允许的时间范围，本页后续工作可以停止
    Terminate,
    /// 处理过程中出现意外错误
    Error { reason: String },
}

impl ScrapeOutcome {
    pub fn skipped(reason: impl Into<String>) -> Self {
        ScrapeOutcome::Skipped {
            reason: reason.into(),
        }
    }

    pub fn error(reason: impl Into<String>) -> Self {
        ScrapeOutcome::Error {
            reason: reason.into(),
        }
    }

    /// 指标标签
    pub fn label(&self) -> &'static str {
        match self {
            ScrapeOutcome::Success { .. } => "success",
            ScrapeOutcome::Skipped { .. } => "skipped",
            ScrapeOutcome::Terminate => "terminate",
            ScrapeOutcome::Error { .. } => "error",
        }
    }
}

/// 校验时被修复的职位
///
/// `original` 是修复前的原始记录，便于排查数据问题。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidJob {
    pub job_url: String,
    pub fields: BTreeSet<String>,
    pub original: JobDraft,
}

/// 一个列表页的处理结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageResult {
    /// 本页写入下游的职位数
    pub job_count: usize,
    pub errors: Vec<String>,
    pub terminated_early: bool,
    pub invalid_jobs: Vec<InvalidJob>,
}

/// 一次抓取运行的汇总
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeSummary {
    pub message: String,
    pub terminated_early: bool,
    #[serde(default)]
    pub job_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<String>>,
    /// 校验时被修复的职位及其原始记录
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub invalid_jobs: Vec<InvalidJob>,
}

impl ScrapeSummary {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            terminated_early: false,
            job_count: 0,
            errors: None,
            invalid_jobs: Vec::new(),
        }
    }
}
