// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use serde_json::Value;

use crate::domain::models::job::{
    format_posted_date, ExperienceLevel, JobDraft, JobMetadata, WorkModel,
};
use crate::utils::listing::canonical_job_urls;

// 按完整单词匹配，所以常见的变形需要单独列出
const INTERN_TITLES: [&str; 4] = ["intern", "interns", "internship", "internships"];
const JUNIOR_TITLES: [&str; 4] = ["junior", "graduate", "graduates", "entry"];
const LEAD_TITLES: [&str; 10] = [
    "lead", "leader", "leaders", "leadership", "manager", "principal", "head", "director", "vp", "chief",
];

/// 把页面元数据合并进 LLM 解析出的职位记录
///
/// 纯函数，不访问任何外部资源；`today` 由调用方传入。
#[derive(Debug, Clone, Copy)]
pub struct JobEnricher {
    /// `posted_within` 显示 "N days ago" 的最大天数，和抓取截止天数相互独立
    display_window_days: i64,
}

impl JobEnricher {
    pub fn new(display_window_days: u32) -> Self {
        Self {
            display_window_days: i64::from(display_window_days),
        }
    }

    pub fn enrich(
        &self,
        mut job: JobDraft,
        job_url: &str,
        location_search: &str,
        metadata: &JobMetadata,
        today: NaiveDate,
    ) -> JobDraft {
        let (canonical, quick_apply) = canonical_job_urls(job_url);
        job.url = Value::from(canonical);
        job.quick_apply_url = Value::from(quick_apply);
        job.location_search = Value::from(location_search);

        job.posted_date = metadata
            .posted_date
            .map(|date| Value::from(format_posted_date(date)))
            .unwrap_or(Value::Null);
        job.posted_within = metadata
            .posted_date
            .and_then(|date| self.relative_posted_time(date, today))
            .map(Value::from)
            .unwrap_or(Value::Null);

        job.logo_link = optional(&metadata.logo_src);
        job.location = optional(&metadata.location);
        job.classification = optional(&metadata.classification);
        job.work_type = optional(&metadata.work_type);
        job.salary = optional(&metadata.salary);
        job.title = optional(&metadata.title);
        job.company = optional(&metadata.company);

        if job.work_model.is_null() {
            job.work_model = Value::from(WorkModel::OnSite.as_str());
        }

        if let Some(level) = job.title.as_str().and_then(level_from_title) {
            job.experience_level = Value::from(level.as_str());
        }

        normalize_experience_level(&mut job);
        job
    }

    pub fn relative_posted_time(&self, posted: NaiveDate, today: NaiveDate) -> Option<String> {
        posted_within(posted, today, self.display_window_days)
    }
}

/// "Today" / "Yesterday" / "N days ago"，超出显示窗口或日期在未来时返回 `None`
pub fn posted_within(posted: NaiveDate, today: NaiveDate, display_window_days: i64) -> Option<String> {
    match (today - posted).num_days() {
        0 => Some("Today".to_string()),
        1 => Some("Yesterday".to_string()),
        days if days > 1 && days <= display_window_days => Some(format!("{} days ago", days)),
        _ => None,
    }
}

fn optional(value: &Option<String>) -> Value {
    value.clone().map(Value::from).unwrap_or(Value::Null)
}

/// 按标题中的关键词判断经验级别
///
/// 按单词匹配，"Headquarters" 不会命中 "head"。
pub fn level_from_title(title: &str) -> Option<ExperienceLevel> {
    let title = title.to_lowercase();
    let words: Vec<&str> = title
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| !word.is_empty())
        .collect();
    let has_any = |terms: &[&str]| words.iter().any(|word| terms.contains(word));

    if has_any(&INTERN_TITLES) {
        Some(ExperienceLevel::Intern)
    } else if has_any(&JUNIOR_TITLES) {
        Some(ExperienceLevel::Junior)
    } else if has_any(&LEAD_TITLES) {
        Some(ExperienceLevel::LeadPlus)
    } else {
        None
    }
}

fn normalize_experience_level(job: &mut JobDraft) {
    let normalized = job
        .experience_level
        .as_str()
        .map(|level| level.to_lowercase())
        .filter(|level| level == "mid" || level == "senior");

    if normalized.is_some() {
        job.experience_level = Value::from(ExperienceLevel::MidOrSenior.as_str());
    }
}
