// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// 发布日期的字符串格式（下游存储使用 `日/月/年`）
pub const POSTED_DATE_FORMAT: &str = "%d/%m/%Y";

/// 经验级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[serde(rename = "intern")]
    Intern,
    #[serde(rename = "junior")]
    Junior,
    #[serde(rename = "mid_or_senior")]
    MidOrSenior,
    #[serde(rename = "lead+")]
    LeadPlus,
}

impl ExperienceLevel {
    pub const ALL: [ExperienceLevel; 4] = [
        ExperienceLevel::Intern,
        ExperienceLevel::Junior,
        ExperienceLevel::MidOrSenior,
        ExperienceLevel::LeadPlus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Intern => "intern",
            ExperienceLevel::Junior => "junior",
            ExperienceLevel::MidOrSenior => "mid_or_senior",
            ExperienceLevel::LeadPlus => "lead+",
        }
    }
}

impl fmt::Display for ExperienceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 只接受四个规范取值，不做大小写或同义词转换
impl FromStr for ExperienceLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ExperienceLevel::ALL
            .into_iter()
            .find(|level| level.as_str() == s)
            .ok_or_else(|| format!("invalid experience level: {}", s))
    }
}

/// 工作模式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WorkModel {
    Remote,
    Hybrid,
    #[serde(rename = "On-site")]
    OnSite,
}

impl WorkModel {
    pub const ALL: [WorkModel; 3] = [WorkModel::Remote, WorkModel::Hybrid, WorkModel::OnSite];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkModel::Remote => "Remote",
            WorkModel::Hybrid => "Hybrid",
            WorkModel::OnSite => "On-site",
        }
    }
}

impl fmt::Display for WorkModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkModel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WorkModel::ALL
            .into_iter()
            .find(|model| model.as_str() == s)
            .ok_or_else(|| format!("invalid work model: {}", s))
    }
}

/// 从职位详情页 DOM 中提取的元数据
///
/// 每个字段独立提取，任何一个字段缺失都不影响其他字段。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobMetadata {
    pub title: Option<String>,
    pub company: Option<String>,
    pub location: Option<String>,
    pub classification: Option<String>,
    pub work_type: Option<String>,
    pub salary: Option<String>,
    pub logo_src: Option<String>,
    pub posted_date: Option<NaiveDate>,
}

/// 校验前的职位记录
///
/// 字段值来自外部协作方（LLM 输出、页面元数据），类型不可信，
/// 因此统一用 [`Value`] 保存；[`crate::domain::services::validator::Validator`]
/// 负责把它修复成 [`JobPosting`]。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JobDraft {
    #[serde(rename = "job_url", alias = "url")]
    pub url: Value,
    #[serde(alias = "quickApplyUrl")]
    pub quick_apply_url: Value,
    pub title: Value,
    pub company: Value,
    pub classification: Value,
    #[serde(alias = "workType")]
    pub work_type: Value,
    pub salary: Value,
    pub location: Value,
    #[serde(alias = "locationSearch")]
    pub location_search: Value,
    pub description: Value,
    pub responsibilities: Value,
    pub requirements: Value,
    pub other: Value,
    #[serde(alias = "experienceLevel")]
    pub experience_level: Value,
    #[serde(alias = "workModel")]
    pub work_model: Value,
    #[serde(alias = "postedDate")]
    pub posted_date: Value,
    #[serde(alias = "postedWithin")]
    pub posted_within: Value,
    #[serde(alias = "logoLink")]
    pub logo_link: Value,
}

/// 校验后的职位记录，交给下游存储
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobPosting {
    #[serde(rename = "job_url")]
    pub url: String,
    pub quick_apply_url: String,
    pub title: String,
    pub company: String,
    pub classification: String,
    pub work_type: String,
    pub salary: Option<String>,
    pub location: String,
    pub location_search: String,
    pub description: String,
    pub responsibilities: Vec<String>,
    pub requirements: Vec<String>,
    pub other: Vec<String>,
    pub experience_level: ExperienceLevel,
    pub work_model: WorkModel,
    #[serde(with = "posted_date_format")]
    pub posted_date: NaiveDate,
    pub posted_within: String,
    pub logo_link: Option<String>,
}

impl From<&JobPosting> for JobDraft {
    fn from(job: &JobPosting) -> Self {
        let list = |items: &[String]| Value::from(items.to_vec());
        let optional = |value: &Option<String>| value.clone().map(Value::from).unwrap_or(Value::Null);

        Self {
            url: Value::from(job.url.clone()),
            quick_apply_url: Value::from(job.quick_apply_url.clone()),
            title: Value::from(job.title.clone()),
            company: Value::from(job.company.clone()),
            classification: Value::from(job.classification.clone()),
            work_type: Value::from(job.work_type.clone()),
            salary: optional(&job.salary),
            location: Value::from(job.location.clone()),
            location_search: Value::from(job.location_search.clone()),
            description: Value::from(job.description.clone()),
            responsibilities: list(&job.responsibilities),
            requirements: list(&job.requirements),
            other: list(&job.other),
            experience_level: Value::from(job.experience_level.as_str()),
            work_model: Value::from(job.work_model.as_str()),
            posted_date: Value::from(format_posted_date(job.posted_date)),
            posted_within: Value::from(job.posted_within.clone()),
            logo_link: optional(&job.logo_link),
        }
    }
}

pub fn format_posted_date(date: NaiveDate) -> String {
    date.format(POSTED_DATE_FORMAT).to_string()
}

pub fn parse_posted_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), POSTED_DATE_FORMAT).ok()
}

mod posted_date_format {
    use super::{format_posted_date, parse_posted_date};
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_posted_date(*date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse_posted_date(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid posted date: {}", raw)))
    }
}
