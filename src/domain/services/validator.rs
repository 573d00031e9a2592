// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{error, warn};
use url::Url;

use crate::domain::models::job::{
    parse_posted_date, ExperienceLevel, JobDraft, JobPosting, WorkModel,
};
use crate::domain::models::outcome::InvalidJob;
use crate::domain::services::enricher::posted_within;
use crate::domain::services::llm_service::FieldInference;

/// 必填字段缺失时使用的占位值
pub const PLACEHOLDER: &str = "Not specified";

const FALLBACK_POSTED_WITHIN: &str = "Today";
const SALARY_PLACEHOLDER: &str = "add expected salary to your profile for insights";
const SALARY_UNSPECIFIED: &str = "Salary unspecified";

/// 单条记录的校验结果
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    pub job: JobPosting,
    /// 被修复过的字段名
    pub touched: BTreeSet<String>,
}

impl ValidationReport {
    pub fn was_touched(&self) -> bool {
        !self.touched.is_empty()
    }
}

/// 职位记录校验器
///
/// 逐条修复记录，保证输出满足以下约束：
/// - `title`、`company`、`classification`、`work_type`、`posted_date`、`posted_within`、
///   `work_model` 非空
/// - URL 字段为空或是绝对 http(s) 地址
/// - 三个列表字段都是字符串数组
/// - `experience_level` 和 `work_model` 是允许的取值
///
/// 工作模式和经验级别无效时先调用推断协作方，失败再使用固定的回退值。
/// `posted_within` 缺失时按显示窗口补全，超出窗口使用占位值。
pub struct Validator {
    inference: Arc<dyn FieldInference>,
    display_window_days: i64,
}

/// 修复过程中的记录状态
struct Repair<'a> {
    job_url: &'a str,
    touched: BTreeSet<String>,
}

impl Repair<'_> {
    fn touch(&mut self, field: &str, message: &str) {
        warn!(
            component = "validate_job",
            job_url = self.job_url,
            field = field,
            "{}",
            message
        );
        metrics::counter!("jobharvest_validation_repairs_total", "field" => field.to_string()).increment(1);
        self.touched.insert(field.to_string());
    }

    /// 把任意值转成字符串，非字符串值记为修复
    fn string(&mut self, field: &str, value: &Value) -> Option<String> {
        match value {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => {
                self.touch(
                    field,
                    &format!("Field '{}' expected string but got {}, converting", field, type_name(other)),
                );
                Some(stringify(other))
            }
        }
    }

    fn required(&mut self, field: &str, value: &Value) -> String {
        match self.string(field, value) {
            Some(s) if !s.trim().is_empty() => s,
            _ => {
                self.touch(field, &format!("Missing required field '{}', applying fallback", field));
                PLACEHOLDER.to_string()
            }
        }
    }

    fn optional(&mut self, field: &str, value: &Value) -> Option<String> {
        self.string(field, value).filter(|s| !s.trim().is_empty())
    }

    fn url(&mut self, field: &str, value: &Value) -> String {
        let raw = self.string(field, value).unwrap_or_default();
        if raw.is_empty() || is_http_url(&raw) {
            return raw;
        }

        error!(
            component = "validate_job",
            job_url = self.job_url,
            invalid_url = raw.as_str(),
            field = field,
            "Invalid URL format in '{}'",
            field
        );
        self.touch(field, "Invalid URL cleared");
        String::new()
    }

    fn list(&mut self, field: &str, value: &Value) -> Vec<String> {
        match value {
            Value::Null => Vec::new(),
            Value::String(s) => {
                self.touch(field, &format!("Field '{}' expected list but got string, converting", field));
                vec![s.clone()]
            }
            Value::Array(items) => {
                let cleaned: Vec<String> = items.iter().filter_map(scalar_string).collect();
                if cleaned.len() != items.len() || items.iter().any(|item| !item.is_string()) {
                    self.touch(field, &format!("Field '{}' contained non-string items", field));
                }
                cleaned
            }
            other => {
                self.touch(
                    field,
                    &format!("Field '{}' expected list but got {}, converting", field, type_name(other)),
                );
                Vec::new()
            }
        }
    }
}

impl Validator {
    pub fn new(inference: Arc<dyn FieldInference>, display_window_days: u32) -> Self {
        Self {
            inference,
            display_window_days: i64::from(display_window_days),
        }
    }

    /// 校验并修复一条记录
    pub async fn validate(&self, draft: &JobDraft, today: NaiveDate) -> ValidationReport {
        let job_url = draft.url.as_str().unwrap_or("Unknown URL").to_string();
        let mut repair = Repair {
            job_url: &job_url,
            touched: BTreeSet::new(),
        };

        let job_text = [
            flatten(&draft.description),
            flatten(&draft.responsibilities),
            flatten(&draft.requirements),
        ]
        .join("\n");

        let work_model = match draft.work_model.as_str().and_then(|s| s.parse::<WorkModel>().ok()) {
            Some(model) => model,
            None => {
                repair.touch("work_model", "Invalid or missing 'work_model', attempting inference");
                let inferred = match self.inference.infer_work_model(&job_text).await {
                    Ok(model) => model,
                    Err(e) => {
                        error!(component = "infer_work_model", job_url = job_url.as_str(), "{}", e);
                        None
                    }
                };
                inferred.unwrap_or(WorkModel::OnSite)
            }
        };

        let title = repair.required("title", &draft.title);
        let company = repair.required("company", &draft.company);
        let classification = repair.required("classification", &draft.classification);
        let work_type = repair.required("work_type", &draft.work_type);

        let posted_date_raw = repair.string("posted_date", &draft.posted_date);
        let (posted_date, posted_within) =
            match posted_date_raw.as_deref().and_then(parse_posted_date) {
                Some(date) => {
                    let within = match repair.string("posted_within", &draft.posted_within) {
                        Some(s) if !s.trim().is_empty() => s,
                        _ => {
                            repair.touch("posted_within", "Missing required field 'posted_within', applying fallback");
                            posted_within(date, today, self.display_window_days)
                                .unwrap_or_else(|| PLACEHOLDER.to_string())
                        }
                    };
                    (date, within)
                }
                None => {
                    repair.touch("posted_date", "Missing required field 'posted_date', applying fallback");
                    if draft.posted_within.as_str() != Some(FALLBACK_POSTED_WITHIN) {
                        repair.touch("posted_within", "Posted date reset to today");
                    }
                    (today, FALLBACK_POSTED_WITHIN.to_string())
                }
            };

        let url = repair.url("job_url", &draft.url);
        let quick_apply_url = repair.url("quick_apply_url", &draft.quick_apply_url);

        let experience_level = match draft
            .experience_level
            .as_str()
            .and_then(|s| s.parse::<ExperienceLevel>().ok())
        {
            Some(level) => level,
            None => {
                repair.touch(
                    "experience_level",
                    &format!("Invalid or missing 'experience_level': {}", draft.experience_level),
                );
                let inferred = match self.inference.infer_experience_level(&title, &job_text).await {
                    Ok(level) => level,
                    Err(e) => {
                        error!(component = "infer_experience_level", job_url = job_url.as_str(), "{}", e);
                        None
                    }
                };
                inferred.unwrap_or(ExperienceLevel::MidOrSenior)
            }
        };

        let salary = repair.optional("salary", &draft.salary).map(|salary| {
            if salary.trim().eq_ignore_ascii_case(SALARY_PLACEHOLDER) {
                SALARY_UNSPECIFIED.to_string()
            } else {
                salary
            }
        });

        let job = JobPosting {
            url,
            quick_apply_url,
            title,
            company,
            classification,
            work_type,
            salary,
            location: repair.string("location", &draft.location).unwrap_or_default(),
            location_search: repair
                .string("location_search", &draft.location_search)
                .unwrap_or_default(),
            description: repair.string("description", &draft.description).unwrap_or_default(),
            responsibilities: repair.list("responsibilities", &draft.responsibilities),
            requirements: repair.list("requirements", &draft.requirements),
            other: repair.list("other", &draft.other),
            experience_level,
            work_model,
            posted_date,
            posted_within,
            logo_link: repair.optional("logo_link", &draft.logo_link),
        };

        ValidationReport {
            job,
            touched: repair.touched,
        }
    }

    /// 校验一批记录
    ///
    /// 返回修复后的记录，以及被修复记录的原始内容（用于诊断）。
    pub async fn validate_batch(
        &self,
        drafts: &[JobDraft],
        today: NaiveDate,
    ) -> (Vec<JobPosting>, Vec<InvalidJob>) {
        let mut jobs = Vec::with_capacity(drafts.len());
        let mut invalid = Vec::new();

        for draft in drafts {
            let report = self.validate(draft, today).await;
            if report.was_touched() {
                invalid.push(InvalidJob {
                    job_url: report.job.url.clone(),
                    fields: report.touched.clone(),
                    original: draft.clone(),
                });
            }
            jobs.push(report.job);
        }

        (jobs, invalid)
    }
}

fn is_http_url(raw: &str) -> bool {
    Url::parse(raw)
        .map(|url| matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty()))
        .unwrap_or(false)
}

fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_string)
            .collect::<Vec<_>>()
            .join(", "),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// 把列表展平成一段文本，用于推断
fn flatten(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .filter_map(scalar_string)
            .collect::<Vec<_>>()
            .join(" "),
        other => stringify(other),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "object",
    }
}
