// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::{Days, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::domain::models::job::JobMetadata;
use crate::engines::traits::{EngineError, PageHandle};
use crate::utils::throttle::{LoadThrottle, Pacing};

static POSTED_AGO_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Posted (\d+)([dhm]) ago").expect("valid posted ago regex"));

/// 发布时间所在 `span` 的 class 列表
pub const POSTED_DATE_CLASS: &str = "x3iy8f0 o3fpgs4z _1i66rlw0 _1i66rlw1 _1i66rlw22 _1g0tbpc4 _1i66rlw7";

/// 公司 logo 图片
pub const LOGO_SELECTOR: &str = r#"div[data-testid="bx-logo-image"] img"#;

/// 职位详情页上的文本字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetadataField {
    Title,
    Company,
    Location,
    Classification,
    WorkType,
    Salary,
}

impl MetadataField {
    pub const ALL: [MetadataField; 6] = [
        MetadataField::Location,
        MetadataField::Classification,
        MetadataField::WorkType,
        MetadataField::Salary,
        MetadataField::Title,
        MetadataField::Company,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MetadataField::Title => "title",
            MetadataField::Company => "company",
            MetadataField::Location => "location",
            MetadataField::Classification => "classification",
            MetadataField::WorkType => "work_type",
            MetadataField::Salary => "salary",
        }
    }

    /// 候选的 `data-automation` 取值，按顺序尝试
    pub fn automation_ids(&self) -> &'static [&'static str] {
        match self {
            MetadataField::Title => &["job-detail-title"],
            MetadataField::Company => &["advertiser-name"],
            MetadataField::Location => &["job-detail-location"],
            MetadataField::Classification => &["job-detail-classifications"],
            MetadataField::WorkType => &["job-detail-work-type"],
            MetadataField::Salary => &["job-detail-salary", "job-detail-add-expected-salary"],
        }
    }

    fn assign(&self, metadata: &mut JobMetadata, value: String) {
        let slot = match self {
            MetadataField::Title => &mut metadata.title,
            MetadataField::Company => &mut metadata.company,
            MetadataField::Location => &mut metadata.location,
            MetadataField::Classification => &mut metadata.classification,
            MetadataField::WorkType => &mut metadata.work_type,
            MetadataField::Salary => &mut metadata.salary,
        };
        *slot = Some(value);
    }
}

/// 发布日期缺失的原因
#[derive(Error, Debug)]
pub enum PostedDateError {
    /// 选择器没有匹配到任何元素，通常意味着页面结构变了
    #[error("'posted_date' selector broke - no elements found")]
    NoElements,

    #[error("no matching 'Posted X ago' text found")]
    NoMatchingText,

    #[error(transparent)]
    Engine(#[from] EngineError),
}

/// 把 "Posted 3d ago" 这样的文本换算成日期
///
/// `d` 按天回退，`h` 和 `m` 都视为今天。
pub fn parse_posted_text(text: &str, today: NaiveDate) -> Option<NaiveDate> {
    let caps = POSTED_AGO_REGEX.captures(text)?;
    let value: u64 = caps.get(1)?.as_str().parse().ok()?;
    let days_ago = match caps.get(2)?.as_str() {
        "d" => value,
        _ => 0,
    };
    today.checked_sub_days(Days::new(days_ago))
}

/// 从页面中读取发布日期
pub async fn extract_posted_date(
    page: &dyn PageHandle,
    class_name: &str,
    today: NaiveDate,
) -> Result<NaiveDate, PostedDateError> {
    let selector = format!("span.{}", class_name.split_whitespace().collect::<Vec<_>>().join("."));
    let texts = page.texts(&selector).await?;

    if texts.is_empty() {
        return Err(PostedDateError::NoElements);
    }

    texts
        .iter()
        .inspect(|text| debug!("Found element text: {}", text))
        .find_map(|text| parse_posted_text(text, today))
        .ok_or(PostedDateError::NoMatchingText)
}

/// 职位详情页元数据提取器
///
/// 每个字段单独提取，单个字段失败只记录诊断事件并留空。
#[derive(Clone)]
pub struct MetadataExtractor {
    throttle: LoadThrottle,
    pacing: Pacing,
    posted_date_class: String,
    logo_selector: String,
}

impl MetadataExtractor {
    pub fn new(throttle: LoadThrottle, pacing: Pacing) -> Self {
        Self {
            throttle,
            pacing,
            posted_date_class: POSTED_DATE_CLASS.to_string(),
            logo_selector: LOGO_SELECTOR.to_string(),
        }
    }

    pub async fn extract(&self, page: &dyn PageHandle, job_url: &str, today: NaiveDate) -> JobMetadata {
        let mut metadata = JobMetadata {
            logo_src: self.extract_logo(page, job_url).await,
            ..JobMetadata::default()
        };

        for field in MetadataField::ALL {
            self.throttle.maybe_pause().await;
            if let Some(value) = self.extract_field(page, field, job_url).await {
                field.assign(&mut metadata, value);
            }
            self.pacing.pause().await;
        }

        self.pacing.pause().await;
        metadata.posted_date = match extract_posted_date(page, &self.posted_date_class, today).await {
            Ok(date) => {
                debug!("Extracted posted date: {}", date);
                Some(date)
            }
            Err(e) => {
                error!(
                    component = "extract_posted_date_by_class",
                    job_url = job_url,
                    "Posted date extraction warning: {}",
                    e
                );
                None
            }
        };

        metadata
    }

    async fn extract_logo(&self, page: &dyn PageHandle, job_url: &str) -> Option<String> {
        self.pacing.pause().await;
        let result = page.attribute(&self.logo_selector, "src").await;
        self.throttle.maybe_pause().await;

        match result {
            Ok(Some(src)) if !src.trim().is_empty() => {
                debug!("Logo found with src: {}", src);
                Some(src)
            }
            Ok(_) => {
                warn!("Logo element not found.");
                None
            }
            Err(e) => {
                error!(component = "extract_logo_src", job_url = job_url, "{}", e);
                None
            }
        }
    }

    async fn extract_field(&self, page: &dyn PageHandle, field: MetadataField, job_url: &str) -> Option<String> {
        let mut last_error = None;

        for id in field.automation_ids() {
            let selector = format!(r#"[data-automation="{}"]"#, id);
            match page.text(&selector).await {
                Ok(Some(text)) => return Some(text.trim().to_string()),
                Ok(None) => {}
                Err(e) => last_error = Some(e.to_string()),
            }
        }

        warn!("No valid element found for job field '{}'", field.name());
        error!(
            component = "extract_job_metadata_fields",
            job_url = job_url,
            field = field.name(),
            error_detail = last_error.as_deref().unwrap_or("Element not found"),
            "Job metadata extraction issue"
        );
        None
    }
}
