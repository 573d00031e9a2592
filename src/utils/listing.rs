// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use url::Url;

/// 列表页标题中的职位总数，例如 `# 1,234 software engineer jobs in Sydney`
static TOTAL_JOBS_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?im)#\s*([\d,]+)\s+.*?\bjobs?\b").expect("valid total jobs regex"));

/// 默认的职位链接模式
pub const DEFAULT_JOB_URL_PATTERN: &str =
    r"https://www\.seek\.com\.au/job/\d+\?[^)\s]*origin=cardTitle";

/// 从列表页 markdown 中读取职位总数，未找到时返回 0
pub fn total_job_count(markdown: &str) -> u64 {
    TOTAL_JOBS_REGEX
        .captures(markdown)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().replace(',', "").parse().ok())
        .unwrap_or(0)
}

/// `ceil(total_jobs / page_size)`，并按 `max_pages` 截断
pub fn total_pages(total_jobs: u64, page_size: u32, max_pages: Option<u32>) -> u32 {
    let page_size = u64::from(page_size.max(1));
    let pages = total_jobs.div_ceil(page_size).min(u64::from(u32::MAX)) as u32;
    match max_pages {
        Some(max) => pages.min(max),
        None => pages,
    }
}

/// 职位链接提取器
#[derive(Debug, Clone)]
pub struct JobUrlExtractor {
    pattern: Regex,
}

impl Default for JobUrlExtractor {
    fn default() -> Self {
        Self {
            pattern: Regex::new(DEFAULT_JOB_URL_PATTERN).expect("valid default job url regex"),
        }
    }
}

impl JobUrlExtractor {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
        })
    }

    /// 按出现顺序提取职位链接，重复链接只保留第一次
    pub fn extract(&self, markdown: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.pattern
            .find_iter(markdown)
            .map(|m| m.as_str().to_string())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }
}

/// 生成第 `page_num` 页的列表链接
pub fn page_url(base_url: &str, page_num: u32) -> String {
    match Url::parse(base_url) {
        Ok(mut url) => {
            url.query_pairs_mut()
                .append_pair("page", &page_num.to_string());
            url.to_string()
        }
        Err(_) => format!("{}&page={}", base_url, page_num),
    }
}

/// 返回 (规范职位链接, 快速申请链接)
///
/// 规范链接去掉查询串和片段，快速申请链接为规范链接加 `/apply`。
pub fn canonical_job_urls(job_url: &str) -> (String, String) {
    let canonical = match Url::parse(job_url) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string().trim_end_matches('/').to_string()
        }
        Err(_) => job_url
            .split(['?', '#'])
            .next()
            .unwrap_or(job_url)
            .to_string(),
    };
    let quick_apply = format!("{}/apply", canonical);
    (canonical, quick_apply)
}

/// 用搜索关键字和地点填充列表链接模板
pub fn listing_url(template: &str, keywords: &str, location: &str) -> String {
    let encode = |value: &str| {
        url::form_urlencoded::byte_serialize(value.as_bytes()).collect::<String>()
    };
    template
        .replace("{keywords}", &encode(keywords))
        .replace("{location}", &encode(location))
}
