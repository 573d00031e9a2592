// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::domain::models::job::JobDraft;

static JSON_BLOCK_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)\{.*\}").expect("valid json block regex"));
static TRAILING_COMMA_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid trailing comma regex"));

/// 从 LLM 的原始输出中解析职位记录
///
/// 取输出中最外层的 `{...}`，先按严格 JSON 解析，失败后修复再解析。
/// 结果必须是 JSON 对象，否则返回 `None`。
pub fn parse_job_draft(raw: &str) -> Option<JobDraft> {
    let block = match JSON_BLOCK_REGEX.find(raw) {
        Some(m) => m.as_str(),
        None => {
            warn!(
                component = "parse_json_block_from_text",
                raw_response = %truncate(raw, 500),
                "No JSON block found in response."
            );
            return None;
        }
    };

    let value = match serde_json::from_str::<Value>(block) {
        Ok(value) => value,
        Err(e) => {
            debug!("Strict JSON parse failed ({}), attempting to repair JSON...", e);
            let repaired = repair_json(block);
            match serde_json::from_str::<Value>(&repaired) {
                Ok(value) => value,
                Err(e) => {
                    error!(
                        component = "clean_repair_parse_json",
                        input_json = %truncate(block, 500),
                        error_stage = "repair or parse",
                        "Failed to parse repaired JSON: {}",
                        e
                    );
                    return None;
                }
            }
        }
    };

    if !value.is_object() {
        warn!(
            component = "parse_job_data_from_markdown",
            "Parsed job data is not an object after JSON repair"
        );
        return None;
    }

    match serde_json::from_value::<JobDraft>(value) {
        Ok(draft) => Some(draft),
        Err(e) => {
            error!(component = "parse_job_data_from_markdown", "Failed to map job data: {}", e);
            None
        }
    }
}

/// 尽力修复常见的 LLM JSON 错误
///
/// 去掉反斜杠和换行，补齐未闭合的引号和括号，删除尾随逗号。
pub fn repair_json(input: &str) -> String {
    let mut text: String = input.chars().filter(|c| *c != '\\' && *c != '\n').collect();

    if text.chars().filter(|c| *c == '"').count() % 2 == 1 {
        text.push('"');
    }

    let mut balanced = String::with_capacity(text.len());
    let mut open = Vec::new();
    let mut in_string = false;
    for c in text.chars() {
        match c {
            '"' => {
                in_string = !in_string;
                balanced.push(c);
            }
            '{' | '[' if !in_string => {
                open.push(c);
                balanced.push(c);
            }
            '}' | ']' if !in_string => {
                let opener = if c == '}' { '{' } else { '[' };
                // A closer with no matching opener is dropped.
                if open.contains(&opener) {
                    while let Some(top) = open.pop() {
                        if top == opener {
                            break;
                        }
                        balanced.push(closer(top));
                    }
                    balanced.push(c);
                }
            }
            _ => balanced.push(c),
        }
    }
    while let Some(top) = open.pop() {
        balanced.push(closer(top));
    }

    TRAILING_COMMA_REGEX.replace_all(&balanced, "$1").into_owned()
}

fn closer(opener: char) -> char {
    if opener == '{' {
        '}'
    } else {
        ']'
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
