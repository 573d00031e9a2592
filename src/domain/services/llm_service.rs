// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::config::settings::LlmSettings;
use crate::domain::models::job::{ExperienceLevel, WorkModel};

/// 单次请求发送给模型的最大字符数
const MAX_INPUT_CHARS: usize = 12_000;

const PARSE_SYSTEM_PROMPT: &str = "You extract structured job data from markdown.";

const PARSE_PROMPT: &str = "You are a strict JSON data extraction tool. Extract the job posting below into a \
single JSON object with exactly these keys, in this order:\n\
- description: up to 3 verbatim sentences describing the role's purpose, as one string (empty string if none)\n\
- responsibilities: array of strings, what the candidate will do\n\
- requirements: array of strings, skills, technologies, experience and certifications\n\
- experience_level: one of 'intern', 'junior', 'mid_or_senior', 'lead+'\n\
- work_model: one of 'Remote', 'Hybrid', 'On-site'; use 'On-site' unless remote or hybrid work is stated explicitly\n\
- other: array of strings, other job-relevant details\n\
Return only the raw JSON object: no markdown, no code fences, no comments.\n\n\
Job Posting Text:\n";

const WORK_MODEL_PROMPT: &str = "Classify the work model of this job posting as exactly one of: \
Remote, Hybrid, On-site. Answer 'Remote' or 'Hybrid' only if the posting says so explicitly; otherwise \
answer 'On-site'. Return only the value.\n\nJob Posting Text:\n";

const EXPERIENCE_PROMPT: &str = "Classify the experience level of this job posting as exactly one of: \
intern, junior, mid_or_senior, lead+. Use the responsibilities and years of experience required, not only \
the title. Return only the value.\n\n";

/// LLM 调用错误
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("LLM API key not configured")]
    NotConfigured,

    #[error("Failed to send request to LLM API: {0}")]
    Request(#[from] reqwest::Error),

    #[error("LLM API returned error: {status} - {body}")]
    Api { status: u16, body: String },

    #[error("Invalid response format from LLM API: {0}")]
    InvalidResponse(String),
}

/// 字段推断协作方
#[async_trait]
pub trait FieldInference: Send + Sync {
    /// 把职位正文解析成 JSON 文本（未经修复的原始输出）
    ///
    /// `index` 是职位在当前页中的序号，用来轮换模型。
    async fn parse_job_posting(&self, markdown: &str, index: usize) -> Result<String, InferenceError>;

    /// 推断工作模式，模型输出不在允许取值内时返回 `Ok(None)`
    async fn infer_work_model(&self, text: &str) -> Result<Option<WorkModel>, InferenceError>;

    /// 推断经验级别，模型输出不在允许取值内时返回 `Ok(None)`
    async fn infer_experience_level(
        &self,
        title: &str,
        text: &str,
    ) -> Result<Option<ExperienceLevel>, InferenceError>;
}

/// LLM服务 - 通过 OpenAI 兼容的 chat completions 接口推断职位字段
pub struct LlmService {
    client: Client,
    api_key: Option<String>,
    api_base_url: String,
    parse_models: Vec<String>,
    inference_model: String,
}

impl LlmService {
    pub fn new(settings: &LlmSettings) -> Result<Self, InferenceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_key: settings.api_key.clone().filter(|key| !key.is_empty()),
            api_base_url: settings.api_base_url.trim_end_matches('/').to_string(),
            parse_models: settings.parse_models.clone(),
            inference_model: settings.inference_model.clone(),
        })
    }

    /// 按职位序号轮换结构化解析使用的模型
    pub fn parse_model(&self, index: usize) -> &str {
        if self.parse_models.is_empty() {
            return &self.inference_model;
        }
        &self.parse_models[index % self.parse_models.len()]
    }

    async fn chat(&self, model: &str, system: &str, prompt: &str) -> Result<String, InferenceError> {
        let api_key = self.api_key.as_ref().ok_or(InferenceError::NotConfigured)?;

        let request_body = json!({
            "model": model,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": prompt }
            ],
            "temperature": 0.0
        });

        let url = format!("{}/chat/completions", self.api_base_url);
        let response = self
            .client
            .post(url)
            .bearer_auth(api_key)
            .json(&request_body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(InferenceError::Api { status, body });
        }

        let body: Value = response.json().await?;
        body["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_string())
            .ok_or_else(|| InferenceError::InvalidResponse("missing choices[0].message.content".into()))
    }
}

#[async_trait]
impl FieldInference for LlmService {
    async fn parse_job_posting(&self, markdown: &str, index: usize) -> Result<String, InferenceError> {
        let model = self.parse_model(index);
        debug!("Parsing job posting {} with model {}", index, model);
        let prompt = format!("{}{}", PARSE_PROMPT, truncate(markdown));
        self.chat(model, PARSE_SYSTEM_PROMPT, &prompt).await
    }

    async fn infer_work_model(&self, text: &str) -> Result<Option<WorkModel>, InferenceError> {
        let prompt = format!("{}{}", WORK_MODEL_PROMPT, truncate(text));
        let answer = self
            .chat(
                &self.inference_model,
                "You are an assistant that determines the 'work_model' of a job posting.",
                &prompt,
            )
            .await?;
        Ok(answer.parse().ok())
    }

    async fn infer_experience_level(
        &self,
        title: &str,
        text: &str,
    ) -> Result<Option<ExperienceLevel>, InferenceError> {
        let prompt = format!(
            "{}Job Title: {}\n\nJob Posting Text:\n{}",
            EXPERIENCE_PROMPT,
            title,
            truncate(text)
        );
        let answer = self
            .chat(
                &self.inference_model,
                "You are an assistant that classifies experience level for a job posting.",
                &prompt,
            )
            .await?;
        Ok(answer.to_lowercase().parse().ok())
    }
}

fn truncate(text: &str) -> String {
    text.chars().take(MAX_INPUT_CHARS).collect()
}
