// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域服务模块
///
/// - 补全（enricher）：把页面元数据合并进 LLM 解析出的职位
/// - 校验（validator）：修复职位记录，保证输出不变量
/// - LLM服务（llm_service）：字段推断协作方及其 HTTP 实现
/// - 解析（job_parser）：从 LLM 输出中修复并解析 JSON
pub mod enricher;
pub mod job_parser;
pub mod llm_service;
pub mod validator;
