// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域层模块
///
/// - 领域模型（models）：职位记录和抓取结果
/// - 服务（services）：补全、校验、LLM 字段推断和输出修复
///
/// 领域层不直接依赖浏览器或 HTTP 实现，外部协作方都通过 trait 注入。
pub mod models;
pub mod services;
