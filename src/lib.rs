// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 配置模块
///
/// 处理应用程序的配置设置和环境变量
pub mod config;

/// 领域模块
///
/// 职位数据模型，以及补全、校验、LLM 解析等领域服务
pub mod domain;

/// 引擎模块
///
/// 浏览器渲染、页面池和页面元数据提取
pub mod engines;

/// 基础设施模块
///
/// 下游存储服务和指标导出
pub mod infrastructure;

/// 工具模块
///
/// 重试、负载节流、列表页解析和日志初始化
pub mod utils;

/// 工作器模块
///
/// 列表页驱动、批次编排和单个职位的有界执行
pub mod workers;
