// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 基础设施层模块
///
/// - 下游（downstream）：把职位批次和运行汇总发送到下游存储服务
/// - 指标（metrics）：Prometheus 导出器和指标描述
pub mod downstream;
pub mod metrics;
