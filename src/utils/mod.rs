// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工具模块
///
/// 提供重试、负载节流、列表页解析和遥测初始化
pub mod listing;
pub mod retry;
pub mod telemetry;
pub mod throttle;
