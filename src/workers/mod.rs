// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 工作器模块
///
/// 列表页驱动、批次编排和单个职位的有界执行
pub mod batch;
pub mod context;
pub mod job_extractor;
pub mod job_runner;
pub mod listing_driver;

pub use listing_driver::ListingDriver;
