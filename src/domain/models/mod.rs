// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

/// 领域模型模块
///
/// - 职位（job）：校验前后的职位记录、经验级别、工作模式
/// - 结果（outcome）：单个职位、单页和整次运行的处理结果
pub mod job;
pub mod outcome;
