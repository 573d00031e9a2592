// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

pub mod chrome;
pub mod markdown;
pub mod metadata;
pub mod page_pool;
pub mod traits;
