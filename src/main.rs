// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use jobharvest::config::settings::Settings;
use jobharvest::domain::services::llm_service::LlmService;
use jobharvest::engines::chrome::ChromeLauncher;
use jobharvest::infrastructure::downstream::HttpDownstreamSender;
use jobharvest::infrastructure::metrics;
use jobharvest::utils::listing::listing_url;
use jobharvest::utils::telemetry;
use jobharvest::workers::ListingDriver;
use std::sync::Arc;
use tracing::info;

/// 主函数
///
/// 加载配置，按配置的搜索条件执行一次抓取，并把汇总以 JSON 输出
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting jobharvest...");

    // 2. Load configuration
    let settings = Settings::new()?;
    info!("Configuration loaded");

    metrics::init_metrics(&settings.metrics);

    // 3. Collaborators
    let launcher = Arc::new(ChromeLauncher::new(settings.browser.clone()));
    let inference = Arc::new(LlmService::new(&settings.llm)?);
    let sender = Arc::new(HttpDownstreamSender::new(&settings.downstream)?);
    let driver = ListingDriver::new(launcher, inference, sender, &settings)?;

    // 4. Run one scrape
    let search = &settings.search;
    let base_url = listing_url(&search.listing_url, &search.job_title, &search.location);
    info!("Scraping {} ({})", search.job_title, base_url);

    let summary = driver
        .scrape_job_listing(
            &base_url,
            &search.location,
            settings.scraper.page_size,
            search.max_pages,
            settings.scraper.day_range_limit,
        )
        .await;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}
