// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use metrics::{describe_counter, describe_histogram, Unit};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use tracing::{info, warn};

use crate::config::settings::MetricsSettings;

/// 安装 Prometheus 导出器
///
/// 未配置监听地址时只注册指标描述，计数仍然写入默认的空 recorder。
pub fn init_metrics(settings: &MetricsSettings) {
    if let Some(ref listen_addr) = settings.listen_addr {
        match listen_addr.parse::<SocketAddr>() {
            Ok(addr) => {
                // Ignore error if address is already in use (for development/testing)
                if let Err(e) = PrometheusBuilder::new().with_http_listener(addr).install() {
                    warn!("Failed to install Prometheus recorder: {}", e);
                } else {
                    info!("Metrics exporter listening on {}", addr);
                }
            }
            Err(e) => warn!("Invalid metrics listen address {}: {}", listen_addr, e),
        }
    }

    describe_metrics();
}

fn describe_metrics() {
    describe_counter!("jobharvest_jobs_total", "Per-job outcomes by type");
    describe_counter!("jobharvest_pages_total", "Listing pages processed");
    describe_counter!(
        "jobharvest_validation_repairs_total",
        "Fields repaired during validation"
    );
    describe_counter!(
        "jobharvest_retry_exhausted_total",
        "Operations that exhausted all retries"
    );
    describe_counter!(
        "jobharvest_throttle_pauses_total",
        "Pauses triggered by high CPU usage"
    );
    describe_histogram!(
        "jobharvest_batch_duration_seconds",
        Unit::Seconds,
        "Time to process one listing page's batch of jobs"
    );
}
