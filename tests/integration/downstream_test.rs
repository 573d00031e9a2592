// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use chrono::NaiveDate;
use jobharvest::config::settings::DownstreamSettings;
use jobharvest::domain::models::job::{ExperienceLevel, JobPosting, WorkModel};
use jobharvest::domain::models::outcome::ScrapeSummary;
use jobharvest::infrastructure::downstream::{DownstreamSender, HttpDownstreamSender, SenderError};
use serde_json::{json, Value};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn settings(server: &MockServer, token: Option<&str>) -> DownstreamSettings {
    DownstreamSettings {
        base_url: format!("{}/api/", server.uri()),
        timeout_secs: 5,
        api_token: token.map(str::to_string),
    }
}

fn posting() -> JobPosting {
    JobPosting {
        url: "https://www.seek.com.au/job/1".to_string(),
        quick_apply_url: "https://www.seek.com.au/job/1/apply".to_string(),
        title: "Software Engineer".to_string(),
        company: "Acme Pty Ltd".to_string(),
        classification: "Engineering - Software".to_string(),
        work_type: "Full time".to_string(),
        salary: None,
        location: "Sydney NSW".to_string(),
        location_search: "Sydney".to_string(),
        description: "Build reliable services.".to_string(),
        responsibilities: vec!["Design services".to_string()],
        requirements: vec!["Rust".to_string()],
        other: Vec::new(),
        experience_level: ExperienceLevel::MidOrSenior,
        work_model: WorkModel::OnSite,
        posted_date: NaiveDate::from_ymd_opt(2025, 6, 9).unwrap(),
        posted_within: "Yesterday".to_string(),
        logo_link: None,
    }
}

#[tokio::test]
async fn test_send_batch_posts_jobs() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/page-batch"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let sender = HttpDownstreamSender::new(&settings(&server, Some("secret"))).unwrap();
    sender.send_batch(&[posting()]).await.unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    let job = &body["jobs"][0];
    assert_eq!(job["job_url"], json!("https://www.seek.com.au/job/1"));
    assert_eq!(job["work_model"], json!("On-site"));
    assert_eq!(job["experience_level"], json!("mid_or_senior"));
    assert_eq!(job["posted_date"], json!("09/06/2025"));
}

#[tokio::test]
async fn test_send_summary() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/scrape-summary"))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&server)
        .await;

    let sender = HttpDownstreamSender::new(&settings(&server, None)).unwrap();
    sender
        .send_summary(&ScrapeSummary::new("Scraped and inserted 0 jobs."))
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["message"], json!("Scraped and inserted 0 jobs."));
    assert_eq!(body["terminated_early"], json!(false));
}

#[tokio::test]
async fn test_error_status_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/jobs/page-batch"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let sender = HttpDownstreamSender::new(&settings(&server, None)).unwrap();
    let err = sender.send_batch(&[posting()]).await.unwrap_err();

    match err {
        SenderError::Status { status, body } => {
            assert_eq!(status, 503);
            assert_eq!(body, "maintenance");
        }
        other => panic!("unexpected error: {}", other),
    }
}
