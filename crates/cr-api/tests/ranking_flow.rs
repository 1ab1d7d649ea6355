use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::connect_info::ConnectInfo,
    http::{Request, StatusCode},
};
use cr_common::sources::MemorySource;
use cr_common::{CandidateRecord, ExperienceRange, Job};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

fn job() -> Job {
    Job {
        id: "JD-2025-001".into(),
        role_title: "Data Engineer".into(),
        mandatory_skills: vec!["Python".into(), "SQL".into()],
        good_to_have_skills: vec!["AWS".into()],
        experience: ExperienceRange::new(2.0, 5.0),
        location: Some("Remote".into()),
        salary: None,
    }
}

fn record(id: &str, skills: &[&str], years: f64, location: &str) -> CandidateRecord {
    CandidateRecord {
        candidate_id: Some(id.into()),
        name: Some(format!("Candidate {id}")),
        email: Some(format!("{}@example.com", id.to_lowercase())),
        total_experience_years: Some(years),
        skills: Some(skills.iter().map(|s| s.to_string()).collect()),
        location: Some(location.into()),
        target_role: Some("Data Engineer".into()),
        ..CandidateRecord::default()
    }
}

fn seeded_source() -> Arc<MemorySource> {
    let source = Arc::new(MemorySource::new());
    source.insert_job(job());
    source.set_pool(vec![
        record("A", &["Python", "SQL", "AWS"], 3.0, "Remote"),
        record("B", &["Python"], 1.0, "Paris"),
    ]);
    source
}

async fn send(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
}

#[tokio::test]
async fn rank_fetch_and_rerank() {
    let app = cr_api::create_router(cr_api::test_state_with_source(seeded_source()));

    let (status, first) = send(&app, "POST", "/api/rank/JD-2025-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["success"], true);
    assert_eq!(first["reused"], false);
    assert_eq!(first["job_title"], "Data Engineer");
    assert_eq!(first["total_candidates"], 2);
    assert_eq!(first["top_candidates"], 1);
    assert_eq!(first["not_recommended"], 1);
    let ranking_id = first["ranking_id"].as_str().unwrap().to_string();
    assert!(ranking_id.starts_with("RANK-JD-2025-001-"));

    let (_, again) = send(&app, "POST", "/api/rank/JD-2025-001").await;
    assert_eq!(again["reused"], true);
    assert_eq!(again["ranking_id"], ranking_id.as_str());

    let (status, run) = send(&app, "GET", &format!("/api/ranking/{ranking_id}")).await;
    assert_eq!(status, StatusCode::OK);
    let ranked = run["ranked_candidates"].as_array().unwrap();
    assert_eq!(ranked[0]["candidate_id"], "A");
    assert_eq!(ranked[0]["rank"], 1);
    assert_eq!(ranked[0]["match_score"]["total_score"], 100.0);
    assert_eq!(ranked[0]["recommendation"], "Highly Recommended");
    assert_eq!(ranked[1]["candidate_id"], "B");
    assert_eq!(ranked[1]["recommendation"], "Not Recommended");
    assert!(ranked[1]["match_score"]["total_score"].as_f64().unwrap() < 50.0);

    let (_, forced) = send(&app, "POST", "/api/rank/JD-2025-001?force_rerank=true").await;
    assert_eq!(forced["reused"], false);
    assert_ne!(forced["ranking_id"], ranking_id.as_str());

    let (status, _) = send(&app, "GET", &format!("/api/ranking/{ranking_id}")).await;
    assert_eq!(status, StatusCode::OK);

    let (status, list) = send(&app, "GET", "/api/rankings").await;
    assert_eq!(status, StatusCode::OK);
    let list = list.as_array().unwrap();
    assert_eq!(list.len(), 2);
    assert_eq!(list[0]["ranking_id"], forced["ranking_id"]);
}

#[tokio::test]
async fn unknown_job_and_ranking_are_404() {
    let app = cr_api::create_router(cr_api::test_state_with_source(seeded_source()));

    let (status, body) = send(&app, "POST", "/api/rank/JD-404").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "not_found");
    assert_eq!(body["success"], false);

    let (status, _) = send(&app, "GET", "/api/ranking/RANK-missing").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn malformed_job_is_bad_gateway() {
    let source = seeded_source();
    let mut bad = job();
    bad.id = "JD-BAD".into();
    bad.good_to_have_skills.push("python".into());
    source.insert_job(bad);
    let app = cr_api::create_router(cr_api::test_state_with_source(source));

    let (status, body) = send(&app, "POST", "/api/rank/JD-BAD").await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["code"], "upstream_error");
}

#[tokio::test]
async fn empty_pool_ranks_successfully() {
    let source = Arc::new(MemorySource::new());
    source.insert_job(job());
    let app = cr_api::create_router(cr_api::test_state_with_source(source));

    let (status, body) = send(&app, "POST", "/api/rank/JD-2025-001").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total_candidates"], 0);
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("No eligible candidates")
    );
}

#[tokio::test]
async fn rank_requests_are_rate_limited_per_ip() {
    let state = cr_api::test_state_with_limits(
        seeded_source(),
        cr_api::RateLimitConfig {
            global_per_sec: 100,
            global_burst: 100,
            rank_per_sec: 1,
            rank_burst: 1,
        },
    );
    let app = cr_api::create_router(state);
    let peer: SocketAddr = ([10, 0, 0, 7], 40000).into();

    let mut statuses = Vec::new();
    for _ in 0..2 {
        let mut request = Request::builder()
            .method("POST")
            .uri("/api/rank/JD-2025-001")
            .body(Body::empty())
            .unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        statuses.push(app.clone().oneshot(request).await.unwrap().status());
    }

    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]);
}
