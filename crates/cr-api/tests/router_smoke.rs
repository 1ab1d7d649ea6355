use axum::{body::Body, http::Request, http::StatusCode};
use tower::ServiceExt;

#[tokio::test]
async fn livez_healthy_and_unknown_routes_404() {
    let app = cr_api::create_router(cr_api::test_state());

    let livez_response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/livez")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(livez_response.status(), StatusCode::OK);
    assert!(livez_response.headers().contains_key("x-request-id"));

    let missing = app
        .oneshot(
            Request::builder()
                .uri("/api/queue/jobs")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(missing.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn rank_endpoint_rejects_get() {
    let app = cr_api::create_router(cr_api::test_state());

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rank/JD-1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
