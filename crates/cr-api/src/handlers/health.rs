use axum::{Json, extract::State};
use serde_json::json;
use tokio::time::{Duration, timeout};

use crate::SharedState;
use crate::error::ApiError;

const READINESS_TIMEOUT: Duration = Duration::from_secs(1);

pub async fn livez() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn readyz(State(state): State<SharedState>) -> Result<Json<serde_json::Value>, ApiError> {
    if !state.readiness.load(std::sync::atomic::Ordering::SeqCst) {
        return Err(ApiError::ServiceUnavailable("shutting_down".into()));
    }

    timeout(READINESS_TIMEOUT, state.orchestrator.store().ping())
        .await
        .map_err(|_| ApiError::ServiceUnavailable("store_ping_timeout".into()))
        .and_then(|result| {
            result.map_err(|err| ApiError::ServiceUnavailable(format!("store check failed: {err}")))
        })?;

    Ok(Json(json!({
        "status": "ok",
        "store": state.config.store.as_ref(),
        "application": env!("CARGO_PKG_NAME"),
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::Ordering;

    use crate::test_state;

    #[tokio::test]
    async fn readyz_rejects_when_readiness_disabled() {
        let state = test_state();
        state.readiness.store(false, Ordering::SeqCst);

        match readyz(State(state)).await {
            Err(ApiError::ServiceUnavailable(code)) => assert!(code.contains("shutting_down")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn readyz_reports_memory_store() {
        let Json(body) = readyz(State(test_state())).await.unwrap();
        assert_eq!(body["status"], "ok");
        assert_eq!(body["store"], "memory");
    }
}
