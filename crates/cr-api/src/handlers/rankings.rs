use std::sync::Arc;
use std::time::Instant;

use axum::{
    Json,
    extract::{Path, Query, State},
};
use cr_common::ranking::{RankingListItem, RankingRun};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::SharedState;
use crate::error::ApiError;

#[derive(Debug, Default, Deserialize)]
pub struct RankQuery {
    #[serde(default)]
    pub force_rerank: bool,
}

/// Summary returned by the rank endpoint. The full document is at
/// `GET /api/ranking/:ranking_id`.
#[derive(Debug, Serialize, Deserialize)]
pub struct RankingResponse {
    pub success: bool,
    pub ranking_id: String,
    pub job_id: String,
    pub job_title: String,
    pub total_candidates: usize,
    pub top_candidates: usize,
    pub acceptable: usize,
    pub not_recommended: usize,
    pub reused: bool,
    pub message: String,
}

impl RankingResponse {
    fn new(run: &RankingRun, reused: bool) -> Self {
        let message = if reused {
            format!(
                "Returned the existing ranking {}; pass force_rerank=true to recompute",
                run.ranking_id
            )
        } else {
            run.summary.clone()
        };

        Self {
            success: true,
            ranking_id: run.ranking_id.clone(),
            job_id: run.job_id.clone(),
            job_title: run.job_title.clone(),
            total_candidates: run.total_candidates_evaluated,
            top_candidates: run.top_candidates.len(),
            acceptable: run.acceptable_candidates.len(),
            not_recommended: run.not_recommended.len(),
            reused,
            message,
        }
    }
}

pub async fn rank_job(
    State(state): State<SharedState>,
    Path(job_id): Path<String>,
    Query(query): Query<RankQuery>,
) -> Result<Json<RankingResponse>, ApiError> {
    let started = Instant::now();
    let outcome = state
        .orchestrator
        .rank(&job_id, query.force_rerank)
        .await?;

    let run = &outcome.run;
    cr_metrics::record_ranking(
        outcome.reused,
        run.total_candidates_evaluated,
        run.skipped_candidates.len(),
        started.elapsed(),
    );
    info!(
        %job_id,
        ranking_id = %run.ranking_id,
        reused = outcome.reused,
        force_rerank = query.force_rerank,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "rank request served"
    );

    Ok(Json(RankingResponse::new(run, outcome.reused)))
}

pub async fn get_ranking(
    State(state): State<SharedState>,
    Path(ranking_id): Path<String>,
) -> Result<Json<RankingRun>, ApiError> {
    let run = state.orchestrator.ranking(&ranking_id).await?;
    Ok(Json(Arc::unwrap_or_clone(run)))
}

pub async fn list_rankings(
    State(state): State<SharedState>,
) -> Result<Json<Vec<RankingListItem>>, ApiError> {
    Ok(Json(state.orchestrator.list_rankings().await?))
}
