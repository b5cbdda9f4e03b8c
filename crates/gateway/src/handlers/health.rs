//! Health check handlers

use axum::{extract::State, Json};
use serde::Serialize;
use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Serialize)]
pub struct ReadyResponse {
    pub status: String,
    pub corpus: CorpusStatus,
    pub models: ModelStatus,
}

#[derive(Serialize)]
pub struct CorpusStatus {
    pub documents: usize,
    pub dimension: usize,
}

#[derive(Serialize)]
pub struct ModelStatus {
    pub embedding: String,
    pub reasoning: String,
}

/// Liveness check: always returns healthy if server is running
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
    })
}

/// Readiness check: reports the loaded corpus and configured models
pub async fn ready(State(state): State<AppState>) -> Json<ReadyResponse> {
    let retriever = state.verifier.retriever();
    let documents = retriever.corpus_size();

    Json(ReadyResponse {
        status: if documents > 0 { "ready" } else { "not_ready" }.to_string(),
        corpus: CorpusStatus {
            documents,
            dimension: retriever.index_dimension(),
        },
        models: ModelStatus {
            embedding: retriever.embedder().model_name().to_string(),
            reasoning: state.verifier.reasoner().model_name().to_string(),
        },
    })
}
