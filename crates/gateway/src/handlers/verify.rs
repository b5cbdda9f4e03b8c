//! Claim verification handlers

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::AppState;
use newsverify_common::{
    config::RetrievalConfig,
    corpus::EvidenceItem,
    errors::{AppError, Result},
    metrics::RequestMetrics,
};
use newsverify_verdict::VerificationReport;

/// Verification request
#[derive(Debug, Deserialize, Validate)]
pub struct VerifyRequest {
    #[validate(length(min = 1, max = 2000))]
    pub claim: String,

    /// Evidence items to retrieve (defaults to `retrieval.default_k`)
    #[serde(default)]
    pub k: Option<usize>,
}

/// Evidence-only response
#[derive(Debug, Serialize)]
pub struct EvidenceResponse {
    pub claim: String,
    pub k: usize,
    pub evidence: Vec<EvidenceItem>,
}

/// Resolve the requested evidence count against configured bounds
pub fn resolve_k(requested: Option<usize>, retrieval: &RetrievalConfig) -> Result<usize> {
    let k = requested.unwrap_or(retrieval.default_k);
    if k == 0 || k > retrieval.max_k {
        return Err(AppError::Validation {
            message: format!("k must be between 1 and {}", retrieval.max_k),
            field: Some("k".to_string()),
        });
    }
    Ok(k)
}

fn validate(request: &VerifyRequest) -> Result<()> {
    request.validate().map_err(|e| AppError::Validation {
        message: e.to_string(),
        field: Some("claim".to_string()),
    })?;
    if request.claim.trim().is_empty() {
        return Err(AppError::InvalidQuery {
            message: "claim must not be empty".into(),
        });
    }
    Ok(())
}

fn finish<T>(metrics: RequestMetrics, result: &Result<T>) {
    let status = match result {
        Ok(_) => 200,
        Err(e) => e.status_code().as_u16(),
    };
    metrics.finish(status);
}

/// Verify a claim against the corpus
pub async fn verify(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<VerificationReport>> {
    let metrics = RequestMetrics::start("POST", "/v1/verify");

    let result = async {
        validate(&request)?;
        let k = resolve_k(request.k, &state.config.retrieval)?;
        state.verifier.verify(&request.claim, k).await
    }
    .await;

    finish(metrics, &result);
    result.map(Json)
}

/// Retrieve evidence for a claim without a verdict
pub async fn evidence(
    State(state): State<AppState>,
    Json(request): Json<VerifyRequest>,
) -> Result<Json<EvidenceResponse>> {
    let metrics = RequestMetrics::start("POST", "/v1/evidence");

    let result = async {
        validate(&request)?;
        let k = resolve_k(request.k, &state.config.retrieval)?;
        let evidence = state.verifier.evidence(&request.claim, k).await?;
        Ok::<_, AppError>(EvidenceResponse {
            claim: request.claim.clone(),
            k,
            evidence,
        })
    }
    .await;

    finish(metrics, &result);
    result.map(Json)
}
