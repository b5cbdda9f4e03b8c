//! Claim verification pipeline
//!
//! retrieve → compose → complete → parse, strictly in sequence for one claim.
//! The verifier holds only shared read-only handles, so concurrent claims
//! need no coordination.

use crate::parser::{Verdict, VerdictParser};
use crate::prompt::PromptComposer;
use newsverify_common::corpus::EvidenceItem;
use newsverify_common::errors::{AppError, Result};
use newsverify_common::metrics;
use newsverify_common::reasoning::CompletionClient;
use newsverify_search::Retriever;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, instrument, warn};

/// Evidence count used by `verify_claim` when callers have no preference
pub const DEFAULT_K: usize = 3;

/// Result of the reasoning step for one claim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VerdictOutcome {
    /// The response parsed into a verdict
    Verified { verdict: Verdict },
    /// The response could not be parsed; the raw text is kept for display
    Unparsed {
        message: String,
        raw_response: String,
    },
}

/// Everything produced while verifying one claim
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerificationReport {
    pub claim: String,
    pub evidence: Vec<EvidenceItem>,
    pub outcome: VerdictOutcome,
    pub elapsed_ms: u64,
}

/// Composes retrieval, prompting, the reasoning capability and parsing
pub struct Verifier {
    retriever: Arc<Retriever>,
    composer: PromptComposer,
    parser: VerdictParser,
    reasoner: Arc<dyn CompletionClient>,
}

impl Verifier {
    pub fn new(
        retriever: Arc<Retriever>,
        composer: PromptComposer,
        reasoner: Arc<dyn CompletionClient>,
    ) -> Self {
        Self {
            retriever,
            composer,
            parser: VerdictParser::new(),
            reasoner,
        }
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    pub fn reasoner(&self) -> &dyn CompletionClient {
        self.reasoner.as_ref()
    }

    /// Retrieve evidence only, without calling the reasoning model
    pub async fn evidence(&self, claim: &str, k: usize) -> Result<Vec<EvidenceItem>> {
        self.retriever.retrieve(claim, k).await
    }

    /// Verify a claim against the `k` closest articles.
    ///
    /// Unparseable responses fail with `AppError::VerdictParse`.
    pub async fn verify_claim(&self, claim: &str, k: usize) -> Result<Verdict> {
        let evidence = self.retriever.retrieve(claim, k).await?;
        let raw = self.reason(claim, &evidence).await?;
        self.parse(&raw)
    }

    /// Verify a claim and keep the evidence; parse failures become an
    /// `Unparsed` outcome instead of an error
    #[instrument(skip(self, claim), fields(claim_len = claim.len()))]
    pub async fn verify(&self, claim: &str, k: usize) -> Result<VerificationReport> {
        let start = Instant::now();

        let evidence = self.retriever.retrieve(claim, k).await?;
        let raw = self.reason(claim, &evidence).await?;

        let outcome = match self.parse(&raw) {
            Ok(verdict) => VerdictOutcome::Verified { verdict },
            Err(AppError::VerdictParse { message, raw }) => VerdictOutcome::Unparsed {
                message,
                raw_response: raw,
            },
            Err(other) => return Err(other),
        };

        let elapsed_ms = start.elapsed().as_millis() as u64;
        info!(
            evidence = evidence.len(),
            parsed = matches!(outcome, VerdictOutcome::Verified { .. }),
            elapsed_ms,
            "Claim verified"
        );

        Ok(VerificationReport {
            claim: claim.to_string(),
            evidence,
            outcome,
            elapsed_ms,
        })
    }

    async fn reason(&self, claim: &str, evidence: &[EvidenceItem]) -> Result<String> {
        let prompt = self.composer.compose(claim, evidence);
        self.reasoner.complete(&prompt).await
    }

    fn parse(&self, raw: &str) -> Result<Verdict> {
        match self.parser.parse(raw) {
            Ok(verdict) => {
                metrics::record_verdict(verdict.label.as_str());
                Ok(verdict)
            }
            Err(err) => {
                metrics::record_verdict_parse_failure();
                warn!(
                    raw_len = raw.len(),
                    model = self.reasoner.model_name(),
                    "Reasoning response could not be parsed"
                );
                Err(err)
            }
        }
    }
}
