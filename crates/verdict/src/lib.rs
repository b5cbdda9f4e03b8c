//! NewsVerify Verdict
//!
//! Turns a claim and its retrieved evidence into a structured verdict:
//! - Prompt composition with a hard content cap
//! - Tolerant parsing and validation of the reasoning model's response
//! - The `Verifier` pipeline tying retrieval and reasoning together

pub mod parser;
pub mod prompt;
pub mod verifier;

pub use parser::{LabelResolution, Verdict, VerdictLabel, VerdictParser};
pub use prompt::PromptComposer;
pub use verifier::{VerdictOutcome, VerificationReport, Verifier, DEFAULT_K};
