//! Pronunciation assessment: service client, result parsing and the
//! streaming session state machine.
//!
//! The session uploads recording chunks opportunistically while always
//! accumulating them locally; scoring falls back to one batch request
//! whenever the streaming path cannot produce a usable result.

pub mod client;
pub mod result;
pub mod session;

// ── Public re-exports ──────────────────────────────────────────────────────

pub use client::{AssessmentClient, HttpAssessmentClient};
pub use result::{AssessmentResult, WordScore};
pub use session::{AssessmentError, AssessmentSession, SessionState};

#[cfg(test)]
pub use client::mock;
