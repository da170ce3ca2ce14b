//! ECDSA signature batch auditing
//!
//! This library inspects batches of `(r, s, z)` signatures over a prime-order
//! scalar field for nonce weaknesses: reused nonces and the private keys they
//! leak, low-S classification, and linear relations among the nonces.

pub mod attack;
pub mod math;
pub mod provider;
pub mod report;
pub mod signature;

pub use math::{InputPolicy, ScalarField};
pub use report::{analyze, AnalysisConfig, AnalysisReport, ReportOutput};
pub use signature::{Signature, SignatureInput};
