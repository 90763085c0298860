//! # Analysis Client
//!
//! Implementations of the `AnalysisService` contract.
//!
//! - `HttpAnalysisService`: multipart upload to a running analysis backend
//! - `FixtureAnalysisService`: serves a pre-computed result from disk
//!
//! Both decode responses through the same path, so an `{"error": ...}` body
//! or a malformed result fails identically regardless of transport.

mod decode;
mod fixture;
mod http;

pub use contracts::{AnalysisService, LogArtifact, ResultModel};
pub use decode::{decode_health, decode_report, decode_result};
pub use fixture::FixtureAnalysisService;
pub use http::HttpAnalysisService;
