//! AnalysisService trait - upstream request/response contract
//!
//! The replayer never computes KPIs or series itself; it receives one fully
//! decoded `ResultModel` per successful analyze call, or an error.

use crate::{ContractError, LogArtifact, ResultModel};

/// Analysis service interface
#[trait_variant::make(AnalysisService: Send)]
pub trait LocalAnalysisService {
    /// Service name (used for logging)
    fn name(&self) -> &str;

    /// Analyze a log and return the complete result
    ///
    /// # Errors
    /// Returns `Upstream` / `ResultDecode` on any transport or payload failure
    async fn analyze(&self, artifact: &LogArtifact) -> Result<ResultModel, ContractError>;

    /// Produce the textual report for a log
    async fn report(&self, artifact: &LogArtifact) -> Result<String, ContractError>;

    /// Liveness check
    async fn health(&self) -> Result<(), ContractError>;
}
