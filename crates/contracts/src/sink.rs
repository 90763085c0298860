//! SceneSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for scene consumers.

use crate::{ContractError, SceneUpdate};

/// Scene output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(SceneSink: Send)]
pub trait LocalSceneSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one resolved scene
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, update: &SceneUpdate) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
