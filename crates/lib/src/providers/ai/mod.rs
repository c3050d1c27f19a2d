pub mod deepseek;

use crate::errors::LlmError;
use async_trait::async_trait;
use dyn_clone::DynClone;
use std::fmt::Debug;

/// A trait for the external LLM provider.
///
/// The orchestrator only ever sees this seam; tests substitute a mock,
/// production wires up [`deepseek::DeepSeekProvider`].
#[async_trait]
pub trait LlmProvider: Send + Sync + Debug + DynClone {
    /// Sends one rendered prompt and returns the raw response body.
    ///
    /// The per-request deadline is enforced inside the provider so that
    /// a hung connection cannot stall a worker past its budget.
    async fn enrich(&self, prompt: &str) -> Result<String, LlmError>;
}

dyn_clone::clone_trait_object!(LlmProvider);
