pub mod error;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod invoker;
pub mod orchestrator;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use error::{ErrorKind, LlmError, Result};
pub use provider::{
    CompletionRequest, LlmProvider, ProviderCapabilities, ProviderConfig, ProviderMetadata,
    TextStream,
};
pub use providers::{CohereProvider, OpenAiCompatibleProvider};
pub use registry::{ProviderDescriptor, ProviderRegistry};
pub use invoker::{InvocationError, InvokeOutcome, Invoker};
pub use orchestrator::{ConversionOutcome, Orchestrator, PipelineError};
