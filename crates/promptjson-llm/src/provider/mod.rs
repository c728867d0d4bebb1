pub mod config;
pub mod base;
pub mod metadata;

pub use config::ProviderConfig;
pub use base::{BaseProvider, StreamStep, WireFormat};
pub use metadata::{
    CompletionRequest, LlmProvider, ProviderCapabilities, ProviderMetadata, TextStream,
};
