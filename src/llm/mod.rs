//! Inference service boundary
//!
//! A trait-based abstraction over text completion so the analyzer and the
//! artifact generator can run against GenAI providers or a scripted mock.

mod client;
mod error;
pub mod extract;
mod genai;
mod mock;
mod types;

pub use client::LLMClient;
pub use error::BackendError;
pub use genai::GenAIClient;
pub use mock::{MockLLMClient, MockResponse};
pub use types::{ChatMessage, LLMRequest, LLMResponse, MessageRole};
