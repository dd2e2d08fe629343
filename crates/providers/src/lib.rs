//! LLM Provider implementations for draftloop.
//!
//! All providers implement the `draftloop_core::Provider` trait.
//! The router builds the configured providers, each behind a retry wrapper.

pub mod openai_compat;
pub mod retry;
pub mod router;

pub use openai_compat::OpenAiCompatProvider;
pub use retry::{RetryPolicy, RetryProvider};
pub use router::{ProviderRouter, build_from_config};
