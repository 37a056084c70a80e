// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! The AI gateway boundary content generation and embedding jobs call
//! through (§4.3, §4.5). Kept as a trait so the kernel never couples to
//! one provider; a concrete HTTP-backed adapter is supplied by whatever
//! plugin wires a provider in.

use async_trait::async_trait;
use brain_core::KernelError;
use serde_json::Value;

/// Adapter for structured generation and embeddings.
#[async_trait]
pub trait AiGateway: Send + Sync + 'static {
    /// Generate an object matching `schema` from `prompt`. Implementations
    /// surface provider failures and schema-validation failures alike as
    /// [`KernelError::Gateway`]; the caller (content generation) applies
    /// its own bounded retry on top.
    async fn generate_object(&self, prompt: &str, schema: &Value) -> Result<Value, KernelError>;

    async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, KernelError>;

    /// Batch form of [`Self::generate_embedding`]; the default
    /// implementation just calls it one at a time, since not every
    /// provider has a genuine batch endpoint.
    async fn generate_embeddings(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, KernelError> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.generate_embedding(text).await?);
        }
        Ok(out)
    }
}

#[cfg(any(test, feature = "test-support"))]
mod fake {
    use super::{AiGateway, KernelError, Value};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::sync::Arc;

    /// Deterministic, network-free gateway for tests: echoes the schema's
    /// defaults where present, otherwise an empty object, and derives a
    /// fixed-length embedding from the input text's byte sum so the same
    /// text always embeds to the same vector.
    #[derive(Clone)]
    pub struct FakeAiGateway {
        calls: Arc<Mutex<Vec<String>>>,
        fail_next: Arc<Mutex<u32>>,
    }

    impl Default for FakeAiGateway {
        fn default() -> Self {
            Self { calls: Arc::new(Mutex::new(Vec::new())), fail_next: Arc::new(Mutex::new(0)) }
        }
    }

    impl FakeAiGateway {
        pub fn new() -> Self {
            Self::default()
        }

        /// Make the next `n` calls to `generate_object` fail, to exercise
        /// the retry path.
        pub fn fail_next_calls(&self, n: u32) {
            *self.fail_next.lock() = n;
        }

        pub fn prompts(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl AiGateway for FakeAiGateway {
        async fn generate_object(&self, prompt: &str, _schema: &Value) -> Result<Value, KernelError> {
            self.calls.lock().push(prompt.to_string());
            let mut remaining = self.fail_next.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(KernelError::gateway("fake gateway forced failure"));
            }
            Ok(serde_json::json!({}))
        }

        async fn generate_embedding(&self, text: &str) -> Result<Vec<f32>, KernelError> {
            let sum: u32 = text.bytes().map(u32::from).sum();
            Ok(vec![(sum % 997) as f32 / 997.0; 8])
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeAiGateway;
