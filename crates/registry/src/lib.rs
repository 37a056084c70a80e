// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Entity registry (schema-validated CRUD, Markdown+frontmatter and
//! structured-content adapters) and template registry / content
//! generation (kernel §3.1, §3.3, §4.3, §4.4, §4.5).

pub mod entity_registry;
pub mod gateway;
pub mod markdown;
pub mod structured;
pub mod template_registry;

pub use entity_registry::{EntityRegistry, EntityValidator, NewEntity, UpsertOptions, DEFAULT_EMBED_BATCH_SIZE};
pub use gateway::AiGateway;
pub use template_registry::{GenerationContext, TemplateRegistry, DEFAULT_MAX_RETRIES};

#[cfg(any(test, feature = "test-support"))]
pub use gateway::FakeAiGateway;
