// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Template registration and schema-validated content generation through
//! the [`AiGateway`] boundary (§4.5).

use crate::gateway::AiGateway;
use brain_core::{KernelError, Template, TemplateKey};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Default number of retries after the first failed generation attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Context supplied to [`TemplateRegistry::generate_content`]. Only
/// history explicitly passed here is used — conversation memory is never
/// read implicitly by the generator.
#[derive(Debug, Clone, Default)]
pub struct GenerationContext {
    pub variables: HashMap<String, serde_json::Value>,
    pub style: Option<String>,
    pub examples: Vec<String>,
    pub history: Vec<String>,
}

pub struct TemplateRegistry {
    templates: Mutex<HashMap<TemplateKey, Template>>,
    gateway: Arc<dyn AiGateway>,
    max_retries: u32,
}

impl TemplateRegistry {
    pub fn new(gateway: Arc<dyn AiGateway>) -> Self {
        Self { templates: Mutex::new(HashMap::new()), gateway, max_retries: DEFAULT_MAX_RETRIES }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Register a template. Idempotent within a plugin's own namespace: a
    /// later call with the same key overwrites the registration; a caller
    /// attempting to register under another plugin's namespace is a
    /// programming error the key's own `plugin_id` prefix prevents by
    /// construction (every key is namespaced at creation).
    pub fn register_template(&self, template: Template) {
        self.templates.lock().insert(template.key.clone(), template);
    }

    pub fn unregister_template(&self, key: &TemplateKey) {
        self.templates.lock().remove(key);
    }

    pub fn get_template(&self, key: &TemplateKey) -> Option<Template> {
        self.templates.lock().get(key).cloned()
    }

    pub fn list_templates(&self, plugin_id: Option<&str>) -> Vec<Template> {
        let templates = self.templates.lock();
        let mut rows: Vec<Template> = match plugin_id {
            Some(plugin_id) => templates.values().filter(|t| t.key.plugin_id() == plugin_id).cloned().collect(),
            None => templates.values().cloned().collect(),
        };
        rows.sort_by(|a, b| a.key.as_str().cmp(b.key.as_str()));
        rows
    }

    /// Build a prompt from the template's body plus explicitly-provided
    /// context, call the gateway for a structured object, and retry up to
    /// `max_retries` times on gateway failure before giving up.
    pub async fn generate_content(
        &self,
        key: &TemplateKey,
        context: &GenerationContext,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, KernelError> {
        let template = self
            .get_template(key)
            .ok_or_else(|| KernelError::not_found(format!("template {key} not registered")))?;

        let missing = template.missing_variables(&context.variables);
        if !missing.is_empty() {
            return Err(KernelError::validation(format!("missing required template variables: {}", missing.join(", "))));
        }

        let prompt = build_prompt(&template, context);

        let mut last_error = None;
        for attempt in 0..=self.max_retries {
            match self.gateway.generate_object(&prompt, schema).await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    tracing::warn!(template = %key, attempt, error = %e, "content generation attempt failed");
                    last_error = Some(e);
                }
            }
        }
        Err(last_error.unwrap_or_else(|| KernelError::gateway("content generation failed with no attempts made")))
    }
}

fn build_prompt(template: &Template, context: &GenerationContext) -> String {
    let mut prompt = template.body.clone();
    if let Some(style) = &context.style {
        prompt.push_str(&format!("\n\nStyle: {style}"));
    }
    if !context.examples.is_empty() {
        prompt.push_str("\n\nExamples:\n");
        for example in &context.examples {
            prompt.push_str(&format!("- {example}\n"));
        }
    }
    if !context.history.is_empty() {
        prompt.push_str("\n\nConversation history:\n");
        for line in &context.history {
            prompt.push_str(&format!("{line}\n"));
        }
    }
    for (name, value) in &context.variables {
        prompt.push_str(&format!("\n\n{{{name}}} = {value}"));
    }
    prompt
}

#[cfg(test)]
#[path = "template_registry_tests.rs"]
mod tests;
