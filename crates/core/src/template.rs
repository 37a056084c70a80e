// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Template registry data model (kernel §3.3, §4.4).

use serde::{Deserialize, Serialize};

/// Namespaced template identifier: `{plugin_id}:{local_name}`.
///
/// Unlike [`crate::job::JobId`] and friends this is not a generated
/// random id — it is a stable, human-assigned name so plugins can refer
/// to each other's templates by a fixed key across restarts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TemplateKey(String);

impl TemplateKey {
    pub fn new(plugin_id: &str, local_name: &str) -> Self {
        Self(format!("{plugin_id}:{local_name}"))
    }

    /// Parse a `plugin_id:local_name` string, rejecting keys missing the
    /// separator or either half.
    pub fn parse(raw: &str) -> Result<Self, String> {
        match raw.split_once(':') {
            Some((plugin_id, local_name)) if !plugin_id.is_empty() && !local_name.is_empty() => {
                Ok(Self::new(plugin_id, local_name))
            }
            _ => Err(format!("malformed template key {raw:?}, expected \"plugin_id:local_name\"")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn plugin_id(&self) -> &str {
        self.0.split_once(':').map(|(p, _)| p).unwrap_or(&self.0)
    }

    pub fn local_name(&self) -> &str {
        self.0.split_once(':').map(|(_, l)| l).unwrap_or("")
    }
}

impl std::fmt::Display for TemplateKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Schema for a single variable a template expects to be filled in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateVariable {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub default: Option<serde_json::Value>,
}

/// A reusable content-generation template registered by a plugin.
///
/// Invariant: `key` is unique across the registry; overwriting an
/// existing key requires the same `plugin_id` (a plugin may update its
/// own templates but never another plugin's).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Template {
    pub key: TemplateKey,
    pub description: String,
    pub body: String,
    #[serde(default)]
    pub variables: Vec<TemplateVariable>,
    #[serde(default)]
    pub output_entity_type: Option<String>,
}

impl Template {
    /// Names of variables declared `required` with no supplied `default`.
    pub fn required_variables(&self) -> Vec<&str> {
        self.variables
            .iter()
            .filter(|v| v.required && v.default.is_none())
            .map(|v| v.name.as_str())
            .collect()
    }

    /// Check that every required variable has an entry in `provided`,
    /// returning the missing names.
    pub fn missing_variables(&self, provided: &std::collections::HashMap<String, serde_json::Value>) -> Vec<String> {
        self.required_variables().into_iter().filter(|name| !provided.contains_key(*name)).map(String::from).collect()
    }
}

#[cfg(test)]
#[path = "template_tests.rs"]
mod tests;
