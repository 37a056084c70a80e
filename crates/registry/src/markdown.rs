// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! Round-trips an [`Entity`] to Markdown+frontmatter and back (§4.4).
//!
//! The frontmatter carries everything but the body text: id, type,
//! timestamps, content hash and metadata. `metadata` is serialized as a
//! JSON string field rather than a nested TOML table so arbitrary
//! `serde_json::Value`s (including `null`, which TOML has no concept of)
//! survive the round trip unchanged.

use brain_core::{Entity, EntityId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DELIMITER: &str = "---";

#[derive(Debug, Serialize, Deserialize)]
struct Frontmatter {
    id: String,
    entity_type: String,
    created: DateTime<Utc>,
    updated: DateTime<Utc>,
    content_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    metadata_json: Option<String>,
}

/// Render an entity as `---\n<frontmatter>\n---\n<body>`.
pub fn to_markdown(entity: &Entity) -> Result<String, String> {
    let metadata_json = if entity.metadata.is_empty() {
        None
    } else {
        Some(serde_json::to_string(&entity.metadata).map_err(|e| format!("serializing metadata: {e}"))?)
    };
    let frontmatter = Frontmatter {
        id: entity.id.to_string(),
        entity_type: entity.entity_type.clone(),
        created: entity.created,
        updated: entity.updated,
        content_hash: entity.content_hash.clone(),
        metadata_json,
    };
    let header = toml::to_string_pretty(&frontmatter).map_err(|e| format!("serializing frontmatter: {e}"))?;
    Ok(format!("{DELIMITER}\n{header}{DELIMITER}\n{}", entity.content))
}

/// Parse a `---`-delimited frontmatter block followed by a Markdown body
/// back into an [`Entity`]. Returns the validation errors describing why
/// on a malformed document; the caller (the entity registry) rejects the
/// write rather than persisting a partial record.
pub fn from_markdown(text: &str) -> Result<Entity, Vec<String>> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    let rest = text.strip_prefix(DELIMITER).ok_or_else(|| vec!["document does not start with a frontmatter block".to_string()])?;
    let rest = rest.strip_prefix('\n').unwrap_or(rest);
    let (header, body) = rest
        .split_once(&format!("\n{DELIMITER}\n"))
        .ok_or_else(|| vec!["frontmatter block is not terminated".to_string()])?;

    let frontmatter: Frontmatter = toml::from_str(header).map_err(|e| vec![format!("invalid frontmatter: {e}")])?;

    let id = EntityId::parse(&frontmatter.id).map_err(|e| vec![e.to_string()])?;

    let metadata: HashMap<String, serde_json::Value> = match frontmatter.metadata_json {
        Some(raw) => serde_json::from_str(&raw).map_err(|e| vec![format!("invalid metadata_json: {e}")])?,
        None => HashMap::new(),
    };

    Ok(Entity {
        id,
        entity_type: frontmatter.entity_type,
        content: body.to_string(),
        metadata,
        created: frontmatter.created,
        updated: frontmatter.updated,
        content_hash: frontmatter.content_hash,
        embedding: None,
    })
}

#[cfg(test)]
#[path = "markdown_tests.rs"]
mod tests;
