// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Brain contributors

//! A reusable adapter kernel for entity types whose content is a
//! structured record rather than free-form prose (§4.4): a schema of
//! ordered field mappings renders to a deterministic hierarchical
//! Markdown document (H1 title, H2/H3 nested fields, bulleted arrays)
//! and parses back by walking section headings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How a single field in a [`StructuredSchema`] renders and parses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    Text,
    Number,
    Boolean,
    /// A nested object, rendered as an `###` subsection of its field's `##`.
    Object,
    /// A list rendered as a bulleted list under its field's heading.
    Array,
}

/// One field mapping in a [`StructuredSchema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldMapping {
    pub key: String,
    pub label: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub children: Vec<FieldMapping>,
}

impl FieldMapping {
    pub fn new(key: impl Into<String>, label: impl Into<String>, field_type: FieldType) -> Self {
        Self { key: key.into(), label: label.into(), field_type, children: Vec::new() }
    }

    pub fn with_children(mut self, children: Vec<FieldMapping>) -> Self {
        self.children = children;
        self
    }
}

/// A title field plus an ordered list of body field mappings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredSchema {
    pub title_key: String,
    pub fields: Vec<FieldMapping>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    Valid,
    Invalid,
}

/// Result of [`StructuredSchema::parse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParseOutcome {
    pub data: Value,
    pub validation_status: ValidationStatus,
    #[serde(default)]
    pub validation_errors: Vec<String>,
}

impl StructuredSchema {
    /// Render `data` as a hierarchical Markdown document. Missing fields
    /// are silently skipped rather than erroring, since a schema evolves
    /// independently of any one record.
    pub fn format(&self, data: &Value) -> String {
        let obj = data.as_object();
        let mut out = String::new();
        let title = obj.and_then(|o| o.get(&self.title_key)).and_then(Value::as_str).unwrap_or("Untitled");
        out.push_str(&format!("# {title}\n\n"));
        for field in &self.fields {
            render_field(field, obj, 2, &mut out);
        }
        out
    }

    /// Parse a document produced by [`Self::format`] (or hand-edited in
    /// compatible shape) back into structured data. On any field-level
    /// parse failure, `previous` (the entity's last-valid data, if any)
    /// is returned as `data` and the failures are reported rather than
    /// persisting a half-parsed record.
    pub fn parse(&self, markdown: &str, previous: Option<&Value>) -> ParseOutcome {
        let sections = split_sections(markdown);
        let mut data = Map::new();
        let mut errors = Vec::new();

        if let Some(title) = extract_title(markdown) {
            data.insert(self.title_key.clone(), Value::String(title));
        } else {
            errors.push("missing H1 title".to_string());
        }

        for field in &self.fields {
            match parse_field(field, &sections) {
                Ok(Some(value)) => {
                    data.insert(field.key.clone(), value);
                }
                Ok(None) => {}
                Err(e) => errors.push(e),
            }
        }

        if errors.is_empty() {
            ParseOutcome { data: Value::Object(data), validation_status: ValidationStatus::Valid, validation_errors: errors }
        } else {
            ParseOutcome {
                data: previous.cloned().unwrap_or_else(|| Value::Object(Map::new())),
                validation_status: ValidationStatus::Invalid,
                validation_errors: errors,
            }
        }
    }
}

fn render_field(field: &FieldMapping, obj: Option<&Map<String, Value>>, level: usize, out: &mut String) {
    let heading = "#".repeat(level.min(6));
    out.push_str(&format!("{heading} {}\n\n", field.label));
    let value = obj.and_then(|o| o.get(&field.key));
    match (field.field_type, value) {
        (FieldType::Array, Some(Value::Array(items))) => {
            for item in items {
                out.push_str(&format!("- {}\n", scalar_to_string(item)));
            }
            out.push('\n');
        }
        (FieldType::Object, Some(Value::Object(nested))) => {
            for child in &field.children {
                render_field(child, Some(nested), level + 1, out);
            }
        }
        (_, Some(v)) => {
            out.push_str(&scalar_to_string(v));
            out.push_str("\n\n");
        }
        (_, None) => {}
    }
}

fn scalar_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// A heading and the raw lines under it, up to (not including) the next
/// heading of the same or a shallower level.
struct Section {
    level: usize,
    label: String,
    body: Vec<String>,
}

fn split_sections(markdown: &str) -> Vec<Section> {
    let mut sections = Vec::new();
    let mut current: Option<Section> = None;
    for line in markdown.lines() {
        if let Some(level) = heading_level(line) {
            if level == 1 {
                continue;
            }
            if let Some(section) = current.take() {
                sections.push(section);
            }
            current = Some(Section { level, label: line.trim_start_matches('#').trim().to_string(), body: Vec::new() });
        } else if let Some(section) = current.as_mut() {
            section.body.push(line.to_string());
        }
    }
    if let Some(section) = current.take() {
        sections.push(section);
    }
    sections
}

fn heading_level(line: &str) -> Option<usize> {
    let trimmed = line.trim_start();
    let hashes = trimmed.chars().take_while(|c| *c == '#').count();
    if hashes > 0 && trimmed.as_bytes().get(hashes) == Some(&b' ') {
        Some(hashes)
    } else {
        None
    }
}

fn extract_title(markdown: &str) -> Option<String> {
    markdown.lines().find_map(|line| {
        if heading_level(line) == Some(1) {
            Some(line.trim_start_matches('#').trim().to_string())
        } else {
            None
        }
    })
}

fn parse_field(field: &FieldMapping, sections: &[Section]) -> Result<Option<Value>, String> {
    let Some((section_index, section)) = sections.iter().enumerate().find(|(_, s)| s.label == field.label) else {
        return Ok(None);
    };
    match field.field_type {
        FieldType::Array => {
            let items: Vec<Value> = section
                .body
                .iter()
                .filter_map(|line| line.trim().strip_prefix("- ").map(|rest| Value::String(rest.trim().to_string())))
                .collect();
            Ok(Some(Value::Array(items)))
        }
        FieldType::Object => {
            let nested_level = section.level + 1;
            // Scope to this section's own subtree: sections immediately
            // following it in document order, stopping at the next
            // heading of the same or a shallower level. A flat filter by
            // level alone would match a same-named child under a sibling
            // Object field too.
            let nested_sections: Vec<&Section> = sections[section_index + 1..]
                .iter()
                .take_while(|s| s.level > section.level)
                .filter(|s| s.level == nested_level)
                .collect();
            let mut obj = Map::new();
            for child in &field.children {
                if let Some(child_section) = nested_sections.iter().find(|s| s.label == child.label) {
                    match parse_field(
                        child,
                        &[Section { level: child_section.level, label: child_section.label.clone(), body: child_section.body.clone() }],
                    ) {
                        Ok(Some(v)) => {
                            obj.insert(child.key.clone(), v);
                        }
                        Ok(None) => {}
                        Err(e) => return Err(e),
                    }
                }
            }
            Ok(Some(Value::Object(obj)))
        }
        FieldType::Number => {
            let text = section.body.join("").trim().to_string();
            if text.is_empty() {
                return Ok(None);
            }
            text.parse::<f64>().map(|n| Some(Value::from(n))).map_err(|_| format!("field {:?} is not a number: {text:?}", field.label))
        }
        FieldType::Boolean => {
            let text = section.body.join("").trim().to_string();
            match text.as_str() {
                "" => Ok(None),
                "true" => Ok(Some(Value::Bool(true))),
                "false" => Ok(Some(Value::Bool(false))),
                other => Err(format!("field {:?} is not a boolean: {other:?}", field.label)),
            }
        }
        FieldType::Text => {
            let text = section.body.join("\n").trim().to_string();
            if text.is_empty() {
                Ok(None)
            } else {
                Ok(Some(Value::String(text)))
            }
        }
    }
}

#[cfg(test)]
#[path = "structured_tests.rs"]
mod tests;
