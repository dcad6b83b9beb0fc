// Copyright 2024-2026 Workspace Mounts Contributors
// SPDX-License-Identifier: Apache-2.0

//! Validation functions for mount annotation fields.
//!
//! Annotations are user-editable, so everything parsed out of them is
//! checked before it is used to build watches or tracker keys.

use std::sync::OnceLock;

use regex::Regex;

use super::types::ResourceReference;

/// Maximum allowed length for name-like fields.
pub const MAX_FIELD_LENGTH: usize = 253;

/// Validation error types.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("malformed annotation JSON: {0}")]
    MalformedJson(String),

    #[error("field '{0}' cannot be empty")]
    EmptyField(String),

    #[error("field '{field}' exceeds maximum length of {max}")]
    MaxLengthExceeded { field: String, max: usize },

    #[error("field '{field}' has invalid value: {value}")]
    InvalidName { field: String, value: String },

    #[error("invalid cluster path: {0}")]
    InvalidClusterPath(String),
}

fn cluster_path_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(:[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)*$")
            .expect("cluster path pattern is a valid regex")
    })
}

fn require(value: &str, field: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }
    if value.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: field.to_string(),
            max: MAX_FIELD_LENGTH,
        });
    }
    Ok(())
}

/// Validate an object name or namespace.
///
/// Lowercase alphanumerics, dashes and dots; must start and end alphanumeric.
pub fn validate_object_name(name: &str, field: &str) -> Result<(), ValidationError> {
    require(name, field)?;

    let valid_chars = |c: char| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.';
    let edge_ok = |c: Option<char>| c.is_some_and(|c| c.is_ascii_lowercase() || c.is_ascii_digit());
    if !name.chars().all(valid_chars) || !edge_ok(name.chars().next()) || !edge_ok(name.chars().last()) {
        return Err(ValidationError::InvalidName {
            field: field.to_string(),
            value: name.to_string(),
        });
    }
    Ok(())
}

/// Validate the reference carried by a mount annotation.
pub fn validate_reference(reference: &ResourceReference) -> Result<(), ValidationError> {
    require(&reference.version, "reference.version")?;
    require(&reference.kind, "reference.kind")?;
    if reference.group.len() > MAX_FIELD_LENGTH {
        return Err(ValidationError::MaxLengthExceeded {
            field: "reference.group".to_string(),
            max: MAX_FIELD_LENGTH,
        });
    }
    validate_object_name(&reference.name, "reference.name")?;
    if !reference.namespace.is_empty() {
        validate_object_name(&reference.namespace, "reference.namespace")?;
    }
    Ok(())
}

/// Validate a logical cluster path such as `root:org:team`.
pub fn validate_cluster_path(path: &str) -> Result<(), ValidationError> {
    if path.is_empty() {
        return Err(ValidationError::EmptyField("cluster".to_string()));
    }
    // Segments are capped at 63 characters by the pattern itself.
    if !cluster_path_pattern().is_match(path) {
        return Err(ValidationError::InvalidClusterPath(path.to_string()));
    }
    Ok(())
}
