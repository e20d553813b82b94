//! Container data models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::error::{ErrorCode, StorageError, StorageResult};

/// Container properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerProperties {
    pub etag: String,
    pub last_modified: DateTime<Utc>,
}

impl Default for ContainerProperties {
    fn default() -> Self {
        Self {
            etag: format!("\"0x{}\"", uuid::Uuid::new_v4().simple()),
            last_modified: Utc::now(),
        }
    }
}

/// Complete container model stored in the metadata store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerModel {
    /// Account name.
    pub account: String,
    /// Container name.
    pub name: String,
    /// Container properties.
    pub properties: ContainerProperties,
    /// User-defined metadata.
    pub metadata: HashMap<String, String>,
}

impl ContainerModel {
    /// Creates a new container model.
    pub fn new(account: String, name: String) -> Self {
        Self {
            account,
            name,
            properties: ContainerProperties::default(),
            metadata: HashMap::new(),
        }
    }
}

/// Validates a container name against the service naming rules.
pub fn validate_container_name(name: &str) -> StorageResult<()> {
    // Container names must be 3-63 characters
    if name.len() < 3 || name.len() > 63 {
        return Err(StorageError::with_message(
            ErrorCode::InvalidResourceName,
            "Container name must be between 3 and 63 characters",
        ));
    }

    if !name.starts_with(|c: char| c.is_ascii_lowercase() || c.is_ascii_digit()) {
        return Err(StorageError::with_message(
            ErrorCode::InvalidResourceName,
            "Container name must start with a letter or number",
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(StorageError::with_message(
            ErrorCode::InvalidResourceName,
            "Container name can only contain lowercase letters, numbers, and hyphens",
        ));
    }

    if name.contains("--") {
        return Err(StorageError::with_message(
            ErrorCode::InvalidResourceName,
            "Container name cannot have consecutive hyphens",
        ));
    }

    if name.ends_with('-') {
        return Err(StorageError::with_message(
            ErrorCode::InvalidResourceName,
            "Container name must end with a letter or number",
        ));
    }

    Ok(())
}

/// Validates a blob name: 1 to 1024 characters.
pub fn validate_blob_name(name: &str) -> StorageResult<()> {
    let len = name.chars().count();
    if len == 0 || len > 1024 {
        return Err(StorageError::with_message(
            ErrorCode::InvalidResourceName,
            "Blob name must be between 1 and 1024 characters",
        ));
    }
    Ok(())
}
