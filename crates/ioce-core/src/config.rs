//! Editor configuration

use crate::error::ConfigError;
use crate::schema::SchemaVersion;
use crate::xml::DEFAULT_INDENT;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Settings shared by the collection and its shells
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Author recorded on documents created without an explicit one
    pub default_author: String,
    /// Document file extension, without dot, matched case-insensitively
    pub extension: String,
    /// Dialect of newly created documents
    pub default_schema: SchemaVersion,
    /// Spaces per nesting level in saved files
    pub indent: usize,
}

impl EditorConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// With default author
    #[inline]
    #[must_use]
    pub fn with_default_author(mut self, author: impl Into<String>) -> Self {
        self.default_author = author.into();
        self
    }

    /// With document extension
    #[inline]
    #[must_use]
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into();
        self
    }

    /// With dialect for new documents
    #[inline]
    #[must_use]
    pub fn with_default_schema(mut self, version: SchemaVersion) -> Self {
        self.default_schema = version;
        self
    }

    /// With indentation width
    #[inline]
    #[must_use]
    pub fn with_indent(mut self, indent: usize) -> Self {
        self.indent = indent;
        self
    }

    /// Parse TOML; missing keys keep their defaults
    ///
    /// # Errors
    /// `ConfigError::Parse` for invalid TOML or values
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load TOML config file
    ///
    /// # Errors
    /// `ConfigError::Io` if the file cannot be read, `ConfigError::Parse` if invalid
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    /// Check whether `file_name` carries the document extension
    #[must_use]
    pub fn matches_extension(&self, file_name: &str) -> bool {
        Path::new(file_name)
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.extension))
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            default_author: "ioce".to_string(),
            extension: "ioc".to_string(),
            default_schema: SchemaVersion::V1_1,
            indent: DEFAULT_INDENT,
        }
    }
}
