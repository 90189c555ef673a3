//! Error types for the IOC document model
//!
//! Provides error handling for:
//! - XML parsing (bytes → element tree)
//! - Document construction (element tree → `Ioc`)
//! - Collection operations (directory load, create, clone, save)
//! - Configuration loading
//!
//! Missing metadata is never an error: absent fields are synthesized.

use std::path::PathBuf;

/// Errors from the XML engine
#[derive(Debug, thiserror::Error)]
pub enum XmlError {
    /// Reader rejected the input
    #[error("xml syntax error at byte {position}: {message}")]
    Syntax { position: u64, message: String },

    /// Input ended while elements were still open
    #[error("unexpected end of input inside <{0}>")]
    UnexpectedEof(String),

    /// Input contained no root element
    #[error("document has no root element")]
    NoRootElement,

    /// Content found after the root element closed
    #[error("content after root element: <{0}>")]
    TrailingElement(String),

    /// Input is not valid UTF-8
    #[error("document is not valid utf-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    /// Declaration names an encoding no decoder knows
    #[error("unknown document encoding '{0}'")]
    UnknownEncoding(String),

    /// Input is not valid in its declared encoding
    #[error("document is not valid {0}")]
    Undecodable(&'static str),
}

impl XmlError {
    /// Create syntax error at reader position
    pub fn syntax(position: u64, message: impl Into<String>) -> Self {
        Self::Syntax {
            position,
            message: message.into(),
        }
    }
}

/// Errors while building or editing a document model
#[derive(Debug, thiserror::Error)]
pub enum DocumentError {
    /// Raw bytes are not parseable XML
    #[error("malformed document: {0}")]
    MalformedDocument(#[from] XmlError),

    /// Root declares neither known namespace
    #[error("unrecognized schema namespace: {}", .namespace.as_deref().unwrap_or("<none>"))]
    UnrecognizedSchema { namespace: Option<String> },

    /// No Indicator/IndicatorItem carries the requested id
    #[error("no indicator-logic node with id '{0}'")]
    UnknownLogicNode(String),

    /// Target node cannot hold children (IndicatorItem)
    #[error("node '{0}' is not an Indicator and cannot hold children")]
    NotAContainer(String),
}

impl DocumentError {
    /// Create unrecognized schema error
    pub fn unrecognized(namespace: Option<&str>) -> Self {
        Self::UnrecognizedSchema {
            namespace: namespace.map(str::to_string),
        }
    }
}

/// Errors from collection workflows
#[derive(Debug, thiserror::Error)]
pub enum CollectionError {
    /// Filesystem collaborator failed (permission, missing path, disk full)
    #[error("filesystem failure at {path}: {source}")]
    Filesystem {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// `create`/`clone` need a directory to place the new file in
    #[error("no directory is open")]
    NoDirectoryOpen,

    /// Path is not held by the collection
    #[error("document not loaded: {0}")]
    UnknownDocument(PathBuf),

    /// Single-document construction failed
    #[error("document error: {0}")]
    Document(#[from] DocumentError),
}

impl CollectionError {
    /// Create filesystem error for path
    pub fn filesystem(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Filesystem {
            path: path.into(),
            source,
        }
    }
}

/// Errors while loading editor configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("io error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file is not valid TOML for `EditorConfig`
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Combined error
#[derive(Debug, thiserror::Error)]
pub enum IoceError {
    #[error("xml error: {0}")]
    Xml(#[from] XmlError),

    #[error("document error: {0}")]
    Document(#[from] DocumentError),

    #[error("collection error: {0}")]
    Collection(#[from] CollectionError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result type alias for IOCE operations
pub type IoceResult<T> = Result<T, IoceError>;
