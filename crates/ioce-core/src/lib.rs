//! IOCE Core - OpenIOC document model
//!
//! Loads, normalizes, edits and saves indicator-of-compromise documents
//! written in either OpenIOC dialect:
//! - Parses XML into an owned element tree
//! - Strips the default namespace so lookups use bare tag names
//! - Detects the schema version (1.0 or 1.1) from the root namespace
//! - Synthesizes missing sections and metadata so every accessor succeeds
//! - Tracks dirty state against a snapshot taken at load/save
//! - Renders indicator tree nodes as display labels
//!
//! ```text
//! ┌────────────┐   bytes   ┌──────┐  tree  ┌───────────┐
//! │ Filesystem │ ────────→ │ xml  │ ─────→ │ namespace │
//! └────────────┘           └──────┘        └─────┬─────┘
//!       ↑                                        ↓
//!   ┌───┴──────┐   holds   ┌─────┐  repairs ┌─────────┐
//!   │ IocList  │ ────────→ │ Ioc │ ←─────── │ factory │
//!   └──────────┘           └──┬──┘          └─────────┘
//!                             ↓ logic nodes
//!                          ┌───────┐
//!                          │ label │
//!                          └───────┘
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use ioce_core::{IocList, SchemaVersion};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let mut list = IocList::new();
//! let report = list.open("./iocs")?;
//! println!("{report}");
//!
//! let path = list.create("analyst", SchemaVersion::V1_1)?;
//! if let Some(ioc) = list.get_mut(&path) {
//!     ioc.set_name("Suspicious service");
//! }
//! list.save(None)?;
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

// Core modules
pub mod collection;
pub mod config;
pub mod document;
pub mod error;
pub mod factory;
pub mod fs;
pub mod label;
pub mod logic;
pub mod namespace;
pub mod schema;
pub mod xml;

// Re-exports for convenience
pub use collection::{FileOutcome, IocList, LoadOutcome, LoadReport, SaveReport};
pub use config::EditorConfig;
pub use document::{Ioc, Link};
pub use error::{
    CollectionError, ConfigError, DocumentError, IoceError, IoceResult, XmlError,
};
pub use fs::{Filesystem, LocalFilesystem, MemoryFilesystem};
pub use label::{generate_label, BadIndicator, Label, LabelColor};
pub use logic::{Condition, IndicatorItemSpec, Operator, UnknownOperator};
pub use namespace::strip_namespace;
pub use schema::{MetadataField, SchemaVersion, UnknownVersion, NAMESPACE_V1_0, NAMESPACE_V1_1};
pub use xml::{parse_document, parse_document_bytes, write_document, Element};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for working with IOCE Core
    pub use crate::{
        generate_label, EditorConfig, Element, Filesystem, Ioc, IocList, IoceError, IoceResult,
        IndicatorItemSpec, Label, LabelColor, Operator, SchemaVersion,
    };
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod integration_tests {
    use super::*;

    #[test]
    fn labels_for_every_logic_node() {
        let mut list = IocList::with_filesystem(MemoryFilesystem::new());
        list.open("/iocs").unwrap();
        let path = list.create("me", SchemaVersion::V1_1).unwrap();

        let ioc = list.get_mut(&path).unwrap();
        let spec = IndicatorItemSpec::new(
            Condition::Is,
            "FileItem",
            "FileItem/Md5sum",
            "d41d8cd98f00b204e9800998ecf8427e",
        )
        .with_content_type("md5");
        ioc.append_indicator_item(None, &spec).unwrap();

        let labels: Vec<_> = ioc
            .logic_nodes()
            .into_iter()
            .map(|(_, node)| generate_label(node).unwrap().text)
            .collect();
        assert_eq!(
            labels,
            vec![
                "OR".to_string(),
                " mir:FileItem/Md5sum is d41d8cd98f00b204e9800998ecf8427e".to_string(),
            ]
        );
    }

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
