//! Schema dialects
//!
//! [`SchemaVersion`] is decided once when a document is constructed; every
//! per-dialect difference (root tag, metadata container, criteria section,
//! required sections) is a function of it.

use crate::factory;
use crate::logic::Operator;
use crate::xml::Element;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Namespace URI of schema 1.0
pub const NAMESPACE_V1_0: &str = "http://schemas.mandiant.com/2010/ioc";
/// Namespace URI of schema 1.1
pub const NAMESPACE_V1_1: &str = "http://openioc.org/schemas/OpenIOC_1.1";

/// Supported OpenIOC dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SchemaVersion {
    /// Mandiant 2010 schema
    #[serde(rename = "1.0")]
    V1_0,
    /// OpenIOC 1.1 schema
    #[serde(rename = "1.1")]
    V1_1,
}

/// A required top-level section and how to build it
#[derive(Debug, Clone, Copy)]
pub struct Section {
    /// Tag looked up on the root
    pub tag: &'static str,
    /// Default appended when the tag is absent
    pub make: fn() -> Element,
}

const V1_0_SECTIONS: &[Section] = &[Section {
    tag: "definition",
    make: definition_section,
}];

const V1_1_SECTIONS: &[Section] = &[
    Section {
        tag: "metadata",
        make: factory::missing_metadata,
    },
    Section {
        tag: "criteria",
        make: criteria_section,
    },
    Section {
        tag: "parameters",
        make: factory::parameters,
    },
];

fn definition_section() -> Element {
    factory::definition(factory::indicator(Operator::Or))
}

fn criteria_section() -> Element {
    factory::criteria(factory::indicator(Operator::Or))
}

impl SchemaVersion {
    /// Both dialects
    pub const ALL: [SchemaVersion; 2] = [Self::V1_0, Self::V1_1];

    /// Version for a declared namespace URI
    #[must_use]
    pub fn from_namespace(uri: &str) -> Option<Self> {
        match uri {
            NAMESPACE_V1_0 => Some(Self::V1_0),
            NAMESPACE_V1_1 => Some(Self::V1_1),
            _ => None,
        }
    }

    /// Namespace URI
    #[inline]
    #[must_use]
    pub fn namespace(self) -> &'static str {
        match self {
            Self::V1_0 => NAMESPACE_V1_0,
            Self::V1_1 => NAMESPACE_V1_1,
        }
    }

    /// "1.0" / "1.1"
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::V1_0 => "1.0",
            Self::V1_1 => "1.1",
        }
    }

    /// Root tag of a new document
    #[inline]
    #[must_use]
    pub fn root_tag(self) -> &'static str {
        match self {
            Self::V1_0 => "ioc",
            Self::V1_1 => "OpenIOC",
        }
    }

    /// Section holding the indicator tree
    #[inline]
    #[must_use]
    pub fn criteria_tag(self) -> &'static str {
        match self {
            Self::V1_0 => "definition",
            Self::V1_1 => "criteria",
        }
    }

    /// Child of the root holding metadata fields; `None` means the root itself
    #[inline]
    #[must_use]
    pub fn metadata_container(self) -> Option<&'static str> {
        match self {
            Self::V1_0 => None,
            Self::V1_1 => Some("metadata"),
        }
    }

    /// Whether documents carry a `parameters` section
    #[inline]
    #[must_use]
    pub fn has_parameters(self) -> bool {
        self == Self::V1_1
    }

    /// Empty OR-indicator inside this dialect's criteria section
    #[must_use]
    pub fn default_criteria(self) -> Element {
        match self {
            Self::V1_0 => definition_section(),
            Self::V1_1 => criteria_section(),
        }
    }

    /// Required top-level sections, in synthesis order
    #[inline]
    #[must_use]
    pub fn sections(self) -> &'static [Section] {
        match self {
            Self::V1_0 => V1_0_SECTIONS,
            Self::V1_1 => V1_1_SECTIONS,
        }
    }
}

impl Display for SchemaVersion {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown version text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown schema version: '{0}' (expected 1.0 or 1.1)")]
pub struct UnknownVersion(pub String);

impl FromStr for SchemaVersion {
    type Err = UnknownVersion;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1.0" => Ok(Self::V1_0),
            "1.1" => Ok(Self::V1_1),
            _ => Err(UnknownVersion(s.to_string())),
        }
    }
}

/// Metadata fields guaranteed present after construction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetadataField {
    Name,
    Description,
    Author,
    Created,
    Links,
}

impl MetadataField {
    /// Synthesis order
    pub const ALL: [MetadataField; 5] = [
        Self::Name,
        Self::Description,
        Self::Author,
        Self::Created,
        Self::Links,
    ];

    /// Element tag inside the metadata container
    #[inline]
    #[must_use]
    pub fn tag(self) -> &'static str {
        match self {
            Self::Name => "short_description",
            Self::Description => "description",
            Self::Author => "authored_by",
            Self::Created => "authored_date",
            Self::Links => "links",
        }
    }

    /// Default appended when the field is absent
    #[must_use]
    pub fn placeholder(self) -> Element {
        match self {
            Self::Name => factory::short_description(factory::MISSING),
            Self::Description => factory::description(factory::MISSING),
            Self::Author => factory::authored_by(factory::MISSING),
            Self::Created => factory::authored_date(),
            Self::Links => factory::links(),
        }
    }
}
