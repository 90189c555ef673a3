//! Indicator-logic vocabulary
//!
//! Typed names for the boolean operators and comparison conditions that
//! appear in a document's criteria tree.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Tag of a boolean operator node
pub const INDICATOR_TAG: &str = "Indicator";
/// Tag of a leaf comparison node
pub const INDICATOR_ITEM_TAG: &str = "IndicatorItem";
/// Tag of an item's search context
pub const CONTEXT_TAG: &str = "Context";
/// Tag of an item's search value
pub const CONTENT_TAG: &str = "Content";

/// Check if an element is an `Indicator` or `IndicatorItem`
#[inline]
#[must_use]
pub fn is_logic_node(element: &crate::xml::Element) -> bool {
    matches!(element.name(), INDICATOR_TAG | INDICATOR_ITEM_TAG)
}

/// Boolean operator of an `Indicator` node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    And,
    Or,
}

impl Operator {
    /// Attribute text
    #[inline]
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::And => "AND",
            Self::Or => "OR",
        }
    }
}

impl Display for Operator {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown operator text
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown operator: '{0}' (expected AND or OR)")]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
    type Err = UnknownOperator;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "AND" => Ok(Self::And),
            "OR" => Ok(Self::Or),
            _ => Err(UnknownOperator(s.to_string())),
        }
    }
}

/// Comparison condition of an `IndicatorItem`
///
/// Values outside the known vocabulary are carried through unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Is,
    IsNot,
    Contains,
    ContainsNot,
    Matches,
    StartsWith,
    EndsWith,
    GreaterThan,
    LessThan,
    Other(String),
}

impl Condition {
    /// Attribute text
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Is => "is",
            Self::IsNot => "isnot",
            Self::Contains => "contains",
            Self::ContainsNot => "containsnot",
            Self::Matches => "matches",
            Self::StartsWith => "starts-with",
            Self::EndsWith => "ends-with",
            Self::GreaterThan => "greater-than",
            Self::LessThan => "less-than",
            Self::Other(other) => other,
        }
    }

    /// Parse attribute text; never fails
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "is" => Self::Is,
            "isnot" => Self::IsNot,
            "contains" => Self::Contains,
            "containsnot" => Self::ContainsNot,
            "matches" => Self::Matches,
            "starts-with" => Self::StartsWith,
            "ends-with" => Self::EndsWith,
            "greater-than" => Self::GreaterThan,
            "less-than" => Self::LessThan,
            other => Self::Other(other.to_string()),
        }
    }
}

impl Display for Condition {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for a new `IndicatorItem`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndicatorItemSpec {
    pub condition: Condition,
    /// `Context/@document`, e.g. `FileItem`
    pub document: String,
    /// `Context/@search`, e.g. `FileItem/Md5sum`
    pub search: String,
    /// `Context/@type`
    pub context_type: String,
    /// `Content/@type`, e.g. `md5`
    pub content_type: String,
    /// `Content` text
    pub content: String,
    /// Only written for 1.1 documents
    pub preserve_case: bool,
    /// Only written for 1.1 documents
    pub negate: bool,
}

impl IndicatorItemSpec {
    /// Item comparing `document`/`search` against `content`
    #[must_use]
    pub fn new(
        condition: Condition,
        document: impl Into<String>,
        search: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            condition,
            document: document.into(),
            search: search.into(),
            content: content.into(),
            ..Self::default()
        }
    }

    /// With `Content/@type`
    #[inline]
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    /// With `preserve-case`
    #[inline]
    #[must_use]
    pub fn with_preserve_case(mut self, preserve_case: bool) -> Self {
        self.preserve_case = preserve_case;
        self
    }

    /// With `negate`
    #[inline]
    #[must_use]
    pub fn with_negate(mut self, negate: bool) -> Self {
        self.negate = negate;
        self
    }
}

impl Default for IndicatorItemSpec {
    fn default() -> Self {
        Self {
            condition: Condition::Is,
            document: "Unknown".to_string(),
            search: String::new(),
            context_type: "mir".to_string(),
            content_type: "Unknown".to_string(),
            content: String::new(),
            preserve_case: false,
            negate: false,
        }
    }
}
