//! Tree labels for indicator-logic nodes
//!
//! Maps an `Indicator` or `IndicatorItem` element to the text and colour a
//! tree view shows for it.

use crate::logic::{Condition, CONTENT_TAG, CONTEXT_TAG, INDICATOR_ITEM_TAG, INDICATOR_TAG};
use crate::xml::Element;
use std::fmt::{self, Display, Formatter};

/// Semantic colour of a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelColor {
    /// Boolean operators
    Neutral,
    /// Plain comparisons
    Informational,
    /// `preserve-case="true"`
    CaseSensitive,
    /// Negated comparisons
    Negated,
    /// `negate="true"` together with `preserve-case="true"`
    NegatedCaseSensitive,
}

impl LabelColor {
    /// RGB hex used by the desktop shell
    #[must_use]
    pub fn hex(self) -> &'static str {
        match self {
            Self::Neutral => "#000000",
            Self::Informational => "#0000FF",
            Self::CaseSensitive => "#009900",
            Self::Negated => "#FF0000",
            Self::NegatedCaseSensitive => "#7300FF",
        }
    }
}

/// Display text and colour for one node
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Label {
    pub text: String,
    pub color: LabelColor,
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Node is neither an Indicator nor an IndicatorItem
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Bad Indicator")]
pub struct BadIndicator;

/// Label for an indicator-logic node
///
/// Items render as `<negation> <type>:<search> <condition> <text>`.
/// `isnot`/`containsnot` are shown as `is`/`contains` with a forced `NOT`
/// and the plain negated colour, even when `preserve-case` is set.
///
/// # Errors
/// `BadIndicator` for any other element
pub fn generate_label(element: &Element) -> Result<Label, BadIndicator> {
    match element.name() {
        INDICATOR_TAG => Ok(Label {
            text: element.attribute("operator").unwrap_or_default().to_string(),
            color: LabelColor::Neutral,
        }),
        INDICATOR_ITEM_TAG => Ok(item_label(element)),
        _ => Err(BadIndicator),
    }
}

fn item_label(element: &Element) -> Label {
    let context = element.find(CONTEXT_TAG);
    let search_type = context.and_then(|c| c.attribute("type")).unwrap_or_default();
    let search_path = context.and_then(|c| c.attribute("search")).unwrap_or_default();
    let search_text = element
        .find(CONTENT_TAG)
        .and_then(Element::text)
        .unwrap_or_default();
    let mut condition = Condition::parse(element.attribute("condition").unwrap_or_default());

    let preserve_case = element.attribute("preserve-case") == Some("true");
    let mut color = if preserve_case {
        LabelColor::CaseSensitive
    } else {
        LabelColor::Informational
    };

    let mut negate = "";
    if element.attribute("negate") == Some("true") {
        negate = " NOT";
        color = if preserve_case {
            LabelColor::NegatedCaseSensitive
        } else {
            LabelColor::Negated
        };
    }

    let rewritten = match condition {
        Condition::IsNot => Some(Condition::Is),
        Condition::ContainsNot => Some(Condition::Contains),
        _ => None,
    };
    if let Some(positive) = rewritten {
        condition = positive;
        negate = " NOT";
        color = LabelColor::Negated;
    }

    Label {
        text: format!("{negate} {search_type}:{search_path} {condition} {search_text}"),
        color,
    }
}
