//! Node factory
//!
//! Constructors for well-formed document fragments. Used to synthesize
//! missing fields on load and to build brand-new documents.
//!
//! Everything here is deterministic except [`current_date`] (process clock)
//! and [`new_identifier`] (random v4 UUID).

use crate::logic::{
    IndicatorItemSpec, Operator, CONTENT_TAG, CONTEXT_TAG, INDICATOR_ITEM_TAG, INDICATOR_TAG,
};
use crate::schema::SchemaVersion;
use crate::xml::Element;

/// Placeholder text for synthesized metadata
pub const MISSING: &str = "*Missing*";

/// Timestamp format used for `last-modified` and `authored_date`
pub const DATE_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// `published-date` written on new 1.1 roots
pub const UNPUBLISHED_DATE: &str = "0001-01-01T00:00:00";

const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";
const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// Current UTC time in [`DATE_FORMAT`]
#[must_use]
pub fn current_date() -> String {
    chrono::Utc::now().format(DATE_FORMAT).to_string()
}

/// Fresh 128-bit random identifier, lowercase hyphenated
///
/// Safe both as an XML attribute value and as a filename stem.
#[must_use]
pub fn new_identifier() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Metadata block (1.1): name, description, keywords, author, date, links
#[must_use]
pub fn metadata(name: &str, description: &str, author: &str, links: Element) -> Element {
    Element::new("metadata")
        .with_child(short_description(name))
        .with_child(self::description(description))
        .with_child(keywords(""))
        .with_child(authored_by(author))
        .with_child(authored_date())
        .with_child(links)
}

/// Metadata block with every field set to [`MISSING`]
#[must_use]
pub fn missing_metadata() -> Element {
    metadata(MISSING, MISSING, MISSING, links())
}

/// `short_description` (the document name)
#[must_use]
pub fn short_description(name: &str) -> Element {
    Element::new("short_description").with_text(name)
}

/// `description`
#[must_use]
pub fn description(text: &str) -> Element {
    Element::new("description").with_text(text)
}

/// `keywords`
#[must_use]
pub fn keywords(text: &str) -> Element {
    Element::new("keywords").with_text(text)
}

/// `authored_by`
#[must_use]
pub fn authored_by(author: &str) -> Element {
    Element::new("authored_by").with_text(author)
}

/// `authored_date` stamped with [`current_date`]
#[must_use]
pub fn authored_date() -> Element {
    Element::new("authored_date").with_text(current_date())
}

/// Empty `links` container
#[must_use]
pub fn links() -> Element {
    Element::new("links")
}

/// Single `link` entry
#[must_use]
pub fn link(rel: &str, value: &str) -> Element {
    Element::new("link").with_attribute("rel", rel).with_text(value)
}

/// 1.1 `criteria` container around `indicator`
#[must_use]
pub fn criteria(indicator: Element) -> Element {
    Element::new("criteria").with_child(indicator)
}

/// 1.0 `definition` container around `indicator`
#[must_use]
pub fn definition(indicator: Element) -> Element {
    Element::new("definition").with_child(indicator)
}

/// Empty 1.1 `parameters` container
#[must_use]
pub fn parameters() -> Element {
    Element::new("parameters")
}

/// `Indicator` with a fresh id
#[must_use]
pub fn indicator(operator: Operator) -> Element {
    Element::new(INDICATOR_TAG)
        .with_attribute("operator", operator.as_str())
        .with_attribute("id", new_identifier())
}

/// `Context` of an indicator item
#[must_use]
pub fn context(document: &str, search: &str, context_type: &str) -> Element {
    Element::new(CONTEXT_TAG)
        .with_attribute("document", document)
        .with_attribute("search", search)
        .with_attribute("type", context_type)
}

/// `Content` of an indicator item
#[must_use]
pub fn content(content_type: &str, text: &str) -> Element {
    Element::new(CONTENT_TAG)
        .with_attribute("type", content_type)
        .with_text(text)
}

/// `IndicatorItem` with a fresh id
///
/// `preserve-case` and `negate` exist only in the 1.1 vocabulary.
#[must_use]
pub fn indicator_item(version: SchemaVersion, spec: &IndicatorItemSpec) -> Element {
    let mut item = Element::new(INDICATOR_ITEM_TAG)
        .with_attribute("id", new_identifier())
        .with_attribute("condition", spec.condition.as_str());
    if version == SchemaVersion::V1_1 {
        item.set_attribute("preserve-case", bool_text(spec.preserve_case));
        item.set_attribute("negate", bool_text(spec.negate));
    }
    item.with_child(context(&spec.document, &spec.search, &spec.context_type))
        .with_child(content(&spec.content_type, &spec.content))
}

/// Fresh document root for `version` with a new identifier
#[must_use]
pub fn ioc_root(version: SchemaVersion) -> Element {
    let root = Element::new(version.root_tag())
        .with_attribute("xmlns", version.namespace())
        .with_attribute("xmlns:xsi", XSI_NAMESPACE)
        .with_attribute("xmlns:xsd", XSD_NAMESPACE)
        .with_attribute("id", new_identifier())
        .with_attribute("last-modified", current_date());
    match version {
        SchemaVersion::V1_0 => root,
        SchemaVersion::V1_1 => root.with_attribute("published-date", UNPUBLISHED_DATE),
    }
}

/// Minimal complete document for `version`
///
/// Carries a fresh root, every metadata field and an empty OR-indicator.
#[must_use]
pub fn blank_document(
    version: SchemaVersion,
    name: &str,
    description: &str,
    author: &str,
) -> Element {
    let root = ioc_root(version);
    match version {
        SchemaVersion::V1_0 => root
            .with_child(short_description(name))
            .with_child(self::description(description))
            .with_child(authored_by(author))
            .with_child(authored_date())
            .with_child(links())
            .with_child(definition(indicator(Operator::Or))),
        SchemaVersion::V1_1 => root
            .with_child(metadata(name, description, author, links()))
            .with_child(criteria(indicator(Operator::Or)))
            .with_child(parameters()),
    }
}

fn bool_text(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}
