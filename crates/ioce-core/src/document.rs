//! IOC document model
//!
//! [`Ioc`] wraps one normalized element tree. Construction decides the
//! schema dialect from the declared namespace and synthesizes every missing
//! required section and metadata field, so all accessors work on any
//! document that parsed.
//!
//! # Dirty tracking
//! An `Ioc` holds a working tree and a frozen original snapshot. The document
//! is dirty when the two serialize differently, or when a write was
//! requested explicitly (new and cloned documents, [`Ioc::force_save`]).

use crate::error::DocumentError;
use crate::factory;
use crate::logic::{is_logic_node, IndicatorItemSpec, Operator, INDICATOR_TAG};
use crate::namespace::strip_namespace;
use crate::schema::{MetadataField, SchemaVersion};
use crate::xml::{self, Element, DEFAULT_INDENT};
use indexmap::IndexMap;

/// Entry of the `links` container
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// `rel` attribute
    pub rel: String,
    /// Link text
    pub value: String,
}

/// Normalized indicator-of-compromise document
#[derive(Debug, Clone)]
pub struct Ioc {
    version: SchemaVersion,
    working: Element,
    original: Element,
    force_dirty: bool,
    repairs: Vec<String>,
}

impl Ioc {
    /// Parse, strip and normalize one document
    ///
    /// # Errors
    /// - `DocumentError::MalformedDocument` if the text is not XML
    /// - `DocumentError::UnrecognizedSchema` if the namespace is unknown
    pub fn parse(text: &str) -> Result<Self, DocumentError> {
        Self::from_tree(xml::parse_document(text)?)
    }

    /// Parse raw file bytes in the encoding their BOM or declaration names
    ///
    /// # Errors
    /// As [`Ioc::parse`]; undecodable input is `MalformedDocument`
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        Self::from_tree(xml::parse_document_bytes(bytes)?)
    }

    /// Build from a parsed tree
    ///
    /// Stripping is repeated here, so both stripped and raw trees are
    /// accepted. Synthesis runs before the original snapshot is taken:
    /// a freshly loaded document is clean even when defaults were added.
    ///
    /// # Errors
    /// `DocumentError::UnrecognizedSchema` if the root declares neither
    /// known namespace
    pub fn from_tree(mut root: Element) -> Result<Self, DocumentError> {
        strip_namespace(&mut root);

        let declared = root.declared_namespace();
        let version = declared
            .and_then(SchemaVersion::from_namespace)
            .ok_or_else(|| DocumentError::unrecognized(declared))?;

        let repairs = synthesize(&mut root, version);
        if !repairs.is_empty() {
            tracing::debug!(
                id = root.attribute("id").unwrap_or_default(),
                repairs = ?repairs,
                "synthesized missing fields"
            );
        }

        Ok(Self {
            version,
            original: root.clone(),
            working: root,
            force_dirty: false,
            repairs,
        })
    }

    /// Build a document that is dirty until its first save
    pub(crate) fn unsaved(root: Element) -> Result<Self, DocumentError> {
        let mut ioc = Self::from_tree(root)?;
        ioc.force_dirty = true;
        Ok(ioc)
    }

    /// Schema dialect
    #[inline]
    #[must_use]
    pub fn schema_version(&self) -> SchemaVersion {
        self.version
    }

    /// Root attributes (`id`, `last-modified`, namespace declarations, ...)
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, String> {
        self.working.attributes()
    }

    /// Unique identifier
    #[inline]
    #[must_use]
    pub fn identifier(&self) -> &str {
        self.working.attribute("id").unwrap_or_default()
    }

    pub(crate) fn set_identifier(&mut self, id: &str) {
        self.working.set_attribute("id", id);
    }

    /// Document name (`short_description`)
    #[must_use]
    pub fn name(&self) -> &str {
        self.field_text(MetadataField::Name)
    }

    /// Set document name
    pub fn set_name(&mut self, name: &str) {
        self.field_mut(MetadataField::Name).set_text(name);
    }

    /// `last-modified` attribute
    #[must_use]
    pub fn modified_date(&self) -> &str {
        self.working.attribute("last-modified").unwrap_or_default()
    }

    /// Stamp `last-modified` with the current time
    pub fn mark_modified_now(&mut self) {
        self.working
            .set_attribute("last-modified", factory::current_date());
    }

    /// Author (`authored_by`)
    #[must_use]
    pub fn author(&self) -> &str {
        self.field_text(MetadataField::Author)
    }

    /// Set author
    pub fn set_author(&mut self, author: &str) {
        self.field_mut(MetadataField::Author).set_text(author);
    }

    /// Creation date (`authored_date`)
    #[must_use]
    pub fn created_date(&self) -> &str {
        self.field_text(MetadataField::Created)
    }

    /// Stamp `authored_date` with the current time
    pub fn mark_created_now(&mut self) {
        self.field_mut(MetadataField::Created)
            .set_text(factory::current_date());
    }

    /// Description; empty when the element has no text
    #[must_use]
    pub fn description(&self) -> &str {
        self.field_text(MetadataField::Description)
    }

    /// Set description
    pub fn set_description(&mut self, description: &str) {
        self.field_mut(MetadataField::Description)
            .set_text(description);
    }

    /// Keywords; empty when absent
    #[must_use]
    pub fn keywords(&self) -> &str {
        self.metadata_root()
            .and_then(|m| m.find("keywords"))
            .and_then(Element::text)
            .unwrap_or_default()
    }

    /// Set keywords, adding the element when the source had none
    pub fn set_keywords(&mut self, keywords: &str) {
        self.metadata_root_mut()
            .child_or_insert_with("keywords", || factory::keywords(""))
            .set_text(keywords);
    }

    /// Entries of the `links` container
    #[must_use]
    pub fn links(&self) -> Vec<Link> {
        self.field(MetadataField::Links)
            .map(|links| {
                links
                    .child_elements()
                    .filter(|e| e.name() == "link")
                    .map(|e| Link {
                        rel: e.attribute("rel").unwrap_or_default().to_string(),
                        value: e.text().unwrap_or_default().to_string(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Append a link
    pub fn add_link(&mut self, rel: &str, value: &str) {
        self.field_mut(MetadataField::Links)
            .push(factory::link(rel, value));
    }

    /// Remove every `link` entry
    pub fn clear_links(&mut self) {
        let links = self.field_mut(MetadataField::Links);
        while let Some(index) = links.position("link") {
            links.remove_child(index);
        }
    }

    /// Section holding the indicator tree (`definition` / `criteria`)
    ///
    /// Present on every constructed document.
    #[must_use]
    pub fn criteria(&self) -> Option<&Element> {
        self.working.find(self.version.criteria_tag())
    }

    /// `parameters` section; always `None` for 1.0 documents
    #[must_use]
    pub fn parameters(&self) -> Option<&Element> {
        if self.version.has_parameters() {
            self.working.find("parameters")
        } else {
            None
        }
    }

    /// Indicator/IndicatorItem nodes in pre-order with their depth
    ///
    /// The top-level Indicator has depth 0.
    #[must_use]
    pub fn logic_nodes(&self) -> Vec<(usize, &Element)> {
        let Some(criteria) = self.criteria() else {
            return Vec::new();
        };
        criteria
            .child_elements()
            .flat_map(Element::walk)
            .filter(|(_, e)| is_logic_node(e))
            .collect()
    }

    /// Logic node by `id`
    #[must_use]
    pub fn find_logic_node(&self, id: &str) -> Option<&Element> {
        self.criteria()?
            .find_descendant(&|e: &Element| is_logic_node(e) && e.attribute("id") == Some(id))
    }

    /// Append an Indicator under `parent` (`None` = top-level Indicator)
    ///
    /// Returns the new node's id.
    ///
    /// # Errors
    /// - `DocumentError::UnknownLogicNode` if `parent` does not exist
    /// - `DocumentError::NotAContainer` if `parent` is an IndicatorItem
    pub fn append_indicator(
        &mut self,
        parent: Option<&str>,
        operator: Operator,
    ) -> Result<String, DocumentError> {
        let node = factory::indicator(operator);
        self.append_logic_node(parent, node)
    }

    /// Append an IndicatorItem under `parent` (`None` = top-level Indicator)
    ///
    /// Returns the new node's id.
    ///
    /// # Errors
    /// As [`Ioc::append_indicator`]
    pub fn append_indicator_item(
        &mut self,
        parent: Option<&str>,
        spec: &IndicatorItemSpec,
    ) -> Result<String, DocumentError> {
        let node = factory::indicator_item(self.version, spec);
        self.append_logic_node(parent, node)
    }

    /// Change an Indicator's operator
    ///
    /// # Errors
    /// - `DocumentError::UnknownLogicNode` if `id` does not exist
    /// - `DocumentError::NotAContainer` if `id` is an IndicatorItem
    pub fn set_operator(&mut self, id: &str, operator: Operator) -> Result<(), DocumentError> {
        let node = self.logic_parent_mut(Some(id))?;
        node.set_attribute("operator", operator.as_str());
        Ok(())
    }

    /// Remove a logic node and its subtree
    ///
    /// # Errors
    /// `DocumentError::UnknownLogicNode` if `id` does not exist
    pub fn remove_logic_node(&mut self, id: &str) -> Result<Element, DocumentError> {
        self.criteria_mut()
            .remove_descendant(&|e: &Element| is_logic_node(e) && e.attribute("id") == Some(id))
            .ok_or_else(|| DocumentError::UnknownLogicNode(id.to_string()))
    }

    /// Sections and fields synthesized during construction
    #[inline]
    #[must_use]
    pub fn repairs(&self) -> &[String] {
        &self.repairs
    }

    /// Whether construction had to synthesize anything
    #[inline]
    #[must_use]
    pub fn was_repaired(&self) -> bool {
        !self.repairs.is_empty()
    }

    /// Request a write on the next save even without changes
    #[inline]
    pub fn force_save(&mut self) {
        self.force_dirty = true;
    }

    /// Working state differs from the last load/save
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.force_dirty
            || xml::write_document(&self.working, DEFAULT_INDENT)
                != xml::write_document(&self.original, DEFAULT_INDENT)
    }

    /// Resynchronize the snapshot after a successful write
    pub(crate) fn mark_saved(&mut self) {
        self.original = self.working.clone();
        self.force_dirty = false;
    }

    /// Full working tree (read-only)
    #[inline]
    #[must_use]
    pub fn working_tree(&self) -> &Element {
        &self.working
    }

    /// Snapshot taken at load or last save
    #[inline]
    #[must_use]
    pub fn original_tree(&self) -> &Element {
        &self.original
    }

    /// Serialized working tree: header, indented, UTF-8
    #[must_use]
    pub fn to_xml_string(&self, indent: usize) -> String {
        xml::write_document(&self.working, indent)
    }

    fn metadata_root(&self) -> Option<&Element> {
        match self.version.metadata_container() {
            None => Some(&self.working),
            Some(tag) => self.working.find(tag),
        }
    }

    fn metadata_root_mut(&mut self) -> &mut Element {
        match self.version.metadata_container() {
            None => &mut self.working,
            Some(tag) => self
                .working
                .child_or_insert_with(tag, factory::missing_metadata),
        }
    }

    fn field(&self, field: MetadataField) -> Option<&Element> {
        self.metadata_root()?.find(field.tag())
    }

    fn field_text(&self, field: MetadataField) -> &str {
        self.field(field)
            .and_then(Element::text)
            .unwrap_or_default()
    }

    fn field_mut(&mut self, field: MetadataField) -> &mut Element {
        self.metadata_root_mut()
            .child_or_insert_with(field.tag(), || field.placeholder())
    }

    fn criteria_mut(&mut self) -> &mut Element {
        let version = self.version;
        self.working
            .child_or_insert_with(version.criteria_tag(), || version.default_criteria())
    }

    fn logic_parent_mut(&mut self, parent: Option<&str>) -> Result<&mut Element, DocumentError> {
        let criteria = self.criteria_mut();
        let Some(id) = parent else {
            return Ok(criteria
                .child_or_insert_with(INDICATOR_TAG, || factory::indicator(Operator::Or)));
        };

        let node = criteria
            .find_descendant_mut(&|e: &Element| is_logic_node(e) && e.attribute("id") == Some(id))
            .ok_or_else(|| DocumentError::UnknownLogicNode(id.to_string()))?;
        if node.name() != INDICATOR_TAG {
            return Err(DocumentError::NotAContainer(id.to_string()));
        }
        Ok(node)
    }

    fn append_logic_node(
        &mut self,
        parent: Option<&str>,
        node: Element,
    ) -> Result<String, DocumentError> {
        let id = node.attribute("id").unwrap_or_default().to_string();
        self.logic_parent_mut(parent)?.push(node);
        Ok(id)
    }
}

/// Append every missing root attribute, section and metadata field
///
/// Idempotent: a complete tree is left untouched.
fn synthesize(root: &mut Element, version: SchemaVersion) -> Vec<String> {
    let mut repairs = Vec::new();

    if !root.has_attribute("id") {
        root.set_attribute("id", factory::new_identifier());
        repairs.push("@id".to_string());
    }
    if !root.has_attribute("last-modified") {
        root.set_attribute("last-modified", factory::current_date());
        repairs.push("@last-modified".to_string());
    }

    for section in version.sections() {
        if root.find(section.tag).is_none() {
            root.push((section.make)());
            repairs.push(section.tag.to_string());
        }
    }

    let container = match version.metadata_container() {
        None => root,
        Some(tag) => root.child_or_insert_with(tag, factory::missing_metadata),
    };
    for field in MetadataField::ALL {
        if container.find(field.tag()).is_none() {
            container.push(field.placeholder());
            repairs.push(field.tag().to_string());
        }
    }

    repairs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::Condition;
    use crate::schema::{NAMESPACE_V1_0, NAMESPACE_V1_1};
    use pretty_assertions::assert_eq;

    fn bare(version: SchemaVersion) -> String {
        format!(
            r#"<{} xmlns="{}" id="abc" last-modified="2014-01-01T00:00:00"/>"#,
            version.root_tag(),
            version.namespace()
        )
    }

    const COMPLETE_V1_1: &str = r#"<?xml version="1.0" encoding="us-ascii"?>
<OpenIOC xmlns="http://openioc.org/schemas/OpenIOC_1.1" id="11111111-2222-3333-4444-555555555555" last-modified="2014-02-03T04:05:06">
  <metadata>
    <short_description>Evil</short_description>
    <description>Known bad</description>
    <authored_by>analyst</authored_by>
    <authored_date>2014-01-01T00:00:00</authored_date>
    <links>
      <link rel="report">http://example.com</link>
    </links>
  </metadata>
  <criteria>
    <Indicator operator="OR" id="root-ind">
      <IndicatorItem id="item-1" condition="is" preserve-case="false" negate="false">
        <Context document="FileItem" search="FileItem/Md5sum" type="mir"/>
        <Content type="md5">ABC</Content>
      </IndicatorItem>
    </Indicator>
  </criteria>
  <parameters/>
</OpenIOC>"#;

    #[test]
    fn bare_roots_get_every_field() {
        for version in SchemaVersion::ALL {
            let ioc = Ioc::parse(&bare(version)).unwrap();
            assert_eq!(ioc.schema_version(), version);
            assert_eq!(ioc.name(), factory::MISSING);
            assert_eq!(ioc.description(), factory::MISSING);
            assert_eq!(ioc.author(), factory::MISSING);
            assert!(!ioc.created_date().is_empty());
            assert!(ioc.links().is_empty());
            assert!(ioc.criteria().is_some());
            assert_eq!(ioc.parameters().is_some(), version == SchemaVersion::V1_1);
            assert!(ioc.was_repaired());
        }
    }

    #[test]
    fn v1_0_fields_live_on_root() {
        let ioc = Ioc::parse(&bare(SchemaVersion::V1_0)).unwrap();
        let root = ioc.working_tree();
        assert!(root.find("short_description").is_some());
        assert!(root.find("definition").is_some());
        assert!(root.find("metadata").is_none());
    }

    #[test]
    fn v1_1_fields_live_in_metadata() {
        let ioc = Ioc::parse(&bare(SchemaVersion::V1_1)).unwrap();
        let metadata = ioc.working_tree().find("metadata").unwrap();
        assert!(metadata.find("short_description").is_some());
        assert!(ioc.working_tree().find("short_description").is_none());
    }

    #[test]
    fn unrecognized_namespace_is_rejected() {
        let err = Ioc::parse(r#"<ioc xmlns="urn:other"/>"#).unwrap_err();
        assert!(matches!(err, DocumentError::UnrecognizedSchema { .. }));

        let err = Ioc::parse("<ioc/>").unwrap_err();
        assert!(matches!(err, DocumentError::UnrecognizedSchema { namespace: None }));
    }

    #[test]
    fn malformed_text_is_rejected() {
        let err = Ioc::parse("<OpenIOC xmlns=\"x\"><metadata>").unwrap_err();
        assert!(matches!(err, DocumentError::MalformedDocument(_)));
    }

    #[test]
    fn complete_document_is_clean_and_untouched() {
        let parsed = {
            let mut root = xml::parse_document(COMPLETE_V1_1).unwrap();
            strip_namespace(&mut root);
            root
        };
        let ioc = Ioc::from_tree(parsed.clone()).unwrap();

        assert!(!ioc.was_repaired());
        assert!(!ioc.is_dirty());
        assert_eq!(ioc.working_tree(), &parsed);
        assert_eq!(ioc.name(), "Evil");
        assert_eq!(ioc.identifier(), "11111111-2222-3333-4444-555555555555");
        assert_eq!(ioc.modified_date(), "2014-02-03T04:05:06");
        assert_eq!(
            ioc.links(),
            vec![Link {
                rel: "report".to_string(),
                value: "http://example.com".to_string()
            }]
        );
    }

    #[test]
    fn synthesis_is_idempotent() {
        let first = Ioc::parse(&bare(SchemaVersion::V1_1)).unwrap();
        let second = Ioc::from_tree(first.working_tree().clone()).unwrap();
        assert!(!second.was_repaired());
        assert_eq!(first.working_tree(), second.working_tree());
    }

    #[test]
    fn setters_mark_dirty_and_leave_original() {
        let mut ioc = Ioc::parse(COMPLETE_V1_1).unwrap();
        let original = ioc.original_tree().clone();

        ioc.set_name("Renamed");
        assert!(ioc.is_dirty());
        assert_eq!(ioc.name(), "Renamed");
        assert_eq!(ioc.original_tree(), &original);

        ioc.mark_saved();
        assert!(!ioc.is_dirty());
    }

    #[test]
    fn restoring_a_value_clears_dirty() {
        let mut ioc = Ioc::parse(COMPLETE_V1_1).unwrap();
        ioc.set_author("someone else");
        ioc.set_author("analyst");
        assert!(!ioc.is_dirty());
    }

    #[test]
    fn description_is_empty_not_missing() {
        let mut ioc = Ioc::parse(COMPLETE_V1_1).unwrap();
        ioc.set_description("");
        assert_eq!(ioc.description(), "");
    }

    #[test]
    fn force_save_marks_dirty() {
        let mut ioc = Ioc::parse(COMPLETE_V1_1).unwrap();
        ioc.force_save();
        assert!(ioc.is_dirty());
    }

    #[test]
    fn links_can_be_added_and_cleared() {
        let mut ioc = Ioc::parse(&bare(SchemaVersion::V1_0)).unwrap();
        ioc.add_link("source", "internal");
        ioc.add_link("grade", "alpha");
        assert_eq!(ioc.links().len(), 2);

        ioc.clear_links();
        assert!(ioc.links().is_empty());
    }

    #[test]
    fn keywords_are_created_on_write() {
        let mut ioc = Ioc::parse(&bare(SchemaVersion::V1_0)).unwrap();
        assert_eq!(ioc.keywords(), "");
        ioc.set_keywords("apt malware");
        assert_eq!(ioc.keywords(), "apt malware");
    }

    #[test]
    fn logic_tree_editing() {
        let mut ioc = Ioc::parse(COMPLETE_V1_1).unwrap();
        let and_id = ioc.append_indicator(Some("root-ind"), Operator::And).unwrap();
        let spec = IndicatorItemSpec::new(Condition::Contains, "FileItem", "FileItem/FileName", "x.exe");
        let item_id = ioc.append_indicator_item(Some(&and_id), &spec).unwrap();

        let depths: Vec<_> = ioc
            .logic_nodes()
            .into_iter()
            .map(|(d, e)| (d, e.attribute("id").unwrap().to_string()))
            .collect();
        assert_eq!(
            depths,
            vec![
                (0, "root-ind".to_string()),
                (1, "item-1".to_string()),
                (1, and_id.clone()),
                (2, item_id.clone()),
            ]
        );

        let err = ioc.append_indicator(Some(&item_id), Operator::Or).unwrap_err();
        assert!(matches!(err, DocumentError::NotAContainer(_)));

        ioc.set_operator(&and_id, Operator::Or).unwrap();
        assert_eq!(
            ioc.find_logic_node(&and_id).unwrap().attribute("operator"),
            Some("OR")
        );

        ioc.remove_logic_node(&and_id).unwrap();
        assert!(ioc.find_logic_node(&item_id).is_none());
        assert!(matches!(
            ioc.remove_logic_node("missing"),
            Err(DocumentError::UnknownLogicNode(_))
        ));
    }

    #[test]
    fn top_level_append_uses_root_indicator() {
        let mut ioc = Ioc::parse(&bare(SchemaVersion::V1_0)).unwrap();
        let spec = IndicatorItemSpec::new(Condition::Is, "FileItem", "FileItem/Md5sum", "abc");
        ioc.append_indicator_item(None, &spec).unwrap();

        let definition = ioc.criteria().unwrap();
        assert_eq!(definition.child_elements().count(), 1);
        let nodes = ioc.logic_nodes();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[1].0, 1);
    }

    #[test]
    fn known_namespaces() {
        assert!(Ioc::parse(&format!(r#"<ioc xmlns="{NAMESPACE_V1_0}"/>"#)).is_ok());
        assert!(Ioc::parse(&format!(r#"<OpenIOC xmlns="{NAMESPACE_V1_1}"/>"#)).is_ok());
    }

    #[test]
    fn missing_root_attributes_are_synthesized() {
        let ioc = Ioc::parse(&format!(r#"<ioc xmlns="{NAMESPACE_V1_0}"/>"#)).unwrap();
        assert!(!ioc.identifier().is_empty());
        assert!(!ioc.modified_date().is_empty());
        assert!(ioc.repairs().iter().any(|r| r == "@id"));
    }
}
