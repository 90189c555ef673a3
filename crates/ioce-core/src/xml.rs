//! Owned XML element tree
//!
//! Parses documents into [`Element`] trees with `quick-xml`'s namespace-aware
//! reader and serializes them back deterministically.
//!
//! The tree uses the text/tail shape: an element owns its leading `text`, its
//! child elements, and each child carries the `tail` text that follows it.
//! Comments are kept as children so they survive a load/save cycle.
//!
//! # Naming
//! Element names bound to a namespace are stored in Clark form (`{uri}local`).
//! Attribute names are kept verbatim, `xmlns` declarations included, so a
//! namespace-stripped tree still serializes with its declarations.
//!
//! # Whitespace
//! Text is kept verbatim, whitespace-only runs included. The one exception is
//! indentation: when every text and tail slot of an element with children is
//! blank and breaks the line, those slots are dropped on parse. The serializer
//! re-creates indentation for such element-only content and writes everything
//! else inline, which makes `parse(serialize(tree)) == tree`.
//!
//! # Encoding
//! [`parse_document_bytes`] decodes by byte-order mark first, then by the
//! `encoding` pseudo-attribute of the XML declaration, then as UTF-8.

use crate::error::XmlError;
use encoding_rs::{Encoding, UTF_8};
use indexmap::IndexMap;
use quick_xml::escape::{escape, partial_escape};
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::ResolveResult;
use quick_xml::{NsReader, Reader};

/// Header written before every persisted document
pub const XML_DECLARATION: &str = "<?xml version='1.0' encoding='utf-8'?>";

/// Default indentation width for [`write_document`]
pub const DEFAULT_INDENT: usize = 2;

/// Node kind stored in the tree
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    /// Regular element
    Element,
    /// `<!-- ... -->`; body lives in `text`
    Comment,
}

/// XML element (or comment) with ordered attributes
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    kind: NodeKind,
    name: String,
    attributes: IndexMap<String, String>,
    text: Option<String>,
    tail: Option<String>,
    children: Vec<Element>,
}

impl Element {
    /// Create empty element
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Element,
            name: name.into(),
            attributes: IndexMap::new(),
            text: None,
            tail: None,
            children: Vec::new(),
        }
    }

    /// Create comment node
    #[inline]
    #[must_use]
    pub fn comment(body: impl Into<String>) -> Self {
        Self {
            kind: NodeKind::Comment,
            name: String::new(),
            attributes: IndexMap::new(),
            text: Some(body.into()),
            tail: None,
            children: Vec::new(),
        }
    }

    /// With attribute (builder)
    #[inline]
    #[must_use]
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attribute(key, value);
        self
    }

    /// With text (builder)
    #[inline]
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.set_text(text);
        self
    }

    /// With child (builder)
    #[inline]
    #[must_use]
    pub fn with_child(mut self, child: Element) -> Self {
        self.push(child);
        self
    }

    /// Check if this node is a comment
    #[inline]
    #[must_use]
    pub fn is_comment(&self) -> bool {
        self.kind == NodeKind::Comment
    }

    /// Tag name (Clark form when namespaced)
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rename element
    #[inline]
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Namespace URI from a Clark-form name
    #[must_use]
    pub fn namespace(&self) -> Option<&str> {
        let rest = self.name.strip_prefix('{')?;
        rest.find('}').map(|end| &rest[..end])
    }

    /// Name without the `{uri}` prefix
    #[must_use]
    pub fn local_name(&self) -> &str {
        match self.name.find('}') {
            Some(end) if self.name.starts_with('{') => &self.name[end + 1..],
            _ => &self.name,
        }
    }

    /// Default namespace declared on this element (`xmlns` attribute)
    #[inline]
    #[must_use]
    pub fn declared_namespace(&self) -> Option<&str> {
        self.attribute("xmlns")
    }

    /// Attribute value
    #[inline]
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes.get(key).map(String::as_str)
    }

    /// Check if attribute is present
    #[inline]
    #[must_use]
    pub fn has_attribute(&self, key: &str) -> bool {
        self.attributes.contains_key(key)
    }

    /// Set attribute; existing keys keep their position
    #[inline]
    pub fn set_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// All attributes in document order
    #[inline]
    #[must_use]
    pub fn attributes(&self) -> &IndexMap<String, String> {
        &self.attributes
    }

    /// Leading text
    #[inline]
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    /// Replace leading text; empty text clears it
    pub fn set_text(&mut self, text: impl Into<String>) {
        let text = text.into();
        self.text = if text.is_empty() { None } else { Some(text) };
    }

    /// Text following this element inside its parent
    #[inline]
    #[must_use]
    pub fn tail(&self) -> Option<&str> {
        self.tail.as_deref()
    }

    /// All children, comments included
    #[inline]
    #[must_use]
    pub fn children(&self) -> &[Element] {
        &self.children
    }

    /// Child elements, comments skipped
    pub fn child_elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter(|c| !c.is_comment())
    }

    /// Append child
    ///
    /// A first child replaces leading text that is only indentation, so an
    /// emptied container such as `<links>\n  </links>` goes back to block form.
    pub fn push(&mut self, child: Element) {
        if self.children.is_empty() && self.text.as_deref().is_some_and(is_indentation) {
            self.text = None;
        }
        self.children.push(child);
    }

    /// Index of the first child element named `name`
    #[must_use]
    pub fn position(&self, name: &str) -> Option<usize> {
        self.children
            .iter()
            .position(|c| !c.is_comment() && c.name == name)
    }

    /// First child element named `name`
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&Element> {
        self.child_elements().find(|c| c.name == name)
    }

    /// First child element named `name` (mutable)
    pub fn find_mut(&mut self, name: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .find(|c| !c.is_comment() && c.name == name)
    }

    /// First child element named `name`, appending `make()` when absent
    pub fn child_or_insert_with<F>(&mut self, name: &str, make: F) -> &mut Element
    where
        F: FnOnce() -> Element,
    {
        let index = match self.position(name) {
            Some(index) => index,
            None => {
                self.push(make());
                self.children.len() - 1
            }
        };
        &mut self.children[index]
    }

    /// Remove child at `index`, keeping its tail text in place
    pub fn remove_child(&mut self, index: usize) -> Element {
        let mut removed = self.children.remove(index);
        if let Some(tail) = removed.tail.take() {
            let target = match index.checked_sub(1) {
                Some(prev) => &mut self.children[prev].tail,
                None => &mut self.text,
            };
            target.get_or_insert_with(String::new).push_str(&tail);
        }
        removed
    }

    /// Depth-first search including `self`
    pub fn find_descendant<P>(&self, predicate: &P) -> Option<&Element>
    where
        P: Fn(&Element) -> bool,
    {
        if predicate(self) {
            return Some(self);
        }
        self.children
            .iter()
            .find_map(|c| c.find_descendant(predicate))
    }

    /// Depth-first search including `self` (mutable)
    pub fn find_descendant_mut<P>(&mut self, predicate: &P) -> Option<&mut Element>
    where
        P: Fn(&Element) -> bool,
    {
        if predicate(self) {
            return Some(self);
        }
        for child in &mut self.children {
            if let Some(found) = child.find_descendant_mut(predicate) {
                return Some(found);
            }
        }
        None
    }

    /// Remove the first descendant matching `predicate` (never `self`)
    pub fn remove_descendant<P>(&mut self, predicate: &P) -> Option<Element>
    where
        P: Fn(&Element) -> bool,
    {
        if let Some(index) = self.children.iter().position(|c| predicate(c)) {
            return Some(self.remove_child(index));
        }
        self.children
            .iter_mut()
            .find_map(|c| c.remove_descendant(predicate))
    }

    /// Visit `self` and every descendant, pre-order
    pub fn for_each_mut<F>(&mut self, f: &mut F)
    where
        F: FnMut(&mut Element),
    {
        f(self);
        for child in &mut self.children {
            child.for_each_mut(f);
        }
    }

    /// Pre-order walk yielding `(depth, element)`, comments skipped
    #[must_use]
    pub fn walk(&self) -> Vec<(usize, &Element)> {
        let mut out = Vec::new();
        self.walk_into(0, &mut out);
        out
    }

    fn walk_into<'a>(&'a self, depth: usize, out: &mut Vec<(usize, &'a Element)>) {
        if self.is_comment() {
            return;
        }
        out.push((depth, self));
        for child in &self.children {
            child.walk_into(depth + 1, out);
        }
    }

    /// Serialize this element without the document header
    #[must_use]
    pub fn to_xml_string(&self, indent: usize) -> String {
        let mut out = String::new();
        write_element(&mut out, self, 0, indent, true, None);
        out
    }
}

/// Parse a UTF-8 document into its root element
///
/// # Errors
/// - `XmlError::Syntax` for anything the reader rejects (mismatched tags,
///   bad attributes, invalid escapes)
/// - `XmlError::UnexpectedEof` for truncated input
/// - `XmlError::NoRootElement` for input without elements
pub fn parse_document(input: &str) -> Result<Element, XmlError> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    let mut reader = NsReader::from_str(input);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let position = reader.buffer_position();
        let (resolved, event) = match reader.read_resolved_event() {
            Ok(pair) => pair,
            Err(e) => return Err(XmlError::syntax(position, e.to_string())),
        };

        match event {
            Event::Start(start) => {
                let element = open_element(&resolved, &start, position)?;
                stack.push(element);
            }
            Event::Empty(start) => {
                let element = open_element(&resolved, &start, position)?;
                attach(&mut stack, &mut root, element)?;
            }
            Event::End(_) => {
                if let Some(mut element) = stack.pop() {
                    strip_indentation(&mut element);
                    attach(&mut stack, &mut root, element)?;
                }
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| XmlError::syntax(position, e.to_string()))?;
                attach_text(&mut stack, &text, position)?;
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data)?;
                attach_text(&mut stack, text, position)?;
            }
            Event::Comment(body) => {
                // Comments outside the root element are not kept
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(Element::comment(std::str::from_utf8(&body)?));
                }
            }
            Event::Eof => break,
            // Declaration, processing instructions, doctype
            _ => {}
        }
    }

    if let Some(open) = stack.pop() {
        return Err(XmlError::UnexpectedEof(open.name));
    }
    root.ok_or(XmlError::NoRootElement)
}

/// Parse raw bytes in whatever encoding they declare
///
/// A byte-order mark wins over the declaration. Input with neither is UTF-8.
///
/// # Errors
/// - `XmlError::UnknownEncoding` for a declared label no decoder knows
/// - `XmlError::Undecodable` for bytes invalid in the chosen encoding
/// - `XmlError::Encoding` for invalid UTF-8
/// - otherwise as [`parse_document`]
pub fn parse_document_bytes(input: &[u8]) -> Result<Element, XmlError> {
    let (encoding, body) = match Encoding::for_bom(input) {
        Some((encoding, bom_length)) => (encoding, &input[bom_length..]),
        None => (declared_encoding(input)?.unwrap_or(UTF_8), input),
    };

    if encoding == UTF_8 {
        return parse_document(std::str::from_utf8(body)?);
    }
    let text = encoding
        .decode_without_bom_handling_and_without_replacement(body)
        .ok_or(XmlError::Undecodable(encoding.name()))?;
    parse_document(&text)
}

/// Encoding named by the XML declaration, if the input starts with one
fn declared_encoding(input: &[u8]) -> Result<Option<&'static Encoding>, XmlError> {
    let mut reader = Reader::from_reader(input);
    let Ok(Event::Decl(decl)) = reader.read_event() else {
        return Ok(None);
    };
    match decl.encoding() {
        Some(Ok(label)) => Encoding::for_label(&label).map(Some).ok_or_else(|| {
            XmlError::UnknownEncoding(String::from_utf8_lossy(&label).into_owned())
        }),
        Some(Err(e)) => Err(XmlError::syntax(0, e.to_string())),
        None => Ok(None),
    }
}

/// Serialize a document: header, then the indented root
#[must_use]
pub fn write_document(root: &Element, indent: usize) -> String {
    let mut out = String::with_capacity(1024);
    out.push_str(XML_DECLARATION);
    out.push('\n');
    write_element(&mut out, root, 0, indent, true, None);
    out.push('\n');
    out
}

fn open_element(
    resolved: &ResolveResult<'_>,
    start: &BytesStart<'_>,
    position: u64,
) -> Result<Element, XmlError> {
    let name = match resolved {
        ResolveResult::Bound(namespace) => format!(
            "{{{}}}{}",
            std::str::from_utf8(namespace.as_ref())?,
            std::str::from_utf8(start.local_name().as_ref())?
        ),
        _ => std::str::from_utf8(start.name().as_ref())?.to_string(),
    };

    let mut element = Element::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(|e| XmlError::syntax(position, e.to_string()))?;
        let key = std::str::from_utf8(attr.key.as_ref())?.to_string();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::syntax(position, e.to_string()))?;
        element.attributes.insert(key, value.into_owned());
    }
    Ok(element)
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None if root.is_some() => return Err(XmlError::TrailingElement(element.name)),
        None => *root = Some(element),
    }
    Ok(())
}

fn attach_text(stack: &mut [Element], text: &str, position: u64) -> Result<(), XmlError> {
    let Some(parent) = stack.last_mut() else {
        if is_blank(text) {
            return Ok(());
        }
        return Err(XmlError::syntax(position, "text outside root element"));
    };
    let slot = match parent.children.last_mut() {
        Some(last) => &mut last.tail,
        None => &mut parent.text,
    };
    slot.get_or_insert_with(String::new).push_str(text);
    Ok(())
}

/// Drop the indentation of element-only content
///
/// Applies only when every text and tail slot is blank and contains a line
/// break. Inline whitespace such as `<b>a</b> <i>b</i>` is content.
fn strip_indentation(element: &mut Element) {
    if element.children.is_empty() {
        return;
    }
    let indentation = |slot: &Option<String>| slot.as_deref().map_or(true, is_indentation);
    let element_only =
        indentation(&element.text) && element.children.iter().all(|c| indentation(&c.tail));
    if !element_only {
        return;
    }
    element.text = None;
    for child in &mut element.children {
        child.tail = None;
    }
}

fn is_indentation(text: &str) -> bool {
    text.contains('\n') && is_blank(text)
}

fn is_blank(text: &str) -> bool {
    text.bytes().all(|b| matches!(b, b' ' | b'\t' | b'\r' | b'\n'))
}

fn write_element(
    out: &mut String,
    element: &Element,
    depth: usize,
    indent: usize,
    pretty: bool,
    scope_namespace: Option<&str>,
) {
    if element.is_comment() {
        out.push_str("<!--");
        out.push_str(element.text().unwrap_or_default());
        out.push_str("-->");
        return;
    }

    let mut namespace = element.declared_namespace().or(scope_namespace);
    let mut declare = None;
    if let Some(uri) = element.namespace() {
        if namespace != Some(uri) {
            declare = Some(uri);
            namespace = Some(uri);
        }
    }

    let name = element.local_name();
    out.push('<');
    out.push_str(name);
    if let Some(uri) = declare {
        out.push_str(" xmlns=\"");
        out.push_str(&escape(uri));
        out.push('"');
    }
    for (key, value) in &element.attributes {
        out.push(' ');
        out.push_str(key);
        out.push_str("=\"");
        out.push_str(&escape(value.as_str()));
        out.push('"');
    }

    if element.text.is_none() && element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    if let Some(text) = &element.text {
        out.push_str(&partial_escape(text.as_str()));
    }

    let block = pretty
        && element.text.is_none()
        && element.children.iter().all(|c| c.tail.is_none());
    for child in &element.children {
        if block {
            newline(out, depth + 1, indent);
        }
        write_element(out, child, depth + 1, indent, block, namespace);
        if let Some(tail) = &child.tail {
            out.push_str(&partial_escape(tail.as_str()));
        }
    }
    if block {
        newline(out, depth, indent);
    }

    out.push_str("</");
    out.push_str(name);
    out.push('>');
}

fn newline(out: &mut String, depth: usize, indent: usize) {
    out.push('\n');
    out.extend(std::iter::repeat(' ').take(depth * indent));
}
