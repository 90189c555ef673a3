//! Namespace stripping
//!
//! Rewrites every tag carrying the root's `{uri}` prefix to its bare local
//! name so field lookups work the same for both schema dialects.

use crate::xml::Element;

/// Strip the root's namespace from every element name in the tree
///
/// Only tags in the root's own namespace are rewritten; attribute names are
/// left alone. A root without a namespace is a no-op (some malformed inputs
/// lack one entirely). The root keeps an `xmlns` declaration for the stripped
/// URI so the tree still records which dialect it is.
///
/// Returns the stripped namespace URI, if any.
pub fn strip_namespace(root: &mut Element) -> Option<String> {
    let Some(namespace) = root.namespace().map(str::to_string) else {
        tracing::debug!("root <{}> has no namespace, nothing to strip", root.name());
        return None;
    };

    let prefix = format!("{{{namespace}}}");
    root.for_each_mut(&mut |element| {
        if let Some(local) = element.name().strip_prefix(prefix.as_str()) {
            let local = local.to_string();
            element.set_name(local);
        }
    });

    if root.declared_namespace() != Some(namespace.as_str()) {
        root.set_attribute("xmlns", namespace.as_str());
    }

    Some(namespace)
}
