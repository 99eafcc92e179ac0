//! XML document tree
//!
//! A [`Document`] owns every element of a parsed file in a flat arena;
//! [`Element`] is a cheap borrowed handle into it that supports the usual
//! tree navigation (parent, children, siblings, attribute lookup). The tree
//! is self-contained and holds no reference to the text it was parsed from.

use crate::error::Result;
use crate::limits::Limits;
use crate::namespaces::{NamespaceContext, QName};
use crate::parsing::TreeBuilder;
use indexmap::IndexMap;
use serde::ser::{SerializeStruct, Serializer};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Index of an element within its [`Document`]
pub type NodeId = usize;

/// Stored data of one element
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct NodeData {
    pub(crate) tag: QName,
    pub(crate) prefix: Option<String>,
    pub(crate) attributes: IndexMap<QName, String>,
    /// In-scope bindings, shared with the parent unless this element declares any
    pub(crate) namespaces: Arc<NamespaceContext>,
    pub(crate) text: Option<String>,
    pub(crate) tail: Option<String>,
    pub(crate) parent: Option<NodeId>,
    /// Position within the parent's children
    pub(crate) index: usize,
    pub(crate) children: Vec<NodeId>,
    pub(crate) sourceline: usize,
}

impl NodeData {
    pub(crate) fn new(
        tag: QName,
        prefix: Option<String>,
        namespaces: Arc<NamespaceContext>,
    ) -> Self {
        Self {
            tag,
            prefix,
            attributes: IndexMap::new(),
            namespaces,
            text: None,
            tail: None,
            parent: None,
            index: 0,
            children: Vec::new(),
            sourceline: 1,
        }
    }
}

/// A parsed XML document.
///
/// A `Document` always has a root element; parsing either produces a
/// complete tree or fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Document {
    /// Root node id
    pub const ROOT: NodeId = 0;

    pub(crate) fn from_nodes(nodes: Vec<NodeData>) -> Self {
        debug_assert!(!nodes.is_empty());
        Self { nodes }
    }

    /// Parse an XML document from a string
    pub fn from_string(xml: &str) -> Result<Self> {
        Self::parse_with_limits(xml, &Limits::default())
    }

    /// Parse an XML document from UTF-8 bytes
    pub fn parse(xml: &[u8]) -> Result<Self> {
        let text = crate::loaders::decode_text(xml)?;
        Self::from_string(text)
    }

    /// Parse an XML document from a string under the given limits
    pub fn parse_with_limits(xml: &str, limits: &Limits) -> Result<Self> {
        TreeBuilder::new(xml, limits).build()
    }

    /// Get the root element
    pub fn root(&self) -> Element<'_> {
        Element {
            doc: self,
            id: Self::ROOT,
        }
    }

    /// Get an element by id
    pub fn get(&self, id: NodeId) -> Option<Element<'_>> {
        (id < self.nodes.len()).then_some(Element { doc: self, id })
    }

    /// Number of elements in the document
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always false; a parsed document has at least its root
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All elements in document order
    pub fn iter(&self) -> Descendants<'_> {
        self.root().descendants()
    }

    /// Maximum nesting depth; a lone root has depth 1
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.nodes.len()];
        let mut max = 0;
        for element in self.iter() {
            let depth = match element.node().parent {
                Some(parent) => depths[parent] + 1,
                None => 1,
            };
            depths[element.id] = depth;
            max = max.max(depth);
        }
        max
    }

    fn node(&self, id: NodeId) -> &NodeData {
        &self.nodes[id]
    }
}

/// Borrowed handle to one element of a [`Document`]
#[derive(Clone, Copy)]
pub struct Element<'a> {
    doc: &'a Document,
    id: NodeId,
}

impl<'a> Element<'a> {
    fn node(&self) -> &'a NodeData {
        self.doc.node(self.id)
    }

    fn at(&self, id: NodeId) -> Element<'a> {
        Element { doc: self.doc, id }
    }

    /// Id of this element within its document
    pub fn id(&self) -> NodeId {
        self.id
    }

    /// The owning document
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Resolved element name
    pub fn tag(&self) -> &'a QName {
        &self.node().tag
    }

    /// Element name in Clark notation (`{uri}local` or `local`)
    pub fn name(&self) -> String {
        self.tag().to_string()
    }

    /// Get the local name of the element
    pub fn local_name(&self) -> &'a str {
        &self.node().tag.local_name
    }

    /// Get the namespace of the element
    pub fn namespace(&self) -> Option<&'a str> {
        self.node().tag.namespace.as_deref()
    }

    /// Prefix used in the source, if any
    pub fn prefix(&self) -> Option<&'a str> {
        self.node().prefix.as_deref()
    }

    /// Namespace bindings in scope at this element
    pub fn namespaces(&self) -> &'a NamespaceContext {
        &self.node().namespaces
    }

    /// Get an attribute value by name.
    ///
    /// `name` is either a bare name, matching an attribute without a
    /// namespace, or Clark notation `{uri}local`.
    pub fn get(&self, name: &str) -> Option<&'a str> {
        self.get_qname(&QName::from_clark(name))
    }

    /// Get an attribute value by qualified name
    pub fn get_qname(&self, qname: &QName) -> Option<&'a str> {
        self.node().attributes.get(qname).map(|s| s.as_str())
    }

    /// Whether the attribute is present
    pub fn has_attribute(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Attributes in source order
    pub fn attributes(&self) -> impl ExactSizeIterator<Item = (&'a QName, &'a str)> + 'a {
        self.node().attributes.iter().map(|(k, v)| (k, v.as_str()))
    }

    /// Text before the first child, if any
    pub fn text(&self) -> Option<&'a str> {
        self.node().text.as_deref()
    }

    /// Text after this element's end tag, if any
    pub fn tail(&self) -> Option<&'a str> {
        self.node().tail.as_deref()
    }

    /// Line of the start tag in the source (1-based)
    pub fn sourceline(&self) -> usize {
        self.node().sourceline
    }

    /// Parent element; `None` for the root
    pub fn parent(&self) -> Option<Element<'a>> {
        self.node().parent.map(|id| self.at(id))
    }

    /// Whether this is the document root
    pub fn is_root(&self) -> bool {
        self.node().parent.is_none()
    }

    /// Child elements in order
    pub fn children(&self) -> Children<'a> {
        Children {
            doc: self.doc,
            ids: self.node().children.iter(),
        }
    }

    /// Number of child elements
    pub fn child_count(&self) -> usize {
        self.node().children.len()
    }

    /// Whether this element has child elements
    pub fn has_children(&self) -> bool {
        !self.node().children.is_empty()
    }

    /// Child at `index`
    pub fn child(&self, index: usize) -> Option<Element<'a>> {
        self.node().children.get(index).map(|&id| self.at(id))
    }

    /// First child element
    pub fn first_child(&self) -> Option<Element<'a>> {
        self.node().children.first().map(|&id| self.at(id))
    }

    /// Last child element
    pub fn last_child(&self) -> Option<Element<'a>> {
        self.node().children.last().map(|&id| self.at(id))
    }

    /// Position within the parent's children (0 for the root)
    pub fn index(&self) -> usize {
        self.node().index
    }

    /// Next sibling element
    pub fn next_sibling(&self) -> Option<Element<'a>> {
        self.parent()?.child(self.index() + 1)
    }

    /// Previous sibling element
    pub fn previous_sibling(&self) -> Option<Element<'a>> {
        let index = self.index().checked_sub(1)?;
        self.parent()?.child(index)
    }

    /// Ancestors, nearest first
    pub fn ancestors(&self) -> Ancestors<'a> {
        Ancestors {
            next: self.parent(),
        }
    }

    /// This element and all its descendants in document order
    pub fn descendants(&self) -> Descendants<'a> {
        Descendants {
            doc: self.doc,
            stack: vec![self.id],
        }
    }

    /// First direct child matching `name` (see [`QName::matches`])
    pub fn find(&self, name: &str) -> Option<Element<'a>> {
        self.children().find(|c| c.tag().matches(name))
    }

    /// All direct children matching `name`
    pub fn findall(&self, name: &str) -> Vec<Element<'a>> {
        self.children().filter(|c| c.tag().matches(name)).collect()
    }

    /// Text of the first direct child matching `name`.
    ///
    /// Returns `Some("")` when the child exists but has no text.
    pub fn findtext(&self, name: &str) -> Option<&'a str> {
        self.find(name).map(|c| c.text().unwrap_or(""))
    }

    /// All descendant elements matching `name`, including this one
    pub fn iter_named(&self, name: &'a str) -> impl Iterator<Item = Element<'a>> + 'a {
        self.descendants().filter(move |e| e.tag().matches(name))
    }

    /// Concatenated text content of this element and its descendants,
    /// excluding this element's own tail
    pub fn itertext(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = self.text() {
            out.push_str(text);
        }
        for child in self.children() {
            child.collect_text(out);
            if let Some(tail) = child.tail() {
                out.push_str(tail);
            }
        }
    }
}

impl PartialEq for Element<'_> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.doc, other.doc) && self.id == other.id
    }
}

impl Eq for Element<'_> {}

impl fmt::Debug for Element<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("tag", &self.name())
            .field("children", &self.child_count())
            .finish()
    }
}

impl Serialize for Element<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("Element", 5)?;
        state.serialize_field("tag", &self.name())?;
        state.serialize_field("attributes", &AttributesRef(*self))?;
        state.serialize_field("text", &self.text())?;
        state.serialize_field("tail", &self.tail())?;
        state.serialize_field("children", &ChildrenRef(*self))?;
        state.end()
    }
}

impl Serialize for Document {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.root().serialize(serializer)
    }
}

struct AttributesRef<'a>(Element<'a>);

impl Serialize for AttributesRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_map(self.0.attributes().map(|(k, v)| (k.to_string(), v)))
    }
}

struct ChildrenRef<'a>(Element<'a>);

impl Serialize for ChildrenRef<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.children())
    }
}

/// Iterator over child elements
pub struct Children<'a> {
    doc: &'a Document,
    ids: std::slice::Iter<'a, NodeId>,
}

impl<'a> Iterator for Children<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.ids.next().map(|&id| Element { doc: self.doc, id })
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.ids.size_hint()
    }
}

impl DoubleEndedIterator for Children<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        self.ids.next_back().map(|&id| Element { doc: self.doc, id })
    }
}

impl ExactSizeIterator for Children<'_> {}

/// Iterator over ancestors
pub struct Ancestors<'a> {
    next: Option<Element<'a>>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

/// Pre-order iterator over a subtree
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = Element<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.doc.node(id).children.iter().rev().copied());
        Some(Element { doc: self.doc, id })
    }
}
