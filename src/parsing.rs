//! Building a [`Document`] from XML text
//!
//! quick-xml provides the tokenizer; the builder on top of it enforces the
//! well-formedness rules quick-xml leaves to its callers (a single root,
//! no stray text, no unclosed elements, valid names and characters,
//! namespace bindings) and assembles the element arena.

use crate::documents::{Document, NodeData, NodeId};
use crate::error::{Error, ParseError, Result};
use crate::limits::Limits;
use crate::names;
use crate::namespaces::NamespaceContext;
use quick_xml::escape;
use quick_xml::events::{BytesDecl, BytesStart, Event};
use quick_xml::Reader;
use std::borrow::Cow;
use std::sync::Arc;
use tracing::trace;

/// Encodings whose bytes decode identically as UTF-8
const UTF8_COMPATIBLE: &[&str] = &["utf-8", "utf8", "us-ascii", "ascii"];

/// Turns XML text into a [`Document`]
pub(crate) struct TreeBuilder<'a> {
    source: &'a str,
    limits: &'a Limits,
    nodes: Vec<NodeData>,
    /// Open elements, innermost last
    stack: Vec<NodeId>,
    root_closed: bool,
    /// Whether any event has been seen; an XML declaration must come first
    started: bool,
    doctype_seen: bool,
    /// Byte offset and line number of the last line lookup
    line_cursor: (usize, usize),
    /// Bindings in scope outside the root element
    top_scope: Arc<NamespaceContext>,
}

impl<'a> TreeBuilder<'a> {
    pub(crate) fn new(source: &'a str, limits: &'a Limits) -> Self {
        Self {
            source,
            limits,
            nodes: Vec::new(),
            stack: Vec::new(),
            root_closed: false,
            started: false,
            doctype_seen: false,
            line_cursor: (0, 1),
            top_scope: Arc::new(NamespaceContext::new()),
        }
    }

    pub(crate) fn build(mut self) -> Result<Document> {
        if let Some((offset, c)) = names::find_invalid_char(self.source) {
            return Err(self.error(
                format!("invalid character U+{:04X} in document", c as u32),
                offset,
            ));
        }

        let mut reader = Reader::from_str(self.source);
        reader.trim_text(false);
        reader.check_end_names(true);
        reader.expand_empty_elements(false);

        loop {
            let pos = reader.buffer_position();
            let event = match reader.read_event() {
                Ok(event) => event,
                Err(e) => {
                    return Err(self.error(
                        format!("malformed XML: {}", e),
                        reader.buffer_position(),
                    ))
                }
            };

            match event {
                Event::Decl(decl) => {
                    if self.started {
                        let msg = "XML declaration is only allowed at the start";
                        return Err(self.error(msg, pos));
                    }
                    self.check_declaration(&decl, pos)?;
                }
                Event::Start(start) => {
                    let id = self.open_element(&start, pos)?;
                    self.stack.push(id);
                }
                Event::Empty(start) => {
                    self.open_element(&start, pos)?;
                    if self.stack.is_empty() {
                        self.root_closed = true;
                    }
                }
                Event::End(end) => {
                    let name = String::from_utf8_lossy(end.name().as_ref()).into_owned();
                    if self.stack.pop().is_none() {
                        return Err(self.error(
                            format!("end tag '{}' without a matching start tag", name),
                            pos,
                        ));
                    }
                    if self.stack.is_empty() {
                        self.root_closed = true;
                    }
                }
                Event::Text(text) => {
                    let raw = std::str::from_utf8(&text)
                        .map_err(|e| self.error(format!("invalid character data: {}", e), pos))?;
                    if raw.contains("]]>") {
                        return Err(self.error("']]>' is not allowed in character data", pos));
                    }
                    let unescaped = escape::unescape(&normalize_newlines(raw))
                        .map_err(|e| self.error(format!("invalid character data: {}", e), pos))?
                        .into_owned();
                    self.check_chars(&unescaped, pos)?;
                    self.push_text(&unescaped, pos)?;
                }
                Event::CData(cdata) => {
                    if self.stack.is_empty() {
                        return Err(self.error("CDATA section outside the root element", pos));
                    }
                    let text = std::str::from_utf8(&cdata)
                        .map_err(|e| self.error(format!("invalid CDATA section: {}", e), pos))?;
                    let text = normalize_newlines(text).into_owned();
                    self.push_text(&text, pos)?;
                }
                Event::DocType(_) => {
                    if !self.nodes.is_empty() {
                        return Err(self.error("DOCTYPE after the root element", pos));
                    }
                    if self.doctype_seen {
                        return Err(self.error("only one DOCTYPE is allowed", pos));
                    }
                    self.doctype_seen = true;
                }
                Event::Comment(_) | Event::PI(_) => {}
                Event::Eof => break,
            }
            self.started = true;
        }

        if let Some(&open) = self.stack.last() {
            let name = self.nodes[open].tag.local_name.clone();
            return Err(self.error(
                format!("unclosed element '{}'", name),
                self.source.len(),
            ));
        }
        if self.nodes.is_empty() {
            return Err(self.error("document has no root element", self.source.len()));
        }

        trace!(elements = self.nodes.len(), "built document tree");
        Ok(Document::from_nodes(self.nodes))
    }

    fn check_declaration(&self, decl: &BytesDecl<'_>, pos: usize) -> Result<()> {
        let version = decl
            .version()
            .map_err(|e| self.error(format!("malformed XML declaration: {}", e), pos))?;
        let supported = version
            .strip_prefix(b"1.")
            .is_some_and(|minor| !minor.is_empty() && minor.iter().all(u8::is_ascii_digit));
        if !supported {
            return Err(self.error(
                format!("unsupported XML version '{}'", String::from_utf8_lossy(&version)),
                pos,
            ));
        }

        let Some(encoding) = decl.encoding() else {
            return Ok(());
        };
        let encoding = encoding
            .map_err(|e| self.error(format!("malformed XML declaration: {}", e), pos))?;
        let encoding = String::from_utf8_lossy(&encoding).to_ascii_lowercase();
        if UTF8_COMPATIBLE.contains(&encoding.as_str()) {
            Ok(())
        } else {
            Err(Error::Encoding(format!(
                "document declares encoding '{}', only UTF-8 input is supported",
                encoding
            )))
        }
    }

    /// Create the element for a start (or empty) tag and attach it to its parent
    fn open_element(&mut self, start: &BytesStart<'_>, pos: usize) -> Result<NodeId> {
        if self.root_closed {
            return Err(self.error("document has more than one root element", pos));
        }
        self.limits
            .check_xml_depth(self.stack.len() + 1)
            .map_err(|e| self.locate(e, pos))?;

        let raw_name = std::str::from_utf8(start.name().as_ref())
            .map_err(|e| self.error(format!("invalid element name: {}", e), pos))?
            .to_string();
        if !names::is_valid_qname(&raw_name) {
            return Err(self.error(format!("invalid element name '{}'", raw_name), pos));
        }
        if !attributes_are_separated(start) {
            let msg = format!("attributes of '{}' must be separated by whitespace", raw_name);
            return Err(self.error(msg, pos));
        }

        // Collect attributes first; namespace declarations apply to the
        // element's own name and attributes. The parent's scope is only
        // copied when this element declares something.
        let mut namespaces = match self.stack.last() {
            Some(&parent) => Arc::clone(&self.nodes[parent].namespaces),
            None => Arc::clone(&self.top_scope),
        };
        let mut declarations = 0;
        let mut plain = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| {
                self.error(format!("malformed attribute on '{}': {}", raw_name, e), pos)
            })?;
            let key = std::str::from_utf8(attr.key.as_ref())
                .map_err(|e| self.error(format!("invalid attribute name: {}", e), pos))?
                .to_string();
            if !names::is_valid_qname(&key) {
                return Err(self.error(format!("invalid attribute name '{}'", key), pos));
            }
            let value = self.attribute_value(&attr.value, &key, pos)?;

            if key == "xmlns" {
                declarations += 1;
                Arc::make_mut(&mut namespaces)
                    .declare(None, &value)
                    .map_err(|e| self.locate(e, pos))?;
            } else if let Some(prefix) = key.strip_prefix("xmlns:") {
                declarations += 1;
                Arc::make_mut(&mut namespaces)
                    .declare(Some(prefix), &value)
                    .map_err(|e| self.locate(e, pos))?;
            } else {
                plain.push((key, value));
            }
        }
        self.limits
            .check_namespaces(declarations)
            .and_then(|_| self.limits.check_attributes(plain.len()))
            .map_err(|e| self.locate(e, pos))?;

        let tag = namespaces
            .resolve(&raw_name)
            .map_err(|e| self.locate(e, pos))?;
        let prefix = names::split_qname(&raw_name).0.map(str::to_string);
        let mut node = NodeData::new(tag, prefix, namespaces);

        for (key, value) in plain {
            let qname = node
                .namespaces
                .resolve_attribute(&key)
                .map_err(|e| self.locate(e, pos))?;
            if node.attributes.insert(qname, value).is_some() {
                return Err(self.error(
                    format!("duplicate attribute '{}' on '{}'", key, raw_name),
                    pos,
                ));
            }
        }

        node.sourceline = self.line_at(pos);
        let id = self.nodes.len();
        if let Some(&parent) = self.stack.last() {
            node.parent = Some(parent);
            node.index = self.nodes[parent].children.len();
            self.nodes[parent].children.push(id);
        }
        self.nodes.push(node);
        Ok(id)
    }

    /// Decode a raw attribute value: reject `<`, normalize whitespace, then
    /// expand references
    fn attribute_value(&self, raw: &[u8], key: &str, pos: usize) -> Result<String> {
        let invalid = |detail: String| {
            self.error(format!("invalid value for attribute '{}': {}", key, detail), pos)
        };
        let raw = std::str::from_utf8(raw).map_err(|e| invalid(e.to_string()))?;
        if raw.contains('<') {
            return Err(invalid("'<' is not allowed".to_string()));
        }
        let normalized = normalize_newlines(raw).replace(['\t', '\n'], " ");
        let value = escape::unescape(&normalized)
            .map_err(|e| invalid(e.to_string()))?
            .into_owned();
        self.check_chars(&value, pos)?;
        Ok(value)
    }

    /// Reject characters that character references expanded to but XML forbids
    fn check_chars(&self, text: &str, pos: usize) -> Result<()> {
        match names::find_invalid_char(text) {
            Some((_, c)) => Err(self.error(
                format!("character reference to invalid character U+{:04X}", c as u32),
                pos,
            )),
            None => Ok(()),
        }
    }

    /// Append character data to the current element's text, or to the
    /// tail of its last child
    fn push_text(&mut self, text: &str, pos: usize) -> Result<()> {
        let Some(&current) = self.stack.last() else {
            if text.trim_matches(is_xml_whitespace).is_empty() {
                return Ok(());
            }
            let msg = if self.nodes.is_empty() {
                "text before the root element"
            } else {
                "text after the root element"
            };
            return Err(self.error(msg, pos));
        };

        let last_child = self.nodes[current].children.last().copied();
        let target = match last_child {
            Some(last) => &mut self.nodes[last].tail,
            None => &mut self.nodes[current].text,
        };
        target.get_or_insert_with(String::new).push_str(text);
        Ok(())
    }

    /// Line number of `pos`, counting only from the previous lookup
    fn line_at(&mut self, pos: usize) -> usize {
        let end = pos.min(self.source.len());
        let (start, line) = match self.line_cursor {
            (last, line) if last <= end => (last, line),
            _ => (0, 1),
        };
        let line = line + count_newlines(&self.source.as_bytes()[start..end]);
        self.line_cursor = (end, line);
        line
    }

    fn error(&self, message: impl Into<String>, offset: usize) -> Error {
        ParseError::new(message)
            .with_position(self.source, offset)
            .into()
    }

    /// Add a position to parse errors that lack one
    fn locate(&self, err: Error, offset: usize) -> Error {
        match err {
            Error::Parse(p) if p.line.is_none() => p.with_position(self.source, offset).into(),
            other => other,
        }
    }
}

fn is_xml_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn count_newlines(bytes: &[u8]) -> usize {
    bytes.iter().filter(|&&b| b == b'\n').count()
}

/// Translate `\r\n` and lone `\r` line breaks to `\n`
fn normalize_newlines(text: &str) -> Cow<'_, str> {
    if text.contains('\r') {
        Cow::Owned(text.replace("\r\n", "\n").replace('\r', "\n"))
    } else {
        Cow::Borrowed(text)
    }
}

/// Whether every quoted attribute value in a start tag is followed by
/// whitespace or the end of the tag
fn attributes_are_separated(start: &BytesStart<'_>) -> bool {
    let bytes: &[u8] = start;
    let mut quote = None;
    for (i, &b) in bytes.iter().enumerate() {
        match quote {
            None if b == b'"' || b == b'\'' => quote = Some(b),
            Some(q) if b == q => {
                quote = None;
                match bytes.get(i + 1) {
                    None => {}
                    Some(next) if next.is_ascii_whitespace() => {}
                    Some(b'/') if i + 2 == bytes.len() => {}
                    Some(_) => return false,
                }
            }
            _ => {}
        }
    }
    true
}
