//! XML namespace handling
//!
//! This module provides qualified names (QNames) and the in-scope prefix
//! mapping used to resolve `prefix:local` names while building a tree.

use crate::error::{ParseError, Result};
use crate::{XMLNS_NAMESPACE, XML_NAMESPACE};
use std::collections::HashMap;
use std::fmt;

/// XML Namespace URI
pub type NamespaceUri = String;

/// Namespace prefix
pub type Prefix = String;

/// Qualified name (QName) - combination of namespace and local name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    /// Namespace URI (None for no namespace)
    pub namespace: Option<NamespaceUri>,
    /// Local name
    pub local_name: String,
}

impl QName {
    /// Create a new QName
    pub fn new(namespace: Option<impl Into<String>>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.map(|s| s.into()),
            local_name: local_name.into(),
        }
    }

    /// Create a QName without a namespace
    pub fn local(local_name: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
        }
    }

    /// Create a QName with a namespace
    pub fn namespaced(namespace: impl Into<String>, local_name: impl Into<String>) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
        }
    }

    /// Parse Clark notation: `{uri}local` or a bare `local`
    pub fn from_clark(name: &str) -> Self {
        if let Some(rest) = name.strip_prefix('{') {
            if let Some((ns, local)) = rest.split_once('}') {
                return QName::namespaced(ns, local);
            }
        }
        QName::local(name)
    }

    /// Match against a name pattern.
    ///
    /// A pattern in Clark notation must match namespace and local name
    /// exactly; a bare pattern matches the local name in any namespace.
    pub fn matches(&self, pattern: &str) -> bool {
        if pattern.starts_with('{') {
            *self == QName::from_clark(pattern)
        } else {
            self.local_name == pattern
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{{{}}}{}", ns, self.local_name),
            None => f.write_str(&self.local_name),
        }
    }
}

/// Namespace context for resolving prefixes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NamespaceContext {
    /// Mapping from prefix to namespace URI
    prefixes: HashMap<Prefix, NamespaceUri>,
    /// Default namespace (no prefix)
    default_namespace: Option<NamespaceUri>,
}

impl NamespaceContext {
    /// Create a new empty namespace context
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a namespace prefix mapping
    pub fn add_prefix(&mut self, prefix: impl Into<String>, namespace: impl Into<String>) {
        self.prefixes.insert(prefix.into(), namespace.into());
    }

    /// Set the default namespace; an empty URI undeclares it
    pub fn set_default_namespace(&mut self, namespace: impl Into<String>) {
        let namespace = namespace.into();
        self.default_namespace = if namespace.is_empty() {
            None
        } else {
            Some(namespace)
        };
    }

    /// Apply an `xmlns` (prefix `None`) or `xmlns:prefix` declaration
    pub fn declare(&mut self, prefix: Option<&str>, uri: &str) -> Result<()> {
        if uri == XMLNS_NAMESPACE {
            return Err(ParseError::new("the xmlns namespace cannot be declared").into());
        }
        match prefix {
            Some("xmlns") => Err(ParseError::new("the 'xmlns' prefix cannot be declared").into()),
            Some("xml") if uri != XML_NAMESPACE => Err(ParseError::new(format!(
                "the 'xml' prefix cannot be bound to '{}'",
                uri
            ))
            .into()),
            Some("xml") => Ok(()),
            _ if uri == XML_NAMESPACE => Err(ParseError::new(
                "the XML namespace can only be bound to the 'xml' prefix",
            )
            .into()),
            Some(p) if uri.is_empty() => Err(ParseError::new(format!(
                "prefix '{}' cannot be bound to an empty namespace",
                p
            ))
            .into()),
            Some(p) => {
                self.add_prefix(p, uri);
                Ok(())
            }
            None => {
                self.set_default_namespace(uri);
                Ok(())
            }
        }
    }

    /// Get the namespace for a prefix
    pub fn get_namespace(&self, prefix: &str) -> Option<&str> {
        if prefix == "xml" {
            return Some(XML_NAMESPACE);
        }
        self.prefixes.get(prefix).map(|s| s.as_str())
    }

    /// Get the default namespace
    pub fn get_default_namespace(&self) -> Option<&str> {
        self.default_namespace.as_deref()
    }

    /// Iterate declared prefix mappings (excluding the default namespace)
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.prefixes.iter().map(|(p, u)| (p.as_str(), u.as_str()))
    }

    /// Number of bindings, counting the default namespace
    pub fn len(&self) -> usize {
        self.prefixes.len() + usize::from(self.default_namespace.is_some())
    }

    /// Whether no bindings are in scope
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve an element name; unprefixed names take the default namespace
    pub fn resolve(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            Ok(QName::namespaced(self.lookup(prefix)?, local))
        } else {
            Ok(QName::new(self.default_namespace.clone(), prefixed_name))
        }
    }

    /// Resolve an attribute name; unprefixed attributes have no namespace
    pub fn resolve_attribute(&self, prefixed_name: &str) -> Result<QName> {
        if let Some((prefix, local)) = prefixed_name.split_once(':') {
            Ok(QName::namespaced(self.lookup(prefix)?, local))
        } else {
            Ok(QName::local(prefixed_name))
        }
    }

    fn lookup(&self, prefix: &str) -> Result<&str> {
        self.get_namespace(prefix).ok_or_else(|| {
            ParseError::new(format!("namespace prefix '{}' is not defined", prefix)).into()
        })
    }
}
