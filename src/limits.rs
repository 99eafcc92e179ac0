//! Limits and constraints for XML loading
//!
//! Documents are read and built entirely in memory, so these limits bound
//! how much a single file may cost before the loader gives up.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Global limits configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Limits {
    /// Maximum element nesting depth
    pub max_xml_depth: usize,

    /// Maximum XML file size in bytes
    pub max_xml_size: usize,

    /// Maximum number of attributes per element
    pub max_attributes: usize,

    /// Maximum number of namespace declarations per element
    pub max_namespaces: usize,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_xml_depth: 1000,
            max_xml_size: 100 * 1024 * 1024, // 100 MB
            max_attributes: 1000,
            max_namespaces: 1000,
        }
    }
}

impl Limits {
    /// Create a new Limits with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Tighter limits for untrusted input: a tenth of the defaults
    pub fn strict() -> Self {
        Self::default().scaled(1, 10)
    }

    /// Ten times the defaults, for trusted corpora with very large files
    pub fn permissive() -> Self {
        Self::default().scaled(10, 1)
    }

    fn scaled(self, mul: usize, div: usize) -> Self {
        let scale = |limit: usize| limit.saturating_mul(mul) / div;
        Self {
            max_xml_depth: scale(self.max_xml_depth),
            max_xml_size: scale(self.max_xml_size),
            max_attributes: scale(self.max_attributes),
            max_namespaces: scale(self.max_namespaces),
        }
    }

    /// Parse limits from a JSON object; missing fields keep their defaults
    pub fn from_json(json: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Check element nesting depth
    pub fn check_xml_depth(&self, depth: usize) -> Result<()> {
        check("element depth", depth, self.max_xml_depth)
    }

    /// Check file size in bytes
    pub fn check_xml_size(&self, size: usize) -> Result<()> {
        check("file size in bytes", size, self.max_xml_size)
    }

    /// Check the attribute count of one element
    pub fn check_attributes(&self, count: usize) -> Result<()> {
        check("attribute count", count, self.max_attributes)
    }

    /// Check the namespace declaration count of one element
    pub fn check_namespaces(&self, count: usize) -> Result<()> {
        check("namespace declaration count", count, self.max_namespaces)
    }
}

fn check(what: &str, value: usize, max: usize) -> Result<()> {
    if value > max {
        return Err(Error::LimitExceeded(format!("{} {} exceeds maximum {}", what, value, max)));
    }
    Ok(())
}
