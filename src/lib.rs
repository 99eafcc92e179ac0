//! # bncparse
//!
//! Load an XML file from disk into an owned, navigable element tree.
//!
//! The whole file is read into memory, decoded as UTF-8 and parsed in one
//! pass. A call either returns a complete [`Document`] or fails with an
//! [`Error`] that tells file system problems apart from malformed content.
//!
//! ## Example
//!
//! ```rust,no_run
//! use bncparse::get_xml;
//!
//! let doc = get_xml("corpus/A00.xml")?;
//! let root = doc.root();
//! println!("root: {} ({} children)", root.name(), root.child_count());
//! for child in root.children() {
//!     if let Some(id) = child.get("id") {
//!         println!("  {} id={}", child.local_name(), id);
//!     }
//! }
//! # Ok::<(), bncparse::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod documents;
pub mod error;
pub mod limits;
pub mod loaders;
pub mod names;
pub mod namespaces;
mod parsing;

// Re-exports for convenience
pub use documents::{Document, Element, NodeId};
pub use error::{Error, ErrorKind, ParseError, Result};
pub use limits::Limits;
pub use loaders::{get_xml, Loader};
pub use namespaces::QName;

/// Version of the bncparse library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// XMLNS namespace
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";
