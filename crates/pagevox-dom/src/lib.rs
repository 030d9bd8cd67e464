//! Document tree and HTML loader for PageVox
//!
//! This crate provides the DOM-like tree the reader walks: an arena of typed
//! nodes with stable ids, attribute/tag queries, and the mutations the
//! content normalizer needs. The loader is deliberately forgiving: malformed
//! markup degrades to whatever tree could be built, never to an error.

pub mod node;
pub mod parser;

pub use node::{Document, Node, NodeId, NodeKind};
pub use parser::HtmlParser;
