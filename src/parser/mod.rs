//! # Tree Parser
//!
//! Turns a tagged interchange document into a generic ordered tree with no
//! domain knowledge. Three views are exposed:
//!
//! * [`GenericTreeNode`]: the tree itself, serializable as nested `[tag, content]` pairs
//! * [`NestedMap`]: children grouped by tag for collection-style lookups
//! * [`RawNode`]: the `(name, value)` form consumed by the mapper
//!
//! Every entry point produces the same tree for the same content, whether the
//! input arrives as a buffer, a string, a reader or a file.

pub mod error;
pub mod nested;
pub mod raw;
pub mod reader;
pub mod tree;

pub use error::ParseError;
pub use nested::{NestedMap, NestedValue};
pub use raw::{RawNode, RawValue};
pub use tree::{GenericTreeNode, NodeContent};

use std::io::{BufRead, BufReader, Read};
use std::path::Path;

/// Parses a complete in-memory document
pub fn parse(input: &[u8]) -> Result<GenericTreeNode, ParseError> {
    reader::build_tree(input)
}

pub fn parse_str(input: &str) -> Result<GenericTreeNode, ParseError> {
    parse(input.as_bytes())
}

/// Parses from a buffered stream
pub fn parse_reader<R: BufRead>(input: R) -> Result<GenericTreeNode, ParseError> {
    reader::build_tree(input)
}

/// Parses from an unbuffered stream
pub fn parse_read<R: Read>(input: R) -> Result<GenericTreeNode, ParseError> {
    parse_reader(BufReader::new(input))
}

pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<GenericTreeNode, ParseError> {
    let file = std::fs::File::open(path.as_ref())?;
    crate::log_parser_debug!("Parsing file {}", path.as_ref().display());
    parse_read(file)
}

/// Parses a document into the grouped view, keyed by the root tag
pub fn parse_to_nested_map(input: &[u8]) -> Result<NestedMap, ParseError> {
    parse(input).map(|tree| nested::to_nested_map(&tree))
}
