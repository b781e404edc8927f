//! quick-xml driven construction of [`GenericTreeNode`] trees.
//!
//! The tree is assembled with an explicit stack of open elements rather than
//! recursion, so deeply nested input cannot exhaust the call stack.

use super::error::ParseError;
use super::tree::GenericTreeNode;
use crate::{log_parser_debug, log_parser_warn};
use quick_xml::events::Event;
use quick_xml::Reader;
use std::io::BufRead;

/// An element that has been opened but not yet closed
struct OpenElement {
    tag: String,
    text: String,
    children: Vec<GenericTreeNode>,
}

impl OpenElement {
    fn new(tag: String) -> Self {
        Self {
            tag,
            text: String::new(),
            children: Vec::new(),
        }
    }

    fn close(self) -> GenericTreeNode {
        if self.children.is_empty() {
            GenericTreeNode::text(self.tag, self.text.trim())
        } else {
            GenericTreeNode::with_children(self.tag, self.children)
        }
    }
}

/// Builds a tree from any buffered reader
pub fn build_tree<R: BufRead>(input: R) -> Result<GenericTreeNode, ParseError> {
    let mut reader = Reader::from_reader(input);

    let mut buf = Vec::new();
    let mut open: Vec<OpenElement> = Vec::new();
    let mut root: Option<GenericTreeNode> = None;

    loop {
        let position = reader.buffer_position() as u64;
        let event = reader
            .read_event_into(&mut buf)
            .map_err(|e| ParseError::malformed(position, e))?;

        match event {
            Event::Start(start) => {
                let tag = decode_tag(start.name().as_ref(), position)?;
                if root.is_some() {
                    return Err(ParseError::MultipleRoots { tag });
                }
                open.push(OpenElement::new(tag));
            }
            Event::Empty(start) => {
                let tag = decode_tag(start.name().as_ref(), position)?;
                close_into(&mut open, &mut root, GenericTreeNode::text(tag, ""))?;
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| ParseError::malformed(position, e))?;
                append_text(&mut open, &text, position)?;
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| ParseError::encoding(position, e.to_string()))?;
                append_text(&mut open, text, position)?;
            }
            Event::End(_) => {
                // quick-xml checks that end names match their start tags
                let element = open
                    .pop()
                    .ok_or(ParseError::StrayText { position })?;
                close_into(&mut open, &mut root, element.close())?;
            }
            Event::Eof => break,
            Event::Decl(_) | Event::Comment(_) | Event::PI(_) | Event::DocType(_) => {}
        }
        buf.clear();
    }

    if let Some(element) = open.pop() {
        log_parser_warn!("Input ended with '{}' still open", element.tag);
        return Err(ParseError::UnclosedElement { tag: element.tag });
    }

    let root = root.ok_or(ParseError::EmptyDocument)?;
    log_parser_debug!(
        "Parsed <{}> with {} elements",
        root.tag,
        root.element_count()
    );
    Ok(root)
}

fn decode_tag(raw: &[u8], position: u64) -> Result<String, ParseError> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| ParseError::encoding(position, format!("tag name: {}", e)))
}

fn append_text(open: &mut [OpenElement], text: &str, position: u64) -> Result<(), ParseError> {
    match open.last_mut() {
        Some(element) => {
            element.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(ParseError::StrayText { position }),
    }
}

fn close_into(
    open: &mut [OpenElement],
    root: &mut Option<GenericTreeNode>,
    node: GenericTreeNode,
) -> Result<(), ParseError> {
    match open.last_mut() {
        Some(parent) => {
            parent.children.push(node);
            Ok(())
        }
        None if root.is_some() => Err(ParseError::MultipleRoots {
            tag: node.tag.clone(),
        }),
        None => {
            *root = Some(node);
            Ok(())
        }
    }
}
