use super::tree::{GenericTreeNode, NodeContent};
use serde::Serialize;

/// Schema-free field value handed to the mapper
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RawValue {
    Text(String),
    Node(RawNode),
}

/// An element reduced to its tag and ordered `(raw name, value)` fields.
///
/// Names are kept exactly as written in the document and may repeat, which is
/// how a container lists several items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawNode {
    pub tag: String,
    pub fields: Vec<(String, RawValue)>,
}

impl RawNode {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style helper used by callers that assemble raw input by hand
    pub fn with_text(mut self, name: impl Into<String>, text: impl Into<String>) -> Self {
        self.fields.push((name.into(), RawValue::Text(text.into())));
        self
    }

    pub fn with_node(mut self, name: impl Into<String>, node: RawNode) -> Self {
        self.fields.push((name.into(), RawValue::Node(node)));
        self
    }

    /// Converts an element and its whole subtree without recursion
    pub fn from_tree(root: &GenericTreeNode) -> RawNode {
        struct Frame<'a> {
            node: &'a GenericTreeNode,
            next_child: usize,
            raw: RawNode,
        }

        let mut stack = vec![Frame {
            node: root,
            next_child: 0,
            raw: RawNode::new(root.tag.clone()),
        }];

        while let Some(frame) = stack.last_mut() {
            let node = frame.node;
            if let Some(child) = node.children().get(frame.next_child) {
                frame.next_child += 1;
                match &child.content {
                    NodeContent::Text(text) => frame
                        .raw
                        .fields
                        .push((child.tag.clone(), RawValue::Text(text.clone()))),
                    NodeContent::Children(_) => stack.push(Frame {
                        node: child,
                        next_child: 0,
                        raw: RawNode::new(child.tag.clone()),
                    }),
                }
                continue;
            }

            let Some(finished) = stack.pop().map(|frame| frame.raw) else {
                break;
            };
            match stack.last_mut() {
                Some(parent) => parent
                    .raw
                    .fields
                    .push((finished.tag.clone(), RawValue::Node(finished))),
                None => return finished,
            }
        }
        RawNode::new(root.tag.clone())
    }

    /// Text of the first field named `name`
    pub fn text(&self, name: &str) -> Option<&str> {
        self.fields.iter().find_map(|(field, value)| match value {
            RawValue::Text(text) if field == name => Some(text.as_str()),
            _ => None,
        })
    }
}

impl RawValue {
    /// Short human-readable rendering used in validation errors
    pub fn describe(&self) -> String {
        match self {
            RawValue::Text(text) => text.clone(),
            RawValue::Node(node) => format!("<{}> with {} fields", node.tag, node.fields.len()),
        }
    }
}

impl Drop for RawNode {
    fn drop(&mut self) {
        let mut pending = std::mem::take(&mut self.fields);
        while let Some((_, value)) = pending.pop() {
            if let RawValue::Node(mut node) = value {
                pending.append(&mut node.fields);
            }
        }
    }
}

impl From<&GenericTreeNode> for RawNode {
    fn from(node: &GenericTreeNode) -> Self {
        RawNode::from_tree(node)
    }
}
