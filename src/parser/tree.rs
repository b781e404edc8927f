use serde::ser::{Serialize, SerializeTuple, Serializer};

/// Content of a parsed element: either character data or child elements.
///
/// An element that holds at least one child element is always `Children`;
/// any character data interleaved with those children is dropped.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
#[serde(untagged)]
pub enum NodeContent {
    Text(String),
    Children(Vec<GenericTreeNode>),
}

/// One element of a parsed document, with no schema applied.
///
/// Serializes as a `[tag, text | [children...]]` pair so the raw view mirrors
/// the document structure exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenericTreeNode {
    pub tag: String,
    pub content: NodeContent,
}

impl GenericTreeNode {
    pub fn text(tag: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            content: NodeContent::Text(text.into()),
        }
    }

    pub fn with_children(tag: impl Into<String>, children: Vec<GenericTreeNode>) -> Self {
        Self {
            tag: tag.into(),
            content: NodeContent::Children(children),
        }
    }

    /// Returns the character data of a leaf element
    pub fn as_text(&self) -> Option<&str> {
        match &self.content {
            NodeContent::Text(text) => Some(text),
            NodeContent::Children(_) => None,
        }
    }

    /// Returns the child elements; leaves have none
    pub fn children(&self) -> &[GenericTreeNode] {
        match &self.content {
            NodeContent::Children(children) => children,
            NodeContent::Text(_) => &[],
        }
    }

    pub fn has_children(&self) -> bool {
        matches!(self.content, NodeContent::Children(_))
    }

    /// First direct child with the given tag
    pub fn child(&self, tag: &str) -> Option<&GenericTreeNode> {
        self.children().iter().find(|child| child.tag == tag)
    }

    /// All direct children with the given tag, in document order
    pub fn children_named<'a>(
        &'a self,
        tag: &'a str,
    ) -> impl Iterator<Item = &'a GenericTreeNode> + 'a {
        self.children().iter().filter(move |child| child.tag == tag)
    }

    /// Number of elements in this subtree, including this one
    pub fn element_count(&self) -> usize {
        let mut count = 0;
        let mut pending = vec![self];
        while let Some(node) = pending.pop() {
            count += 1;
            pending.extend(node.children());
        }
        count
    }
}

impl Drop for GenericTreeNode {
    // Frees deep subtrees from a heap stack; the generated drop glue recurses
    fn drop(&mut self) {
        let NodeContent::Children(children) = &mut self.content else {
            return;
        };
        let mut pending = std::mem::take(children);
        while let Some(mut node) = pending.pop() {
            if let NodeContent::Children(grandchildren) = &mut node.content {
                pending.append(grandchildren);
            }
        }
    }
}

impl Serialize for GenericTreeNode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut tuple = serializer.serialize_tuple(2)?;
        tuple.serialize_element(&self.tag)?;
        tuple.serialize_element(&self.content)?;
        tuple.end()
    }
}
