use super::tree::{GenericTreeNode, NodeContent};
use indexmap::IndexMap;
use serde::Serialize;

/// Children of one element grouped by tag, in order of first appearance.
///
/// Within a tag the values keep document order, so "all HOP under HOPS" is
/// `map["HOPS"][0].get_all("HOP")`.
pub type NestedMap = IndexMap<String, Vec<NestedValue>>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum NestedValue {
    Text(String),
    Map(NestedMap),
}

impl NestedValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            NestedValue::Text(text) => Some(text),
            NestedValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&NestedMap> {
        match self {
            NestedValue::Map(map) => Some(map),
            NestedValue::Text(_) => None,
        }
    }

    /// All values grouped under `tag`; empty for text values and absent tags
    pub fn get_all(&self, tag: &str) -> &[NestedValue] {
        self.as_map()
            .and_then(|map| map.get(tag))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Text of the first value grouped under `tag`
    pub fn text_of(&self, tag: &str) -> Option<&str> {
        self.get_all(tag).first().and_then(NestedValue::as_text)
    }
}

impl Drop for NestedValue {
    fn drop(&mut self) {
        let NestedValue::Map(map) = self else {
            return;
        };
        let mut pending: Vec<NestedValue> = std::mem::take(map).into_values().flatten().collect();
        while let Some(mut value) = pending.pop() {
            if let NestedValue::Map(map) = &mut value {
                pending.extend(std::mem::take(map).into_values().flatten());
            }
        }
    }
}

struct Frame<'a> {
    node: &'a GenericTreeNode,
    next_child: usize,
    map: NestedMap,
}

impl<'a> Frame<'a> {
    fn new(node: &'a GenericTreeNode) -> Self {
        Self {
            node,
            next_child: 0,
            map: NestedMap::new(),
        }
    }
}

/// Converts a parsed tree into the grouped view, keyed by the root tag
pub fn to_nested_map(root: &GenericTreeNode) -> NestedMap {
    let mut stack = vec![Frame::new(root)];
    let mut result = NestedMap::new();

    while let Some(frame) = stack.last_mut() {
        let node = frame.node;
        if let Some(child) = node.children().get(frame.next_child) {
            frame.next_child += 1;
            match &child.content {
                NodeContent::Text(text) => {
                    frame
                        .map
                        .entry(child.tag.clone())
                        .or_default()
                        .push(NestedValue::Text(text.clone()));
                }
                NodeContent::Children(_) => stack.push(Frame::new(child)),
            }
            continue;
        }

        let Some(done) = stack.pop() else { break };
        let value = match &done.node.content {
            NodeContent::Text(text) => NestedValue::Text(text.clone()),
            NodeContent::Children(_) => NestedValue::Map(done.map),
        };
        let target = match stack.last_mut() {
            Some(parent) => &mut parent.map,
            None => &mut result,
        };
        target.entry(done.node.tag.clone()).or_default().push(value);
    }

    result
}
