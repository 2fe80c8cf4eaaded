#![forbid(unsafe_code)]

use super::snapshot::NodeRef;
use crate::ids::CategoryId;
use serde::{Deserialize, Serialize};

/// Nested, owned form of a subtree: `{id, parent_id, name, children}`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializedNode {
    pub id: CategoryId,
    pub parent_id: Option<CategoryId>,
    pub name: String,
    pub children: Vec<SerializedNode>,
}

impl SerializedNode {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Number of nodes in this subtree, the node itself included.
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children.iter());
        }
        count
    }

    /// Pre-order search.
    pub fn find(&self, id: CategoryId) -> Option<&SerializedNode> {
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            if node.id == id {
                return Some(node);
            }
            stack.extend(node.children.iter().rev());
        }
        None
    }
}

struct Frame<'a> {
    node: NodeRef<'a>,
    // Children still to visit, last one first.
    pending: Vec<NodeRef<'a>>,
    done: Vec<SerializedNode>,
}

impl<'a> Frame<'a> {
    fn new(node: NodeRef<'a>) -> Self {
        let mut pending: Vec<NodeRef<'a>> = node.children().collect();
        pending.reverse();
        Self {
            node,
            done: Vec::with_capacity(pending.len()),
            pending,
        }
    }

    fn finish(self) -> SerializedNode {
        SerializedNode {
            id: self.node.id(),
            parent_id: self.node.parent().map(|parent| parent.id()),
            name: self.node.name().to_string(),
            children: self.done,
        }
    }
}

/// Depth-first with an explicit stack; tree height never grows the call stack.
pub fn serialize(node: NodeRef<'_>) -> SerializedNode {
    let mut path: Vec<Frame<'_>> = Vec::new();
    let mut current = Frame::new(node);
    loop {
        if let Some(child) = current.pending.pop() {
            path.push(std::mem::replace(&mut current, Frame::new(child)));
            continue;
        }
        let finished = current.finish();
        match path.pop() {
            Some(mut parent) => {
                parent.done.push(finished);
                current = parent;
            }
            None => return finished,
        }
    }
}
