#![forbid(unsafe_code)]

use super::error::TreeError;
use super::node::SimplifiedNode;
use super::serialize::{SerializedNode, serialize};
use crate::ids::CategoryId;
use crate::model::Category;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

pub const TREE_ENCODING_VERSION: u32 = 1;

/// Arena of simplified nodes built from one consistent read of the store.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    nodes: Vec<SimplifiedNode>,
    slots: BTreeMap<CategoryId, usize>,
    roots: Vec<CategoryId>,
    orphans: Vec<CategoryId>,
}

#[derive(Serialize)]
struct EncodedTreeRef<'a> {
    version: u32,
    nodes: Vec<&'a SimplifiedNode>,
}

#[derive(Deserialize)]
struct EncodedTree {
    version: u32,
    nodes: Vec<SimplifiedNode>,
}

impl TreeSnapshot {
    /// Walks `categories` once. A node is materialized the first time it is
    /// referenced, either as itself or as someone's parent, and never
    /// replaced afterwards. Children keep the order of `categories`.
    pub fn build(categories: &[Category]) -> Self {
        let rows: HashMap<CategoryId, &Category> =
            categories.iter().map(|category| (category.id, category)).collect();

        let mut snapshot = Self::default();
        for category in categories {
            let slot = snapshot.materialize(category);
            if category.parent_id.get() <= 0 {
                continue;
            }
            let Some(parent_row) = rows.get(&category.parent_id) else {
                continue;
            };
            let parent_slot = snapshot.materialize(parent_row);
            snapshot.nodes[parent_slot].children.push(category.id);
            snapshot.nodes[slot].parent = Some(category.parent_id);
        }

        snapshot.detach_unreachable();
        snapshot.index_roots();
        snapshot
    }

    pub fn encode(&self) -> Result<Vec<u8>, serde_json::Error> {
        let encoded = EncodedTreeRef {
            version: TREE_ENCODING_VERSION,
            nodes: self.slots.values().map(|&slot| &self.nodes[slot]).collect(),
        };
        serde_json::to_vec(&encoded)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, TreeError> {
        let encoded: EncodedTree = serde_json::from_slice(bytes)?;
        if encoded.version != TREE_ENCODING_VERSION {
            return Err(TreeError::UnsupportedVersion(encoded.version));
        }

        let mut snapshot = Self::default();
        for node in encoded.nodes {
            let id = node.id;
            if snapshot.slots.insert(id, snapshot.nodes.len()).is_some() {
                return Err(TreeError::BrokenLink(id));
            }
            snapshot.nodes.push(node);
        }
        snapshot.validate_links()?;
        snapshot.index_roots();
        Ok(snapshot)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: CategoryId) -> bool {
        self.slots.contains_key(&id)
    }

    pub fn get(&self, id: CategoryId) -> Option<NodeRef<'_>> {
        let slot = *self.slots.get(&id)?;
        Some(NodeRef {
            snapshot: self,
            node: &self.nodes[slot],
        })
    }

    pub fn node(&self, id: CategoryId) -> Result<NodeRef<'_>, TreeError> {
        self.get(id).ok_or(TreeError::NotFound(id))
    }

    /// Nodes without a parent link, ordered by id.
    pub fn top_level(&self) -> Vec<NodeRef<'_>> {
        self.roots.iter().filter_map(|id| self.get(*id)).collect()
    }

    pub fn serialize_subtree(&self, id: CategoryId) -> Result<SerializedNode, TreeError> {
        Ok(self.node(id)?.serialize())
    }

    pub fn serialize_top_level(&self) -> Vec<SerializedNode> {
        self.top_level().into_iter().map(serialize).collect()
    }

    /// Nodes whose stored `parent_id` could not be linked (missing parent or
    /// a parent cycle); they are served as top-level nodes.
    pub fn orphans(&self) -> &[CategoryId] {
        &self.orphans
    }

    /// Every node ordered by id.
    pub fn nodes(&self) -> impl Iterator<Item = NodeRef<'_>> + '_ {
        self.slots.values().map(move |&slot| NodeRef {
            snapshot: self,
            node: &self.nodes[slot],
        })
    }

    fn materialize(&mut self, category: &Category) -> usize {
        if let Some(slot) = self.slots.get(&category.id) {
            return *slot;
        }
        let slot = self.nodes.len();
        self.nodes.push(SimplifiedNode::from_category(category));
        self.slots.insert(category.id, slot);
        slot
    }

    fn mark_reachable(&self, start: usize, reachable: &mut [bool]) {
        let mut stack = vec![start];
        while let Some(slot) = stack.pop() {
            if reachable[slot] {
                continue;
            }
            reachable[slot] = true;
            for child in &self.nodes[slot].children {
                if let Some(child_slot) = self.slots.get(child) {
                    stack.push(*child_slot);
                }
            }
        }
    }

    fn reachable_slots(&self) -> Vec<bool> {
        let mut reachable = vec![false; self.nodes.len()];
        for (slot, node) in self.nodes.iter().enumerate() {
            if node.parent.is_none() {
                self.mark_reachable(slot, &mut reachable);
            }
        }
        reachable
    }

    // Breaks parent cycles left by corrupt rows: the lowest unreachable id of
    // each cycle is cut from its parent and becomes top-level.
    fn detach_unreachable(&mut self) {
        let mut reachable = self.reachable_slots();
        let ordered: Vec<usize> = self.slots.values().copied().collect();
        for slot in ordered {
            if reachable[slot] {
                continue;
            }
            let id = self.nodes[slot].id;
            if let Some(parent) = self.nodes[slot].parent.take()
                && let Some(&parent_slot) = self.slots.get(&parent)
            {
                self.nodes[parent_slot].children.retain(|child| *child != id);
            }
            self.mark_reachable(slot, &mut reachable);
        }
    }

    fn validate_links(&self) -> Result<(), TreeError> {
        for node in &self.nodes {
            if let Some(parent) = node.parent {
                let linked = self
                    .get(parent)
                    .is_some_and(|parent| parent.node.children.contains(&node.id));
                if !linked {
                    return Err(TreeError::BrokenLink(node.id));
                }
            }
            for child in &node.children {
                let linked = self
                    .get(*child)
                    .is_some_and(|child| child.node.parent == Some(node.id));
                if !linked {
                    return Err(TreeError::BrokenLink(node.id));
                }
            }
        }

        let reachable = self.reachable_slots();
        if let Some(slot) = reachable.iter().position(|seen| !seen) {
            return Err(TreeError::BrokenLink(self.nodes[slot].id));
        }
        Ok(())
    }

    fn index_roots(&mut self) {
        self.roots.clear();
        self.orphans.clear();
        for &slot in self.slots.values() {
            let node = &self.nodes[slot];
            if node.parent.is_some() {
                continue;
            }
            self.roots.push(node.id);
            if node.parent_id.get() > 0 {
                self.orphans.push(node.id);
            }
        }
    }
}

/// Borrowed view of one node inside a [`TreeSnapshot`].
#[derive(Clone, Copy, Debug)]
pub struct NodeRef<'a> {
    snapshot: &'a TreeSnapshot,
    node: &'a SimplifiedNode,
}

impl<'a> NodeRef<'a> {
    pub fn id(&self) -> CategoryId {
        self.node.id
    }

    pub fn name(&self) -> &'a str {
        &self.node.name
    }

    pub fn node(&self) -> &'a SimplifiedNode {
        self.node
    }

    pub fn is_top_level(&self) -> bool {
        self.node.parent.is_none()
    }

    pub fn parent(&self) -> Option<NodeRef<'a>> {
        self.snapshot.get(self.node.parent?)
    }

    pub fn children(&self) -> impl Iterator<Item = NodeRef<'a>> + 'a {
        let snapshot = self.snapshot;
        self.node
            .children
            .iter()
            .filter_map(move |child| snapshot.get(*child))
    }

    pub fn child_count(&self) -> usize {
        self.node.children.len()
    }

    /// Parent chain from the direct parent up to the top-level node.
    pub fn ancestor_ids(&self) -> Vec<CategoryId> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(node) = current {
            out.push(node.id());
            current = node.parent();
        }
        out
    }

    pub fn serialize(&self) -> SerializedNode {
        serialize(*self)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        self.serialize().to_json()
    }
}
