// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;

/// Nested relation keys to expand, in request order.
pub type ExpandTree = IndexMap<String, SelectionNode>;

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SelectionNode {
    #[default]
    Leaf,
    Branch(ExpandTree),
}

impl SelectionNode {
    pub fn children(&self) -> Option<&ExpandTree> {
        match self {
            SelectionNode::Leaf => None,
            SelectionNode::Branch(children) => Some(children),
        }
    }

    /// Merge `other` into this node. A leaf merged with a branch becomes the branch.
    pub(super) fn merge(&mut self, other: SelectionNode) {
        match other {
            SelectionNode::Leaf => {}
            SelectionNode::Branch(other_children) => match self {
                SelectionNode::Leaf => *self = SelectionNode::Branch(other_children),
                SelectionNode::Branch(children) => merge_trees(children, other_children),
            },
        }
    }
}

pub(super) fn merge_trees(tree: &mut ExpandTree, other: ExpandTree) {
    for (name, node) in other {
        tree.entry(name).or_default().merge(node);
    }
}

/// Insert the path formed by `segments`, turning leaves along the way into branches.
pub(super) fn insert_path<'a>(tree: &mut ExpandTree, segments: impl IntoIterator<Item = &'a str>) {
    let mut current = &mut *tree;

    for segment in segments {
        let node = current.entry(segment.to_string()).or_default();
        if let SelectionNode::Leaf = node {
            *node = SelectionNode::Branch(ExpandTree::new());
        }
        let SelectionNode::Branch(children) = node else {
            break;
        };
        current = children;
    }

    normalize(tree);
}

/// Turn childless branches into leaves.
fn normalize(tree: &mut ExpandTree) {
    for node in tree.values_mut() {
        if let SelectionNode::Branch(children) = node {
            if children.is_empty() {
                *node = SelectionNode::Leaf;
            } else {
                normalize(children);
            }
        }
    }
}

/// Dot-paths of every node in `tree`, parents before their children.
pub(crate) fn node_paths(tree: &ExpandTree) -> Vec<String> {
    fn collect(tree: &ExpandTree, prefix: &str, paths: &mut Vec<String>) {
        for (name, node) in tree {
            let path = join_path(prefix, name);
            paths.push(path.clone());
            if let Some(children) = node.children() {
                collect(children, &path, paths);
            }
        }
    }

    let mut paths = vec![];
    collect(tree, "", &mut paths);
    paths
}

pub(super) fn join_path(prefix: &str, name: &str) -> String {
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}.{name}")
    }
}
