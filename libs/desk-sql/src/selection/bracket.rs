// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::node::{ExpandTree, SelectionNode, join_path};

/// The result of parsing a bracketed selection such as `orders[id,total,customer[name]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct BracketSelection {
    /// Every leaf path, followed by the path of every branch (so that the branch's container
    /// survives projection)
    pub fields: Vec<String>,
    /// The branches, mirrored
    pub expand: ExpandTree,
}

/// Parse a bracketed selection.
///
/// ```text
/// select := ident ('[' list ']')?
/// list   := item (',' item)*
/// item   := ident (('[' | '{') list (']' | '}'))?
/// ```
///
/// The parser is lenient:
/// - `[` and `}` (or `{` and `]`) are accepted as a pair
/// - the `entity[...]` wrapper is optional: `[...]`, `{...}` and a bare `a,b[c]` list are all
///   accepted. A lone identifier is the entity without an item list, so selects nothing.
/// - parsing stops at the end of input, or at the first unexpected character. Whatever was
///   completely scanned up to that point is kept: an identifier ended by the end of input is
///   complete, but an item interrupted by an unexpected character is dropped.
///
/// Returns `None` if nothing usable was scanned.
pub fn parse_bracket_select(raw: &str) -> Option<BracketSelection> {
    let mut parser = Parser::new(raw);
    let items = parser.parse_select();

    if items.is_empty() {
        return None;
    }

    let mut leaves = vec![];
    let mut branches = vec![];
    collect_paths(&items, "", &mut leaves, &mut branches);
    leaves.extend(branches);

    Some(BracketSelection {
        fields: leaves,
        expand: branch_tree(&items),
    })
}

struct Parser {
    chars: Vec<char>,
    pos: usize,
    /// Set on the first unexpected character; every enclosing level stops as well
    halted: bool,
}

impl Parser {
    fn new(raw: &str) -> Self {
        Self {
            chars: raw.chars().collect(),
            pos: 0,
            halted: false,
        }
    }

    fn parse_select(&mut self) -> ExpandTree {
        self.skip_whitespace();

        if self.peek().is_some_and(is_open) {
            self.pos += 1;
            return self.parse_list();
        }

        let start = self.pos;
        if self.parse_ident().is_some() {
            self.skip_whitespace();
            match self.peek() {
                Some(c) if is_open(c) => {
                    self.pos += 1;
                    return self.parse_list();
                }
                // The entity alone, without an item list
                None => return ExpandTree::new(),
                Some(_) => {}
            }
        }

        // No wrapper: the input is the list itself
        self.pos = start;
        self.parse_list()
    }

    /// Parse items up to (and including) the closing character, or to the end of input.
    fn parse_list(&mut self) -> ExpandTree {
        let mut items = ExpandTree::new();

        loop {
            self.skip_whitespace();
            match self.peek() {
                None => return items,
                Some(c) if is_close(c) => {
                    self.pos += 1;
                    return items;
                }
                _ => {}
            }

            if let Some((name, node)) = self.parse_item() {
                items.entry(name).or_default().merge(node);
            }
            if self.halted {
                return items;
            }

            self.skip_whitespace();
            match self.peek() {
                None => return items,
                Some(',') => self.pos += 1,
                Some(c) if is_close(c) => {
                    self.pos += 1;
                    return items;
                }
                Some(_) => {
                    self.halted = true;
                    return items;
                }
            }
        }
    }

    fn parse_item(&mut self) -> Option<(String, SelectionNode)> {
        let Some(name) = self.parse_ident() else {
            // Not even the start of an identifier (an empty item such as `a,,b` included)
            if self.peek() != Some(',') {
                self.halted = true;
            }
            return None;
        };

        self.skip_whitespace();
        match self.peek() {
            Some(c) if is_open(c) => {
                self.pos += 1;
                let children = self.parse_list();
                if children.is_empty() {
                    Some((name, SelectionNode::Leaf))
                } else {
                    Some((name, SelectionNode::Branch(children)))
                }
            }
            None | Some(',') => Some((name, SelectionNode::Leaf)),
            Some(c) if is_close(c) => Some((name, SelectionNode::Leaf)),
            Some(_) => {
                self.halted = true;
                None
            }
        }
    }

    fn parse_ident(&mut self) -> Option<String> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }

        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_open(c: char) -> bool {
    c == '[' || c == '{'
}

fn is_close(c: char) -> bool {
    c == ']' || c == '}'
}

fn collect_paths(
    items: &ExpandTree,
    prefix: &str,
    leaves: &mut Vec<String>,
    branches: &mut Vec<String>,
) {
    for (name, node) in items {
        let path = join_path(prefix, name);
        match node {
            SelectionNode::Leaf => leaves.push(path),
            SelectionNode::Branch(children) => {
                collect_paths(children, &path, leaves, branches);
                branches.push(path);
            }
        }
    }
}

/// The tree of branches only (leaves are plain attributes, not expansions)
fn branch_tree(items: &ExpandTree) -> ExpandTree {
    items
        .iter()
        .filter_map(|(name, node)| {
            node.children().map(|children| {
                let nested = branch_tree(children);
                let node = if nested.is_empty() {
                    SelectionNode::Leaf
                } else {
                    SelectionNode::Branch(nested)
                };
                (name.clone(), node)
            })
        })
        .collect()
}
