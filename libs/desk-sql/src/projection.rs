// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use indexmap::IndexMap;
use serde_json::Value;

use crate::datastore::JsonObject;

/// Prunes enriched rows to the requested fields.
///
/// A requested path keeps its whole value, unless deeper paths under it are requested as well,
/// in which case only those are kept. Arrays are projected element by element.
#[derive(Debug, Clone)]
pub struct Projection {
    root: FieldTree,
}

/// The attributes a relation may expose, wherever it shows up in projected rows.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeCap {
    /// Dotted path of the relation key from the row, such as `owner.roles`
    pub path: String,
    /// `None` if the relation exposes every attribute
    pub allowed: Option<Vec<String>>,
    /// Keys of relations expanded under this one, kept along with `allowed`
    pub nested: Vec<String>,
}

#[derive(Debug, Clone, Default)]
struct FieldTree {
    /// Keep attributes without a subtree as they are
    keep_all: bool,
    children: IndexMap<String, FieldTree>,
}

impl Projection {
    pub fn new(fields: &[String]) -> Self {
        let mut root = FieldTree::default();

        for field in fields {
            let mut current = &mut root;
            for segment in field.split('.') {
                current.keep_all = false;
                current = current
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(FieldTree::whole);
            }
        }

        Self { root }
    }

    /// Narrow every requested relation to its allowed attributes. Caps must be ordered parents
    /// first.
    ///
    /// A relation requested whole keeps its allowed attributes and nested relations; one
    /// requested with sub-fields keeps only the sub-fields that are allowed.
    pub fn with_attribute_caps(mut self, caps: &[AttributeCap]) -> Self {
        for cap in caps {
            let Some(allowed) = &cap.allowed else {
                continue;
            };
            let Some(tree) = self.root.requested_mut(&cap.path) else {
                continue;
            };

            let permitted = |name: &str| allowed.iter().chain(&cap.nested).any(|p| p == name);

            if tree.keep_all {
                for name in allowed.iter().chain(&cap.nested) {
                    tree.children
                        .entry(name.clone())
                        .or_insert_with(FieldTree::whole);
                }
                tree.keep_all = false;
            }
            tree.children.retain(|name, _| permitted(name));
        }

        self
    }

    pub fn apply(&self, row: JsonObject) -> JsonObject {
        self.root.project_object(row)
    }
}

impl FieldTree {
    fn whole() -> Self {
        Self {
            keep_all: true,
            children: IndexMap::new(),
        }
    }

    /// The subtree at `path` if the path is part of the projection. Subtrees under attributes
    /// kept whole are created on the way.
    fn requested_mut(&mut self, path: &str) -> Option<&mut FieldTree> {
        let mut current = self;

        for segment in path.split('.') {
            current = if current.keep_all {
                current
                    .children
                    .entry(segment.to_string())
                    .or_insert_with(FieldTree::whole)
            } else {
                current.children.get_mut(segment)?
            };
        }

        Some(current)
    }

    fn project_value(&self, value: Value) -> Value {
        if self.keep_all && self.children.is_empty() {
            return value;
        }

        match value {
            Value::Object(object) => Value::Object(self.project_object(object)),
            Value::Array(elements) => Value::Array(
                elements
                    .into_iter()
                    .map(|element| self.project_value(element))
                    .collect(),
            ),
            // Null (relation without a match) or a scalar: nothing to narrow
            other => other,
        }
    }

    fn project_object(&self, object: JsonObject) -> JsonObject {
        object
            .into_iter()
            .filter_map(|(key, value)| match self.children.get(&key) {
                Some(subtree) => {
                    let value = subtree.project_value(value);
                    Some((key, value))
                }
                None if self.keep_all => Some((key, value)),
                None => None,
            })
            .collect()
    }
}

/// Project `row` to `fields`, or return it unchanged if `fields` is `None`.
pub fn project(row: JsonObject, fields: Option<&[String]>) -> JsonObject {
    match fields {
        Some(fields) => Projection::new(fields).apply(row),
        None => row,
    }
}
