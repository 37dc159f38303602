// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::request::QueryParams;

use super::{
    ExpandTree,
    bracket::parse_bracket_select,
    flat::{parse_expand_param, parse_fields_param},
    node::node_paths,
};

/// What a request asks for: which fields to keep (`None` keeps everything) and which relations
/// to expand.
///
/// Every expanded path is reachable through `fields`: if the container of an expanded relation
/// is restricted, the relation itself is part of `fields` as well, so projection never drops an
/// expansion that was asked for.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SelectionSpec {
    pub fields: Option<Vec<String>>,
    pub expand: ExpandTree,
}

impl SelectionSpec {
    /// Build from the `select` parameter if present (ignoring `fields` and `expand` altogether),
    /// or else from the `fields` and `expand` parameters.
    ///
    /// A `select` that yields nothing usable selects everything.
    pub fn from_query(params: &QueryParams) -> Self {
        if let Some(select) = params.get("select") {
            return match parse_bracket_select(select) {
                Some(selection) => Self {
                    fields: Some(selection.fields),
                    expand: selection.expand,
                },
                None => Self::default(),
            };
        }

        let fields = params
            .get("fields")
            .map(parse_fields_param)
            .filter(|fields| !fields.is_empty());
        let expand = params.get("expand").map(parse_expand_param).unwrap_or_default();

        Self::new(fields, expand)
    }

    pub fn new(fields: Option<Vec<String>>, expand: ExpandTree) -> Self {
        let mut spec = Self { fields, expand };
        spec.include_expanded_paths();
        spec
    }

    fn include_expanded_paths(&mut self) {
        let Some(fields) = &mut self.fields else {
            return;
        };

        // Parents come before their children, so by the time a nested path is considered, its
        // parent is either present or kept in full through an ancestor
        for path in node_paths(&self.expand) {
            if !is_covered(fields, &path) {
                fields.push(path);
            }
        }
    }
}

/// Is `path` kept by projecting against `fields`? That is the case if `path` is listed, or an
/// ancestor of it is listed (which keeps it in full), or a descendant of it is listed (which
/// keeps it restricted).
fn is_covered(fields: &[String], path: &str) -> bool {
    fields.iter().any(|field| {
        field == path
            || path
                .strip_prefix(field.as_str())
                .is_some_and(|rest| rest.starts_with('.'))
            || field
                .strip_prefix(path)
                .is_some_and(|rest| rest.starts_with('.'))
    })
}
