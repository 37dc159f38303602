// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::node::{ExpandTree, insert_path};

/// Parse `expand=owner.roles.permissions,status` into a tree of relation keys.
pub fn parse_expand_param(raw: &str) -> ExpandTree {
    let mut tree = ExpandTree::new();

    for token in raw.split(',') {
        let segments: Vec<&str> = token
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect();

        if !segments.is_empty() {
            insert_path(&mut tree, segments);
        }
    }

    tree
}

/// Parse `fields=id,title,owner.name` into dot-paths.
pub fn parse_fields_param(raw: &str) -> Vec<String> {
    let mut fields: Vec<String> = vec![];

    for token in raw.split(',') {
        let path = token
            .split('.')
            .map(str::trim)
            .filter(|segment| !segment.is_empty())
            .collect::<Vec<_>>()
            .join(".");

        if !path.is_empty() && !fields.contains(&path) {
            fields.push(path);
        }
    }

    fields
}
