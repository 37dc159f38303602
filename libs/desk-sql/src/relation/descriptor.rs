// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::sql::identifier::Identifier;

use super::registry::RegistryError;

/// A foreign key column on some table, pointing to the `id` of `target_table`. The enriched row
/// carries the referenced row under `relation_key`.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationDescriptor {
    pub source_column: Identifier,
    pub target_table: Identifier,
    pub relation_key: Identifier,
    /// Attributes a client-facing listing would show for the relation by default. Projection
    /// doesn't use them: a requested relation is kept whole within `allowed_attributes`.
    pub default_attributes: Option<Vec<String>>,
    /// Attributes of the target row that projected rows may expose
    pub allowed_attributes: Option<Vec<String>>,
}

/// A many-to-many relation: rows of `source_table` are associated with rows of `target_table`
/// through the assignment table `link_table`.
///
/// For example, `users.roles` through `user_roles(user_id, role_id)`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinkDescriptor {
    pub source_table: Identifier,
    pub relation_key: Identifier,
    pub link_table: Identifier,
    /// Column of `link_table` referencing the source row's `id`
    pub link_source_column: Identifier,
    /// Column of `link_table` referencing the target row's `id`
    pub link_target_column: Identifier,
    pub target_table: Identifier,
    pub allowed_attributes: Option<Vec<String>>,
}

/// Declaration of a [`RelationDescriptor`] for [`RelationRegistryBuilder`](super::RelationRegistryBuilder).
/// Names are validated when the registry is built.
#[derive(Debug, Clone)]
pub struct RelationDecl {
    source_column: String,
    target_table: String,
    relation_key: String,
    default_attributes: Option<Vec<String>>,
    allowed_attributes: Option<Vec<String>>,
}

impl RelationDecl {
    pub fn new(source_column: &str, target_table: &str, relation_key: &str) -> Self {
        Self {
            source_column: source_column.to_string(),
            target_table: target_table.to_string(),
            relation_key: relation_key.to_string(),
            default_attributes: None,
            allowed_attributes: None,
        }
    }

    pub fn defaults(mut self, attributes: &[&str]) -> Self {
        self.default_attributes = Some(to_strings(attributes));
        self
    }

    pub fn allowed(mut self, attributes: &[&str]) -> Self {
        self.allowed_attributes = Some(to_strings(attributes));
        self
    }

    pub(crate) fn validate(self) -> Result<RelationDescriptor, RegistryError> {
        Ok(RelationDescriptor {
            source_column: identifier(self.source_column)?,
            target_table: identifier(self.target_table)?,
            relation_key: identifier(self.relation_key)?,
            default_attributes: self.default_attributes,
            allowed_attributes: self.allowed_attributes,
        })
    }
}

/// Declaration of a [`LinkDescriptor`] for [`RelationRegistryBuilder`](super::RelationRegistryBuilder).
#[derive(Debug, Clone)]
pub struct LinkDecl {
    source_table: String,
    relation_key: String,
    target_table: String,
    link_table: String,
    link_source_column: String,
    link_target_column: String,
    allowed_attributes: Option<Vec<String>>,
}

impl LinkDecl {
    pub fn new(source_table: &str, relation_key: &str, target_table: &str) -> Self {
        Self {
            source_table: source_table.to_string(),
            relation_key: relation_key.to_string(),
            target_table: target_table.to_string(),
            link_table: String::new(),
            link_source_column: String::new(),
            link_target_column: String::new(),
            allowed_attributes: None,
        }
    }

    /// The assignment table and its columns referencing the source and target rows
    pub fn via(mut self, link_table: &str, source_column: &str, target_column: &str) -> Self {
        self.link_table = link_table.to_string();
        self.link_source_column = source_column.to_string();
        self.link_target_column = target_column.to_string();
        self
    }

    pub fn allowed(mut self, attributes: &[&str]) -> Self {
        self.allowed_attributes = Some(to_strings(attributes));
        self
    }

    pub(crate) fn validate(self) -> Result<LinkDescriptor, RegistryError> {
        Ok(LinkDescriptor {
            source_table: identifier(self.source_table)?,
            relation_key: identifier(self.relation_key)?,
            link_table: identifier(self.link_table)?,
            link_source_column: identifier(self.link_source_column)?,
            link_target_column: identifier(self.link_target_column)?,
            target_table: identifier(self.target_table)?,
            allowed_attributes: self.allowed_attributes,
        })
    }
}

pub(super) fn identifier(name: String) -> Result<Identifier, RegistryError> {
    Identifier::new(name.clone()).map_err(|_| RegistryError::InvalidIdentifier(name))
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}
