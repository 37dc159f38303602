// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.
use super::{ExpressionBuilder, SQLBuilder, identifier::Identifier};

/// A table in a FROM or JOIN clause, optionally aliased.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRef {
    pub name: Identifier,
    pub alias: Option<Identifier>,
}

impl TableRef {
    pub fn new(name: Identifier) -> Self {
        Self { name, alias: None }
    }

    pub fn aliased(name: Identifier, alias: Identifier) -> Self {
        Self {
            name,
            alias: Some(alias),
        }
    }

    /// The name other parts of the statement use to refer to this table.
    pub fn reference(&self) -> &Identifier {
        self.alias.as_ref().unwrap_or(&self.name)
    }
}

impl ExpressionBuilder for TableRef {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_identifier(&self.name);
        if let Some(alias) = &self.alias {
            builder.push_str(" AS ");
            builder.push_identifier(alias);
        }
    }
}
