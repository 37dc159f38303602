// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SQLBuilder, predicate::Predicate, table::TableRef};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinKind {
    Left,
    Inner,
}

/// A join of the table in the FROM clause (or of a previously joined table) with another table.
#[derive(Debug, Clone)]
pub struct Join {
    pub kind: JoinKind,
    /// The right table in the join such as `customers`.
    pub table: TableRef,
    /// The join predicate such as `orders.customer_id = customers.id`.
    pub on: Predicate,
}

impl Join {
    pub fn left(table: TableRef, on: Predicate) -> Self {
        Self {
            kind: JoinKind::Left,
            table,
            on,
        }
    }

    pub fn inner(table: TableRef, on: Predicate) -> Self {
        Self {
            kind: JoinKind::Inner,
            table,
            on,
        }
    }
}

impl ExpressionBuilder for Join {
    /// Build expression of the form `LEFT JOIN <right> ON <predicate>`.
    fn build(&self, builder: &mut SQLBuilder) {
        match self.kind {
            JoinKind::Left => builder.push_str("LEFT JOIN "),
            JoinKind::Inner => builder.push_str("INNER JOIN "),
        }
        self.table.build(builder);
        builder.push_str(" ON ");
        self.on.build(builder);
    }
}
