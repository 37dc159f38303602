// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use super::{ExpressionBuilder, SQLBuilder, SQLParam, column::ColumnRef};

/// A filter supplied by the caller (typically, the permission middleware) as SQL text written
/// against its own `$1..$n` placeholders.
#[derive(Debug, Clone)]
pub struct WhereClause {
    pub sql: String,
    pub params: Vec<Arc<dyn SQLParam>>,
}

impl WhereClause {
    pub fn new(sql: impl Into<String>, params: Vec<Arc<dyn SQLParam>>) -> Self {
        Self {
            sql: sql.into(),
            params,
        }
    }
}

#[derive(Debug, Clone)]
pub enum Predicate {
    True,
    /// `<left> = <right>`, used for join conditions
    Eq(ColumnRef, ColumnRef),
    /// `<column>::text = $n`
    TextEq(ColumnRef, String),
    /// `<column>::text = ANY($n)`. Comparing as text lets one batched query handle integer as well
    /// as uuid keys.
    TextIn(ColumnRef, Vec<String>),
    Fragment(WhereClause),
    And(Box<Predicate>, Box<Predicate>),
}

impl Predicate {
    /// Conjunction of two predicates that avoids the inelegant (but correct) `TRUE AND ...`.
    pub fn and(lhs: Predicate, rhs: Predicate) -> Predicate {
        match (lhs, rhs) {
            (Predicate::True, rhs) => rhs,
            (lhs, Predicate::True) => lhs,
            (lhs, rhs) => Predicate::And(Box::new(lhs), Box::new(rhs)),
        }
    }

    pub fn is_true(&self) -> bool {
        matches!(self, Predicate::True)
    }
}

impl ExpressionBuilder for Predicate {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            Predicate::True => builder.push_str("TRUE"),
            Predicate::Eq(lhs, rhs) => {
                lhs.build(builder);
                builder.push_str(" = ");
                rhs.build(builder);
            }
            Predicate::TextEq(column, value) => {
                column.build(builder);
                builder.push_str("::text = ");
                builder.push_param(Arc::new(value.clone()));
            }
            Predicate::TextIn(column, values) => {
                column.build(builder);
                builder.push_str("::text = ANY(");
                builder.push_param(Arc::new(values.clone()));
                builder.push(')');
            }
            Predicate::Fragment(clause) => {
                builder.push('(');
                builder.push_fragment(&clause.sql, &clause.params);
                builder.push(')');
            }
            Predicate::And(lhs, rhs) => {
                lhs.build(builder);
                builder.push_str(" AND ");
                rhs.build(builder);
            }
        }
    }
}
