// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{any::Any, fmt::Debug, sync::Arc};

use tokio_postgres::types::ToSql;

#[macro_use]
#[cfg(test)]
mod test_util;

pub(crate) mod column;
pub(crate) mod identifier;
pub(crate) mod join;
pub(crate) mod limit;
pub(crate) mod offset;
pub(crate) mod order;
pub(crate) mod predicate;
pub(crate) mod select;
pub(crate) mod sql_builder;
pub(crate) mod table;

pub use sql_builder::SQLBuilder;

/// A parameter that can be bound to a placeholder (`$1`, `$2`, ...) of a statement.
pub trait SQLParam: ToSql + Sync + Send + Debug {
    fn as_any(&self) -> &dyn Any;
    fn eq(&self, other: &dyn SQLParam) -> bool;

    fn as_pg(&self) -> &(dyn ToSql + Sync);
}

impl<T: ToSql + Sync + Send + Debug + Any + PartialEq> SQLParam for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn eq(&self, other: &dyn SQLParam) -> bool {
        if let Some(other) = other.as_any().downcast_ref::<T>() {
            self == other
        } else {
            false
        }
    }

    fn as_pg(&self) -> &(dyn ToSql + Sync) {
        self
    }
}

impl PartialEq for dyn SQLParam {
    fn eq(&self, other: &Self) -> bool {
        SQLParam::eq(self, other)
    }
}

/// A fully rendered statement along with the parameters for its placeholders.
#[derive(Debug, Clone)]
pub struct SQLStatement {
    pub sql: String,
    pub params: Vec<Arc<dyn SQLParam>>,
}

impl SQLStatement {
    pub fn params(&self) -> Vec<&(dyn ToSql + Sync)> {
        self.params.iter().map(|p| p.as_pg()).collect()
    }
}

pub trait ExpressionBuilder {
    /// Build the SQL expression into the given builder
    fn build(&self, builder: &mut SQLBuilder);

    /// Build a statement from this expression. Typically, to be used only for the top-level expression.
    fn to_sql(&self) -> SQLStatement {
        let mut builder = SQLBuilder::new();
        self.build(&mut builder);
        builder.into_sql()
    }
}

impl<T: ExpressionBuilder> ExpressionBuilder for Box<T> {
    fn build(&self, builder: &mut SQLBuilder) {
        self.as_ref().build(builder)
    }
}
