// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::{
    database_error::DatabaseError,
    request::{Pagination, QueryParams, SortSpec},
    sql::{identifier::Identifier, predicate::WhereClause},
};

/// An additional computed column, such as a `COUNT(*)` subquery. The expression is trusted SQL
/// supplied by the caller, never built from request input.
#[derive(Debug, Clone)]
pub struct ExtraColumn {
    pub expression: String,
    pub alias: Identifier,
}

impl ExtraColumn {
    pub fn new(expression: impl Into<String>, alias: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            expression: expression.into(),
            alias: Identifier::new(alias)?,
        })
    }
}

/// A request for the rows of `table`.
#[derive(Debug, Clone)]
pub struct ListQuery {
    pub table: Identifier,
    /// Row filter built by the caller (typically, the permission layer)
    pub filter: Option<WhereClause>,
    pub extra_columns: Vec<ExtraColumn>,
    /// Without it, rows come back in the datastore's order
    pub sort: Option<SortSpec>,
    /// Without it, all matching rows are returned
    pub pagination: Option<Pagination>,
    /// The request's query parameters (for selection and sorting)
    pub params: QueryParams,
}

impl ListQuery {
    pub fn new(table: &str) -> Result<Self, DatabaseError> {
        Ok(Self {
            table: Identifier::new(table)?,
            filter: None,
            extra_columns: vec![],
            sort: None,
            pagination: None,
            params: QueryParams::default(),
        })
    }

    pub fn with_filter(mut self, filter: WhereClause) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_extra_column(mut self, column: ExtraColumn) -> Self {
        self.extra_columns.push(column);
        self
    }

    pub fn with_sort(mut self, sort: SortSpec) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }
}

/// A request for the row of `table` with the given `id`.
#[derive(Debug, Clone)]
pub struct DetailQuery {
    pub table: Identifier,
    /// Compared in its textual form, so that integer and uuid keys work alike
    pub id: String,
    pub filter: Option<WhereClause>,
    pub extra_columns: Vec<ExtraColumn>,
    pub params: QueryParams,
}

impl DetailQuery {
    pub fn new(table: &str, id: impl Into<String>) -> Result<Self, DatabaseError> {
        Ok(Self {
            table: Identifier::new(table)?,
            id: id.into(),
            filter: None,
            extra_columns: vec![],
            params: QueryParams::default(),
        })
    }

    pub fn with_filter(mut self, filter: WhereClause) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_extra_column(mut self, column: ExtraColumn) -> Self {
        self.extra_columns.push(column);
        self
    }

    pub fn with_params(mut self, params: QueryParams) -> Self {
        self.params = params;
        self
    }
}
