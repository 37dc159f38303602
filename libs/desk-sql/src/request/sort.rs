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
    sql::{identifier::Identifier, order::Ordering},
};

use super::QueryParams;

/// The sort a request asks for: `sort=<column>`, optionally with `order=asc|desc`, or
/// `sort=-<column>` (descending).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SortRequest {
    pub column: Option<String>,
    pub ordering: Option<Ordering>,
}

impl SortRequest {
    pub fn from_query(params: &QueryParams) -> Self {
        let order = params.get("order").and_then(Ordering::parse);

        match params.get("sort").map(str::trim).filter(|s| !s.is_empty()) {
            Some(sort) => match sort.strip_prefix('-') {
                Some(column) => Self {
                    column: Some(column.to_string()),
                    ordering: Some(Ordering::Desc),
                },
                None => Self {
                    column: Some(sort.to_string()),
                    ordering: order,
                },
            },
            None => Self {
                column: None,
                ordering: order,
            },
        }
    }
}

/// The columns a listing may be sorted by, and the sort to use otherwise.
#[derive(Debug, Clone)]
pub struct SortSpec {
    pub sortable: Vec<Identifier>,
    pub default_column: Identifier,
    pub default_ordering: Ordering,
}

impl SortSpec {
    pub fn new(
        sortable: &[&str],
        default_column: &str,
        default_ordering: Ordering,
    ) -> Result<Self, DatabaseError> {
        Ok(Self {
            sortable: sortable
                .iter()
                .map(|column| Identifier::new(*column))
                .collect::<Result<_, _>>()?,
            default_column: Identifier::new(default_column)?,
            default_ordering,
        })
    }

    /// The allow-listed column matching the requested one, with the requested ordering (or the
    /// default one). `None` if the request names no column or one that may not be sorted on.
    pub fn requested(&self, request: &SortRequest) -> Option<(&Identifier, Ordering)> {
        let column = request.column.as_deref()?;

        self.sortable
            .iter()
            .find(|sortable| *sortable == column)
            .map(|sortable| (sortable, request.ordering.unwrap_or(self.default_ordering)))
    }

    /// The default column, with the requested ordering if the request only asked for an ordering
    pub fn fallback(&self, request: &SortRequest) -> (&Identifier, Ordering) {
        let ordering = match request.column {
            None => request.ordering.unwrap_or(self.default_ordering),
            Some(_) => self.default_ordering,
        };
        (&self.default_column, ordering)
    }
}
