// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use crate::sql::{limit::Limit, offset::Offset};

use super::QueryParams;

/// Page-based pagination: `page` (1-based) and `pageSize` (or `limit`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub page_size: i64,
}

impl Pagination {
    pub const DEFAULT_PAGE_SIZE: i64 = 20;
    pub const MAX_PAGE_SIZE: i64 = 100;

    pub fn new(page: i64, page_size: i64) -> Self {
        Self {
            page: page.max(1),
            page_size: page_size.clamp(1, Self::MAX_PAGE_SIZE),
        }
    }

    /// Values that are missing or not numbers fall back to the defaults; out of range values are
    /// clamped.
    pub fn from_query(params: &QueryParams) -> Self {
        let number = |key: &str| params.get(key).and_then(|value| value.trim().parse::<i64>().ok());

        Self::new(
            number("page").unwrap_or(1),
            number("pageSize")
                .or_else(|| number("limit"))
                .unwrap_or(Self::DEFAULT_PAGE_SIZE),
        )
    }

    pub fn limit(&self) -> Limit {
        Limit(self.page_size)
    }

    pub fn offset(&self) -> Offset {
        Offset((self.page - 1) * self.page_size)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self::new(1, Self::DEFAULT_PAGE_SIZE)
    }
}
