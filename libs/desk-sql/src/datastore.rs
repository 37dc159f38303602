// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;

use crate::{database_error::DatabaseError, sql::select::Select};

/// A row as the engine sees it: column (or relation key) to value, in select-list order.
pub type JsonObject = serde_json::Map<String, Value>;

/// The datastore the engine reads from. Only two kinds of interactions are needed: metadata
/// lookups (for the schema catalog) and executing a [`Select`].
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Does `column` exist on `table`?
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, DatabaseError>;

    /// The subset of `tables` that exist, checked in one round-trip.
    async fn existing_tables(&self, tables: &[String]) -> Result<HashSet<String>, DatabaseError>;

    /// Execute the select, returning each row as a JSON object.
    async fn select(&self, select: &Select) -> Result<Vec<JsonObject>, DatabaseError>;
}

/// The textual form of a key value used to match rows across queries (primary keys may be
/// integers or uuids, and are compared as text on the database side as well).
pub(crate) fn value_as_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn key_text() {
        assert_eq!(value_as_text(&json!(7)), Some("7".to_string()));
        assert_eq!(
            value_as_text(&json!("6f1c0a4e-2b7d-4c2e-9d61-0f3a7f8b9c10")),
            Some("6f1c0a4e-2b7d-4c2e-9d61-0f3a7f8b9c10".to_string())
        );
        assert_eq!(value_as_text(&json!(null)), None);
        assert_eq!(value_as_text(&json!({"id": 1})), None);
    }
}
