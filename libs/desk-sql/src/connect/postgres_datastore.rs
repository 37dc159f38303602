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
use tracing::debug;

use crate::{
    database_error::{DatabaseError, WithContext},
    datastore::{Datastore, JsonObject},
    sql::select::{POSITION_COLUMN, Select},
};

use super::{config::EngineConfig, database_pool::DatabasePool};

const COLUMN_EXISTS_QUERY: &str = "SELECT EXISTS(SELECT 1 FROM information_schema.columns WHERE table_schema::text = $1 AND table_name::text = $2 AND column_name::text = $3)";

const EXISTING_TABLES_QUERY: &str = "SELECT table_name::text FROM information_schema.tables WHERE table_schema::text = $1 AND table_name::text = ANY($2)";

/// [`Datastore`] backed by a PostgreSQL connection pool.
pub struct PostgresDatastore {
    pool: DatabasePool,
    schema: String,
}

impl PostgresDatastore {
    pub fn new(pool: DatabasePool, schema: impl Into<String>) -> Self {
        Self {
            pool,
            schema: schema.into(),
        }
    }

    pub async fn from_config(config: &EngineConfig) -> Result<Self, DatabaseError> {
        let pool = DatabasePool::from_config(config).await?;
        Ok(Self::new(pool, config.schema.clone()))
    }
}

#[async_trait]
impl Datastore for PostgresDatastore {
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, DatabaseError> {
        let client = self.pool.get_client().await?;

        let row = client
            .query_one(COLUMN_EXISTS_QUERY, &[&self.schema, &table, &column])
            .await
            .map_err(DatabaseError::Delegate)
            .with_context(format!("While checking column {table}.{column}"))?;

        Ok(row.try_get(0)?)
    }

    async fn existing_tables(&self, tables: &[String]) -> Result<HashSet<String>, DatabaseError> {
        let client = self.pool.get_client().await?;

        let rows = client
            .query(EXISTING_TABLES_QUERY, &[&self.schema, &tables])
            .await
            .map_err(DatabaseError::Delegate)
            .with_context("While checking table existence".into())?;

        rows.iter()
            .map(|row| row.try_get::<_, String>(0).map_err(DatabaseError::Delegate))
            .collect()
    }

    async fn select(&self, select: &Select) -> Result<Vec<JsonObject>, DatabaseError> {
        let statement = select.to_json_statement();
        debug!("Executing SQL operation: {}", statement.sql);

        let client = self.pool.get_client().await?;

        let row = client
            .query_one(statement.sql.as_str(), &statement.params())
            .await
            .map_err(DatabaseError::Delegate)
            .with_context(format!("While executing query on {}", select.table.name))?;

        let json_text: String = row.try_get(0)?;

        decode_rows(&json_text, select.order_by.is_some())
    }
}

/// Rows of a JSON statement's output. Rows of an ordered statement carry their position last.
fn decode_rows(json_text: &str, ordered: bool) -> Result<Vec<JsonObject>, DatabaseError> {
    let mut rows: Vec<JsonObject> = serde_json::from_str(json_text)?;

    if ordered {
        for row in &mut rows {
            row.shift_remove(POSITION_COLUMN);
        }
    }

    Ok(rows)
}
