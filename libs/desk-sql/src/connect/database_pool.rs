// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::str::FromStr;

use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod};
use tokio_postgres::Config;
use tracing::debug;

use crate::database_error::DatabaseError;

use super::{config::EngineConfig, database_client::DatabaseClient};

pub struct DatabasePool {
    pool: Pool,
}

impl DatabasePool {
    pub async fn from_config(config: &EngineConfig) -> Result<Self, DatabaseError> {
        let mut pg_config = Config::from_str(&config.url).map_err(|e| {
            DatabaseError::Delegate(e)
                .with_context("Failed to parse PostgreSQL connection string".into())
        })?;

        if let Some(user) = &config.user {
            pg_config.user(user);
        }
        if let Some(password) = &config.password {
            pg_config.password(password);
        }

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = Manager::from_config(pg_config, tokio_postgres::NoTls, manager_config);

        let pool = Pool::builder(manager)
            .max_size(config.pool_size)
            .build()
            .map_err(|e| DatabaseError::Config(format!("Failed to create DB pool: {e}")))?;

        let db = Self { pool };

        if config.check_connection {
            // Fail at startup (rather than on the first request) if the database is unreachable
            let _ = db.get_client().await?;
            debug!("Database connection verified");
        }

        Ok(db)
    }

    pub async fn get_client(&self) -> Result<DatabaseClient, DatabaseError> {
        Ok(DatabaseClient(self.pool.get().await?))
    }
}
