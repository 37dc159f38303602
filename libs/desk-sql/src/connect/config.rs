// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use desk_env::Environment;

use crate::{database_error::DatabaseError, env_const};

/// Everything needed to reach the database and read its metadata.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub url: String,
    pub user: Option<String>,
    pub password: Option<String>,
    pub pool_size: usize,
    pub check_connection: bool,
    /// The schema whose metadata the catalog consults
    pub schema: String,
}

impl EngineConfig {
    pub fn from_env(env: &dyn Environment) -> Result<Self, DatabaseError> {
        let url = env_const::get_postgres_url(env).ok_or(DatabaseError::Config(format!(
            "Env {} must be provided",
            env_const::DESK_POSTGRES_URL
        )))?;

        Ok(Self {
            url,
            user: env.get(env_const::DESK_POSTGRES_USER),
            password: env.get(env_const::DESK_POSTGRES_PASSWORD),
            pool_size: env_const::get_connection_pool_size(env)?,
            check_connection: env_const::get_check_connection_on_startup(env)?,
            schema: env_const::get_database_schema(env),
        })
    }
}

#[cfg(test)]
mod tests {
    use desk_env::MapEnvironment;

    use super::*;

    #[test]
    fn defaults() {
        let env = MapEnvironment::from([("DESK_POSTGRES_URL", "postgres://localhost/desk")]);
        let config = EngineConfig::from_env(&env).unwrap();

        assert_eq!(config.url, "postgres://localhost/desk");
        assert_eq!(config.pool_size, 10);
        assert!(config.check_connection);
        assert_eq!(config.schema, "public");
        assert_eq!(config.user, None);
    }

    #[test]
    fn overrides() {
        let env = MapEnvironment::from([
            ("DATABASE_URL", "postgres://db/desk"),
            ("DESK_POSTGRES_USER", "agent"),
            ("DESK_CONNECTION_POOL_SIZE", "4"),
            ("DESK_CHECK_CONNECTION_ON_STARTUP", "false"),
            ("DESK_DATABASE_SCHEMA", "helpdesk"),
        ]);
        let config = EngineConfig::from_env(&env).unwrap();

        assert_eq!(config.url, "postgres://db/desk");
        assert_eq!(config.user.as_deref(), Some("agent"));
        assert_eq!(config.pool_size, 4);
        assert!(!config.check_connection);
        assert_eq!(config.schema, "helpdesk");
    }

    #[test]
    fn missing_url() {
        let env = MapEnvironment::from([("DESK_CONNECTION_POOL_SIZE", "4")]);
        assert!(matches!(
            EngineConfig::from_env(&env),
            Err(DatabaseError::Config(_))
        ));
    }

    #[test]
    fn invalid_pool_size() {
        let env = MapEnvironment::from([
            ("DESK_POSTGRES_URL", "postgres://localhost/desk"),
            ("DESK_CONNECTION_POOL_SIZE", "many"),
        ]);
        assert!(matches!(
            EngineConfig::from_env(&env),
            Err(DatabaseError::Env(_))
        ));
    }
}
