// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use desk_env::{EnvError, Environment, get_parsed};

pub const DESK_POSTGRES_URL: &str = "DESK_POSTGRES_URL";
pub const DATABASE_URL: &str = "DATABASE_URL";
pub const DESK_POSTGRES_USER: &str = "DESK_POSTGRES_USER";
pub const DESK_POSTGRES_PASSWORD: &str = "DESK_POSTGRES_PASSWORD";
pub const DESK_CONNECTION_POOL_SIZE: &str = "DESK_CONNECTION_POOL_SIZE";
pub const DESK_CHECK_CONNECTION_ON_STARTUP: &str = "DESK_CHECK_CONNECTION_ON_STARTUP";
pub const DESK_DATABASE_SCHEMA: &str = "DESK_DATABASE_SCHEMA";

pub const DEFAULT_CONNECTION_POOL_SIZE: usize = 10;
pub const DEFAULT_DATABASE_SCHEMA: &str = "public";

/// The connection URL, falling back to the conventional `DATABASE_URL`.
pub fn get_postgres_url(env: &dyn Environment) -> Option<String> {
    env.get(DESK_POSTGRES_URL).or_else(|| env.get(DATABASE_URL))
}

pub fn get_connection_pool_size(env: &dyn Environment) -> Result<usize, EnvError> {
    Ok(get_parsed(env, DESK_CONNECTION_POOL_SIZE)?.unwrap_or(DEFAULT_CONNECTION_POOL_SIZE))
}

pub fn get_check_connection_on_startup(env: &dyn Environment) -> Result<bool, EnvError> {
    env.enabled(DESK_CHECK_CONNECTION_ON_STARTUP, true)
}

pub fn get_database_schema(env: &dyn Environment) -> String {
    env.get_or_else(DESK_DATABASE_SCHEMA, DEFAULT_DATABASE_SCHEMA)
}
