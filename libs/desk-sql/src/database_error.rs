// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use desk_env::EnvError;
use thiserror::Error;
use tracing::error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Env(#[from] EnvError),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Delegate: {0}")]
    Delegate(#[from] tokio_postgres::Error),

    #[error("Pool: {0}")]
    Pool(#[from] deadpool_postgres::PoolError),

    #[error("Unable to decode query result: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0} {1}")]
    WithContext(String, #[source] Box<DatabaseError>),

    #[error("{0}")]
    BoxedError(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl DatabaseError {
    pub fn with_context(self, context: String) -> DatabaseError {
        DatabaseError::WithContext(context, Box::new(self))
    }

    /// A message safe to show to an API client.
    pub fn user_error_message(&self) -> String {
        match self {
            DatabaseError::Validation(_) => self.to_string(),
            DatabaseError::WithContext(_, e) => e.user_error_message(),
            // Postgres and decoding errors may quote table names or row values
            _ => {
                error!("Database operation failed: {:?}", self);
                "Operation failed".to_string()
            }
        }
    }
}

pub trait WithContext {
    fn with_context(self, context: String) -> Self;
}

impl<T> WithContext for Result<T, DatabaseError> {
    fn with_context(self, context: String) -> Result<T, DatabaseError> {
        self.map_err(|e| e.with_context(context))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_message_hides_internal_details() {
        let err = DatabaseError::Config("password=secret".into())
            .with_context("while listing tickets".into());
        assert_eq!(err.user_error_message(), "Operation failed");

        let decoding = serde_json::from_str::<serde_json::Value>(r#"[{"password_hash": "h1""#)
            .unwrap_err();
        let err = DatabaseError::from(decoding).with_context("While listing users".into());
        assert_eq!(err.user_error_message(), "Operation failed");

        let err = DatabaseError::Validation("Invalid identifier 'a b'".into());
        assert_eq!(err.user_error_message(), "Validation: Invalid identifier 'a b'");
    }
}
