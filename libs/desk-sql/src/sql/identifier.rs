// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::fmt::Display;

use crate::database_error::DatabaseError;

/// Postgres truncates identifiers longer than this (NAMEDATALEN - 1).
const MAX_IDENTIFIER_LENGTH: usize = 63;

/// A table, column, or alias name that is safe to splice into SQL text.
///
/// The only way to get one is through [`Identifier::new`], which accepts `[A-Za-z_][A-Za-z0-9_]*`.
/// Statements built by this crate take identifiers only as `Identifier`, so a raw request string
/// can never end up in the SQL text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identifier(String);

impl Identifier {
    pub fn new(name: impl Into<String>) -> Result<Self, DatabaseError> {
        let name = name.into();

        if Self::is_valid(&name) {
            Ok(Self(name))
        } else {
            Err(DatabaseError::Validation(format!(
                "Invalid identifier '{name}'"
            )))
        }
    }

    pub fn is_valid(name: &str) -> bool {
        let mut chars = name.chars();

        match chars.next() {
            Some(first) if first.is_ascii_alphabetic() || first == '_' => {
                name.len() <= MAX_IDENTIFIER_LENGTH
                    && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
            }
            _ => false,
        }
    }

    /// The primary key column every table is expected to have
    pub fn id() -> Self {
        Self("id".to_string())
    }

    pub fn position() -> Self {
        Self(super::select::POSITION_COLUMN.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Identifier {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Display for Identifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<str> for Identifier {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Identifier {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
