// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Reading of helpdesk entities as enriched JSON rows.
//!
//! Given a base table, [`RelationEngine`] joins every known relation of the table in one
//! statement, expands the relations a request asks for (`expand=`, or the bracket form of
//! `select=`) with batched follow-up queries, and prunes the rows to the requested `fields=`.

#[macro_use]
mod sql;

mod compose;
mod connect;
mod engine;
mod env_const;
mod expand;
mod projection;

pub mod database_error;
pub mod datastore;
pub mod relation;
pub mod request;
pub mod schema;
pub mod selection;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use compose::{DetailQuery, ExtraColumn, ListQuery};
pub use connect::{
    config::EngineConfig, database_client::DatabaseClient, database_pool::DatabasePool,
    postgres_datastore::PostgresDatastore,
};
pub use database_error::DatabaseError;
pub use datastore::{Datastore, JsonObject};
pub use engine::RelationEngine;
pub use env_const::*;
pub use projection::{AttributeCap, Projection, project};
pub use sql::{
    ExpressionBuilder, SQLBuilder, SQLParam, SQLStatement,
    column::{Column, ColumnRef, SelectColumn},
    identifier::Identifier,
    join::{Join, JoinKind},
    limit::Limit,
    offset::Offset,
    order::{OrderBy, OrderByElement, Ordering},
    predicate::{Predicate, WhereClause},
    select::Select,
    table::TableRef,
};
