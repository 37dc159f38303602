// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use anyhow::{Result, bail};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use desk_env::Environment;
use desk_sql::DetailQuery;
use serde_json::Value;

use super::command::{
    CommandDefinition, create_engine, database_arg, get_required, print_json, query_arg,
    query_params, schema_arg, table_arg, where_arg, where_clause,
};

pub(crate) struct GetCommandDefinition {}

#[async_trait]
impl CommandDefinition for GetCommandDefinition {
    fn command(&self) -> Command {
        Command::new("get")
            .about("Show one row of a table with its relations")
            .arg(table_arg())
            .arg(
                Arg::new("id")
                    .help("The id of the row")
                    .required(true)
                    .index(2),
            )
            .arg(query_arg())
            .arg(where_arg())
            .arg(database_arg())
            .arg(schema_arg())
    }

    async fn execute(&self, matches: &ArgMatches, env: Arc<dyn Environment>) -> Result<()> {
        let table: String = get_required(matches, "table")?;
        let id: String = get_required(matches, "id")?;

        let mut query = DetailQuery::new(&table, id.clone())?.with_params(query_params(matches));
        if let Some(filter) = where_clause(matches) {
            query = query.with_filter(filter);
        }

        let engine = create_engine(matches, env).await?;

        match engine.get_detailed(&query).await? {
            Some(row) => print_json(&Value::Object(row)),
            None => bail!("No row of {table} with id {id}"),
        }
    }
}
