// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use desk_env::Environment;
use desk_sql::{
    ListQuery, Ordering,
    request::{Pagination, SortSpec},
};
use serde_json::Value;
use tracing::debug;

use super::command::{
    CommandDefinition, create_engine, database_arg, get_required, print_json, query_arg,
    query_params, schema_arg, table_arg, where_arg, where_clause,
};

/// List the rows of a table as a JSON array, paginated and sorted per the query string.
///
/// Rows are sorted by `id` (descending) unless the query asks for one of the `--sortable` columns.
pub(crate) struct ListCommandDefinition {}

#[async_trait]
impl CommandDefinition for ListCommandDefinition {
    fn command(&self) -> Command {
        Command::new("list")
            .about("List rows of a table with their relations")
            .arg(table_arg())
            .arg(query_arg())
            .arg(where_arg())
            .arg(
                Arg::new("sortable")
                    .help("Comma-separated columns the query may sort by with `sort=`")
                    .long("sortable")
                    .value_delimiter(',')
                    .required(false),
            )
            .arg(database_arg())
            .arg(schema_arg())
    }

    async fn execute(&self, matches: &ArgMatches, env: Arc<dyn Environment>) -> Result<()> {
        let table: String = get_required(matches, "table")?;
        let params = query_params(matches);

        let sortable: Vec<String> = matches
            .get_many::<String>("sortable")
            .map(|columns| columns.cloned().collect())
            .unwrap_or_default();
        let sortable: Vec<&str> = sortable.iter().map(String::as_str).collect();

        let mut query = ListQuery::new(&table)?
            .with_sort(SortSpec::new(&sortable, "id", Ordering::Desc)?)
            .with_pagination(Pagination::from_query(&params))
            .with_params(params);

        if let Some(filter) = where_clause(matches) {
            query = query.with_filter(filter);
        }

        let engine = create_engine(matches, env).await?;
        let rows = engine.list_detailed(&query).await?;
        debug!("Listed {} rows of {table}", rows.len());

        print_json(&Value::Array(rows.into_iter().map(Value::Object).collect()))
    }
}
