// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use anyhow::{Result, anyhow};
use async_trait::async_trait;
use clap::{Arg, ArgMatches, Command};
use desk_env::{CompositeEnvironment, Environment, MapEnvironment};
use desk_sql::{
    DESK_DATABASE_SCHEMA, DESK_POSTGRES_URL, EngineConfig, PostgresDatastore, RelationEngine, WhereClause,
    relation::helpdesk_registry, request::QueryParams, schema::SchemaCatalog,
};
use serde_json::Value;

#[async_trait]
pub trait CommandDefinition {
    fn command(&self) -> Command;

    async fn execute(&self, matches: &ArgMatches, env: Arc<dyn Environment>) -> Result<()>;
}

pub struct SubcommandDefinition {
    pub name: &'static str,
    pub about: &'static str,
    pub command_definitions: Vec<Box<dyn CommandDefinition + Send + Sync>>,
}

impl SubcommandDefinition {
    pub fn new(
        name: &'static str,
        about: &'static str,
        command_definitions: Vec<Box<dyn CommandDefinition + Send + Sync>>,
    ) -> Self {
        Self {
            name,
            about,
            command_definitions,
        }
    }
}

#[async_trait]
impl CommandDefinition for SubcommandDefinition {
    fn command(&self) -> Command {
        Command::new(self.name)
            .about(self.about)
            .subcommand_required(true)
            .arg_required_else_help(true)
            .disable_help_subcommand(true)
            .subcommands(
                self.command_definitions
                    .iter()
                    .map(|command_definition| command_definition.command()),
            )
    }

    async fn execute(&self, matches: &ArgMatches, env: Arc<dyn Environment>) -> Result<()> {
        let Some((name, subcommand_matches)) = matches.subcommand() else {
            return Err(anyhow!("Missing subcommand"));
        };

        for command_definition in &self.command_definitions {
            if command_definition.command().get_name() == name {
                return command_definition.execute(subcommand_matches, env).await;
            }
        }

        Err(anyhow!("Unknown subcommand: {}", name))
    }
}

pub fn get_required<T: Clone + Send + Sync + 'static>(
    matches: &ArgMatches,
    arg_id: &str,
) -> Result<T> {
    get(matches, arg_id).ok_or_else(|| anyhow!("Required argument `{}` is not present", arg_id))
}

pub fn get<T: Clone + Send + Sync + 'static>(matches: &ArgMatches, arg_id: &str) -> Option<T> {
    matches.get_one::<T>(arg_id).cloned()
}

pub fn table_arg() -> Arg {
    Arg::new("table")
        .help("The table to read from, such as `tickets`")
        .required(true)
        .index(1)
}

pub fn query_arg() -> Arg {
    Arg::new("query")
        .help("Query string of the request, such as `select=tickets[id,requester[name]]`")
        .long_help(
            "Query string of the request. Supports `fields=`, `expand=` and `select=` to shape \
             the rows, `sort=`/`order=` to sort them, and `page=`/`pageSize=` to paginate.",
        )
        .short('q')
        .long("query")
        .required(false)
        .default_value("")
}

pub fn where_arg() -> Arg {
    Arg::new("where")
        .help("Extra SQL condition the rows must satisfy, such as `tickets.status_id = 1`")
        .long("where")
        .required(false)
}

pub fn database_arg() -> Arg {
    Arg::new("database")
        .help(format!(
            "The PostgreSQL database connection string to use. If not specified, the program \
             will attempt to read it from the environment (`{DESK_POSTGRES_URL}`)."
        ))
        .long("database")
        .required(false)
}

pub fn schema_arg() -> Arg {
    Arg::new("schema")
        .help(format!(
            "The database schema holding the tables. If not specified, the program will attempt \
             to read it from the environment (`{DESK_DATABASE_SCHEMA}`), or use `public`."
        ))
        .long("schema")
        .required(false)
}

pub fn query_params(matches: &ArgMatches) -> QueryParams {
    get::<String>(matches, "query")
        .map(|query| QueryParams::parse(&query))
        .unwrap_or_default()
}

/// The `--where` condition. Supplied by the operator, so trusted as is.
pub fn where_clause(matches: &ArgMatches) -> Option<WhereClause> {
    get::<String>(matches, "where").map(|sql| WhereClause::new(sql, vec![]))
}

/// An engine over the database given by `--database` (or the environment) with the helpdesk
/// relations.
pub async fn create_engine(
    matches: &ArgMatches,
    env: Arc<dyn Environment>,
) -> Result<RelationEngine> {
    let env = cli_environment(matches, env);
    let config = EngineConfig::from_env(env.as_ref())?;

    let store = PostgresDatastore::from_config(&config).await?;
    let catalog = SchemaCatalog::new(Arc::new(store));
    let registry = helpdesk_registry()?;

    Ok(RelationEngine::new(Arc::new(catalog), Arc::new(registry)))
}

/// The environment with the connection arguments given on the command line taking precedence.
fn cli_environment(matches: &ArgMatches, env: Arc<dyn Environment>) -> Arc<dyn Environment> {
    let mut flags = MapEnvironment::default();

    for (arg_id, key) in [("database", DESK_POSTGRES_URL), ("schema", DESK_DATABASE_SCHEMA)] {
        if let Some(value) = get::<String>(matches, arg_id) {
            flags.set(key, &value);
        }
    }

    Arc::new(CompositeEnvironment::new(vec![Arc::new(flags), env]))
}

pub fn print_json(value: &Value) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
