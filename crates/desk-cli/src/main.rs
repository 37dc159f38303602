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
use desk_env::SystemEnvironment;

use commands::{
    command::{CommandDefinition, SubcommandDefinition},
    get::GetCommandDefinition,
    list::ListCommandDefinition,
};

mod commands;
mod logging_tracing;

#[tokio::main]
async fn main() -> Result<()> {
    logging_tracing::init();

    let subcommand_definition = SubcommandDefinition::new(
        "desk",
        "Read helpdesk entities with their relations expanded",
        vec![
            Box::new(ListCommandDefinition {}),
            Box::new(GetCommandDefinition {}),
        ],
    );

    let command = subcommand_definition
        .command()
        .version(env!("CARGO_PKG_VERSION"));

    let matches = command.get_matches();

    subcommand_definition
        .execute(&matches, Arc::new(SystemEnvironment))
        .await
}
