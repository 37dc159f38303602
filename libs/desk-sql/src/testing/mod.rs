// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Support for testing code that uses the engine without a running database.

mod memory_datastore;

pub use memory_datastore::{MemoryDatastore, MemoryTable, Operation};
