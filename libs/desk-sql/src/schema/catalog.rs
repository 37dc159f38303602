// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex, PoisonError},
};

use tracing::{debug, warn};

use crate::datastore::Datastore;

/// Memoized knowledge of which tables and columns exist.
///
/// Every answer (including a negative one) is cached for the lifetime of the catalog, so each
/// `(table, column)` pair costs at most one metadata query. The schema is assumed not to change
/// while the process runs; there is no invalidation.
///
/// When the metadata query fails, the column (or table) is treated as absent and that answer is
/// cached as well. Something whose existence can't be established is never assumed to be present.
pub struct SchemaCatalog {
    store: Arc<dyn Datastore>,
    /// Keyed by `table.column`
    columns: Mutex<HashMap<String, bool>>,
    tables: Mutex<HashMap<String, bool>>,
    /// Tables whose complete column list is known upfront
    known_columns: HashMap<String, HashSet<String>>,
}

impl SchemaCatalog {
    pub fn new(store: Arc<dyn Datastore>) -> Self {
        Self {
            store,
            columns: Mutex::new(HashMap::new()),
            tables: Mutex::new(HashMap::new()),
            known_columns: HashMap::new(),
        }
    }

    /// A catalog that already knows the full column list of the given tables. Lookups against
    /// these tables never reach the datastore; other tables are looked up as usual.
    pub fn seeded<'a>(
        store: Arc<dyn Datastore>,
        tables: impl IntoIterator<Item = (&'a str, &'a [&'a str])>,
    ) -> Self {
        let mut catalog = Self::new(store);

        for (table, columns) in tables {
            catalog.known_columns.insert(
                table.to_string(),
                columns.iter().map(|c| c.to_string()).collect(),
            );
            Self::locked(&catalog.tables).insert(table.to_string(), true);
        }

        catalog
    }

    /// Record `table` as not existing (along with all its columns).
    pub fn with_absent_table(self, table: &str) -> Self {
        Self::locked(&self.tables).insert(table.to_string(), false);
        self
    }

    pub fn store(&self) -> &Arc<dyn Datastore> {
        &self.store
    }

    pub async fn column_exists(&self, table: &str, column: &str) -> bool {
        if let Some(columns) = self.known_columns.get(table) {
            return columns.contains(column);
        }
        if Self::locked(&self.tables).get(table) == Some(&false) {
            return false;
        }

        let key = format!("{table}.{column}");

        // The lock must not be held across the await below
        if let Some(exists) = Self::locked(&self.columns).get(&key) {
            return *exists;
        }

        let exists = match self.store.column_exists(table, column).await {
            Ok(exists) => exists,
            Err(e) => {
                warn!("Unable to determine if column {key} exists, treating it as absent: {e}");
                false
            }
        };

        debug!("Column {key} exists: {exists}");
        Self::locked(&self.columns).insert(key, exists);
        exists
    }

    /// The subset of `tables` that exist. All tables not already known are checked in one
    /// metadata query.
    pub async fn tables_exist(&self, tables: &[String]) -> HashSet<String> {
        let unknown: Vec<String> = {
            let cache = Self::locked(&self.tables);
            let mut unknown: Vec<String> = tables
                .iter()
                .filter(|table| !cache.contains_key(table.as_str()))
                .cloned()
                .collect();
            unknown.sort();
            unknown.dedup();
            unknown
        };

        if !unknown.is_empty() {
            let existing = match self.store.existing_tables(&unknown).await {
                Ok(existing) => existing,
                Err(e) => {
                    warn!("Unable to determine if tables {unknown:?} exist, treating them as absent: {e}");
                    HashSet::new()
                }
            };

            let mut cache = Self::locked(&self.tables);
            for table in unknown {
                let exists = existing.contains(&table);
                cache.insert(table, exists);
            }
        }

        let cache = Self::locked(&self.tables);
        tables
            .iter()
            .filter(|table| cache.get(table.as_str()) == Some(&true))
            .cloned()
            .collect()
    }

    // Writes are idempotent, so a panic elsewhere while holding the lock can't leave the cache in
    // an inconsistent state.
    fn locked<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        mutex.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
