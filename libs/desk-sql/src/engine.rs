// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::Arc;

use indexmap::IndexMap;
use tracing::debug;

use crate::{
    compose::{ComposedSelect, DetailQuery, ListQuery, QueryComposer},
    database_error::{DatabaseError, WithContext},
    datastore::JsonObject,
    expand::ExpansionResolver,
    projection::{AttributeCap, Projection},
    relation::{RelationDescriptor, RelationRegistry},
    request::QueryParams,
    schema::SchemaCatalog,
    selection::{ExpandTree, SelectionSpec},
};

/// Entry point for reading enriched rows: composes the base statement, expands the requested
/// relations, and projects the result to the requested shape.
///
/// Built once per process and shared across requests.
pub struct RelationEngine {
    catalog: Arc<SchemaCatalog>,
    registry: Arc<RelationRegistry>,
}

impl RelationEngine {
    pub fn new(catalog: Arc<SchemaCatalog>, registry: Arc<RelationRegistry>) -> Self {
        Self { catalog, registry }
    }

    pub fn catalog(&self) -> &SchemaCatalog {
        &self.catalog
    }

    pub fn registry(&self) -> &RelationRegistry {
        &self.registry
    }

    /// Rows of `query.table` matching the query's filter, with every relation of the table joined
    /// and the relations requested through `query.params` expanded.
    pub async fn list_detailed(&self, query: &ListQuery) -> Result<Vec<JsonObject>, DatabaseError> {
        let composer = QueryComposer::new(&self.catalog, &self.registry);
        let composed = composer.list(query).await?;

        let rows = self
            .execute(&composed)
            .await
            .with_context(format!("While listing rows of {}", query.table))?;

        self.enrich(query.table.as_str(), rows, &composed.relations, &query.params)
            .await
    }

    /// The row of `query.table` with the given id (if it exists and passes the query's filter),
    /// enriched the same way as [`RelationEngine::list_detailed`].
    pub async fn get_detailed(
        &self,
        query: &DetailQuery,
    ) -> Result<Option<JsonObject>, DatabaseError> {
        let composer = QueryComposer::new(&self.catalog, &self.registry);
        let composed = composer.detail(query).await?;

        let rows = self
            .execute(&composed)
            .await
            .with_context(format!("While fetching {} {}", query.table, query.id))?;

        let rows = self
            .enrich(query.table.as_str(), rows, &composed.relations, &query.params)
            .await?;

        Ok(rows.into_iter().next())
    }

    async fn execute(&self, composed: &ComposedSelect) -> Result<Vec<JsonObject>, DatabaseError> {
        self.catalog.store().select(&composed.select).await
    }

    async fn enrich(
        &self,
        table: &str,
        rows: Vec<JsonObject>,
        relations: &[RelationDescriptor],
        params: &QueryParams,
    ) -> Result<Vec<JsonObject>, DatabaseError> {
        let selection = SelectionSpec::from_query(params);
        debug!(
            "Enriching {} rows of {table} with {:?}",
            rows.len(),
            selection
        );

        let rows = if selection.expand.is_empty() {
            rows
        } else {
            ExpansionResolver::new(&self.catalog, &self.registry)
                .resolve(table.to_string(), rows, &selection.expand)
                .await?
        };

        Ok(match &selection.fields {
            Some(fields) if !rows.is_empty() => {
                let caps = self.attribute_caps(table, relations, &selection.expand).await;
                let projection = Projection::new(fields).with_attribute_caps(&caps);
                rows.into_iter().map(|row| projection.apply(row)).collect()
            }
            _ => rows,
        })
    }

    /// Caps for the relations embedded by the base statement and those expanded under them,
    /// parents first.
    async fn attribute_caps(
        &self,
        table: &str,
        relations: &[RelationDescriptor],
        expand: &ExpandTree,
    ) -> Vec<AttributeCap> {
        let mut caps: IndexMap<String, AttributeCap> = IndexMap::new();

        for relation in relations {
            let path = relation.relation_key.to_string();
            caps.insert(path.clone(), cap(path, &relation.allowed_attributes));
        }

        let mut pending = vec![(table.to_string(), String::new(), expand)];

        while let Some((table, prefix, tree)) = pending.pop() {
            for (key, node) in tree {
                let (target_table, allowed) = if let Some(link) = self.registry.link(&table, key) {
                    (link.target_table.to_string(), link.allowed_attributes.clone())
                } else if let Some(relation) = self
                    .registry
                    .relation_by_key(&self.catalog, &table, key)
                    .await
                {
                    (
                        relation.target_table.to_string(),
                        relation.allowed_attributes.clone(),
                    )
                } else {
                    continue;
                };

                let path = if prefix.is_empty() {
                    key.clone()
                } else {
                    format!("{prefix}.{key}")
                };

                if let Some(parent) = caps.get_mut(&prefix) {
                    parent.nested.push(key.clone());
                }
                caps.entry(path.clone())
                    .or_insert_with(|| cap(path.clone(), &allowed));

                if let Some(children) = node.children() {
                    pending.push((target_table, path, children));
                }
            }
        }

        caps.into_values().collect()
    }
}

fn cap(path: String, allowed: &Option<Vec<String>>) -> AttributeCap {
    AttributeCap {
        path,
        allowed: allowed.clone(),
        nested: vec![],
    }
}
