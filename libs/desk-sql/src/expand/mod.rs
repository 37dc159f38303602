// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Expansion of relations beyond what the base statement joins.
//!
//! Each level of the expansion tree costs at most one query per relation, whatever the number of
//! rows: the keys of the whole level are collected, fetched in one batch, and the results are
//! grouped back onto their rows.

use std::collections::HashMap;

use futures::{FutureExt, future::BoxFuture};
use indexmap::{IndexMap, IndexSet};
use serde_json::Value;
use tracing::debug;

use crate::{
    database_error::DatabaseError,
    datastore::{Datastore, JsonObject, value_as_text},
    relation::{LinkDescriptor, RelationDescriptor, RelationRegistry},
    schema::SchemaCatalog,
    selection::ExpandTree,
    sql::{
        column::{Column, ColumnRef, SelectColumn},
        identifier::Identifier,
        join::Join,
        order::{OrderBy, OrderByElement, Ordering},
        predicate::Predicate,
        select::Select,
        table::TableRef,
    },
};

/// Alias for the link table's source column in a batched many-to-many query
const PARENT_ID: &str = "__parent_id";

pub(crate) struct ExpansionResolver<'a> {
    catalog: &'a SchemaCatalog,
    registry: &'a RelationRegistry,
}

impl<'a> ExpansionResolver<'a> {
    pub fn new(catalog: &'a SchemaCatalog, registry: &'a RelationRegistry) -> Self {
        Self { catalog, registry }
    }

    /// Expand the relations in `tree` on `rows` (of `table`), recursing into the expanded rows
    /// for nested trees. Rows keep their order.
    pub fn resolve<'b>(
        &'b self,
        table: String,
        rows: Vec<JsonObject>,
        tree: &'b ExpandTree,
    ) -> BoxFuture<'b, Result<Vec<JsonObject>, DatabaseError>> {
        async move {
            let mut rows = rows;
            if rows.is_empty() {
                return Ok(rows);
            }

            for (key, node) in tree {
                if let Some(link) = self.registry.link(&table, key) {
                    rows = self.expand_link(link, rows, node.children()).await?;
                } else if let Some(relation) = self
                    .registry
                    .relation_by_key(self.catalog, &table, key)
                    .await
                {
                    rows = self
                        .expand_relation(&relation, rows, node.children())
                        .await?;
                } else {
                    debug!("Ignoring expansion of unknown relation {table}.{key}");
                }
            }

            Ok(rows)
        }
        .boxed()
    }

    async fn expand_relation(
        &self,
        relation: &RelationDescriptor,
        mut rows: Vec<JsonObject>,
        children: Option<&ExpandTree>,
    ) -> Result<Vec<JsonObject>, DatabaseError> {
        let key = relation.relation_key.as_str();

        // Relations of the base table are already embedded by the base statement
        if !rows.iter().any(|row| row.contains_key(key)) {
            self.fetch_relation(relation, &mut rows).await?;
        }

        if let Some(children) = children {
            let mut positions = vec![];
            let mut objects = vec![];
            for (index, row) in rows.iter_mut().enumerate() {
                if let Some(Value::Object(object)) = row.get_mut(key) {
                    positions.push(index);
                    objects.push(std::mem::take(object));
                }
            }

            let resolved = self
                .resolve(relation.target_table.to_string(), objects, children)
                .await?;

            for (index, object) in positions.into_iter().zip(resolved) {
                rows[index].insert(key.to_string(), Value::Object(object));
            }
        }

        Ok(rows)
    }

    /// Attach the target row of `relation` to each row (or null), with one query for all rows.
    async fn fetch_relation(
        &self,
        relation: &RelationDescriptor,
        rows: &mut [JsonObject],
    ) -> Result<(), DatabaseError> {
        let source_column = relation.source_column.as_str();
        let target_table = relation.target_table.to_string();

        let ids: IndexSet<String> = rows
            .iter()
            .filter_map(|row| row.get(source_column))
            .filter_map(value_as_text)
            .collect();

        let mut targets: HashMap<String, JsonObject> = HashMap::new();

        if !ids.is_empty()
            && self
                .registry
                .targets_exist(self.catalog, std::slice::from_ref(&target_table))
                .await
                .contains(&target_table)
        {
            let mut select = Select::new(
                TableRef::new(relation.target_table.clone()),
                vec![SelectColumn::new(Column::Star(
                    relation.target_table.clone(),
                ))],
            );
            select.predicate = Predicate::TextIn(
                ColumnRef::new(relation.target_table.clone(), Identifier::id()),
                ids.into_iter().collect(),
            );

            for target in self.store().select(&select).await? {
                if let Some(id) = target.get("id").and_then(value_as_text) {
                    targets.insert(id, target);
                }
            }
        }

        for row in rows {
            let value = row
                .get(source_column)
                .and_then(value_as_text)
                .and_then(|id| targets.get(&id).cloned())
                .map(Value::Object)
                .unwrap_or(Value::Null);

            row.insert(relation.relation_key.to_string(), value);
        }

        Ok(())
    }

    /// Attach the linked rows to each row (as an array, empty if there are none), with one query
    /// for all rows and one more per nested level.
    async fn expand_link(
        &self,
        link: &LinkDescriptor,
        mut rows: Vec<JsonObject>,
        children: Option<&ExpandTree>,
    ) -> Result<Vec<JsonObject>, DatabaseError> {
        let parent_ids: IndexSet<String> = rows
            .iter()
            .filter_map(|row| row.get("id"))
            .filter_map(value_as_text)
            .collect();

        let mut children_by_parent: IndexMap<String, Vec<JsonObject>> = IndexMap::new();

        if !parent_ids.is_empty() {
            let tables = [link.link_table.to_string(), link.target_table.to_string()];
            let existing = self.registry.targets_exist(self.catalog, &tables).await;

            if tables.iter().all(|table| existing.contains(table)) {
                let select = link_select(link, parent_ids.into_iter().collect())?;

                for mut child in self.store().select(&select).await? {
                    let Some(parent) = child.remove(PARENT_ID).as_ref().and_then(value_as_text)
                    else {
                        continue;
                    };
                    children_by_parent.entry(parent).or_default().push(child);
                }
            } else {
                debug!(
                    "Tables of {}.{} do not exist, expanding to empty arrays",
                    link.source_table, link.relation_key
                );
            }
        }

        if let Some(children) = children {
            // One batch for the children of every parent, regrouped afterwards
            let counts: Vec<(String, usize)> = children_by_parent
                .iter()
                .map(|(parent, children)| (parent.clone(), children.len()))
                .collect();
            let flattened: Vec<JsonObject> =
                children_by_parent.into_values().flatten().collect();

            let mut resolved = self
                .resolve(link.target_table.to_string(), flattened, children)
                .await?
                .into_iter();

            children_by_parent = counts
                .into_iter()
                .map(|(parent, count)| (parent, resolved.by_ref().take(count).collect()))
                .collect();
        }

        for row in &mut rows {
            let children = row
                .get("id")
                .and_then(value_as_text)
                .and_then(|id| children_by_parent.get(&id).cloned())
                .unwrap_or_default();

            row.insert(
                link.relation_key.to_string(),
                Value::Array(children.into_iter().map(Value::Object).collect()),
            );
        }

        Ok(rows)
    }

    fn store(&self) -> &dyn Datastore {
        self.catalog.store().as_ref()
    }
}

/// `SELECT "<target>".*, "<link>"."<source column>" AS "__parent_id" FROM "<target>"
///  INNER JOIN "<link>" ON "<link>"."<target column>" = "<target>"."id"
///  WHERE "<link>"."<source column>"::text = ANY($1) ORDER BY "<target>"."id" ASC`
fn link_select(link: &LinkDescriptor, parent_ids: Vec<String>) -> Result<Select, DatabaseError> {
    let parent_column = ColumnRef::new(link.link_table.clone(), link.link_source_column.clone());
    let target_id = ColumnRef::new(link.target_table.clone(), Identifier::id());

    let mut select = Select::new(
        TableRef::new(link.target_table.clone()),
        vec![
            SelectColumn::new(Column::Star(link.target_table.clone())),
            // Last, so that removing it keeps the order of the other attributes
            SelectColumn::aliased(
                Column::Physical(parent_column.clone()),
                Identifier::new(PARENT_ID)?,
            ),
        ],
    );
    select.joins.push(Join::inner(
        TableRef::new(link.link_table.clone()),
        Predicate::Eq(
            ColumnRef::new(link.link_table.clone(), link.link_target_column.clone()),
            target_id.clone(),
        ),
    ));
    select.predicate = Predicate::TextIn(parent_column, parent_ids);
    select.order_by = Some(OrderBy(vec![OrderByElement(target_id, Ordering::Asc)]));

    Ok(select)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use crate::{
        relation::{LinkDecl, RelationDecl},
        selection::parse_expand_param,
        sql::ExpressionBuilder,
        testing::{MemoryDatastore, MemoryTable},
    };

    use super::*;

    fn store() -> Arc<MemoryDatastore> {
        Arc::new(
            MemoryDatastore::new()
                .with_table(
                    MemoryTable::new("users", &["id", "name", "password_hash", "department_id"])
                        .with_rows([
                            json!({"id": 10, "name": "Ada", "password_hash": "x", "department_id": 1}),
                            json!({"id": 11, "name": "Grace", "password_hash": "y", "department_id": null}),
                        ]),
                )
                .with_table(
                    MemoryTable::new("departments", &["id", "name"])
                        .with_row(json!({"id": 1, "name": "Support"})),
                )
                .with_table(MemoryTable::new("roles", &["id", "name"]).with_rows([
                    json!({"id": 1, "name": "agent"}),
                    json!({"id": 2, "name": "admin"}),
                ]))
                .with_table(MemoryTable::new("user_roles", &["user_id", "role_id"]).with_rows([
                    json!({"user_id": 10, "role_id": 2}),
                    json!({"user_id": 10, "role_id": 1}),
                    json!({"user_id": 11, "role_id": 1}),
                ])),
        )
    }

    fn registry() -> RelationRegistry {
        RelationRegistry::builder()
            .generic(
                RelationDecl::new("department_id", "departments", "department")
                    .allowed(&["id", "name"]),
            )
            .generic(
                RelationDecl::new("manager_id", "users", "manager").allowed(&["id", "name"]),
            )
            .link(LinkDecl::new("users", "roles", "roles").via("user_roles", "user_id", "role_id"))
            .link(
                LinkDecl::new("roles", "permissions", "permissions").via(
                    "role_permissions",
                    "role_id",
                    "permission_id",
                ),
            )
            .build()
            .unwrap()
    }

    fn users() -> Vec<JsonObject> {
        vec![
            json!({"id": 10, "name": "Ada", "department_id": 1}),
            json!({"id": 11, "name": "Grace", "department_id": null}),
            json!({"id": 10, "name": "Ada", "department_id": 1}),
        ]
        .into_iter()
        .map(|value| value.as_object().unwrap().clone())
        .collect()
    }

    #[test]
    fn link_statement() {
        let link = registry().link("users", "roles").unwrap().clone();
        let select = link_select(&link, vec!["10".into(), "11".into()]).unwrap();

        assert_binding!(
            select.to_sql(),
            r#"SELECT "roles".*, "user_roles"."user_id" AS "__parent_id" FROM "roles" INNER JOIN "user_roles" ON "user_roles"."role_id" = "roles"."id" WHERE "user_roles"."user_id"::text = ANY($1) ORDER BY "roles"."id" ASC"#,
            vec!["10".to_string(), "11".to_string()]
        );
    }

    #[tokio::test]
    async fn links_and_relations_are_batched() {
        let store = store();
        let catalog = SchemaCatalog::new(store.clone());
        let registry = registry();
        let resolver = ExpansionResolver::new(&catalog, &registry);

        let tree = parse_expand_param("roles,department");
        let rows = resolver
            .resolve("users".into(), users(), &tree)
            .await
            .unwrap();

        assert_eq!(
            Value::Array(rows.into_iter().map(Value::Object).collect()),
            json!([
                {
                    "id": 10, "name": "Ada", "department_id": 1,
                    "roles": [{"id": 1, "name": "agent"}, {"id": 2, "name": "admin"}],
                    "department": {"id": 1, "name": "Support"}
                },
                {
                    "id": 11, "name": "Grace", "department_id": null,
                    "roles": [{"id": 1, "name": "agent"}],
                    "department": null
                },
                {
                    "id": 10, "name": "Ada", "department_id": 1,
                    "roles": [{"id": 1, "name": "agent"}, {"id": 2, "name": "admin"}],
                    "department": {"id": 1, "name": "Support"}
                },
            ])
        );
        assert_eq!(store.select_count(), 2);
    }

    #[tokio::test]
    async fn absent_tables_expand_without_querying() {
        let store = store();
        let catalog = SchemaCatalog::new(store.clone());
        let registry = registry();
        let resolver = ExpansionResolver::new(&catalog, &registry);

        // `role_permissions` and `permissions` don't exist
        let tree = parse_expand_param("roles.permissions");
        let rows = resolver
            .resolve("users".into(), users(), &tree)
            .await
            .unwrap();

        for row in &rows {
            for role in row["roles"].as_array().unwrap() {
                assert_eq!(role["permissions"], json!([]));
            }
        }
        assert_eq!(store.select_count(), 1);
    }

    #[tokio::test]
    async fn unknown_keys_are_ignored() {
        let store = store();
        let catalog = SchemaCatalog::new(store.clone());
        let registry = registry();
        let resolver = ExpansionResolver::new(&catalog, &registry);

        let tree = parse_expand_param("name,nonexistent.deeper,manager");
        let rows = resolver
            .resolve("users".into(), users(), &tree)
            .await
            .unwrap();

        assert_eq!(rows, users());
        assert_eq!(store.select_count(), 0);
    }
}
