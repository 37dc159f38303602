// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::collections::HashSet;

use indexmap::IndexMap;
use thiserror::Error;
use tracing::warn;

use crate::schema::SchemaCatalog;

use super::descriptor::{
    LinkDecl, LinkDescriptor, RelationDecl, RelationDescriptor, identifier,
};

#[derive(Error, Debug, PartialEq)]
pub enum RegistryError {
    #[error("Invalid identifier '{0}' in a relation declaration")]
    InvalidIdentifier(String),

    #[error("Relation {0} is declared more than once")]
    DuplicateRelation(String),

    #[error("Relation key '{key}' is used more than once for {scope}")]
    DuplicateKey { scope: String, key: String },

    #[error("Relation key '{key}' for {scope} is also the name of a relation's source column")]
    KeyCollision { scope: String, key: String },
}

/// The relation graph: which columns are foreign keys (to which table, under which key) and
/// which many-to-many links exist.
///
/// A relation declared for a specific `(table, column)` takes precedence over the generic one
/// declared for `column` alone, since the same column name (such as `category_id`) may refer to
/// different tables depending on where it appears.
#[derive(Debug)]
pub struct RelationRegistry {
    /// Keyed by source column
    generic: IndexMap<String, RelationDescriptor>,
    /// Keyed by (table, source column)
    specific: IndexMap<(String, String), RelationDescriptor>,
    /// Keyed by (source table, relation key)
    links: IndexMap<(String, String), LinkDescriptor>,
}

impl RelationRegistry {
    pub fn builder() -> RelationRegistryBuilder {
        RelationRegistryBuilder::default()
    }

    /// The relations of `table` whose source column exists, in declaration order (specific ones
    /// first).
    ///
    /// A relation whose key is also an actual column of `table` is skipped, since its value would
    /// replace the column's value in the enriched row.
    pub async fn relations_for(
        &self,
        catalog: &SchemaCatalog,
        table: &str,
    ) -> Vec<RelationDescriptor> {
        let mut relations = vec![];

        for descriptor in self.candidates(table) {
            if !catalog
                .column_exists(table, descriptor.source_column.as_str())
                .await
            {
                continue;
            }
            if catalog
                .column_exists(table, descriptor.relation_key.as_str())
                .await
            {
                warn!(
                    "Skipping relation {table}.{}: the key collides with an existing column",
                    descriptor.relation_key
                );
                continue;
            }
            relations.push(descriptor.clone());
        }

        relations
    }

    /// The many-to-one relation of `table` named `key`, if it applies to the table.
    pub async fn relation_by_key(
        &self,
        catalog: &SchemaCatalog,
        table: &str,
        key: &str,
    ) -> Option<RelationDescriptor> {
        let descriptor = self
            .candidates(table)
            .find(|descriptor| descriptor.relation_key == key)?;

        let applies = catalog
            .column_exists(table, descriptor.source_column.as_str())
            .await
            && !catalog.column_exists(table, key).await;

        applies.then(|| descriptor.clone())
    }

    /// The subset of `tables` that exist (checked together).
    pub async fn targets_exist(
        &self,
        catalog: &SchemaCatalog,
        tables: &[String],
    ) -> HashSet<String> {
        catalog.tables_exist(tables).await
    }

    pub fn links_for<'a>(&'a self, table: &'a str) -> impl Iterator<Item = &'a LinkDescriptor> {
        self.links
            .iter()
            .filter(move |((source_table, _), _)| source_table == table)
            .map(|(_, link)| link)
    }

    pub fn link(&self, table: &str, key: &str) -> Option<&LinkDescriptor> {
        self.links.get(&(table.to_string(), key.to_string()))
    }

    /// Relations that may apply to `table` (if their source column exists).
    fn candidates<'a>(
        &'a self,
        table: &'a str,
    ) -> impl Iterator<Item = &'a RelationDescriptor> + Clone {
        let specific = self
            .specific
            .iter()
            .filter(move |((specific_table, _), _)| specific_table == table)
            .map(|(_, descriptor)| descriptor);

        let generic = self.generic.values().filter(move |descriptor| {
            !self.specific.contains_key(&(
                table.to_string(),
                descriptor.source_column.to_string(),
            ))
        });

        specific.chain(generic)
    }

    fn check_keys(&self) -> Result<(), RegistryError> {
        let mut tables: Vec<&str> = self
            .specific
            .keys()
            .chain(self.links.keys())
            .map(|(table, _)| table.as_str())
            .collect();
        tables.sort();
        tables.dedup();

        Self::check_scope_keys(
            "all tables",
            self.generic.values(),
            std::iter::empty(),
        )?;

        for table in tables {
            Self::check_scope_keys(
                table,
                self.candidates(table),
                self.links_for(table).map(|link| link.relation_key.as_str()),
            )?;
        }

        Ok(())
    }

    fn check_scope_keys<'a>(
        scope: &str,
        relations: impl Iterator<Item = &'a RelationDescriptor> + Clone,
        link_keys: impl Iterator<Item = &'a str>,
    ) -> Result<(), RegistryError> {
        let source_columns: HashSet<&str> = relations
            .clone()
            .map(|descriptor| descriptor.source_column.as_str())
            .collect();

        let mut seen = HashSet::new();
        for key in relations
            .map(|descriptor| descriptor.relation_key.as_str())
            .chain(link_keys)
        {
            if source_columns.contains(key) {
                return Err(RegistryError::KeyCollision {
                    scope: scope.to_string(),
                    key: key.to_string(),
                });
            }
            if !seen.insert(key) {
                return Err(RegistryError::DuplicateKey {
                    scope: scope.to_string(),
                    key: key.to_string(),
                });
            }
        }

        Ok(())
    }
}

#[derive(Default)]
pub struct RelationRegistryBuilder {
    generic: Vec<RelationDecl>,
    specific: Vec<(String, RelationDecl)>,
    links: Vec<LinkDecl>,
}

impl RelationRegistryBuilder {
    /// A relation for every table that has the declared source column
    pub fn generic(mut self, relation: RelationDecl) -> Self {
        self.generic.push(relation);
        self
    }

    /// A relation for `table` only, overriding a generic relation with the same source column
    pub fn specific(mut self, table: &str, relation: RelationDecl) -> Self {
        self.specific.push((table.to_string(), relation));
        self
    }

    pub fn link(mut self, link: LinkDecl) -> Self {
        self.links.push(link);
        self
    }

    pub fn build(self) -> Result<RelationRegistry, RegistryError> {
        let mut generic = IndexMap::new();
        for relation in self.generic {
            let descriptor = relation.validate()?;
            let column = descriptor.source_column.to_string();
            if generic.contains_key(&column) {
                return Err(RegistryError::DuplicateRelation(column));
            }
            generic.insert(column, descriptor);
        }

        let mut specific = IndexMap::new();
        for (table, relation) in self.specific {
            let table = identifier(table)?.to_string();
            let descriptor = relation.validate()?;
            let key = (table, descriptor.source_column.to_string());
            if specific.contains_key(&key) {
                return Err(RegistryError::DuplicateRelation(format!("{}.{}", key.0, key.1)));
            }
            specific.insert(key, descriptor);
        }

        let mut links = IndexMap::new();
        for link in self.links {
            let descriptor = link.validate()?;
            let key = (
                descriptor.source_table.to_string(),
                descriptor.relation_key.to_string(),
            );
            if links.contains_key(&key) {
                return Err(RegistryError::DuplicateRelation(format!("{}.{}", key.0, key.1)));
            }
            links.insert(key, descriptor);
        }

        let registry = RelationRegistry {
            generic,
            specific,
            links,
        };
        registry.check_keys()?;

        Ok(registry)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::testing::{MemoryDatastore, MemoryTable};

    use super::*;

    fn registry() -> RelationRegistry {
        RelationRegistry::builder()
            .generic(RelationDecl::new("category_id", "ticket_categories", "category"))
            .generic(RelationDecl::new("created_by", "users", "creator"))
            .generic(RelationDecl::new("owner_id", "users", "owner"))
            .specific(
                "kb_articles",
                RelationDecl::new("category_id", "kb_categories", "category"),
            )
            .link(LinkDecl::new("users", "roles", "roles").via("user_roles", "user_id", "role_id"))
            .build()
            .unwrap()
    }

    fn catalog() -> SchemaCatalog {
        SchemaCatalog::seeded(
            Arc::new(MemoryDatastore::new()),
            [
                ("tickets", &["id", "category_id", "created_by"][..]),
                ("kb_articles", &["id", "created_by", "category_id"][..]),
                ("notes", &["id", "owner_id", "owner"][..]),
            ],
        )
    }

    fn summary(relations: &[RelationDescriptor]) -> Vec<(String, String, String)> {
        relations
            .iter()
            .map(|r| {
                (
                    r.source_column.to_string(),
                    r.target_table.to_string(),
                    r.relation_key.to_string(),
                )
            })
            .collect()
    }

    #[tokio::test]
    async fn specific_relations_take_precedence() {
        let registry = registry();
        let catalog = catalog();

        assert_eq!(
            summary(&registry.relations_for(&catalog, "tickets").await),
            vec![
                ("category_id".into(), "ticket_categories".into(), "category".into()),
                ("created_by".into(), "users".into(), "creator".into()),
            ]
        );
        assert_eq!(
            summary(&registry.relations_for(&catalog, "kb_articles").await),
            vec![
                ("category_id".into(), "kb_categories".into(), "category".into()),
                ("created_by".into(), "users".into(), "creator".into()),
            ]
        );
    }

    #[tokio::test]
    async fn relation_colliding_with_column_is_skipped() {
        let registry = registry();
        let catalog = catalog();

        assert!(registry.relations_for(&catalog, "notes").await.is_empty());
        assert!(registry.relation_by_key(&catalog, "notes", "owner").await.is_none());
        assert!(
            registry
                .relation_by_key(&catalog, "tickets", "creator")
                .await
                .is_some()
        );
    }

    #[tokio::test]
    async fn targets_are_checked_together() {
        let store = Arc::new(
            MemoryDatastore::new().with_table(MemoryTable::new("users", &["id", "name"])),
        );
        let catalog = SchemaCatalog::new(store.clone());

        let existing = registry()
            .targets_exist(&catalog, &["users".to_string(), "ticket_categories".to_string()])
            .await;

        assert_eq!(existing, HashSet::from(["users".to_string()]));
        assert_eq!(store.operations().len(), 1);
    }

    #[test]
    fn links() {
        let registry = registry();

        let link = registry.link("users", "roles").unwrap();
        assert_eq!(link.link_table, "user_roles");
        assert_eq!(registry.links_for("users").count(), 1);
        assert!(registry.link("roles", "users").is_none());
    }

    #[test]
    fn rejects_invalid_declarations() {
        assert_eq!(
            RelationRegistry::builder()
                .generic(RelationDecl::new("owner_id", "users", "owner_id"))
                .build()
                .unwrap_err(),
            RegistryError::KeyCollision {
                scope: "all tables".into(),
                key: "owner_id".into()
            }
        );

        assert_eq!(
            RelationRegistry::builder()
                .generic(RelationDecl::new("owner_id", "users", "owner"))
                .specific("notes", RelationDecl::new("owner", "users", "author"))
                .build()
                .unwrap_err(),
            RegistryError::KeyCollision {
                scope: "notes".into(),
                key: "owner".into()
            }
        );

        assert_eq!(
            RelationRegistry::builder()
                .generic(RelationDecl::new("owner_id", "users", "owner"))
                .generic(RelationDecl::new("owner_id", "teams", "team"))
                .build()
                .unwrap_err(),
            RegistryError::DuplicateRelation("owner_id".into())
        );

        assert_eq!(
            RelationRegistry::builder()
                .generic(RelationDecl::new("owner_id", "users", "owner"))
                .link(LinkDecl::new("tickets", "owner", "users").via("ticket_owners", "ticket_id", "user_id"))
                .build()
                .unwrap_err(),
            RegistryError::DuplicateKey {
                scope: "tickets".into(),
                key: "owner".into()
            }
        );

        assert_eq!(
            RelationRegistry::builder()
                .generic(RelationDecl::new("owner_id", "users\"; --", "owner"))
                .build()
                .unwrap_err(),
            RegistryError::InvalidIdentifier("users\"; --".into())
        );
    }
}
