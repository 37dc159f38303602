// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use tracing::debug;

use crate::{
    database_error::DatabaseError,
    relation::{RelationDescriptor, RelationRegistry},
    request::{SortRequest, SortSpec},
    schema::SchemaCatalog,
    sql::{
        column::{Column, ColumnRef, SelectColumn},
        identifier::Identifier,
        join::Join,
        limit::Limit,
        order::{OrderBy, OrderByElement, Ordering},
        predicate::Predicate,
        select::Select,
        table::TableRef,
    },
};

use super::query::{DetailQuery, ExtraColumn, ListQuery};

/// The single statement for a list or detail request, along with the relations it embeds.
#[derive(Debug)]
pub(crate) struct ComposedSelect {
    pub select: Select,
    /// The relations whose key is present in every row (as the joined row, or null)
    pub relations: Vec<RelationDescriptor>,
}

/// Builds list and detail statements that join every resolvable relation of the base table.
pub(crate) struct QueryComposer<'a> {
    catalog: &'a SchemaCatalog,
    registry: &'a RelationRegistry,
}

impl<'a> QueryComposer<'a> {
    pub fn new(catalog: &'a SchemaCatalog, registry: &'a RelationRegistry) -> Self {
        Self { catalog, registry }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ComposedSelect, DatabaseError> {
        let mut composed = self.compose(&query.table, &query.extra_columns).await?;

        if let Some(filter) = &query.filter {
            composed.select.predicate = Predicate::Fragment(filter.clone());
        }

        if let Some(sort) = &query.sort {
            let request = SortRequest::from_query(&query.params);
            composed.select.order_by = self.order_by(&query.table, sort, &request).await;
        }

        if let Some(pagination) = &query.pagination {
            composed.select.limit = Some(pagination.limit());
            composed.select.offset = Some(pagination.offset());
        }

        Ok(composed)
    }

    pub async fn detail(&self, query: &DetailQuery) -> Result<ComposedSelect, DatabaseError> {
        let mut composed = self.compose(&query.table, &query.extra_columns).await?;

        let id_predicate = Predicate::TextEq(
            ColumnRef::new(query.table.clone(), Identifier::id()),
            query.id.clone(),
        );
        let filter = query
            .filter
            .clone()
            .map(Predicate::Fragment)
            .unwrap_or(Predicate::True);

        composed.select.predicate = Predicate::and(id_predicate, filter);
        composed.select.limit = Some(Limit(1));

        Ok(composed)
    }

    /// `SELECT "<table>".*, <relations>, <extra columns> FROM "<table>" LEFT JOIN ...`
    ///
    /// Each relation contributes its key to every row: the joined row as a JSON object (or null
    /// if nothing matched), or a plain null if the target table doesn't exist.
    async fn compose(
        &self,
        table: &Identifier,
        extra_columns: &[ExtraColumn],
    ) -> Result<ComposedSelect, DatabaseError> {
        let relations = self.registry.relations_for(self.catalog, table.as_str()).await;

        let mut targets: Vec<String> = relations
            .iter()
            .map(|relation| relation.target_table.to_string())
            .collect();
        targets.sort();
        targets.dedup();

        let existing_targets = if targets.is_empty() {
            Default::default()
        } else {
            self.registry.targets_exist(self.catalog, &targets).await
        };

        let mut columns = vec![SelectColumn::new(Column::Star(table.clone()))];
        let mut joins = vec![];

        for (index, relation) in relations.iter().enumerate() {
            if existing_targets.contains(relation.target_table.as_str()) {
                let alias = Identifier::new(format!("_rel{index}"))?;

                joins.push(Join::left(
                    TableRef::aliased(relation.target_table.clone(), alias.clone()),
                    Predicate::Eq(
                        ColumnRef::new(table.clone(), relation.source_column.clone()),
                        ColumnRef::new(alias.clone(), Identifier::id()),
                    ),
                ));
                columns.push(SelectColumn::aliased(
                    Column::RowJson {
                        table: alias,
                        key: Identifier::id(),
                    },
                    relation.relation_key.clone(),
                ));
            } else {
                debug!(
                    "Target table {} of {table}.{} does not exist",
                    relation.target_table, relation.relation_key
                );
                columns.push(SelectColumn::aliased(
                    Column::Null,
                    relation.relation_key.clone(),
                ));
            }
        }

        for extra in extra_columns {
            columns.push(SelectColumn::aliased(
                Column::Expression(extra.expression.clone()),
                extra.alias.clone(),
            ));
        }

        let mut select = Select::new(TableRef::new(table.clone()), columns);
        select.joins = joins;

        Ok(ComposedSelect { select, relations })
    }

    /// The requested sort if the column is allow-listed and exists, or else the default one (if
    /// its column exists).
    async fn order_by(
        &self,
        table: &Identifier,
        sort: &SortSpec,
        request: &SortRequest,
    ) -> Option<OrderBy> {
        if let Some((column, ordering)) = sort.requested(request) {
            if self.catalog.column_exists(table.as_str(), column.as_str()).await {
                return Some(order_by(table, column, ordering));
            }
            debug!("Sort column {column} does not exist on {table}, using the default sort");
        }

        let (column, ordering) = sort.fallback(request);
        self.catalog
            .column_exists(table.as_str(), column.as_str())
            .await
            .then(|| order_by(table, column, ordering))
    }
}

fn order_by(table: &Identifier, column: &Identifier, ordering: Ordering) -> OrderBy {
    OrderBy(vec![OrderByElement(
        ColumnRef::new(table.clone(), column.clone()),
        ordering,
    )])
}
