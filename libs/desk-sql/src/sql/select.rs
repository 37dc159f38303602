// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{
    ExpressionBuilder, SQLBuilder, SQLStatement,
    column::{Column, SelectColumn},
    identifier::Identifier,
    join::Join,
    limit::Limit,
    offset::Offset,
    order::OrderBy,
    predicate::Predicate,
    table::TableRef,
};

/// Output column carrying each row's position in an ordered JSON statement. Datastores drop it
/// from the decoded rows.
pub const POSITION_COLUMN: &str = "__position";

/// A select statement
#[derive(Debug, Clone)]
pub struct Select {
    /// The table to select from
    pub table: TableRef,
    /// The columns to select
    pub columns: Vec<SelectColumn>,
    /// Tables joined to the `table`, in order
    pub joins: Vec<Join>,
    /// The predicate to filter the rows
    pub predicate: Predicate,
    /// The order by clause
    pub order_by: Option<OrderBy>,
    /// The limit clause
    pub limit: Option<Limit>,
    /// The offset clause
    pub offset: Option<Offset>,
}

impl Select {
    pub fn new(table: TableRef, columns: Vec<SelectColumn>) -> Self {
        Self {
            table,
            columns,
            joins: vec![],
            predicate: Predicate::True,
            order_by: None,
            limit: None,
            offset: None,
        }
    }

    /// Build a statement that returns all the rows of this select as a single JSON array (in
    /// text form), so that rows come back as JSON objects regardless of the column types involved.
    ///
    /// `SELECT COALESCE(json_agg("q"), '[]'::json)::text FROM (<select>) AS "q"`
    ///
    /// `json_agg` doesn't follow the order of its input, so an ordered select also outputs each
    /// row's position (as [`POSITION_COLUMN`], after every other column) and aggregates by it.
    pub fn to_json_statement(&self) -> SQLStatement {
        let mut builder = SQLBuilder::new();

        match &self.order_by {
            Some(order_by) => {
                let mut select = self.clone();
                select.columns.push(SelectColumn::aliased(
                    Column::RowNumber(order_by.clone()),
                    Identifier::position(),
                ));

                builder.push_str("SELECT COALESCE(json_agg(\"q\" ORDER BY \"q\".");
                builder.push_identifier(&Identifier::position());
                builder.push_str("), ");
                builder.push_literal("[]");
                builder.push_str("::json)::text FROM (");
                select.build(&mut builder);
            }
            None => {
                builder.push_str("SELECT COALESCE(json_agg(\"q\"), ");
                builder.push_literal("[]");
                builder.push_str("::json)::text FROM (");
                self.build(&mut builder);
            }
        }

        builder.push_str(") AS \"q\"");
        builder.into_sql()
    }
}

impl ExpressionBuilder for Select {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_str("SELECT ");
        builder.push_elems(&self.columns, ", ");

        builder.push_str(" FROM ");
        self.table.build(builder);

        for join in &self.joins {
            builder.push_space();
            join.build(builder);
        }

        // Avoid correct, but inelegant "WHERE TRUE" clause
        if !self.predicate.is_true() {
            builder.push_str(" WHERE ");
            self.predicate.build(builder);
        }
        if let Some(order_by) = &self.order_by {
            builder.push_space();
            order_by.build(builder);
        }
        if let Some(limit) = &self.limit {
            builder.push_space();
            limit.build(builder);
        }
        if let Some(offset) = &self.offset {
            builder.push_space();
            offset.build(builder);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::sql::{
        SQLParam,
        column::{Column, ColumnRef},
        identifier::Identifier,
        order::{OrderByElement, Ordering},
        predicate::WhereClause,
    };

    use super::*;

    fn ident(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    #[test]
    fn joined_select() {
        let mut select = Select::new(
            TableRef::new(ident("orders")),
            vec![
                SelectColumn::new(Column::Star(ident("orders"))),
                SelectColumn::aliased(
                    Column::RowJson {
                        table: ident("_rel0"),
                        key: ident("id"),
                    },
                    ident("customer"),
                ),
                SelectColumn::aliased(Column::Null, ident("warehouse")),
            ],
        );
        select.joins.push(Join::left(
            TableRef::aliased(ident("customers"), ident("_rel0")),
            Predicate::Eq(
                ColumnRef::new(ident("orders"), ident("customer_id")),
                ColumnRef::new(ident("_rel0"), ident("id")),
            ),
        ));
        select.predicate = Predicate::Fragment(WhereClause::new(
            "orders.total > $1",
            vec![Arc::new(5i32) as Arc<dyn SQLParam>],
        ));
        select.order_by = Some(OrderBy(vec![OrderByElement(
            ColumnRef::new(ident("orders"), ident("id")),
            Ordering::Desc,
        )]));
        select.limit = Some(Limit(20));
        select.offset = Some(Offset(40));

        assert_binding!(
            select.to_sql(),
            r#"SELECT "orders".*, CASE WHEN "_rel0"."id" IS NULL THEN NULL ELSE row_to_json("_rel0".*) END AS "customer", NULL AS "warehouse" FROM "orders" LEFT JOIN "customers" AS "_rel0" ON "orders"."customer_id" = "_rel0"."id" WHERE (orders.total > $1) ORDER BY "orders"."id" DESC LIMIT $2 OFFSET $3"#,
            5i32,
            20i64,
            40i64
        );
    }

    #[test]
    fn json_statement_wraps_select() {
        let select = Select::new(
            TableRef::new(ident("people")),
            vec![SelectColumn::new(Column::Star(ident("people")))],
        );

        assert_binding!(
            select.to_json_statement(),
            r#"SELECT COALESCE(json_agg("q"), '[]'::json)::text FROM (SELECT "people".* FROM "people") AS "q""#
        );
    }

    #[test]
    fn ordered_json_statement_aggregates_by_position() {
        let mut select = Select::new(
            TableRef::new(ident("tickets")),
            vec![SelectColumn::new(Column::Star(ident("tickets")))],
        );
        select.order_by = Some(OrderBy(vec![OrderByElement(
            ColumnRef::new(ident("tickets"), ident("id")),
            Ordering::Desc,
        )]));
        select.limit = Some(Limit(20));

        assert_binding!(
            select.to_json_statement(),
            r#"SELECT COALESCE(json_agg("q" ORDER BY "q"."__position"), '[]'::json)::text FROM (SELECT "tickets".*, ROW_NUMBER() OVER (ORDER BY "tickets"."id" DESC) AS "__position" FROM "tickets" ORDER BY "tickets"."id" DESC LIMIT $1) AS "q""#,
            20i64
        );
    }
}
