// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use super::{ExpressionBuilder, SQLBuilder, identifier::Identifier, order::OrderBy};

/// A column of a table (or of an aliased table) in the current statement.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    /// The table name, or its alias if it has one
    pub table: Identifier,
    pub column: Identifier,
}

impl ColumnRef {
    pub fn new(table: Identifier, column: Identifier) -> Self {
        Self { table, column }
    }
}

impl ExpressionBuilder for ColumnRef {
    fn build(&self, builder: &mut SQLBuilder) {
        builder.push_column(&self.table, &self.column);
    }
}

/// Anything that may appear in the column list of a select.
#[derive(Debug, Clone, PartialEq)]
pub enum Column {
    /// An actual physical column in a table
    Physical(ColumnRef),
    /// All columns of a table: `"table".*`
    Star(Identifier),
    /// The whole row of a (joined) table as a single JSON object, or NULL if the join didn't match
    /// anything (checked through the `key` column, which is never null for an existing row).
    RowJson { table: Identifier, key: Identifier },
    /// A null value
    Null,
    /// Position of the row under the given ordering, starting at 1
    RowNumber(OrderBy),
    /// An expression supplied by the caller such as a `COUNT(*)` subquery. Never built from
    /// request input.
    Expression(String),
}

impl ExpressionBuilder for Column {
    fn build(&self, builder: &mut SQLBuilder) {
        match self {
            Column::Physical(column) => column.build(builder),
            Column::Star(table) => {
                builder.push_identifier(table);
                builder.push_str(".*");
            }
            Column::RowJson { table, key } => {
                builder.push_str("CASE WHEN ");
                builder.push_column(table, key);
                builder.push_str(" IS NULL THEN NULL ELSE row_to_json(");
                builder.push_identifier(table);
                builder.push_str(".*) END");
            }
            Column::Null => builder.push_str("NULL"),
            Column::RowNumber(order_by) => {
                builder.push_str("ROW_NUMBER() OVER (");
                order_by.build(builder);
                builder.push(')');
            }
            Column::Expression(expression) => {
                builder.push('(');
                builder.push_str(expression);
                builder.push(')');
            }
        }
    }
}

/// A column in the select list along with its (optional) output name.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectColumn {
    pub column: Column,
    pub alias: Option<Identifier>,
}

impl SelectColumn {
    pub fn new(column: Column) -> Self {
        Self {
            column,
            alias: None,
        }
    }

    pub fn aliased(column: Column, alias: Identifier) -> Self {
        Self {
            column,
            alias: Some(alias),
        }
    }
}

impl ExpressionBuilder for SelectColumn {
    fn build(&self, builder: &mut SQLBuilder) {
        self.column.build(builder);
        if let Some(alias) = &self.alias {
            builder.push_str(" AS ");
            builder.push_identifier(alias);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Identifier {
        Identifier::new(name).unwrap()
    }

    #[test]
    fn row_json() {
        let column = SelectColumn::aliased(
            Column::RowJson {
                table: ident("_rel0"),
                key: ident("id"),
            },
            ident("customer"),
        );

        assert_binding!(
            column.to_sql(),
            r#"CASE WHEN "_rel0"."id" IS NULL THEN NULL ELSE row_to_json("_rel0".*) END AS "customer""#
        );
    }

    #[test]
    fn null_and_expression() {
        assert_binding!(
            SelectColumn::aliased(Column::Null, ident("category")).to_sql(),
            r#"NULL AS "category""#
        );
        assert_binding!(
            SelectColumn::aliased(
                Column::Expression("SELECT COUNT(*) FROM messages m WHERE m.ticket_id = tickets.id".into()),
                ident("message_count")
            )
            .to_sql(),
            r#"(SELECT COUNT(*) FROM messages m WHERE m.ticket_id = tickets.id) AS "message_count""#
        );
    }
}
