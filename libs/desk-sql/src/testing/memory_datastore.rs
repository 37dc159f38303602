// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::{
    cmp::Ordering as ValueOrdering,
    collections::{HashMap, HashSet},
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde_json::Value;

use crate::{
    database_error::DatabaseError,
    datastore::{Datastore, JsonObject, value_as_text},
    sql::{
        ExpressionBuilder,
        column::{Column, ColumnRef, SelectColumn},
        join::JoinKind,
        order::Ordering,
        predicate::Predicate,
        select::Select,
    },
};

/// An interaction with the datastore, recorded so that tests can assert on how many (and which)
/// queries were issued.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ColumnExists { table: String, column: String },
    TablesExist { tables: Vec<String> },
    Select { table: String, sql: String },
}

impl Operation {
    pub fn is_select(&self) -> bool {
        matches!(self, Operation::Select { .. })
    }
}

#[derive(Debug, Clone)]
pub struct MemoryTable {
    name: String,
    columns: Vec<String>,
    rows: Vec<JsonObject>,
}

impl MemoryTable {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: vec![],
        }
    }

    /// Add a row. Columns missing from `row` are null.
    pub fn with_row(mut self, row: Value) -> Self {
        match row {
            Value::Object(row) => self.rows.push(row),
            other => panic!("Rows of {} must be JSON objects, got {other}", self.name),
        }
        self
    }

    pub fn with_rows(self, rows: impl IntoIterator<Item = Value>) -> Self {
        rows.into_iter().fold(self, |table, row| table.with_row(row))
    }

    /// The row with every declared column, in declaration order (like `row_to_json` would)
    fn full_row(&self, row: &JsonObject) -> JsonObject {
        self.columns
            .iter()
            .map(|column| (column.clone(), row.get(column).cloned().unwrap_or(Value::Null)))
            .collect()
    }
}

/// A [`Datastore`] over in-memory tables.
///
/// Selects are evaluated directly from the [`Select`] structure, so joins, predicates, ordering
/// and pagination behave as they would against PostgreSQL. Raw SQL (where-clause fragments and
/// extra column expressions) can't be evaluated and fails the select.
#[derive(Default)]
pub struct MemoryDatastore {
    tables: IndexMap<String, MemoryTable>,
    fail_metadata: bool,
    operations: Mutex<Vec<Operation>>,
}

impl MemoryDatastore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: MemoryTable) -> Self {
        self.tables.insert(table.name.clone(), table);
        self
    }

    /// Make every metadata query fail
    pub fn failing_metadata(mut self) -> Self {
        self.fail_metadata = true;
        self
    }

    pub fn operations(&self) -> Vec<Operation> {
        self.locked_operations().clone()
    }

    pub fn count(&self, filter: impl Fn(&Operation) -> bool) -> usize {
        self.locked_operations().iter().filter(|op| filter(op)).count()
    }

    pub fn select_count(&self) -> usize {
        self.count(Operation::is_select)
    }

    pub fn clear_operations(&self) {
        self.locked_operations().clear();
    }

    fn record(&self, operation: Operation) {
        self.locked_operations().push(operation);
    }

    fn locked_operations(&self) -> std::sync::MutexGuard<'_, Vec<Operation>> {
        self.operations
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn metadata_available(&self) -> Result<(), DatabaseError> {
        if self.fail_metadata {
            Err(DatabaseError::Config("Metadata is unavailable".into()))
        } else {
            Ok(())
        }
    }

    fn table(&self, name: &str) -> Result<&MemoryTable, DatabaseError> {
        self.tables.get(name).ok_or_else(|| {
            DatabaseError::Validation(format!("relation \"{name}\" does not exist"))
        })
    }

    fn evaluate(&self, select: &Select) -> Result<Vec<JsonObject>, DatabaseError> {
        let base = self.table(select.table.name.as_str())?;
        let base_alias = select.table.reference().to_string();

        let mut tables = HashMap::from([(base_alias.clone(), base)]);
        let mut bindings: Vec<Binding> = base
            .rows
            .iter()
            .map(|row| Binding::from([(base_alias.clone(), Some(base.full_row(row)))]))
            .collect();

        for join in &select.joins {
            let joined = self.table(join.table.name.as_str())?;
            let alias = join.table.reference().to_string();
            tables.insert(alias.clone(), joined);

            let mut next = vec![];
            for binding in bindings {
                let mut matched = false;
                for row in &joined.rows {
                    let mut candidate = binding.clone();
                    candidate.insert(alias.clone(), Some(joined.full_row(row)));
                    if satisfies(&join.on, &candidate)? {
                        next.push(candidate);
                        matched = true;
                    }
                }
                if !matched && join.kind == JoinKind::Left {
                    let mut candidate = binding;
                    candidate.insert(alias.clone(), None);
                    next.push(candidate);
                }
            }
            bindings = next;
        }

        let mut selected = vec![];
        for binding in bindings {
            if satisfies(&select.predicate, &binding)? {
                selected.push(binding);
            }
        }

        if let Some(order_by) = &select.order_by {
            let mut keyed = selected
                .into_iter()
                .map(|binding| {
                    let keys = order_by
                        .0
                        .iter()
                        .map(|element| column_value(&element.0, &binding))
                        .collect::<Result<Vec<_>, _>>()?;
                    Ok((keys, binding))
                })
                .collect::<Result<Vec<_>, DatabaseError>>()?;

            keyed.sort_by(|(lhs, _), (rhs, _)| {
                lhs.iter()
                    .zip(rhs)
                    .zip(&order_by.0)
                    .map(|((l, r), element)| match element.1 {
                        Ordering::Asc => compare_values(l, r),
                        Ordering::Desc => compare_values(l, r).reverse(),
                    })
                    .find(|ordering| *ordering != ValueOrdering::Equal)
                    .unwrap_or(ValueOrdering::Equal)
            });

            selected = keyed.into_iter().map(|(_, binding)| binding).collect();
        }

        let offset = select.offset.map(|offset| offset.0.max(0) as usize);
        let limit = select.limit.map(|limit| limit.0.max(0) as usize);

        selected
            .iter()
            .skip(offset.unwrap_or(0))
            .take(limit.unwrap_or(usize::MAX))
            .map(|binding| output_row(&select.columns, binding, &tables))
            .collect()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn column_exists(&self, table: &str, column: &str) -> Result<bool, DatabaseError> {
        self.record(Operation::ColumnExists {
            table: table.to_string(),
            column: column.to_string(),
        });
        self.metadata_available()?;

        Ok(self
            .tables
            .get(table)
            .is_some_and(|table| table.columns.iter().any(|c| c == column)))
    }

    async fn existing_tables(&self, tables: &[String]) -> Result<HashSet<String>, DatabaseError> {
        self.record(Operation::TablesExist {
            tables: tables.to_vec(),
        });
        self.metadata_available()?;

        Ok(tables
            .iter()
            .filter(|table| self.tables.contains_key(table.as_str()))
            .cloned()
            .collect())
    }

    async fn select(&self, select: &Select) -> Result<Vec<JsonObject>, DatabaseError> {
        self.record(Operation::Select {
            table: select.table.name.to_string(),
            sql: select.to_sql().sql,
        });

        self.evaluate(select)
    }
}

/// Table alias to its row for one (partial) result row. `None` for a left join without a match.
type Binding = HashMap<String, Option<JsonObject>>;

fn column_value(column: &ColumnRef, binding: &Binding) -> Result<Value, DatabaseError> {
    match binding.get(column.table.as_str()) {
        Some(Some(row)) => row.get(column.column.as_str()).cloned().ok_or_else(|| {
            DatabaseError::Validation(format!(
                "column {}.{} does not exist",
                column.table, column.column
            ))
        }),
        Some(None) => Ok(Value::Null),
        None => Err(DatabaseError::Validation(format!(
            "missing FROM-clause entry for table \"{}\"",
            column.table
        ))),
    }
}

fn satisfies(predicate: &Predicate, binding: &Binding) -> Result<bool, DatabaseError> {
    Ok(match predicate {
        Predicate::True => true,
        Predicate::Eq(lhs, rhs) => {
            let lhs = value_as_text(&column_value(lhs, binding)?);
            let rhs = value_as_text(&column_value(rhs, binding)?);
            lhs.is_some() && lhs == rhs
        }
        Predicate::TextEq(column, value) => {
            value_as_text(&column_value(column, binding)?).as_ref() == Some(value)
        }
        Predicate::TextIn(column, values) => value_as_text(&column_value(column, binding)?)
            .is_some_and(|value| values.contains(&value)),
        Predicate::Fragment(clause) => {
            return Err(DatabaseError::Validation(format!(
                "SQL fragments can't be evaluated in memory: {}",
                clause.sql
            )));
        }
        Predicate::And(lhs, rhs) => satisfies(lhs, binding)? && satisfies(rhs, binding)?,
    })
}

/// Nulls sort after every other value (as they do in PostgreSQL by default)
fn compare_values(lhs: &Value, rhs: &Value) -> ValueOrdering {
    match (lhs, rhs) {
        (Value::Null, Value::Null) => ValueOrdering::Equal,
        (Value::Null, _) => ValueOrdering::Greater,
        (_, Value::Null) => ValueOrdering::Less,
        (Value::Number(l), Value::Number(r)) => l
            .as_f64()
            .partial_cmp(&r.as_f64())
            .unwrap_or(ValueOrdering::Equal),
        (Value::String(l), Value::String(r)) => l.cmp(r),
        (Value::Bool(l), Value::Bool(r)) => l.cmp(r),
        (l, r) => l.to_string().cmp(&r.to_string()),
    }
}

fn output_row(
    columns: &[SelectColumn],
    binding: &Binding,
    tables: &HashMap<String, &MemoryTable>,
) -> Result<JsonObject, DatabaseError> {
    let mut output = JsonObject::new();

    for select_column in columns {
        let alias = select_column.alias.as_ref().map(|alias| alias.to_string());

        match &select_column.column {
            Column::Star(table) => {
                let Some(memory_table) = tables.get(table.as_str()) else {
                    return Err(DatabaseError::Validation(format!(
                        "missing FROM-clause entry for table \"{table}\""
                    )));
                };
                let row = binding.get(table.as_str()).and_then(|row| row.as_ref());
                for column in &memory_table.columns {
                    let value = row
                        .and_then(|row| row.get(column))
                        .cloned()
                        .unwrap_or(Value::Null);
                    output.insert(column.clone(), value);
                }
            }
            Column::Physical(column) => {
                let value = column_value(column, binding)?;
                output.insert(alias.unwrap_or_else(|| column.column.to_string()), value);
            }
            Column::RowJson { table, key } => {
                let value = match binding.get(table.as_str()) {
                    Some(Some(row)) if !row.get(key.as_str()).is_none_or(Value::is_null) => {
                        Value::Object(row.clone())
                    }
                    Some(_) => Value::Null,
                    None => {
                        return Err(DatabaseError::Validation(format!(
                            "missing FROM-clause entry for table \"{table}\""
                        )));
                    }
                };
                output.insert(alias.unwrap_or_else(|| "row_to_json".to_string()), value);
            }
            Column::Null => {
                output.insert(alias.unwrap_or_else(|| "?column?".to_string()), Value::Null);
            }
            Column::RowNumber(_) => {
                return Err(DatabaseError::Validation(
                    "window functions can't be evaluated in memory".to_string(),
                ));
            }
            Column::Expression(expression) => {
                return Err(DatabaseError::Validation(format!(
                    "SQL expressions can't be evaluated in memory: {expression}"
                )));
            }
        }
    }

    Ok(output)
}
