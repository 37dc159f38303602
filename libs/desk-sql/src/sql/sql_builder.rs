// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

use std::sync::{Arc, LazyLock};

use regex::{Captures, Regex};

use super::{ExpressionBuilder, SQLParam, SQLStatement, identifier::Identifier};

static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(\d+)").expect("valid placeholder regex"));

pub struct SQLBuilder {
    /// The SQL being built with placeholders for each parameter
    sql: String,
    /// The list of parameters
    params: Vec<Arc<dyn SQLParam>>,
}

impl Default for SQLBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SQLBuilder {
    pub fn new() -> Self {
        Self {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a string
    pub fn push_str<T: AsRef<str>>(&mut self, s: T) {
        self.sql.push_str(s.as_ref());
    }

    /// Push a character
    pub fn push(&mut self, c: char) {
        self.sql.push(c);
    }

    /// Push an identifier surrounded by double quotes. Without the quotes, an identifier with
    /// uppercase letters would be interpreted the same as the lowercase one.
    pub fn push_identifier(&mut self, identifier: &Identifier) {
        self.sql.push('"');
        self.sql.push_str(identifier.as_str());
        self.sql.push('"');
    }

    /// Push `"<table>"."<column>"`
    pub fn push_column(&mut self, table: &Identifier, column: &Identifier) {
        self.push_identifier(table);
        self.push('.');
        self.push_identifier(column);
    }

    /// Push a string literal such as `'[]'`. Only meant for constants known at compile time.
    pub fn push_literal(&mut self, literal: &'static str) {
        self.sql.push('\'');
        self.sql.push_str(literal);
        self.sql.push('\'');
    }

    /// Push a space. This is a common operation, so it is provided as a separate method.
    pub fn push_space(&mut self) {
        self.sql.push(' ');
    }

    /// Push a parameter, which will be replaced with a placeholder in the SQL string
    /// and the parameter will be added to the list of parameters.
    pub fn push_param(&mut self, param: Arc<dyn SQLParam>) {
        self.params.push(param);
        self.push('$');
        self.push_str(self.params.len().to_string());
    }

    /// Push a trusted SQL fragment written against its own `$1..$n` placeholders (such as a
    /// WHERE clause built by the caller). The placeholders are shifted to follow the parameters
    /// already pushed, and the parameters are appended.
    pub fn push_fragment(&mut self, sql: &str, params: &[Arc<dyn SQLParam>]) {
        let shift = self.params.len();

        let renumbered = PLACEHOLDER.replace_all(sql, |caps: &Captures| {
            match caps[1].parse::<usize>() {
                Ok(index) => format!("${}", index + shift),
                Err(_) => caps[0].to_string(),
            }
        });

        self.sql.push_str(&renumbered);
        self.params.extend(params.iter().cloned());
    }

    /// Push elements of an iterator, separated by `sep`. The `push_elem` function provides
    /// the flexibility to map the elements (compared to [`SQLBuilder::push_elems`], which assumes that
    /// the elements implement [`ExpressionBuilder`] and [`build`](ExpressionBuilder::build) is all you need to call).
    pub fn push_iter<T>(
        &mut self,
        iter: impl ExactSizeIterator<Item = T>,
        sep: &str,
        push_elem: impl Fn(&mut Self, T),
    ) {
        let len = iter.len();
        for (i, item) in iter.enumerate() {
            push_elem(self, item);

            if i < len - 1 {
                self.sql.push_str(sep);
            }
        }
    }

    /// Push elements of a slice, separated by `sep`.
    pub fn push_elems<T: ExpressionBuilder>(&mut self, elems: &[T], sep: &str) {
        self.push_iter(elems.iter(), sep, |builder, elem| {
            elem.build(builder);
        });
    }

    /// Get the SQL string and the list of parameters. Calling this method should be the final step
    /// in building an SQL expression, and thus this builder consumes the `self`.
    pub fn into_sql(self) -> SQLStatement {
        SQLStatement {
            sql: self.sql,
            params: self.params,
        }
    }
}
