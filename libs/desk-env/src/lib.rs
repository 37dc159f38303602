// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

//! Read-only access to configuration values.
//!
//! Everything that reads configuration goes through [`Environment`] instead of `std::env`, so
//! tests can supply values through a [`MapEnvironment`] without touching the process
//! environment.

use std::str::FromStr;

mod composite;
mod map;

pub use composite::CompositeEnvironment;
pub use map::MapEnvironment;

pub trait Environment: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;

    fn enabled(&self, key: &str, default_value: bool) -> Result<bool, EnvError> {
        match self.get(key) {
            Some(value) => match value.to_lowercase().as_str() {
                "true" | "1" | "yes" | "on" | "enabled" | "enable" => Ok(true),
                "false" | "0" | "no" | "off" | "disabled" | "disable" => Ok(false),
                _ => Err(EnvError::InvalidBoolean {
                    key: key.to_string(),
                    value,
                }),
            },
            None => Ok(default_value),
        }
    }

    fn get_or_else(&self, key: &str, default_value: &str) -> String {
        self.get(key).unwrap_or(default_value.to_string())
    }

    /// Parse the value of `key` into `T`, returning `None` if the key isn't set.
    fn get_parsed<T: FromStr>(&self, key: &str) -> Result<Option<T>, EnvError>
    where
        Self: Sized,
    {
        parse_value(self.get(key), key)
    }
}

/// Same as [`Environment::get_parsed`], but usable through a `&dyn Environment`.
pub fn get_parsed<T: FromStr>(env: &dyn Environment, key: &str) -> Result<Option<T>, EnvError> {
    parse_value(env.get(key), key)
}

fn parse_value<T: FromStr>(value: Option<String>, key: &str) -> Result<Option<T>, EnvError> {
    match value {
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| EnvError::InvalidValue {
                key: key.to_string(),
                value,
                expected: std::any::type_name::<T>(),
            }),
        None => Ok(None),
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvError {
    #[error(
        "Invalid value for {key}: {value}. Expected true, 1, yes, on, enabled, enable OR false, 0, no, off, disabled, disable"
    )]
    InvalidBoolean { key: String, value: String },

    #[error("Invalid value for {key}: {value}. Expected a value of type {expected}")]
    InvalidValue {
        key: String,
        value: String,
        expected: &'static str,
    },

    #[error("Missing required env {0}")]
    Missing(&'static str),
}

pub struct SystemEnvironment;

impl Environment for SystemEnvironment {
    fn get(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}
