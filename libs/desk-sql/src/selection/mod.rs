// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

mod bracket;
mod flat;
mod node;
mod spec;

pub use bracket::{BracketSelection, parse_bracket_select};
pub use flat::{parse_expand_param, parse_fields_param};
pub use node::{ExpandTree, SelectionNode};
pub use spec::SelectionSpec;
