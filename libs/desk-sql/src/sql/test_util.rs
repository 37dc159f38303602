// Copyright Exograph, Inc. All rights reserved.
//
// Use of this software is governed by the Business Source License
// included in the LICENSE file at the root of this repository.
//
// As of the Change Date specified in that file, in accordance with
// the Business Source License, use of this software will be governed
// by the Apache License, Version 2.0.

macro_rules! assert_params {
    ($actual_params:expr) => {
        assert!($actual_params.is_empty(), "expected no params, got {:?}", $actual_params);
    };
    ($actual_params:expr, $($expected_param:expr),+) => {
        let actual_params = &$actual_params;
        let mut index = 0;
        $(
            let expected = $expected_param;
            let actual = actual_params.get(index).expect("fewer params than expected");
            assert!(
                $crate::sql::SQLParam::eq(&**actual, &expected as &dyn $crate::sql::SQLParam),
                "param {} mismatch: {:?} != {:?}",
                index + 1,
                actual,
                expected
            );
            index += 1;
        )+
        assert_eq!(actual_params.len(), index, "more params than expected");
    };
}

macro_rules! assert_binding {
    ($actual:expr, $expected_stmt:expr) => {
        let actual = $actual;
        assert_eq!(actual.sql.as_str(), $expected_stmt);
        assert_params!(actual.params);
    };
    ($actual:expr, $expected_stmt:expr, $($rest:expr),+) => {
        let actual = $actual;
        assert_eq!(actual.sql.as_str(), $expected_stmt);
        assert_params!(actual.params, $($rest),+);
    };
}
