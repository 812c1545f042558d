// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: Validate dense and ragged (test, channel) slicing through lazy navigation.
// Author: Lukas Bower
#![forbid(unsafe_code)]

mod common;

use common::fixture;
use hawk_store::{slice, Error, FetchError, Slice};

#[test]
fn uniform_selection_is_dense() {
    let fx = fixture();
    let data = fx.open();
    let lms = data.group("LMS").expect("LMS");
    let tests = [("BR_AR", "01"), ("BR_AR", "02")];
    let channels = [("frf", "LLC-01"), ("frf", "LLC-02")];

    let result = slice(&lms, &tests, &channels).expect("slice");
    let array = result.as_dense().expect("dense");
    assert_eq!(array.shape(), &[4, 1, 2, 2]);
    assert_eq!(array[[0, 0, 0, 0]], 0.0);
    assert_eq!(array[[3, 0, 1, 0]], 13.0);
    assert_eq!(array[[2, 0, 1, 1]], 112.0);
    // Header plus one download per repeat shard.
    assert_eq!(fx.transport.calls(), 3);
}

#[test]
fn ragged_selection_falls_back_to_nested_series() {
    let fx = fixture();
    let data = fx.open();
    let lms = data.group("LMS").expect("LMS");
    let tests = [("BR_AR".to_string(), "01".to_string())];
    let channels = [("frf", "LLC-01"), ("coh", "LLC-01")];

    match slice(&lms, &tests, &channels).expect("slice") {
        Slice::Ragged(rows) => {
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0][0].len(), 4);
            assert_eq!(rows[0][1].len(), 3);
        }
        Slice::Dense(array) => panic!("expected ragged fallback, got {:?}", array.shape()),
    }
}

#[test]
fn unknown_cells_propagate_navigation_errors() {
    let fx = fixture();
    let data = fx.open();
    let lms = data.group("LMS").expect("LMS");
    let err = slice(&lms, &[("RPH_AR", "01")], &[("acc", "LLC-01")]).unwrap_err();
    assert!(matches!(
        err,
        Error::Fetch { source: FetchError::UnknownShard { .. }, .. }
    ));
}
