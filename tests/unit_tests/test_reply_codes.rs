// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! §3's named reply-code table, checked against the constants the engine
//! actually arms as triggers.

use mftp_client_rs::reply::signal;

#[test]
fn named_codes_match_the_spec_table() {
    assert_eq!(signal::DATA_CONNECTION_OPEN_STARTING_TRANSFER, 125);
    assert_eq!(signal::ABOUT_TO_OPEN_DATA_CONNECTION, 150);
    assert_eq!(signal::COMMAND_OKAY, 200);
    assert_eq!(signal::FILE_STATUS, 213);
    assert_eq!(signal::SERVICE_READY, 220);
    assert_eq!(signal::GOODBYE, 221);
    assert_eq!(signal::TRANSFER_COMPLETE, 226);
    assert_eq!(signal::ENTERING_PASSIVE_MODE, 227);
    assert_eq!(signal::ENTERING_EXTENDED_PASSIVE_MODE, 229);
    assert_eq!(signal::LOGGED_IN, 230);
    assert_eq!(signal::TLS_SUCCESSFUL, 234);
    assert_eq!(signal::REQUESTED_ACTION_OKAY, 250);
    assert_eq!(signal::MKDIR_SUCCESS_OR_PWD, 257);
    assert_eq!(signal::PASSWORD_REQUIRED, 331);
    assert_eq!(signal::REQUEST_FURTHER_INFORMATION, 350);
    assert_eq!(signal::REQUESTED_ACTION_ABORTED, 451);
    assert_eq!(signal::NOT_LOGGED_IN, 530);
    assert_eq!(signal::FILE_ERROR, 550);
}

#[test]
fn every_named_code_other_than_the_4xx_5xx_ones_is_not_an_error() {
    let non_error_codes = [
        signal::DATA_CONNECTION_OPEN_STARTING_TRANSFER,
        signal::ABOUT_TO_OPEN_DATA_CONNECTION,
        signal::COMMAND_OKAY,
        signal::FILE_STATUS,
        signal::SERVICE_READY,
        signal::GOODBYE,
        signal::TRANSFER_COMPLETE,
        signal::ENTERING_PASSIVE_MODE,
        signal::ENTERING_EXTENDED_PASSIVE_MODE,
        signal::LOGGED_IN,
        signal::TLS_SUCCESSFUL,
        signal::REQUESTED_ACTION_OKAY,
        signal::MKDIR_SUCCESS_OR_PWD,
        signal::PASSWORD_REQUIRED,
        signal::REQUEST_FURTHER_INFORMATION,
    ];
    for code in non_error_codes {
        assert!(!signal::is_error(i32::from(code)), "{code} should not be an error code");
    }
    for code in [signal::REQUESTED_ACTION_ABORTED, signal::NOT_LOGGED_IN, signal::FILE_ERROR] {
        assert!(signal::is_error(i32::from(code)), "{code} should be an error code");
    }
}
