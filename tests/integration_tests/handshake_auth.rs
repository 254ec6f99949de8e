// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! §8 scenario S1: greeting, `USER`/`PASS` login, and a clean `QUIT` on
//! close.

use mftp_client_rs::{FtpError, Security, Session};

use crate::integration_tests::common::{
    expect_quit, read_line, spawn_control_server, split, test_config, write_line,
};

#[test]
fn handshake_then_auth_then_close() {
    let port = spawn_control_server(|stream| {
        let (mut reader, mut writer) = split(stream);
        write_line(&mut writer, "220 ready");

        assert_eq!(read_line(&mut reader), "USER u");
        write_line(&mut writer, "331 need pass");

        assert_eq!(read_line(&mut reader), "PASS p");
        write_line(&mut writer, "230 ok");

        assert_eq!(read_line(&mut reader), "PWD");
        write_line(&mut writer, "257 \"/\" is the current directory");

        expect_quit(&mut reader, &mut writer);
    });

    let session = Session::open("127.0.0.1", port, Security::None, test_config()).expect("open");
    session.auth("u", "p", false).expect("auth");
    assert_eq!(session.get_cur_directory().expect("cwd"), "/");
    session.close().expect("close");
}

#[test]
fn wrong_password_surfaces_as_wrong_auth() {
    let port = spawn_control_server(|stream| {
        let (mut reader, mut writer) = split(stream);
        write_line(&mut writer, "220 ready");

        assert_eq!(read_line(&mut reader), "USER u");
        write_line(&mut writer, "331 need pass");

        assert_eq!(read_line(&mut reader), "PASS wrong");
        write_line(&mut writer, "530 Login incorrect");
    });

    let session = Session::open("127.0.0.1", port, Security::None, test_config()).expect("open");
    let err = session.auth("u", "wrong", false).expect_err("auth should fail");
    assert_eq!(err, FtpError::WrongAuth);
}
