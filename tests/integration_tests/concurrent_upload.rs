// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! §8 scenario S5: with `allow_multi` credentials stored and the root
//! session's data socket already busy, a second `fopen` spawns, authenticates,
//! and `cwd`s a sibling session rather than blocking on the root.

use std::io::Read;

use mftp_client_rs::{ClientConfig, Direction, OpenPosition, Security, Session};

use crate::integration_tests::common::{
    expect_quit, pasv_reply, read_line, spawn_data_server, spawn_multi_control_server, split,
    write_line,
};

#[test]
fn second_fopen_spawns_an_authenticated_sibling() {
    let data_port_root = spawn_data_server(|stream| {
        let mut stream = stream;
        let mut received = Vec::new();
        stream.read_to_end(&mut received).expect("read upload bytes");
        assert_eq!(received, b"hello-a");
    });
    let data_port_sibling = spawn_data_server(|stream| {
        let mut stream = stream;
        let mut received = Vec::new();
        stream.read_to_end(&mut received).expect("read upload bytes");
        assert_eq!(received, b"hello-b");
    });

    let root_handler = move |stream: std::net::TcpStream| {
        let (mut reader, mut writer) = split(stream);
        write_line(&mut writer, "220 ready");

        assert_eq!(read_line(&mut reader), "USER u");
        write_line(&mut writer, "230 ok");
        assert_eq!(read_line(&mut reader), "PWD");
        write_line(&mut writer, "257 \"/\" is the current directory");

        // First fopen: root is free, takes it directly.
        assert_eq!(read_line(&mut reader), "TYPE I");
        write_line(&mut writer, "200 Type set to I");
        assert_eq!(read_line(&mut reader), "PASV");
        write_line(&mut writer, &pasv_reply(data_port_root));
        assert_eq!(read_line(&mut reader), "STOR a.bin");
        write_line(&mut writer, "150 Ok to send data");
        write_line(&mut writer, "226 Transfer complete");

        expect_quit(&mut reader, &mut writer);
    };

    let sibling_handler = move |stream: std::net::TcpStream| {
        let (mut reader, mut writer) = split(stream);
        write_line(&mut writer, "220 ready");

        // generate_sibling: authenticate with the stored credentials...
        assert_eq!(read_line(&mut reader), "USER u");
        write_line(&mut writer, "230 ok");
        assert_eq!(read_line(&mut reader), "PWD");
        write_line(&mut writer, "257 \"/\" is the current directory");
        // ...then cwd into the root's current directory.
        assert_eq!(read_line(&mut reader), "CWD /");
        write_line(&mut writer, "250 CWD successful");

        assert_eq!(read_line(&mut reader), "TYPE I");
        write_line(&mut writer, "200 Type set to I");
        assert_eq!(read_line(&mut reader), "PASV");
        write_line(&mut writer, &pasv_reply(data_port_sibling));
        assert_eq!(read_line(&mut reader), "STOR b.bin");
        write_line(&mut writer, "150 Ok to send data");
        write_line(&mut writer, "226 Transfer complete");

        expect_quit(&mut reader, &mut writer);
    };

    let handlers: Vec<Box<dyn FnOnce(std::net::TcpStream) + Send>> =
        vec![Box::new(root_handler), Box::new(sibling_handler)];
    let port = spawn_multi_control_server(handlers);

    let cfg = ClientConfig { use_epsv: false, file_transfer_second_connection: false, ..ClientConfig::default() };
    let session = Session::open("127.0.0.1", port, Security::None, cfg).expect("open");
    session.auth("u", "p", true).expect("auth with multi enabled");

    let mut handle_a = session
        .fopen("a.bin", Direction::Write, OpenPosition::Start)
        .expect("first fopen takes the root connection");
    handle_a.fwrite(b"hello-a").expect("write a");

    // Root's data socket is still open: the second fopen must spawn a
    // sibling instead of waiting on it.
    let mut handle_b = session
        .fopen("b.bin", Direction::Write, OpenPosition::Start)
        .expect("second fopen spawns a sibling");
    handle_b.fwrite(b"hello-b").expect("write b");

    handle_a.fclose().expect("close a");
    handle_b.fclose().expect("close b");

    session.close().expect("close");
}
