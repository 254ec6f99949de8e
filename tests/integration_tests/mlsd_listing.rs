// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! §8 scenario S3: a real `MLSD` round-trip over a loopback data socket,
//! checked against every fact the listing carries, plus the MLSD→LIST
//! permanent downgrade on a server rejection.

use std::io::Write;

use mftp_client_rs::{ClientConfig, FileType, Security, Session};

use crate::integration_tests::common::{
    expect_quit, pasv_reply, read_line, spawn_control_server, spawn_data_server, split,
    write_line,
};

#[test]
fn mlsd_entry_facts_round_trip() {
    let data_port = spawn_data_server(|stream| {
        let mut stream = stream;
        stream
            .write_all(b"size=1024;modify=20240115103000;type=file; report.txt\r\n")
            .expect("write listing");
        let _ = stream.shutdown(std::net::Shutdown::Write);
    });

    let control_port = spawn_control_server(move |stream| {
        let (mut reader, mut writer) = split(stream);
        write_line(&mut writer, "220 ready");

        assert_eq!(read_line(&mut reader), "TYPE A");
        write_line(&mut writer, "200 Type set to A");
        assert_eq!(read_line(&mut reader), "PASV");
        write_line(&mut writer, &pasv_reply(data_port));
        assert_eq!(read_line(&mut reader), "MLSD");
        write_line(&mut writer, "150 Here comes the directory listing");
        write_line(&mut writer, "226 Transfer complete");

        expect_quit(&mut reader, &mut writer);
    });

    let cfg = ClientConfig { use_epsv: false, ..ClientConfig::default() };
    let session = Session::open("127.0.0.1", control_port, Security::None, cfg).expect("open");

    let listing = session.contents_of_directory().expect("listing");
    assert_eq!(listing.len(), 1);
    let entry = &listing.entries[0];
    assert_eq!(entry.filename, "report.txt");
    assert_eq!(entry.facts.size, Some(1024));
    assert_eq!(entry.facts.file_type, Some(FileType::File));
    let modify = entry.facts.modify.expect("modify fact");
    assert_eq!((modify.year, modify.month, modify.day), (2024, 1, 15));
    assert_eq!((modify.hour, modify.minute, modify.second), (10, 30, 0));

    session.close().expect("close");
}

#[test]
fn mlsd_rejection_downgrades_to_list_permanently() {
    // The MLSD attempt's data connection is never read from: the control
    // reply to `MLSD` is a rejection, so the session never issues
    // `read_to_end` on it — it just connects and is torn down again.
    let data_port_1 = spawn_data_server(|_stream| {});
    let data_port_2 = spawn_data_server(|stream| {
        let mut stream = stream;
        stream
            .write_all(b"-rw-r--r-- 1 user group 20 Jan 15 10:30 b.txt\r\n")
            .expect("write legacy listing");
        let _ = stream.shutdown(std::net::Shutdown::Write);
    });

    let control_port = spawn_control_server(move |stream| {
        let (mut reader, mut writer) = split(stream);
        write_line(&mut writer, "220 ready");

        assert_eq!(read_line(&mut reader), "TYPE A");
        write_line(&mut writer, "200 Type set to A");
        assert_eq!(read_line(&mut reader), "PASV");
        write_line(&mut writer, &pasv_reply(data_port_1));
        assert_eq!(read_line(&mut reader), "MLSD");
        write_line(&mut writer, "500 MLSD not understood");

        // Falls back to LIST within the same call, on a fresh PASV.
        assert_eq!(read_line(&mut reader), "PASV");
        write_line(&mut writer, &pasv_reply(data_port_2));
        assert_eq!(read_line(&mut reader), "LIST");
        write_line(&mut writer, "150 Here comes the directory listing");
        write_line(&mut writer, "226 Transfer complete");

        expect_quit(&mut reader, &mut writer);
    });

    let cfg = ClientConfig { use_epsv: false, ..ClientConfig::default() };
    let session = Session::open("127.0.0.1", control_port, Security::None, cfg).expect("open");

    // MLSD is rejected; the session retries the same call on a fresh PASV
    // via LIST, and downgrades `use_mlsd` permanently so a later call never
    // attempts MLSD again.
    let listing = session.contents_of_directory().expect("falls back to LIST");
    assert_eq!(listing.entries[0].filename, "b.txt");

    session.close().expect("close");
}
