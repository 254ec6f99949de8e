// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! §8 scenario S2: `EPSV` rejected, falls back to `PASV`; the downgrade
//! persists so a second listing goes straight to `PASV`.

use std::io::Write;

use mftp_client_rs::{Security, Session};

use crate::integration_tests::common::{
    expect_quit, pasv_reply, read_line, spawn_control_server, spawn_data_server, split,
    test_config, write_line,
};

#[test]
fn epsv_rejection_falls_back_to_pasv_and_downgrade_persists() {
    let data_port_1 = spawn_data_server(|stream| {
        let mut stream = stream;
        stream.write_all(b"size=11;type=file; report.txt\r\n").expect("write listing");
        let _ = stream.shutdown(std::net::Shutdown::Write);
    });
    let data_port_2 = spawn_data_server(|stream| {
        let mut stream = stream;
        stream.write_all(b"size=22;type=file; other.txt\r\n").expect("write listing");
        let _ = stream.shutdown(std::net::Shutdown::Write);
    });

    let control_port = spawn_control_server(move |stream| {
        let (mut reader, mut writer) = split(stream);
        write_line(&mut writer, "220 ready");

        assert_eq!(read_line(&mut reader), "TYPE A");
        write_line(&mut writer, "200 Type set to A");

        assert_eq!(read_line(&mut reader), "EPSV");
        write_line(&mut writer, "500 EPSV not understood");

        assert_eq!(read_line(&mut reader), "PASV");
        write_line(&mut writer, &pasv_reply(data_port_1));

        assert_eq!(read_line(&mut reader), "MLSD");
        write_line(&mut writer, "150 Here comes the directory listing");
        write_line(&mut writer, "226 Transfer complete");

        // Downgrade must persist: the next listing skips EPSV entirely.
        assert_eq!(read_line(&mut reader), "PASV");
        write_line(&mut writer, &pasv_reply(data_port_2));

        assert_eq!(read_line(&mut reader), "MLSD");
        write_line(&mut writer, "150 Here comes the directory listing");
        write_line(&mut writer, "226 Transfer complete");

        expect_quit(&mut reader, &mut writer);
    });

    let session =
        Session::open("127.0.0.1", control_port, Security::None, test_config()).expect("open");

    let first = session.contents_of_directory().expect("first listing");
    assert_eq!(first.len(), 1);
    assert_eq!(first.entries[0].filename, "report.txt");
    assert_eq!(first.entries[0].facts.size, Some(11));

    let second = session.contents_of_directory().expect("second listing");
    assert_eq!(second.entries[0].filename, "other.txt");

    session.close().expect("close");
}
