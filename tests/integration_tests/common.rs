// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! A scripted, single-purpose FTP/FTPS server used to drive the end-to-end
//! scenarios of §8 against the real blocking socket and thread code paths
//! (as opposed to the pure-function unit tests scattered across `src/`).

use std::{
    io::{BufRead, BufReader, Write},
    net::{TcpListener, TcpStream},
    thread,
};

use mftp_client_rs::ClientConfig;

/// A short control-channel timeout so a scripted test that deliberately
/// withholds a reply (the timeout scenario) doesn't stall the suite, while
/// still comfortably exceeding loopback round-trip time for every other
/// scenario.
pub fn test_config() -> ClientConfig {
    ClientConfig { timeout_seconds: 3, ..ClientConfig::default() }
}

/// Binds an ephemeral control-listening port and runs `handler` against the
/// first accepted connection on a background thread. Returns the port
/// immediately so the caller can `Session::open` against it.
pub fn spawn_control_server<F>(handler: F) -> u16
where F: FnOnce(TcpStream) + Send + 'static {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind control listener");
    let port = listener.local_addr().expect("local_addr").port();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            handler(stream);
        }
    });
    port
}

/// Like [`spawn_control_server`], but dispatches one handler per accepted
/// connection, in order, each on its own thread — used by the
/// concurrent-upload scenario where the root and a sibling session both
/// connect to the same mock server and each blocks independently waiting on
/// its own `QUIT`.
pub fn spawn_multi_control_server<F>(mut handlers: Vec<F>) -> u16
where F: FnOnce(TcpStream) + Send + 'static {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind control listener");
    let port = listener.local_addr().expect("local_addr").port();
    handlers.reverse();
    thread::spawn(move || {
        while let Some(handler) = handlers.pop() {
            match listener.accept() {
                Ok((stream, _)) => {
                    thread::spawn(move || handler(stream));
                },
                Err(_) => break,
            }
        }
    });
    port
}

/// Binds an ephemeral data-listening port and runs `handler` against the
/// first accepted connection on a background thread, returning the port so
/// the control-channel script can report it via `PASV`/`EPSV`.
pub fn spawn_data_server<F>(handler: F) -> u16
where F: FnOnce(TcpStream) + Send + 'static {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind data listener");
    let port = listener.local_addr().expect("local_addr").port();
    thread::spawn(move || {
        if let Ok((stream, _)) = listener.accept() {
            handler(stream);
        }
    });
    port
}

/// Splits a connected stream into a line reader and a raw writer half.
pub fn split(stream: TcpStream) -> (BufReader<TcpStream>, TcpStream) {
    let writer = stream.try_clone().expect("clone stream");
    (BufReader::new(stream), writer)
}

pub fn write_line(writer: &mut TcpStream, line: &str) {
    writer.write_all(format!("{line}\r\n").as_bytes()).expect("write reply line");
}

/// Reads one CRLF-terminated line and returns it with the terminator
/// stripped.
pub fn read_line(reader: &mut BufReader<TcpStream>) -> String {
    let mut buf = String::new();
    reader.read_line(&mut buf).expect("read command line");
    buf.trim_end_matches(['\r', '\n']).to_string()
}

/// Renders a `227 Entering Passive Mode (h1,h2,h3,h4,hi,lo).` reply for the
/// given loopback data port.
pub fn pasv_reply(port: u16) -> String {
    let hi = (port >> 8) as u8;
    let lo = (port & 0xFF) as u8;
    format!("227 Entering Passive Mode (127,0,0,1,{hi},{lo}).")
}

/// Handles the trailing `QUIT`/`221` exchange that every scripted control
/// handler ends with once `Session::close` is exercised.
pub fn expect_quit(reader: &mut BufReader<TcpStream>, writer: &mut TcpStream) {
    assert_eq!(read_line(reader), "QUIT");
    write_line(writer, "221 Goodbye");
}
