// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! YAML parsing of the `security` config field, including the aliases
//! tolerated alongside the canonical lowercase spelling.

use mftp_client_rs::{ClientConfig, Security};

#[test]
fn parses_canonical_security_values() {
    let cfg: ClientConfig = serde_yaml::from_str("security: none\n").unwrap();
    assert_eq!(cfg.security, Security::None);

    let cfg: ClientConfig = serde_yaml::from_str("security: explicit_tls\n").unwrap();
    assert_eq!(cfg.security, Security::ExplicitTls);
}

#[test]
fn tolerates_alternate_capitalizations() {
    let cfg: ClientConfig = serde_yaml::from_str("security: ExplicitTls\n").unwrap();
    assert_eq!(cfg.security, Security::ExplicitTls);

    let cfg: ClientConfig = serde_yaml::from_str("security: NONE\n").unwrap();
    assert_eq!(cfg.security, Security::None);
}

#[test]
fn defaults_to_none_when_omitted() {
    let cfg: ClientConfig = serde_yaml::from_str("timeout_seconds: 10\n").unwrap();
    assert_eq!(cfg.security, Security::None);
}
