// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use once_cell::sync::Lazy;

pub(crate) static CLIENT_TYPE_ID: Lazy<String> =
    Lazy::new(|| option_env!("CARGO_PKG_NAME").unwrap_or("tuf-rotate").to_owned());

/// Directory inside a credentials archive that holds key pairs.
pub(crate) const KEYS_NAMESPACE: &str = "tufrepo/keys/";

/// The archive entry prefix for a key pair generated by this tool, without
/// the `.pub`/`.sec` suffix.
pub(crate) fn key_entry_base(role: &str, key_id: &str) -> String {
    format!("{KEYS_NAMESPACE}{}-{role}-{key_id}", *CLIENT_TYPE_ID)
}
