// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use log::debug;
use serde::Serialize;

use crate::{error::Result, keys::Signer, model::Signature};

/// Serializes a payload as canonical JSON: object keys in lexicographic order
/// and no insignificant whitespace.
///
/// Going through [`serde_json::Value`] sorts object keys regardless of the
/// field order of the Rust type, because its map is ordered.
pub(crate) fn canonical_bytes<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>> {
    let value = serde_json::to_value(payload)?;
    Ok(serde_json::to_vec(&value)?)
}

/// Signs the canonical form of `payload` with every signer, in order.
pub(crate) fn sign_metadata<T: Serialize + ?Sized>(
    payload: &T,
    signers: &[Signer],
) -> Result<Vec<Signature>> {
    let bytes = canonical_bytes(payload)?;
    debug!(
        "Signing {} canonical bytes with {} key(s)",
        bytes.len(),
        signers.len()
    );
    signers.iter().map(|signer| signer.sign(&bytes)).collect()
}
