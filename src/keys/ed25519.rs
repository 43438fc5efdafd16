// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use ed25519_dalek::{
    Signature, Signer as _, SigningKey, Verifier as _, VerifyingKey, KEYPAIR_LENGTH,
    PUBLIC_KEY_LENGTH, SECRET_KEY_LENGTH,
};
use rand_core::CryptoRngCore;

use crate::error::{self, Result};

pub(super) fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> SigningKey {
    SigningKey::generate(rng)
}

/// Returns the private and public records: hex of the 64-byte keypair and of
/// the 32-byte verifying key.
pub(super) fn serialize(key: &SigningKey) -> (String, String) {
    (
        hex::encode(key.to_keypair_bytes()),
        hex::encode(key.verifying_key().to_bytes()),
    )
}

pub(super) fn parse_private(record: &str) -> Result<SigningKey, error::Conversion> {
    let bytes = hex::decode(record.trim())?;
    match bytes.len() {
        KEYPAIR_LENGTH => {
            let mut keypair = [0_u8; KEYPAIR_LENGTH];
            keypair.copy_from_slice(&bytes);
            Ok(SigningKey::from_keypair_bytes(&keypair)?)
        }
        SECRET_KEY_LENGTH => {
            let mut seed = [0_u8; SECRET_KEY_LENGTH];
            seed.copy_from_slice(&bytes);
            Ok(SigningKey::from_bytes(&seed))
        }
        len => Err(error::Conversion::KeyMaterialLength(KEYPAIR_LENGTH, len)),
    }
}

pub(super) fn sign(key: &SigningKey, message: &[u8]) -> Vec<u8> {
    key.sign(message).to_bytes().to_vec()
}

pub(super) fn verify(public: &str, message: &[u8], signature: &[u8]) -> Result<bool> {
    let bytes: [u8; PUBLIC_KEY_LENGTH] =
        hex::decode(public.trim())
            .map_err(error::Conversion::from)?
            .try_into()
            .map_err(|rejected: Vec<u8>| {
                error::Conversion::KeyMaterialLength(PUBLIC_KEY_LENGTH, rejected.len())
            })?;
    let key = VerifyingKey::from_bytes(&bytes).map_err(error::Conversion::from)?;
    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };
    Ok(key.verify(message, &signature).is_ok())
}
