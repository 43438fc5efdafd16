// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use rand::rngs::OsRng;
use rand_core::CryptoRngCore;
use rsa::{
    pkcs1::{DecodeRsaPrivateKey as _, EncodeRsaPrivateKey as _, LineEnding},
    pkcs8::{DecodePublicKey as _, EncodePublicKey as _},
    Pss, RsaPrivateKey, RsaPublicKey,
};
use sha2::Sha256;

use crate::error::{self, Result};

#[cfg(not(test))]
const KEY_BITS: usize = 4096;
// Generating 4096-bit keys takes too long in unoptimized builds.
#[cfg(test)]
const KEY_BITS: usize = 1024;

pub(super) fn generate<R: CryptoRngCore + ?Sized>(rng: &mut R) -> Result<RsaPrivateKey> {
    Ok(RsaPrivateKey::new(rng, KEY_BITS).map_err(error::Signing::from)?)
}

/// Returns the private and public records: a PKCS#1 PEM and an SPKI PEM.
pub(super) fn serialize(key: &RsaPrivateKey) -> Result<(String, String), error::Conversion> {
    let private = key.to_pkcs1_pem(LineEnding::LF)?;
    let public = key.to_public_key().to_public_key_pem(LineEnding::LF)?;
    Ok((private.as_str().to_owned(), public))
}

pub(super) fn parse_private(record: &str) -> Result<RsaPrivateKey, error::Conversion> {
    Ok(RsaPrivateKey::from_pkcs1_pem(record.trim())?)
}

/// Signs an already hashed message with PSS padding.
pub(super) fn sign(key: &RsaPrivateKey, digest: &[u8]) -> Result<Vec<u8>> {
    Ok(key
        .sign_with_rng(&mut OsRng, Pss::new::<Sha256>(), digest)
        .map_err(error::Signing::from)?)
}

pub(super) fn verify(public: &str, digest: &[u8], signature: &[u8]) -> Result<bool> {
    let key = RsaPublicKey::from_public_key_pem(public.trim()).map_err(error::Conversion::from)?;
    Ok(key
        .verify(Pss::new::<Sha256>(), digest, signature)
        .is_ok())
}
