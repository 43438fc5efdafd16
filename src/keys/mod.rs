// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod ed25519;
mod rsa_pss;

use std::{borrow::Cow, fmt, str::FromStr};

use clap::ValueEnum;
use digest::Digest as _;
use rand_core::CryptoRngCore;
use secrecy::{ExposeSecret as _, SecretVec};
use sha2::Sha256;

use crate::{
    error::{self, Result},
    model,
};

/// A hash applied to a message before it is handed to the signing primitive.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub(crate) enum Prehash {
    Sha256,
}

impl Prehash {
    fn digest(self, message: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(message).to_vec(),
        }
    }
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, ValueEnum)]
pub(crate) enum KeyType {
    #[default]
    Ed25519,
    Rsa,
}

impl KeyType {
    /// The `keytype` value recorded in key records.
    pub(crate) const fn name(self) -> &'static str {
        match self {
            Self::Ed25519 => "ED25519",
            Self::Rsa => "RSA",
        }
    }

    /// The `method` value recorded in signatures.
    pub(crate) const fn method(self) -> &'static str {
        match self {
            Self::Ed25519 => "ed25519",
            Self::Rsa => "rsassa-pss-sha256",
        }
    }

    /// Ed25519 signs the message itself; RSA-PSS signs its SHA-256 digest.
    pub(crate) const fn signing_options(self) -> Option<Prehash> {
        match self {
            Self::Ed25519 => None,
            Self::Rsa => Some(Prehash::Sha256),
        }
    }

    pub(crate) fn generate_key<R: CryptoRngCore + ?Sized>(self, rng: &mut R) -> Result<PrivateKey> {
        Ok(match self {
            Self::Ed25519 => PrivateKey::Ed25519(Box::new(ed25519::generate(rng))),
            Self::Rsa => PrivateKey::Rsa(Box::new(rsa_pss::generate(rng)?)),
        })
    }

    pub(crate) fn parse_private(self, record: &str) -> Result<PrivateKey, error::Conversion> {
        Ok(match self {
            Self::Ed25519 => PrivateKey::Ed25519(Box::new(ed25519::parse_private(record)?)),
            Self::Rsa => PrivateKey::Rsa(Box::new(rsa_pss::parse_private(record)?)),
        })
    }

    fn prehash<'message>(self, message: &'message [u8]) -> Cow<'message, [u8]> {
        match self.signing_options() {
            Some(prehash) => Cow::Owned(prehash.digest(message)),
            None => Cow::Borrowed(message),
        }
    }
}

impl FromStr for KeyType {
    type Err = error::Error;

    fn from_str(s: &str) -> Result<Self> {
        if s.eq_ignore_ascii_case("ed25519") {
            Ok(Self::Ed25519)
        } else if s.eq_ignore_ascii_case("rsa") {
            Ok(Self::Rsa)
        } else {
            Err(error::Error::UnsupportedAlgorithm(s.to_owned()))
        }
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone)]
pub(crate) enum PrivateKey {
    Ed25519(Box<ed25519_dalek::SigningKey>),
    Rsa(Box<::rsa::RsaPrivateKey>),
}

impl PrivateKey {
    pub(crate) const fn key_type(&self) -> KeyType {
        match *self {
            Self::Ed25519(_) => KeyType::Ed25519,
            Self::Rsa(_) => KeyType::Rsa,
        }
    }

    /// Returns the private and public key records, in that order.
    pub(crate) fn serialize(&self) -> Result<(String, String), error::Conversion> {
        match *self {
            Self::Ed25519(ref key) => Ok(ed25519::serialize(key)),
            Self::Rsa(ref key) => rsa_pss::serialize(key),
        }
    }
}

impl fmt::Debug for PrivateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PrivateKey({}, [REDACTED])", self.key_type())
    }
}

/// A private key bound to the TUF key ID it signs as.
#[derive(Clone, Debug)]
pub(crate) struct Signer {
    id: String,
    key: PrivateKey,
}

impl Signer {
    pub(crate) fn new(id: String, key: PrivateKey) -> Self {
        Self { id, key }
    }

    pub(crate) fn id(&self) -> &str {
        &self.id
    }

    pub(crate) const fn key_type(&self) -> KeyType {
        self.key.key_type()
    }

    pub(crate) fn sign(&self, message: &[u8]) -> Result<model::Signature> {
        let digest = self.key_type().prehash(message);
        let sig = match self.key {
            PrivateKey::Ed25519(ref key) => ed25519::sign(key, &digest),
            PrivateKey::Rsa(ref key) => rsa_pss::sign(key, &digest)?,
        };
        Ok(model::Signature {
            key_id: self.id.clone(),
            method: self.key_type().method().to_owned(),
            sig,
        })
    }
}

/// A freshly generated key together with both of its records and their
/// serialized archive entries.
pub(crate) struct KeyPair {
    signer: Signer,
    public: model::Key,
    public_bytes: Vec<u8>,
    private_bytes: SecretVec<u8>,
}

impl KeyPair {
    pub(crate) fn generate<R: CryptoRngCore + ?Sized>(key_type: KeyType, rng: &mut R) -> Result<Self> {
        Self::from_private_key(key_type.generate_key(rng)?)
    }

    pub(crate) fn from_private_key(key: PrivateKey) -> Result<Self> {
        let key_type = key.key_type();
        let (private, public) = key.serialize()?;

        let public = model::Key::new_public(key_type.name(), public);
        let private = model::Key::new_private(key_type.name(), private);
        let id = public.id()?;

        Ok(Self {
            signer: Signer::new(id, key),
            public_bytes: serde_json::to_vec(&public)?,
            private_bytes: SecretVec::new(serde_json::to_vec(&private)?),
            public,
        })
    }

    pub(crate) fn id(&self) -> &str {
        self.signer.id()
    }

    #[cfg(test)]
    pub(crate) const fn signer(&self) -> &Signer {
        &self.signer
    }

    pub(crate) const fn public(&self) -> &model::Key {
        &self.public
    }

    pub(crate) fn public_bytes(&self) -> &[u8] {
        &self.public_bytes
    }

    pub(crate) fn private_bytes(&self) -> &[u8] {
        self.private_bytes.expose_secret()
    }
}

/// Checks a signature against a public key record, applying the same pre-hash
/// the signer applied.
pub(crate) fn verify(key: &model::Key, message: &[u8], signature: &model::Signature) -> Result<()> {
    let key_type: KeyType = key.key_type.parse()?;
    if signature.method != key_type.method() {
        return Err(error::Signing::MethodMismatch {
            method: signature.method.clone(),
            key_type: key.key_type.clone(),
        }
        .into());
    }

    let public = key
        .public()
        .ok_or(error::Conversion::MissingKeyValue("public"))?;
    let digest = key_type.prehash(message);
    let verified = match key_type {
        KeyType::Ed25519 => ed25519::verify(public, &digest, &signature.sig)?,
        KeyType::Rsa => rsa_pss::verify(public, &digest, &signature.sig)?,
    };

    if verified {
        Ok(())
    } else {
        Err(error::Signing::Verification(signature.key_id.clone()).into())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use super::*;

    fn round_trip(key_type: KeyType) -> Result<()> {
        let key = key_type.generate_key(&mut OsRng)?;
        let (private, public) = key.serialize()?;

        let parsed = key_type.parse_private(&private)?;
        let (private_again, public_again) = parsed.serialize()?;

        assert_eq!(public, public_again);
        assert_eq!(private, private_again);
        assert_eq!(parsed.key_type(), key_type);
        Ok(())
    }

    #[test]
    fn ed25519_round_trip() -> Result<()> {
        round_trip(KeyType::Ed25519)
    }

    #[test]
    fn rsa_round_trip() -> Result<()> {
        round_trip(KeyType::Rsa)
    }

    #[test]
    fn key_id_is_stable_across_reparsing() -> Result<()> {
        let pair = KeyPair::generate(KeyType::Ed25519, &mut OsRng)?;
        let private: model::Key = serde_json::from_slice(pair.private_bytes())?;
        let reparsed = KeyType::Ed25519.parse_private(private.private().unwrap_or_default())?;

        assert_eq!(KeyPair::from_private_key(reparsed)?.id(), pair.id());
        let public: model::Key = serde_json::from_slice(pair.public_bytes())?;
        assert_eq!(public.id()?, pair.id());
        Ok(())
    }

    #[test]
    fn key_types_parse_case_insensitively() -> Result<()> {
        assert_eq!("Ed25519".parse::<KeyType>()?, KeyType::Ed25519);
        assert_eq!("ED25519".parse::<KeyType>()?, KeyType::Ed25519);
        assert_eq!("rsa".parse::<KeyType>()?, KeyType::Rsa);
        assert!(matches!(
            "ecdsa".parse::<KeyType>(),
            Err(error::Error::UnsupportedAlgorithm(name)) if name == "ecdsa"
        ));
        Ok(())
    }

    #[test]
    fn only_rsa_prehashes() {
        assert_eq!(KeyType::Ed25519.signing_options(), None);
        assert_eq!(KeyType::Rsa.signing_options(), Some(Prehash::Sha256));
    }

    #[test]
    fn tampered_message_does_not_verify() -> Result<()> {
        for key_type in [KeyType::Ed25519, KeyType::Rsa] {
            let pair = KeyPair::generate(key_type, &mut OsRng)?;
            let signature = pair.signer().sign(b"signed bytes")?;

            verify(pair.public(), b"signed bytes", &signature)?;
            assert!(matches!(
                verify(pair.public(), b"other bytes", &signature),
                Err(error::Error::Signing(error::Signing::Verification(_)))
            ));
        }
        Ok(())
    }

    #[test]
    fn private_key_debug_is_redacted() -> Result<()> {
        let key = KeyType::Ed25519.generate_key(&mut OsRng)?;
        let (private, _) = key.serialize()?;

        assert!(!format!("{key:?}").contains(&private));
        Ok(())
    }
}
