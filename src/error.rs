// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, path::PathBuf, result};

use thiserror::Error;

pub(crate) type Result<T, E = Error> = result::Result<T, E>;

#[derive(Error, Debug)]
pub(crate) enum Error {
    #[error("IO operation failed: {0}")]
    Io(#[from] io::Error),
    #[error("JSON format error: {0}")]
    Json(serde_json::Error),
    #[error("data conversion error: {0}")]
    Conversion(#[from] Conversion),
    #[error("credentials archive is invalid: {0}")]
    CredsFormat(#[from] CredsFormat),
    #[error("unsupported key type: {0}")]
    UnsupportedAlgorithm(String),
    #[error("signing error: {0}")]
    Signing(#[from] Signing),
    #[error("unable to find the online targets key for the factory")]
    MissingOnlineKey,
    #[error("unable to find a private key for key ID {key_id} in the credentials archive")]
    KeyNotFound { key_id: String },
    #[error("rotation is not possible right now: {0}")]
    RotationBlocked(#[from] Blocked),
    #[error("transaction service error: {0}")]
    Remote(#[from] Remote),
    #[error("{} is not writable: {source}", .path.display())]
    NotWritable { path: PathBuf, source: io::Error },
    #[error("upload of the new TUF root failed ({source}); the new keys are kept at {}", .temp_path.display())]
    UploadFailed {
        temp_path: PathBuf,
        source: Box<Error>,
    },
    #[error("unable to update the credentials archive ({source}); the new keys are kept at {}", .temp_path.display())]
    CredentialCommit { temp_path: PathBuf, source: io::Error },
    #[error("command execution failed")]
    Command,
}

impl From<serde_json::Error> for Error {
    fn from(value: serde_json::Error) -> Self {
        // LINT: Deliberate fall-through that should catch future cases added to
        // the enum.
        #[allow(clippy::wildcard_enum_match_arm)]
        match value.classify() {
            serde_json::error::Category::Io => Self::Io(value.into()),
            _ => Self::Json(value),
        }
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::Io(value.into())
    }
}

#[derive(Error, Debug)]
pub(crate) enum Conversion {
    #[error("unexpected key material length (wanted {0} bytes, but got {1} bytes)")]
    KeyMaterialLength(usize, usize),
    #[error("key record has no {0} value")]
    MissingKeyValue(&'static str),
    #[error("invalid hexadecimal data: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("invalid PKCS#1 data: {0}")]
    Pkcs1(#[from] rsa::pkcs1::Error),
    #[error("invalid SubjectPublicKeyInfo data: {0}")]
    Spki(#[from] rsa::pkcs8::spki::Error),
    #[error("invalid Ed25519 key: {0}")]
    Ed25519(#[from] ed25519_dalek::SignatureError),
    #[error("expiry timestamp is out of range")]
    Expiry,
}

#[derive(Error, Debug)]
pub(crate) enum CredsFormat {
    #[error("not a gzip-compressed tar archive: {0}")]
    Archive(io::Error),
    #[error("unable to parse entry {name}: {source}")]
    Entry {
        name: String,
        source: serde_json::Error,
    },
    #[error("unsupported key type {key_type} in entry {name}")]
    KeyType { name: String, key_type: String },
    #[error("unable to parse key value of entry {name}: {source}")]
    KeyValue { name: String, source: Conversion },
}

#[derive(Error, Debug)]
pub(crate) enum Signing {
    #[error("RSA operation failed: {0}")]
    Rsa(#[from] rsa::Error),
    #[error("signature method {method} does not match key type {key_type}")]
    MethodMismatch { method: String, key_type: String },
    #[error("signature from key ID {0} did not verify")]
    Verification(String),
    #[error("key ID {0} is not listed in the root being signed")]
    UnknownKey(String),
}

#[derive(Error, Debug)]
pub(crate) enum Blocked {
    #[error("there are no TUF root updates in progress")]
    NoUpdates,
    #[error("TUF root updates are being applied and can no longer be changed")]
    Applying,
    #[error("the current or the updated TUF root is missing from the transaction")]
    MissingRoot,
    #[error("the transaction in progress is {actual}, not {expected}")]
    TransactionMismatch { expected: String, actual: String },
    #[error("wave {0} is in progress")]
    WaveActive(String),
    #[error("role {0} is missing from the TUF root")]
    MissingRole(String),
}

#[derive(Error, Debug)]
pub(crate) enum Remote {
    #[error("service is unavailable: {0}")]
    Unavailable(io::Error),
    #[error("service returned malformed data: {0}")]
    Malformed(serde_json::Error),
    #[error("unknown factory {0}")]
    UnknownFactory(String),
    #[error("transaction {actual} does not match the transaction in progress ({expected})")]
    TransactionMismatch { expected: String, actual: String },
    #[error("URL scheme {0} is not supported")]
    UnsupportedScheme(String),
}
