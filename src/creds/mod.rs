// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod archive;
#[cfg(test)]
mod memory;

use std::{collections::BTreeMap, fmt, path::PathBuf};

use async_trait::async_trait;
use log::debug;

use crate::{
    error::{self, Result},
    keys::{KeyPair, KeyType, Signer},
    metadata, model,
};

pub(crate) use archive::Archive;
#[cfg(test)]
pub(crate) use memory::Memory;

/// The contents of an offline credentials archive: entry names mapped to
/// their raw bytes.
#[derive(Clone, Default, PartialEq, Eq)]
pub(crate) struct OfflineCreds(BTreeMap<String, Vec<u8>>);

impl OfflineCreds {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub(crate) fn get(&self, name: &str) -> Option<&[u8]> {
        self.0.get(name).map(Vec::as_slice)
    }

    pub(crate) fn insert(&mut self, name: String, content: Vec<u8>) {
        let _ = self.0.insert(name, content);
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.0
            .iter()
            .map(|(name, content)| (name.as_str(), content.as_slice()))
    }

    pub(crate) fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub(crate) fn len(&self) -> usize {
        self.0.len()
    }

    /// Adds the `.pub`/`.sec` entries of a newly generated key for `role`.
    pub(crate) fn insert_key_pair(&mut self, role: &str, pair: &KeyPair) {
        let base = metadata::key_entry_base(role, pair.id());
        self.insert(format!("{base}.pub"), pair.public_bytes().to_vec());
        self.insert(format!("{base}.sec"), pair.private_bytes().to_vec());
    }

    /// Finds the private key whose public entry matches `public` and binds it
    /// to `key_id`.
    pub(crate) fn find_signer(&self, key_id: &str, public: &str) -> Result<Signer> {
        let public = public.trim();
        for (name, content) in &self.0 {
            let Some(base) = name.strip_suffix(".pub") else {
                continue;
            };
            if parse_entry(name, content)?.public().map(str::trim) != Some(public) {
                continue;
            }

            let private_name = format!("{base}.sec");
            let Some(private_content) = self.0.get(&private_name) else {
                debug!("Entry {} has no private counterpart", name);
                break;
            };
            let record = parse_entry(&private_name, private_content)?;
            let key_type: KeyType =
                record
                    .key_type
                    .parse()
                    .map_err(|_| error::CredsFormat::KeyType {
                        name: private_name.clone(),
                        key_type: record.key_type.clone(),
                    })?;
            let key = record
                .private()
                .ok_or(error::Conversion::MissingKeyValue("private"))
                .and_then(|private| key_type.parse_private(private))
                .map_err(|source| error::CredsFormat::KeyValue {
                    name: private_name.clone(),
                    source,
                })?;

            debug!("Using {} to sign as key ID {}", private_name, key_id);
            return Ok(Signer::new(key_id.to_owned(), key));
        }

        Err(error::Error::KeyNotFound {
            key_id: key_id.to_owned(),
        })
    }
}

fn parse_entry(name: &str, content: &[u8]) -> Result<model::Key> {
    Ok(
        serde_json::from_slice(content).map_err(|source| error::CredsFormat::Entry {
            name: name.to_owned(),
            source,
        })?,
    )
}

impl FromIterator<(String, Vec<u8>)> for OfflineCreds {
    fn from_iter<T: IntoIterator<Item = (String, Vec<u8>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

// Entry contents include private keys, so only names are printed.
impl fmt::Debug for OfflineCreds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.names()).finish()
    }
}

#[async_trait]
pub(crate) trait Storage: Send + Sync {
    /// A human-readable location for messages.
    fn location(&self) -> String;

    /// Reads the stored credentials, or `None` if nothing is stored yet.
    async fn get(&mut self) -> Result<Option<OfflineCreds>>;

    /// Fails unless the credentials could be replaced right now.
    async fn check_writable(&self) -> Result<()>;

    /// Writes `creds` alongside the current copy without replacing it. Returns
    /// where the staged copy lives, if it lives in a file.
    async fn stage(&mut self, creds: &OfflineCreds) -> Result<Option<PathBuf>>;

    /// Replaces the current copy with the staged one.
    async fn commit(&mut self) -> Result<()>;

    async fn update(&mut self, creds: &OfflineCreds) -> Result<()> {
        let _ = self.stage(creds).await?;
        self.commit().await
    }
}

#[async_trait]
impl<T: Storage + ?Sized> Storage for Box<T> {
    fn location(&self) -> String {
        (**self).location()
    }

    async fn get(&mut self) -> Result<Option<OfflineCreds>> {
        (**self).get().await
    }

    async fn check_writable(&self) -> Result<()> {
        (**self).check_writable().await
    }

    async fn stage(&mut self, creds: &OfflineCreds) -> Result<Option<PathBuf>> {
        (**self).stage(creds).await
    }

    async fn commit(&mut self) -> Result<()> {
        (**self).commit().await
    }
}
