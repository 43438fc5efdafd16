// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod root;
mod targets;
mod updates;

use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use sha2::{Digest as _, Sha256};

use crate::{error::Result, signing};

pub(crate) use root::Root;
#[cfg(test)]
pub(crate) use root::{RoleKeys, RootMeta};
pub(crate) use targets::Targets;
pub(crate) use updates::{RootUpdates, RootUpdatesPut, UpdatesStatus};

/// Private key text as stored in a credentials archive. Never printed.
#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(transparent)]
pub(crate) struct PrivateMaterial(String);

impl secrecy::Zeroize for PrivateMaterial {
    fn zeroize(&mut self) {
        self.0.zeroize();
    }
}

impl secrecy::CloneableSecret for PrivateMaterial {}

impl secrecy::SerializableSecret for PrivateMaterial {}

impl secrecy::DebugSecret for PrivateMaterial {}

impl PrivateMaterial {
    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

pub(crate) type PrivateValue = secrecy::Secret<PrivateMaterial>;

pub(crate) fn private_value(material: String) -> PrivateValue {
    secrecy::Secret::new(PrivateMaterial(material))
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub(crate) struct KeyValue {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) public: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) private: Option<PrivateValue>,
}

impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.public == other.public
            && self.private.as_ref().map(ExposeSecret::expose_secret)
                == other.private.as_ref().map(ExposeSecret::expose_secret)
    }
}

/// A key record, either the public half (as listed in a TUF root) or the
/// private half (as stored next to it in a credentials archive).
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub(crate) struct Key {
    #[serde(rename = "keytype")]
    pub(crate) key_type: String,
    #[serde(rename = "keyval")]
    pub(crate) key_value: KeyValue,
}

impl Key {
    pub(crate) fn new_public(key_type: &str, public: String) -> Self {
        Self {
            key_type: key_type.to_owned(),
            key_value: KeyValue {
                public: Some(public),
                private: None,
            },
        }
    }

    pub(crate) fn new_private(key_type: &str, private: String) -> Self {
        Self {
            key_type: key_type.to_owned(),
            key_value: KeyValue {
                public: None,
                private: Some(private_value(private)),
            },
        }
    }

    pub(crate) fn public(&self) -> Option<&str> {
        self.key_value.public.as_deref()
    }

    pub(crate) fn private(&self) -> Option<&str> {
        self.key_value
            .private
            .as_ref()
            .map(|value| value.expose_secret().as_str())
    }

    /// The TUF key ID: the hex SHA-256 of the canonical public record.
    pub(crate) fn id(&self) -> Result<String> {
        let public = Self {
            key_type: self.key_type.clone(),
            key_value: KeyValue {
                public: self.key_value.public.clone(),
                private: None,
            },
        };
        let digest = Sha256::digest(signing::canonical_bytes(&public)?);
        Ok(hex::encode(digest))
    }
}

#[serde_as]
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct Signature {
    #[serde(rename = "keyid")]
    pub(crate) key_id: String,
    pub(crate) method: String,
    #[serde_as(as = "Base64")]
    pub(crate) sig: Vec<u8>,
}
