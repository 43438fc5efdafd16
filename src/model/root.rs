// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Blocked, Result};

use super::{Key, Signature};

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) struct RoleKeys {
    #[serde(rename = "keyids")]
    pub(crate) key_ids: Vec<String>,
    pub(crate) threshold: u32,
}

/// The signed portion of a TUF root.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub(crate) struct RootMeta {
    #[serde(rename = "_type")]
    pub(crate) type_: String,
    #[serde(default)]
    pub(crate) consistent_snapshot: bool,
    pub(crate) expires: DateTime<Utc>,
    pub(crate) keys: BTreeMap<String, Key>,
    pub(crate) roles: BTreeMap<String, RoleKeys>,
    pub(crate) version: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub(crate) struct Root {
    pub(crate) signatures: Vec<Signature>,
    pub(crate) signed: RootMeta,
}

impl Root {
    pub(crate) fn role(&self, name: &str) -> Result<&RoleKeys> {
        Ok(self
            .signed
            .roles
            .get(name)
            .ok_or_else(|| Blocked::MissingRole(name.to_owned()))?)
    }

    pub(crate) fn role_mut(&mut self, name: &str) -> Result<&mut RoleKeys> {
        Ok(self
            .signed
            .roles
            .get_mut(name)
            .ok_or_else(|| Blocked::MissingRole(name.to_owned()))?)
    }

    /// Every key ID listed by at least one role.
    pub(crate) fn referenced_key_ids(&self) -> BTreeSet<&str> {
        self.signed
            .roles
            .values()
            .flat_map(|role| role.key_ids.iter().map(String::as_str))
            .collect()
    }
}
