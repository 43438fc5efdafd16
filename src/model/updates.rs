// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Root, Signature};

#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub(crate) enum UpdatesStatus {
    None,
    Started,
    Applying,
}

/// The state of a factory's TUF root updates transaction, as reported by the
/// transaction service.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RootUpdates {
    pub(crate) status: UpdatesStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) transaction_id: Option<String>,
    /// The last committed CI root.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) current: Option<Root>,
    /// The staged CI root that this transaction will publish.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) updated: Option<Root>,
    #[serde(default)]
    pub(crate) online_keys: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) active_wave: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) staged: Option<RootUpdatesPut>,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RootUpdatesPut {
    pub(crate) ci_root: Root,
    pub(crate) prod_root: Root,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) targets_signatures: Option<BTreeMap<String, Vec<Signature>>>,
}
