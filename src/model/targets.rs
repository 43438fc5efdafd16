// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use serde::{Deserialize, Serialize};

use super::Signature;

/// Production targets metadata for one deployment tag. The signed payload is
/// kept opaque: it is only ever re-serialized for signing, never edited.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub(crate) struct Targets {
    pub(crate) signatures: Vec<Signature>,
    pub(crate) signed: serde_json::Value,
}
