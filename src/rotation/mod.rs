// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod resign;
mod root;
mod targets;

use std::{
    collections::{BTreeMap, BTreeSet},
    fmt,
};

use chrono::{DateTime, Months, Timelike as _, Utc};
use clap::ValueEnum;
use log::{debug, info};

use crate::{
    creds::OfflineCreds,
    error::{self, Blocked, Result},
    keys::{self, KeyPair, Signer},
    model, signing,
};

pub(crate) use resign::resign;
pub(crate) use root::RootRotation;
pub(crate) use targets::TargetsRotation;

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum Role {
    Root,
    Targets,
}

impl Role {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Targets => "targets",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A root updates transaction that is open for changes.
#[derive(Debug)]
pub(crate) struct Transaction {
    /// The last committed CI root.
    pub(crate) current: model::Root,
    /// The staged CI root that rotations build on.
    pub(crate) updated: model::Root,
    pub(crate) online_keys: BTreeMap<String, String>,
}

pub(crate) fn check_status(
    updates: model::RootUpdates,
    txid: &str,
    role: Role,
) -> Result<Transaction> {
    match updates.status {
        model::UpdatesStatus::None => return Err(Blocked::NoUpdates.into()),
        model::UpdatesStatus::Applying => return Err(Blocked::Applying.into()),
        model::UpdatesStatus::Started => {}
    }

    if let Some(actual) = updates.transaction_id {
        if actual != txid {
            return Err(Blocked::TransactionMismatch {
                expected: txid.to_owned(),
                actual,
            }
            .into());
        }
    }

    if let Some(wave) = updates.active_wave {
        debug!("Refusing to rotate the {} key while wave {} is active", role, wave);
        return Err(Blocked::WaveActive(wave).into());
    }

    match (updates.current, updates.updated) {
        (Some(current), Some(updated)) => Ok(Transaction {
            current,
            updated,
            online_keys: updates.online_keys,
        }),
        _ => Err(Blocked::MissingRoot.into()),
    }
}

/// The CI root and the production root derived from it.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Rotated {
    pub(crate) ci: model::Root,
    pub(crate) prod: model::Root,
}

impl Rotated {
    /// Co-signs both roots with the root keys of `previous` and of the new
    /// root, then checks every signature. Returns the signing key IDs.
    pub(crate) fn sign(&mut self, previous: &model::Root, creds: &OfflineCreds) -> Result<Vec<String>> {
        let signers = root_signers(previous, &self.ci, creds)?;
        for root in [&mut self.ci, &mut self.prod] {
            root.signatures = signing::sign_metadata(&root.signed, &signers)?;
            verify_signatures(root, previous)?;
        }
        Ok(signers.iter().map(|signer| signer.id().to_owned()).collect())
    }
}

pub(crate) trait Rotate: Send + Sync {
    fn role(&self) -> Role;

    /// Makes `key_id` the offline key of the rotated role.
    fn assign(&self, root: &mut model::Root, key_id: &str, now: DateTime<Utc>) -> Result<()>;

    fn rotate(
        &self,
        mut root: model::Root,
        pair: &KeyPair,
        online_keys: &BTreeMap<String, String>,
        now: DateTime<Utc>,
    ) -> Result<Rotated> {
        let _ = root
            .signed
            .keys
            .insert(pair.id().to_owned(), pair.public().clone());
        self.assign(&mut root, pair.id(), now)?;
        root.signatures.clear();
        prune_unused_keys(&mut root);
        info!("New {} key ID is {}", self.role(), pair.id());

        let prod = derive_production(&root, online_keys)?;
        Ok(Rotated { ci: root, prod })
    }
}

/// Removes every key that no role lists.
pub(crate) fn prune_unused_keys(root: &mut model::Root) {
    let referenced: BTreeSet<String> = root
        .referenced_key_ids()
        .into_iter()
        .map(str::to_owned)
        .collect();
    root.signed.keys.retain(|key_id, _| {
        let keep = referenced.contains(key_id);
        if !keep {
            debug!("Removing unused key {}", key_id);
        }
        keep
    });
}

/// Production devices never trust the online targets key while an offline
/// one is listed.
pub(crate) fn derive_production(
    ci: &model::Root,
    online_keys: &BTreeMap<String, String>,
) -> Result<model::Root> {
    let mut prod = ci.clone();
    let online: BTreeSet<&str> = online_keys.values().map(String::as_str).collect();

    let targets = prod.role_mut("targets")?;
    let offline: Vec<String> = targets
        .key_ids
        .iter()
        .filter(|key_id| !online.contains(key_id.as_str()))
        .cloned()
        .collect();
    if !offline.is_empty() {
        let count = u32::try_from(offline.len()).unwrap_or(u32::MAX);
        targets.threshold = targets.threshold.clamp(1, count);
        targets.key_ids = offline;
    }

    prod.signatures.clear();
    prune_unused_keys(&mut prod);
    Ok(prod)
}

/// One year from `now`, in whole seconds.
pub(crate) fn expiry(now: DateTime<Utc>) -> Result<DateTime<Utc>> {
    Ok(now
        .checked_add_months(Months::new(12))
        .and_then(|expires| expires.with_nanosecond(0))
        .ok_or(error::Conversion::Expiry)?)
}

/// The offline root keys of `previous` followed by those of `new`, each once.
pub(crate) fn root_signers(
    previous: &model::Root,
    new: &model::Root,
    creds: &OfflineCreds,
) -> Result<Vec<Signer>> {
    let mut seen = BTreeSet::new();
    let mut signers = Vec::new();
    for root in [previous, new] {
        for key_id in &root.role("root")?.key_ids {
            if !seen.insert(key_id.as_str()) {
                continue;
            }
            let public = root
                .signed
                .keys
                .get(key_id)
                .and_then(model::Key::public)
                .ok_or_else(|| error::Signing::UnknownKey(key_id.clone()))?;
            signers.push(creds.find_signer(key_id, public)?);
        }
    }
    Ok(signers)
}

/// Checks each signature of `root` against the key recorded for it in `root`
/// or in `previous`.
pub(crate) fn verify_signatures(root: &model::Root, previous: &model::Root) -> Result<()> {
    let bytes = signing::canonical_bytes(&root.signed)?;
    for signature in &root.signatures {
        let key = root
            .signed
            .keys
            .get(&signature.key_id)
            .or_else(|| previous.signed.keys.get(&signature.key_id))
            .ok_or_else(|| error::Signing::UnknownKey(signature.key_id.clone()))?;
        keys::verify(key, &bytes, signature)?;
    }
    Ok(())
}
