// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use log::{debug, info};

use crate::{
    creds::OfflineCreds,
    error::{self, Result},
    model,
    service::TransactionService,
    signing,
};

use super::Role;

/// Signs every production targets document again with the offline targets
/// keys of `root`. The documents themselves are left as they are; for each
/// tag the result holds the signatures of the online key followed by the new
/// offline signatures.
pub(crate) async fn resign<S: TransactionService + ?Sized>(
    service: &S,
    factory: &str,
    root: &model::Root,
    online_key_id: &str,
    creds: &OfflineCreds,
) -> Result<BTreeMap<String, Vec<model::Signature>>> {
    let targets = service.list_prod_targets(factory).await?;
    if targets.is_empty() {
        debug!("Factory {} has no production targets", factory);
        return Ok(BTreeMap::new());
    }

    let signers = root
        .role(Role::Targets.as_str())?
        .key_ids
        .iter()
        .filter(|key_id| *key_id != online_key_id)
        .map(|key_id| {
            let public = root
                .signed
                .keys
                .get(key_id)
                .and_then(model::Key::public)
                .ok_or_else(|| error::Signing::UnknownKey(key_id.clone()))?;
            creds.find_signer(key_id, public)
        })
        .collect::<Result<Vec<_>>>()?;

    targets
        .into_iter()
        .map(|(tag, document)| {
            let mut signatures: Vec<model::Signature> = document
                .signatures
                .into_iter()
                .filter(|signature| signature.key_id == online_key_id)
                .collect();
            signatures.extend(signing::sign_metadata(&document.signed, &signers)?);
            info!("Re-signed production targets for tag {}", tag);
            Ok((tag, signatures))
        })
        .collect()
}
