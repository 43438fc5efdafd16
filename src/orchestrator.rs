// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, io, path::PathBuf};

use chrono::Utc;
use log::{debug, info, warn};
use rand::rngs::OsRng;

use crate::{
    creds::{OfflineCreds, Storage},
    error::{Error, Result},
    keys::{KeyPair, KeyType},
    model,
    rotation::{self, Role, Rotate, RootRotation, TargetsRotation},
    service::TransactionService,
};

/// Where the root keys that co-sign the new root come from.
pub(crate) enum RootKeys<S> {
    /// The new root is uploaded unsigned.
    Unsigned,
    /// The root keys are in the archive that receives the new key.
    Shared,
    /// The root keys are in another archive, which is only read.
    Separate(S),
}

pub(crate) struct Request {
    pub(crate) factory: String,
    pub(crate) txid: String,
    pub(crate) role: Role,
    pub(crate) key_type: KeyType,
}

#[derive(Debug)]
pub(crate) struct Outcome {
    pub(crate) key_id: String,
    /// Key IDs that signed the new root, if it was signed.
    pub(crate) root_signers: Vec<String>,
    /// Key IDs of the signatures now on each production targets tag.
    pub(crate) resigned: BTreeMap<String, Vec<String>>,
    pub(crate) location: String,
}

fn missing<S: Storage>(storage: &S) -> Error {
    io::Error::new(
        io::ErrorKind::NotFound,
        format!("no credentials archive at {}", storage.location()),
    )
    .into()
}

async fn load<S: Storage>(storage: &mut S) -> Result<OfflineCreds> {
    storage.get().await?.ok_or_else(|| missing(storage))
}

/// Rotates the offline key of `request.role` within an open root updates
/// transaction.
///
/// The credentials holding the new key are staged before the upload and only
/// replace the stored copy once the service has accepted the new root. If the
/// upload fails, the stored copy is untouched and the staged copy is reported
/// in the error.
pub(crate) async fn rotate_offline_key<T, S>(
    service: &T,
    request: &Request,
    mut storage: S,
    root_keys: RootKeys<S>,
) -> Result<Outcome>
where
    T: TransactionService + ?Sized,
    S: Storage,
{
    let mut creds = match storage.get().await? {
        Some(creds) => creds,
        // The archive is only written once the upload has succeeded.
        None if request.role == Role::Targets => {
            debug!("Starting a new credentials archive for {}", storage.location());
            OfflineCreds::new()
        }
        None => return Err(missing(&storage)),
    };
    storage.check_writable().await?;

    let sign = !matches!(root_keys, RootKeys::Unsigned);
    let separate = match root_keys {
        RootKeys::Separate(mut other) => Some(load(&mut other).await?),
        RootKeys::Unsigned | RootKeys::Shared => None,
    };

    let updates = service.get_root_updates(&request.factory).await?;
    let transaction = rotation::check_status(updates, &request.txid, request.role)?;

    let targets = match request.role {
        Role::Root => None,
        Role::Targets => Some(TargetsRotation::new(&transaction.online_keys)?),
    };
    let rotation: &dyn Rotate = match targets {
        Some(ref targets) => targets,
        None => &RootRotation,
    };

    let key_type = request.key_type;
    debug!("Generating a new {} key", key_type);
    let pair = tokio::task::spawn_blocking(move || KeyPair::generate(key_type, &mut OsRng)).await??;
    let mut rotated = rotation.rotate(
        transaction.updated,
        &pair,
        &transaction.online_keys,
        Utc::now(),
    )?;
    creds.insert_key_pair(request.role.as_str(), &pair);

    let targets_signatures = match targets {
        Some(ref targets) => Some(
            rotation::resign(
                service,
                &request.factory,
                &rotated.ci,
                targets.online_key_id(),
                &creds,
            )
            .await?,
        ),
        None => None,
    };

    let root_signers = if sign {
        rotated.sign(&transaction.current, separate.as_ref().unwrap_or(&creds))?
    } else {
        Vec::new()
    };

    let staged = storage.stage(&creds).await?;
    let resigned = targets_signatures
        .iter()
        .flatten()
        .map(|(tag, signatures)| {
            (
                tag.clone(),
                signatures.iter().map(|s| s.key_id.clone()).collect(),
            )
        })
        .collect();
    let upload = model::RootUpdatesPut {
        ci_root: rotated.ci,
        prod_root: rotated.prod,
        targets_signatures,
    };

    info!("Uploading the new TUF root for transaction {}", request.txid);
    if let Err(e) = service
        .put_root_updates(&request.factory, &request.txid, &upload)
        .await
    {
        let temp_path = staged.unwrap_or_else(|| PathBuf::from(storage.location()));
        warn!(
            "The new {} key was not uploaded; its credentials are kept at {}",
            request.role,
            temp_path.display()
        );
        return Err(Error::UploadFailed {
            temp_path,
            source: Box::new(e),
        });
    }

    storage.commit().await?;
    Ok(Outcome {
        key_id: pair.id().to_owned(),
        root_signers,
        resigned,
        location: storage.location(),
    })
}
