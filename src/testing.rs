// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{collections::BTreeMap, io};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::{
    error::{self, Result},
    keys::KeyPair,
    model,
    service::TransactionService,
};

pub(crate) const FACTORY: &str = "factory";
pub(crate) const TXID: &str = "tx-1";

pub(crate) fn expires() -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339("2030-01-01T00:00:00Z")
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?
        .with_timezone(&Utc))
}

/// Builds an unsigned root that lists every given key under its role.
pub(crate) fn root(roles: &[(&str, &[&KeyPair], u32)]) -> Result<model::Root> {
    let mut keys = BTreeMap::new();
    let mut role_keys = BTreeMap::new();
    for &(name, pairs, threshold) in roles {
        for pair in pairs {
            let _ = keys.insert(pair.id().to_owned(), pair.public().clone());
        }
        let _ = role_keys.insert(
            name.to_owned(),
            model::RoleKeys {
                key_ids: pairs.iter().map(|pair| pair.id().to_owned()).collect(),
                threshold,
            },
        );
    }

    Ok(model::Root {
        signatures: Vec::new(),
        signed: model::RootMeta {
            type_: "Root".to_owned(),
            consistent_snapshot: false,
            expires: expires()?,
            keys,
            roles: role_keys,
            version: 2,
        },
    })
}

pub(crate) fn started(
    current: model::Root,
    updated: model::Root,
    online_targets: &KeyPair,
) -> model::RootUpdates {
    model::RootUpdates {
        status: model::UpdatesStatus::Started,
        transaction_id: Some(TXID.to_owned()),
        current: Some(current),
        updated: Some(updated),
        online_keys: [("targets".to_owned(), online_targets.id().to_owned())]
            .into_iter()
            .collect(),
        active_wave: None,
        staged: None,
    }
}

/// A transaction service that records uploads instead of applying them.
pub(crate) struct MockService {
    pub(crate) updates: model::RootUpdates,
    pub(crate) targets: BTreeMap<String, model::Targets>,
    pub(crate) reject_uploads: bool,
    pub(crate) uploads: Mutex<Vec<(String, model::RootUpdatesPut)>>,
}

impl MockService {
    pub(crate) fn new(updates: model::RootUpdates) -> Self {
        Self {
            updates,
            targets: BTreeMap::new(),
            reject_uploads: false,
            uploads: Mutex::new(Vec::new()),
        }
    }

    pub(crate) async fn uploads(&self) -> Vec<(String, model::RootUpdatesPut)> {
        self.uploads.lock().await.clone()
    }
}

#[async_trait]
impl TransactionService for MockService {
    async fn get_root_updates(&self, factory: &str) -> Result<model::RootUpdates> {
        if factory == FACTORY {
            Ok(self.updates.clone())
        } else {
            Err(error::Remote::UnknownFactory(factory.to_owned()).into())
        }
    }

    async fn put_root_updates(
        &self,
        _factory: &str,
        txid: &str,
        updates: &model::RootUpdatesPut,
    ) -> Result<()> {
        if self.reject_uploads {
            return Err(error::Remote::Unavailable(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "connection reset by peer",
            ))
            .into());
        }
        self.uploads
            .lock()
            .await
            .push((txid.to_owned(), updates.clone()));
        Ok(())
    }

    async fn list_prod_targets(&self, _factory: &str) -> Result<BTreeMap<String, model::Targets>> {
        Ok(self.targets.clone())
    }
}
