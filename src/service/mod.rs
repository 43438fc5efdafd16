// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

mod directory;

use std::collections::BTreeMap;

use async_trait::async_trait;
use log::error;
use url::Url;

use crate::{
    error::{self, Result},
    model,
};

pub(crate) use directory::Directory;

/// The remote service that stages TUF root updates for a factory.
#[async_trait]
pub(crate) trait TransactionService: Send + Sync {
    async fn get_root_updates(&self, factory: &str) -> Result<model::RootUpdates>;

    async fn put_root_updates(
        &self,
        factory: &str,
        txid: &str,
        updates: &model::RootUpdatesPut,
    ) -> Result<()>;

    /// Production targets by tag. A factory without any is not an error.
    async fn list_prod_targets(&self, factory: &str) -> Result<BTreeMap<String, model::Targets>>;
}

#[async_trait]
impl<T: TransactionService + ?Sized> TransactionService for Box<T> {
    async fn get_root_updates(&self, factory: &str) -> Result<model::RootUpdates> {
        (**self).get_root_updates(factory).await
    }

    async fn put_root_updates(
        &self,
        factory: &str,
        txid: &str,
        updates: &model::RootUpdatesPut,
    ) -> Result<()> {
        (**self).put_root_updates(factory, txid, updates).await
    }

    async fn list_prod_targets(&self, factory: &str) -> Result<BTreeMap<String, model::Targets>> {
        (**self).list_prod_targets(factory).await
    }
}

pub(crate) fn connect(url: &Url) -> Result<Box<dyn TransactionService>> {
    match url.scheme() {
        "file" => Ok(Box::new(Directory::new(url.to_file_path().map_err(
            |()| {
                error!("The URL {} is not a valid file path", url);
                error::Error::Command
            },
        )?))),
        scheme => Err(error::Remote::UnsupportedScheme(scheme.to_owned()).into()),
    }
}
