// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    collections::BTreeMap,
    fs, io,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use log::{debug, info};
use serde::{de::DeserializeOwned, Serialize};

use crate::{
    error::{self, Result},
    model,
};

use super::TransactionService;

const ROOT_UPDATES: &str = "root-updates.json";
const PROD_TARGETS: &str = "prod-targets.json";

/// A transaction service kept as JSON documents in a directory, one
/// subdirectory per factory.
pub(crate) struct Directory {
    base: PathBuf,
}

impl Directory {
    pub(crate) fn new<P: AsRef<Path>>(base: P) -> Self {
        Self {
            base: base.as_ref().to_owned(),
        }
    }

    fn factory_dir(&self, factory: &str) -> Result<PathBuf> {
        let dir = self.base.join(factory);
        if dir.is_dir() {
            Ok(dir)
        } else {
            Err(error::Remote::UnknownFactory(factory.to_owned()).into())
        }
    }

    fn read<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match fs::read(path) {
            Ok(bytes) => Ok(Some(
                serde_json::from_slice(&bytes).map_err(error::Remote::Malformed)?,
            )),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(error::Remote::Unavailable(e).into()),
        }
    }

    fn write<T: Serialize>(path: &Path, data: &T) -> Result<()> {
        let dir = path.parent().unwrap_or_else(|| Path::new("."));
        let write = || -> io::Result<()> {
            let mut temp = tempfile::NamedTempFile::new_in(dir)?;
            serde_json::to_writer_pretty(temp.as_file_mut(), data)?;
            let _ = temp.persist(path).map_err(|e| e.error)?;
            Ok(())
        };
        write().map_err(|e| error::Remote::Unavailable(e).into())
    }
}

#[async_trait]
impl TransactionService for Directory {
    async fn get_root_updates(&self, factory: &str) -> Result<model::RootUpdates> {
        let path = self.factory_dir(factory)?.join(ROOT_UPDATES);
        debug!("Reading TUF root updates from {}", path.display());
        Ok(Self::read(&path)?.unwrap_or(model::RootUpdates {
            status: model::UpdatesStatus::None,
            transaction_id: None,
            current: None,
            updated: None,
            online_keys: BTreeMap::new(),
            active_wave: None,
            staged: None,
        }))
    }

    async fn put_root_updates(
        &self,
        factory: &str,
        txid: &str,
        updates: &model::RootUpdatesPut,
    ) -> Result<()> {
        let path = self.factory_dir(factory)?.join(ROOT_UPDATES);
        let mut state: model::RootUpdates = Self::read(&path)?.ok_or_else(|| {
            error::Remote::Unavailable(io::Error::new(
                io::ErrorKind::NotFound,
                "no TUF root updates are in progress",
            ))
        })?;

        match state.transaction_id {
            Some(ref expected) if expected == txid => {}
            ref other => {
                return Err(error::Remote::TransactionMismatch {
                    expected: other.clone().unwrap_or_default(),
                    actual: txid.to_owned(),
                }
                .into())
            }
        }

        state.updated = Some(updates.ci_root.clone());
        state.staged = Some(updates.clone());
        Self::write(&path, &state)?;
        info!("Stored TUF root updates for transaction {} in {}", txid, path.display());
        Ok(())
    }

    async fn list_prod_targets(&self, factory: &str) -> Result<BTreeMap<String, model::Targets>> {
        let path = self.factory_dir(factory)?.join(PROD_TARGETS);
        Ok(Self::read(&path)?.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::OsRng;

    use crate::{
        keys::{KeyPair, KeyType},
        testing,
    };

    use super::*;

    struct Fixture {
        dir: tempfile::TempDir,
        online: KeyPair,
        root: model::Root,
    }

    impl Fixture {
        fn new() -> Result<Self> {
            let dir = tempfile::tempdir()?;
            fs::create_dir(dir.path().join(testing::FACTORY))?;
            let root_key = KeyPair::generate(KeyType::Ed25519, &mut OsRng)?;
            let online = KeyPair::generate(KeyType::Ed25519, &mut OsRng)?;
            let root = testing::root(&[("root", &[&root_key], 1), ("targets", &[&online], 1)])?;
            Ok(Self { dir, online, root })
        }

        fn service(&self) -> Directory {
            Directory::new(self.dir.path())
        }

        fn write_updates(&self, updates: &model::RootUpdates) -> Result<()> {
            Directory::write(
                &self.dir.path().join(testing::FACTORY).join(ROOT_UPDATES),
                updates,
            )
        }

        fn upload(&self) -> model::RootUpdatesPut {
            let mut ci_root = self.root.clone();
            ci_root.signed.version += 1;
            model::RootUpdatesPut {
                prod_root: ci_root.clone(),
                ci_root,
                targets_signatures: None,
            }
        }
    }

    #[tokio::test]
    async fn unknown_factory_is_rejected() -> Result<()> {
        let fixture = Fixture::new()?;

        assert!(matches!(
            fixture.service().get_root_updates("other").await,
            Err(error::Error::Remote(error::Remote::UnknownFactory(factory))) if factory == "other"
        ));
        Ok(())
    }

    #[tokio::test]
    async fn factory_without_updates_has_none_in_progress() -> Result<()> {
        let fixture = Fixture::new()?;
        let service = fixture.service();

        let updates = service.get_root_updates(testing::FACTORY).await?;

        assert_eq!(updates.status, model::UpdatesStatus::None);
        assert!(service.list_prod_targets(testing::FACTORY).await?.is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn upload_for_another_transaction_is_rejected() -> Result<()> {
        let fixture = Fixture::new()?;
        let updates = testing::started(fixture.root.clone(), fixture.root.clone(), &fixture.online);
        fixture.write_updates(&updates)?;
        let service = fixture.service();

        assert!(matches!(
            service
                .put_root_updates(testing::FACTORY, "tx-2", &fixture.upload())
                .await,
            Err(error::Error::Remote(error::Remote::TransactionMismatch { expected, actual }))
                if expected == testing::TXID && actual == "tx-2"
        ));
        assert_eq!(service.get_root_updates(testing::FACTORY).await?, updates);
        Ok(())
    }

    #[tokio::test]
    async fn upload_replaces_updated_root() -> Result<()> {
        let fixture = Fixture::new()?;
        let updates = testing::started(fixture.root.clone(), fixture.root.clone(), &fixture.online);
        fixture.write_updates(&updates)?;
        let service = fixture.service();
        let upload = fixture.upload();

        service
            .put_root_updates(testing::FACTORY, testing::TXID, &upload)
            .await?;

        let stored = service.get_root_updates(testing::FACTORY).await?;
        assert_eq!(stored.current, updates.current);
        assert_eq!(stored.updated, Some(upload.ci_root.clone()));
        assert_eq!(stored.staged, Some(upload));
        assert_eq!(stored.online_keys, updates.online_keys);
        Ok(())
    }

    #[tokio::test]
    async fn production_targets_are_read_by_tag() -> Result<()> {
        let fixture = Fixture::new()?;
        let targets = model::Targets {
            signatures: Vec::new(),
            signed: serde_json::json!({"_type": "Targets", "version": 4}),
        };
        let by_tag: BTreeMap<String, model::Targets> =
            [("production".to_owned(), targets)].into_iter().collect();
        Directory::write(
            &fixture.dir.path().join(testing::FACTORY).join(PROD_TARGETS),
            &by_tag,
        )?;

        assert_eq!(
            fixture.service().list_prod_targets(testing::FACTORY).await?,
            by_tag
        );
        Ok(())
    }

    #[tokio::test]
    async fn malformed_state_is_reported() -> Result<()> {
        let fixture = Fixture::new()?;
        fs::write(
            fixture.dir.path().join(testing::FACTORY).join(ROOT_UPDATES),
            b"{\"status\": 3}",
        )?;

        assert!(matches!(
            fixture.service().get_root_updates(testing::FACTORY).await,
            Err(error::Error::Remote(error::Remote::Malformed(_)))
        ));
        Ok(())
    }
}
