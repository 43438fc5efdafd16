// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{io, path::PathBuf, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{self, Result};

use super::{OfflineCreds, Storage};

#[derive(Default)]
struct State {
    current: Option<OfflineCreds>,
    staged: Option<OfflineCreds>,
    fail_commit: bool,
}

/// Credentials held in process. Clones share the same contents.
#[derive(Clone, Default)]
pub(crate) struct Memory {
    state: Arc<RwLock<State>>,
}

impl Memory {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with(creds: OfflineCreds) -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                current: Some(creds),
                ..State::default()
            })),
        }
    }

    /// Makes every later commit fail, as a rename over a busy file would.
    pub(crate) async fn fail_commits(&self) {
        self.state.write().await.fail_commit = true;
    }

    pub(crate) async fn staged(&self) -> Option<OfflineCreds> {
        self.state.read().await.staged.clone()
    }
}

#[async_trait]
impl Storage for Memory {
    fn location(&self) -> String {
        "memory".to_owned()
    }

    async fn get(&mut self) -> Result<Option<OfflineCreds>> {
        Ok(self.state.read().await.current.clone())
    }

    async fn check_writable(&self) -> Result<()> {
        Ok(())
    }

    async fn stage(&mut self, creds: &OfflineCreds) -> Result<Option<PathBuf>> {
        self.state.write().await.staged = Some(creds.clone());
        Ok(None)
    }

    async fn commit(&mut self) -> Result<()> {
        let mut guard = self.state.write().await;
        if guard.fail_commit {
            return Err(error::Error::CredentialCommit {
                temp_path: PathBuf::from(self.location()),
                source: io::Error::new(io::ErrorKind::PermissionDenied, "commit refused"),
            });
        }
        if let Some(staged) = guard.staged.take() {
            guard.current = Some(staged);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn clones_share_contents() -> Result<()> {
        let mut storage = Memory::new();
        let observer = storage.clone();
        let creds: OfflineCreds = [("a".to_owned(), b"b".to_vec())].into_iter().collect();

        assert_eq!(storage.stage(&creds).await?, None);
        assert_eq!(observer.staged().await, Some(creds.clone()));

        storage.commit().await?;
        assert_eq!(observer.clone().get().await?, Some(creds));
        assert_eq!(observer.staged().await, None);
        Ok(())
    }

    #[tokio::test]
    async fn failed_commit_keeps_the_current_copy() -> Result<()> {
        let mut storage = Memory::with(OfflineCreds::new());
        storage.fail_commits().await;
        let creds: OfflineCreds = [("a".to_owned(), b"b".to_vec())].into_iter().collect();

        assert!(matches!(
            storage.update(&creds).await,
            Err(error::Error::CredentialCommit { .. })
        ));
        assert_eq!(storage.get().await?, Some(OfflineCreds::new()));
        Ok(())
    }
}
