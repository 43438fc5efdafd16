// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::{
    fs,
    io::{self, Read, Write},
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use chrono::Utc;
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use log::{debug, warn};

use crate::error::{self, Result};

use super::{OfflineCreds, Storage};

/// Credentials kept in a gzip-compressed tar file on disk.
pub(crate) struct Archive {
    path: PathBuf,
    staged: Option<PathBuf>,
}

impl Archive {
    pub(crate) fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_owned(),
            staged: None,
        }
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

pub(crate) fn decode<R: Read>(reader: R) -> Result<OfflineCreds, error::CredsFormat> {
    let mut archive = tar::Archive::new(GzDecoder::new(reader));
    let mut creds = OfflineCreds::new();

    for entry in archive.entries().map_err(error::CredsFormat::Archive)? {
        let mut entry = entry.map_err(error::CredsFormat::Archive)?;
        if !entry.header().entry_type().is_file() {
            continue;
        }

        let name = entry
            .path()
            .map_err(error::CredsFormat::Archive)?
            .to_string_lossy()
            .into_owned();
        let mut content = Vec::new();
        let _ = entry
            .read_to_end(&mut content)
            .map_err(error::CredsFormat::Archive)?;
        creds.insert(name, content);
    }

    Ok(creds)
}

pub(crate) fn encode<W: Write>(writer: W, creds: &OfflineCreds) -> io::Result<W> {
    let mtime = u64::try_from(Utc::now().timestamp()).unwrap_or_default();
    let mut builder = tar::Builder::new(GzEncoder::new(writer, Compression::default()));

    for (name, content) in creds.iter() {
        let mut header = tar::Header::new_gnu();
        header.set_entry_type(tar::EntryType::Regular);
        header.set_size(content.len() as u64);
        header.set_mode(0o600);
        header.set_mtime(mtime);
        builder.append_data(&mut header, name, content)?;
    }

    builder.into_inner()?.finish()
}

#[async_trait]
impl Storage for Archive {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn get(&mut self) -> Result<Option<OfflineCreds>> {
        match fs::File::open(&self.path) {
            Ok(fp) => Ok(Some(decode(fp)?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn check_writable(&self) -> Result<()> {
        let result = match fs::OpenOptions::new().append(true).open(&self.path) {
            Ok(_) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tempfile::tempfile_in(self.dir()).map(drop)
            }
            Err(e) => Err(e),
        };
        result.map_err(|source| error::Error::NotWritable {
            path: self.path.clone(),
            source,
        })
    }

    async fn stage(&mut self, creds: &OfflineCreds) -> Result<Option<PathBuf>> {
        let prefix = format!(
            ".{}.",
            self.path
                .file_name()
                .map_or_else(|| "creds".into(), |name| name.to_string_lossy())
        );
        // The temporary file is only readable by its owner.
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(self.dir())?;
        let _ = encode(temp.as_file_mut(), creds)?;
        temp.as_file().sync_all()?;
        let (_, path) = temp.keep().map_err(|e| e.error)?;

        debug!(
            "Staged {} credential entries for {} at {}",
            creds.len(),
            self.path.display(),
            path.display()
        );
        if let Some(previous) = self.staged.replace(path.clone()) {
            warn!(
                "Replacing an earlier staged copy that is still at {}",
                previous.display()
            );
        }
        Ok(Some(path))
    }

    async fn commit(&mut self) -> Result<()> {
        let Some(staged) = self.staged.take() else {
            return Ok(());
        };
        if let Err(source) = fs::rename(&staged, &self.path) {
            return Err(error::Error::CredentialCommit {
                temp_path: staged,
                source,
            });
        }
        debug!("Committed credentials to {}", self.path.display());
        Ok(())
    }
}
