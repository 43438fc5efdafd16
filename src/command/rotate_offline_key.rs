// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::path::PathBuf;

use async_trait::async_trait;
use clap::Parser;
use log::{error, info};
use tabled::{
    settings::{object::Segment, Alignment, Modify, Style},
    Table, Tabled,
};

use crate::{
    creds::Archive,
    error::{self, Result},
    keys::KeyType,
    orchestrator::{self, RootKeys},
    rotation::Role,
};

/// Stage rotation of an offline TUF signing key for the factory.
///
/// The new key is used in both the CI and the production TUF root. Rotating
/// the targets key also signs every production targets document with the new
/// key, and is not allowed while a wave is active.
#[derive(Debug, Parser)]
pub(crate) struct Command {
    /// The TUF role whose offline key is replaced.
    #[arg(short, long, value_enum, ignore_case = true)]
    role: Role,

    /// The TUF root updates transaction ID.
    #[arg(short = 'x', long)]
    txid: String,

    /// The credentials archive with the offline TUF root keys.
    #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
    keys: Option<PathBuf>,

    /// The credentials archive that receives the new offline TUF targets key.
    /// Defaults to the archive given by --keys.
    #[arg(short = 'K', long, value_hint = clap::ValueHint::FilePath)]
    targets_keys: Option<PathBuf>,

    /// The type of the new key.
    #[arg(short = 'y', long, value_enum, ignore_case = true, default_value_t)]
    key_type: KeyType,

    /// Sign the new TUF root with the offline TUF root keys.
    #[arg(short, long)]
    sign: bool,
}

#[derive(Tabled)]
struct Resigned {
    #[tabled(rename = "Tag")]
    tag: String,
    #[tabled(rename = "Signed By")]
    key_ids: String,
}

impl Command {
    /// Picks the archive that receives the new key and the root keys to sign
    /// with.
    fn archives(&self) -> Result<(Archive, RootKeys<Archive>)> {
        match self.role {
            Role::Root => {
                let Some(ref keys) = self.keys else {
                    error!("The --keys option is required to rotate the offline TUF root key");
                    return Err(error::Error::Command);
                };
                if self.targets_keys.is_some() {
                    error!("The --targets-keys option is only valid to rotate the offline TUF targets key");
                    return Err(error::Error::Command);
                }

                let root_keys = if self.sign {
                    RootKeys::Shared
                } else {
                    RootKeys::Unsigned
                };
                Ok((Archive::new(keys), root_keys))
            }
            Role::Targets => {
                let Some(targets_keys) = self.targets_keys.as_ref().or(self.keys.as_ref()) else {
                    error!("The --keys or --targets-keys option is required to rotate the offline TUF targets key");
                    return Err(error::Error::Command);
                };

                let root_keys = match (self.sign, self.keys.as_ref()) {
                    (false, _) => RootKeys::Unsigned,
                    (true, None) => {
                        error!("The --keys option is required to sign the new TUF root");
                        return Err(error::Error::Command);
                    }
                    (true, Some(keys)) if keys == targets_keys => RootKeys::Shared,
                    (true, Some(keys)) => RootKeys::Separate(Archive::new(keys)),
                };
                Ok((Archive::new(targets_keys), root_keys))
            }
        }
    }
}

#[async_trait]
impl super::Command for Command {
    async fn execute(self, context: super::Context) -> Result<()> {
        let (storage, root_keys) = self.archives()?;
        let request = orchestrator::Request {
            factory: context.factory,
            txid: self.txid,
            role: self.role,
            key_type: self.key_type,
        };
        info!(
            "Rotating the offline TUF {} key of factory {}",
            request.role, request.factory
        );

        let outcome =
            orchestrator::rotate_offline_key(&context.service, &request, storage, root_keys).await?;

        println!("New {} key ID: {}", request.role, outcome.key_id);
        if !outcome.root_signers.is_empty() {
            println!("TUF root signed by: {}", outcome.root_signers.join(", "));
        }
        if !outcome.resigned.is_empty() {
            println!(
                "{}",
                Table::new(outcome.resigned.into_iter().map(|(tag, key_ids)| Resigned {
                    tag,
                    key_ids: key_ids.join(", "),
                }))
                .with(Style::rounded())
                .with(Modify::new(Segment::all()).with(Alignment::left()))
            );
        }
        println!("Credentials saved to {}", outcome.location);
        Ok(())
    }
}
