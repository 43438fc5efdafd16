// SPDX-FileCopyrightText: 2022-2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use async_trait::async_trait;

use crate::{error::Result, service::TransactionService};

pub(crate) mod rotate_offline_key;

/// What every command runs against.
pub(crate) struct Context {
    pub(crate) factory: String,
    pub(crate) service: Box<dyn TransactionService>,
}

#[async_trait]
pub(crate) trait Command {
    async fn execute(self, context: Context) -> Result<()>;
}
