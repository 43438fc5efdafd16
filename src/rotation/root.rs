// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use chrono::{DateTime, Utc};

use crate::{error::Result, model};

use super::{expiry, Role, Rotate};

/// Replaces the offline root key. The new root is valid for another year.
pub(crate) struct RootRotation;

impl Rotate for RootRotation {
    fn role(&self) -> Role {
        Role::Root
    }

    fn assign(&self, root: &mut model::Root, key_id: &str, now: DateTime<Utc>) -> Result<()> {
        let role = root.role_mut(Role::Root.as_str())?;
        role.key_ids = vec![key_id.to_owned()];
        let count = u32::try_from(role.key_ids.len()).unwrap_or(u32::MAX);
        if !(1..=count).contains(&role.threshold) {
            role.threshold = 1;
        }

        root.signed.expires = expiry(now)?;
        Ok(())
    }
}
