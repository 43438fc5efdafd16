// SPDX-FileCopyrightText: 2024 Noah Fontes
//
// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::{
    error::{Error, Result},
    model,
};

use super::{Role, Rotate};

/// Replaces the offline targets key, keeping the online key CI signs with.
pub(crate) struct TargetsRotation {
    online_key_id: String,
}

impl TargetsRotation {
    pub(crate) fn new(online_keys: &BTreeMap<String, String>) -> Result<Self> {
        match online_keys.get(Role::Targets.as_str()) {
            Some(key_id) if !key_id.is_empty() => Ok(Self {
                online_key_id: key_id.clone(),
            }),
            _ => Err(Error::MissingOnlineKey),
        }
    }

    pub(crate) fn online_key_id(&self) -> &str {
        &self.online_key_id
    }
}

impl Rotate for TargetsRotation {
    fn role(&self) -> Role {
        Role::Targets
    }

    // Any threshold above one would stop CI from signing on its own.
    fn assign(&self, root: &mut model::Root, key_id: &str, _now: DateTime<Utc>) -> Result<()> {
        let role = root.role_mut(Role::Targets.as_str())?;
        role.key_ids = vec![self.online_key_id.clone(), key_id.to_owned()];
        role.threshold = 1;
        Ok(())
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

    #[test]
    fn targets_role_lists_online_then_new_key() -> Result<()> {
        let root_key = KeyPair::generate(KeyType::Ed25519, &mut OsRng)?;
        let online = KeyPair::generate(KeyType::Ed25519, &mut OsRng)?;
        let old = KeyPair::generate(KeyType::Ed25519, &mut OsRng)?;
        let new = KeyPair::generate(KeyType::Ed25519, &mut OsRng)?;
        let root = testing::root(&[
            ("root", &[&root_key], 1),
            ("targets", &[&online, &old], 2),
        ])?;
        let online_keys: BTreeMap<String, String> =
            [("targets".to_owned(), online.id().to_owned())].into_iter().collect();
        let expires = root.signed.expires;

        let rotation = TargetsRotation::new(&online_keys)?;
        let rotated = rotation.rotate(root, &new, &online_keys, Utc::now())?;

        let role = rotated.ci.role("targets")?;
        assert_eq!(role.key_ids, vec![online.id().to_owned(), new.id().to_owned()]);
        assert_eq!(role.threshold, 1);
        assert!(!rotated.ci.signed.keys.contains_key(old.id()));
        assert_eq!(rotated.ci.signed.expires, expires);

        let prod = rotated.prod.role("targets")?;
        assert_eq!(prod.key_ids, vec![new.id().to_owned()]);
        assert!(!rotated.prod.signed.keys.contains_key(online.id()));
        Ok(())
    }

    #[test]
    fn online_key_is_required() {
        assert!(matches!(
            TargetsRotation::new(&BTreeMap::new()),
            Err(Error::MissingOnlineKey)
        ));
        let empty: BTreeMap<String, String> =
            [("targets".to_owned(), String::new())].into_iter().collect();
        assert!(matches!(
            TargetsRotation::new(&empty),
            Err(Error::MissingOnlineKey)
        ));
    }
}
