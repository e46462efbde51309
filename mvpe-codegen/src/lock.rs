//! In-memory representation of the IDs lock.
//!
//! The lock records every name → id mapping ever assigned, the tombstoned
//! ids that must never be reused, and rename aliases that carry an id from
//! an old name to a new one. Ordered maps keep on-disk emission stable.

use crate::error::IdError;
use std::collections::{BTreeMap, BTreeSet};

/// Maximum alias hops followed before the chain is declared cyclic.
pub const MAX_ALIAS_HOPS: usize = 10;

/// Persistent ID assignments across builds.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IdsLock {
    pub version: u32,

    /// Service name → id.
    pub services: BTreeMap<String, u32>,
    /// `"Service.Method"` → id.
    pub methods: BTreeMap<String, u32>,
    /// Message name → id.
    pub messages: BTreeMap<String, u32>,

    /// Retired service ids.
    pub tombstone_services: BTreeSet<u32>,
    /// Retired method ids, bucketed per service.
    pub tombstone_methods: BTreeMap<String, BTreeSet<u32>>,
    /// Retired message ids.
    pub tombstone_messages: BTreeSet<u32>,

    /// Service rename mapping (old → new).
    pub alias_services: BTreeMap<String, String>,
    /// Message rename mapping (old → new).
    pub alias_messages: BTreeMap<String, String>,
}

impl IdsLock {
    pub fn new() -> Self {
        Self {
            version: 1,
            ..Self::default()
        }
    }

    /// Method tombstones for one service (empty set if none recorded).
    pub fn tombstones_for_service(&self, service: &str) -> BTreeSet<u32> {
        self.tombstone_methods
            .get(service)
            .cloned()
            .unwrap_or_default()
    }

    /// Qualified method ids belonging to one service.
    pub fn method_ids_for_service(&self, service: &str) -> BTreeSet<u32> {
        let prefix = format!("{service}.");
        self.methods
            .iter()
            .filter(|(name, _)| name.starts_with(&prefix))
            .map(|(_, id)| *id)
            .collect()
    }

    /// Follows an alias chain to its terminal name, bounded by
    /// [`MAX_ALIAS_HOPS`].
    pub fn resolve_alias<'a>(
        aliases: &'a BTreeMap<String, String>,
        name: &'a str,
    ) -> Result<&'a str, IdError> {
        let mut current = name;
        for _ in 0..MAX_ALIAS_HOPS {
            match aliases.get(current) {
                Some(next) => current = next,
                None => return Ok(current),
            }
        }
        Err(IdError::AliasCycle(name.to_string()))
    }

    /// Rewrites every aliased entry to its canonical name so lookups from
    /// a renamed schema find the preserved id.
    ///
    /// A service rename also migrates its qualified method entries and its
    /// method tombstone bucket.
    pub fn canonicalize(&mut self) -> Result<(), IdError> {
        // Services first, since their rename moves method keys with them.
        let service_renames: Vec<(String, String)> = self
            .services
            .keys()
            .filter_map(|name| {
                match Self::resolve_alias(&self.alias_services, name) {
                    Ok(canonical) if canonical != name => {
                        Some(Ok((name.clone(), canonical.to_string())))
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .collect::<Result<_, _>>()?;

        for (old, new) in service_renames {
            if let Some(id) = self.services.remove(&old) {
                self.services.entry(new.clone()).or_insert(id);
            }

            let old_prefix = format!("{old}.");
            let moved: Vec<(String, u32)> = self
                .methods
                .iter()
                .filter(|(name, _)| name.starts_with(&old_prefix))
                .map(|(name, id)| (name.clone(), *id))
                .collect();
            for (name, id) in moved {
                self.methods.remove(&name);
                let suffix = &name[old_prefix.len()..];
                self.methods.entry(format!("{new}.{suffix}")).or_insert(id);
            }

            if let Some(tombs) = self.tombstone_methods.remove(&old) {
                self.tombstone_methods
                    .entry(new)
                    .or_default()
                    .extend(tombs);
            }
        }

        let message_renames: Vec<(String, String)> = self
            .messages
            .keys()
            .filter_map(|name| {
                match Self::resolve_alias(&self.alias_messages, name) {
                    Ok(canonical) if canonical != name => {
                        Some(Ok((name.clone(), canonical.to_string())))
                    }
                    Ok(_) => None,
                    Err(e) => Some(Err(e)),
                }
            })
            .collect::<Result<_, _>>()?;

        for (old, new) in message_renames {
            if let Some(id) = self.messages.remove(&old) {
                self.messages.entry(new).or_insert(id);
            }
        }

        Ok(())
    }
}
