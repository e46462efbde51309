//! ID assignment for a schema against the lock.
//!
//! Walks the schema in declaration order (service, then methods, then
//! messages), resolving aliases, reconciling explicit ids, reusing locked
//! ids, and allocating the rest deterministically. Mode controls how the
//! lockfile participates:
//!
//! - `Off`: the lock is neither read nor written; ad-hoc generation.
//! - `Check`: the lock is authoritative; unknown symbols and drift fail.
//! - `Write`: missing ids are allocated, drift is overwritten, and the
//!   lock is persisted.

use crate::error::{CodegenError, IdError};
use crate::ids::{
    self, GLOBAL_PROBE_LIMIT, MESSAGE_SPACE, METHOD_PROBE_LIMIT, METHOD_SPACE, SERVICE_SPACE,
};
use crate::lock::IdsLock;
use crate::lockfile;
use crate::schema::Schema;
use std::collections::BTreeMap;
use std::path::Path;

/// Lockfile participation mode for one generation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockMode {
    Off,
    Check,
    Write,
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LockMode::Off => f.write_str("OFF"),
            LockMode::Check => f.write_str("CHECK"),
            LockMode::Write => f.write_str("WRITE"),
        }
    }
}

/// The ids stamped onto one schema by an assignment run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdTable {
    pub service_id: u32,
    /// Method name → id.
    pub method_ids: BTreeMap<String, u32>,
    /// Message name → id.
    pub message_ids: BTreeMap<String, u32>,
}

/// Assigns ids for `schema` against an in-memory lock.
///
/// The schema is rewritten to canonical (alias-resolved) names and its
/// `id` fields are filled in; the lock accumulates any new assignments.
pub fn assign_ids(
    schema: &mut Schema,
    lock: &mut IdsLock,
    mode: LockMode,
) -> Result<IdTable, IdError> {
    lock.canonicalize()?;

    // Service name goes through rename aliases first.
    let service = IdsLock::resolve_alias(&lock.alias_services, &schema.service)?.to_string();
    if service != schema.service {
        tracing::debug!(from = %schema.service, to = %service, "Resolved service alias");
        schema.service = service.clone();
    }

    let service_id = assign_service_id(schema, lock, mode, &service)?;

    let mut method_ids = BTreeMap::new();
    for method in &mut schema.methods {
        let id = assign_method_id(lock, mode, &service, &method.name, method.id)?;
        method.id = Some(id);
        method_ids.insert(method.name.clone(), id);
    }

    let mut message_ids = BTreeMap::new();
    let mut renames: Vec<(String, String)> = Vec::new();
    for message in &mut schema.messages {
        let canonical = IdsLock::resolve_alias(&lock.alias_messages, &message.name)?.to_string();
        if canonical != message.name {
            tracing::debug!(from = %message.name, to = %canonical, "Resolved message alias");
            renames.push((message.name.clone(), canonical.clone()));
            message.name = canonical.clone();
        }

        let id = assign_message_id(lock, mode, &canonical, message.id)?;
        message.id = Some(id);
        message_ids.insert(canonical, id);
    }

    // Method request/response references follow renamed messages.
    for (old, new) in &renames {
        for method in &mut schema.methods {
            if &method.request == old {
                method.request = new.clone();
            }
            if &method.response == old {
                method.response = new.clone();
            }
        }
    }

    tracing::info!(
        service = %schema.service,
        service_id,
        methods = method_ids.len(),
        messages = message_ids.len(),
        mode = %mode,
        "Assigned ids"
    );

    Ok(IdTable {
        service_id,
        method_ids,
        message_ids,
    })
}

/// Loads the lock, assigns, and persists according to `mode`.
pub fn assign_with_lockfile(
    schema: &mut Schema,
    lockfile_path: &Path,
    mode: LockMode,
) -> Result<IdTable, CodegenError> {
    let mut lock = match mode {
        LockMode::Off => IdsLock::new(),
        LockMode::Check | LockMode::Write => lockfile::load(lockfile_path)?,
    };

    let table = assign_ids(schema, &mut lock, mode)?;

    if mode == LockMode::Write {
        lockfile::save(&lock, lockfile_path)?;
    }

    Ok(table)
}

fn assign_service_id(
    schema: &mut Schema,
    lock: &mut IdsLock,
    mode: LockMode,
    service: &str,
) -> Result<u32, IdError> {
    let locked = lock.services.get(service).copied();

    let id = match schema.id {
        Some(explicit) => {
            let holder = holder_of(&lock.services, explicit, service);
            ids::validate_explicit(explicit, &SERVICE_SPACE, holder, &lock.tombstone_services)?;

            match locked {
                Some(locked) if locked != explicit => {
                    reconcile_drift(mode, service, locked, explicit)?;
                }
                None if mode == LockMode::Check => {
                    return Err(IdError::MissingInLockCheckMode {
                        symbol: service.to_string(),
                    });
                }
                _ => {}
            }
            explicit
        }
        None => match locked {
            Some(locked) => locked,
            None => {
                if mode == LockMode::Check {
                    return Err(IdError::MissingInLockCheckMode {
                        symbol: service.to_string(),
                    });
                }
                let used = lock.services.values().copied().collect();
                ids::allocate(
                    &ids::service_canonical_name(service),
                    &SERVICE_SPACE,
                    &used,
                    &lock.tombstone_services,
                    GLOBAL_PROBE_LIMIT,
                )?
            }
        },
    };

    schema.id = Some(id);
    lock.services.insert(service.to_string(), id);
    Ok(id)
}

fn assign_method_id(
    lock: &mut IdsLock,
    mode: LockMode,
    service: &str,
    method: &str,
    explicit: Option<u32>,
) -> Result<u32, IdError> {
    let qualified = format!("{service}.{method}");
    let tombstones = lock.tombstones_for_service(service);
    let locked = lock.methods.get(&qualified).copied();

    let id = match explicit {
        Some(explicit) => {
            let prefix = format!("{service}.");
            let holder = lock
                .methods
                .iter()
                .find(|(name, &id)| {
                    id == explicit && name.starts_with(&prefix) && **name != qualified
                })
                .map(|(name, _)| name.as_str());
            ids::validate_explicit(explicit, &METHOD_SPACE, holder, &tombstones)?;

            match locked {
                Some(locked) if locked != explicit => {
                    reconcile_drift(mode, &qualified, locked, explicit)?;
                }
                None if mode == LockMode::Check => {
                    return Err(IdError::MissingInLockCheckMode { symbol: qualified });
                }
                _ => {}
            }
            explicit
        }
        None => match locked {
            Some(locked) => locked,
            None => {
                if mode == LockMode::Check {
                    return Err(IdError::MissingInLockCheckMode { symbol: qualified });
                }
                let used = lock.method_ids_for_service(service);
                ids::allocate(
                    &ids::method_canonical_name(service, method),
                    &METHOD_SPACE,
                    &used,
                    &tombstones,
                    METHOD_PROBE_LIMIT,
                )?
            }
        },
    };

    lock.methods.insert(qualified, id);
    Ok(id)
}

fn assign_message_id(
    lock: &mut IdsLock,
    mode: LockMode,
    message: &str,
    explicit: Option<u32>,
) -> Result<u32, IdError> {
    let locked = lock.messages.get(message).copied();

    let id = match explicit {
        Some(explicit) => {
            let holder = holder_of(&lock.messages, explicit, message);
            ids::validate_explicit(explicit, &MESSAGE_SPACE, holder, &lock.tombstone_messages)?;

            match locked {
                Some(locked) if locked != explicit => {
                    reconcile_drift(mode, message, locked, explicit)?;
                }
                None if mode == LockMode::Check => {
                    return Err(IdError::MissingInLockCheckMode {
                        symbol: message.to_string(),
                    });
                }
                _ => {}
            }
            explicit
        }
        None => match locked {
            Some(locked) => locked,
            None => {
                if mode == LockMode::Check {
                    return Err(IdError::MissingInLockCheckMode {
                        symbol: message.to_string(),
                    });
                }
                let used = lock.messages.values().copied().collect();
                ids::allocate(
                    &ids::message_canonical_name(message),
                    &MESSAGE_SPACE,
                    &used,
                    &lock.tombstone_messages,
                    GLOBAL_PROBE_LIMIT,
                )?
            }
        },
    };

    lock.messages.insert(message.to_string(), id);
    Ok(id)
}

/// Finds a different symbol already holding `id` in a name → id map.
fn holder_of<'a>(map: &'a BTreeMap<String, u32>, id: u32, this: &str) -> Option<&'a str> {
    map.iter()
        .find(|(name, &held)| held == id && name.as_str() != this)
        .map(|(name, _)| name.as_str())
}

/// Lock and schema disagree on an explicit id: fatal in CHECK, schema
/// wins in WRITE (caller persists afterwards).
fn reconcile_drift(mode: LockMode, symbol: &str, locked: u32, schema: u32) -> Result<(), IdError> {
    match mode {
        LockMode::Check => Err(IdError::LockDrift {
            symbol: symbol.to_string(),
            locked,
            schema,
        }),
        LockMode::Write | LockMode::Off => {
            tracing::warn!(symbol, locked, schema, "Overwriting lock to match schema");
            Ok(())
        }
    }
}
