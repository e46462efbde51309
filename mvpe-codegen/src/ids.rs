//! Deterministic ID allocation.
//!
//! Ids are derived from a 32-bit FNV-1a hash of a canonical name string
//! mapped into the symbol's ID space. Collisions and tombstoned slots are
//! resolved by deterministic probing: `#1`, `#2`, ... suffixes are appended
//! to the canonical name and the hash is recomputed, up to a fixed cap.
//! The same name therefore yields the same id on every machine and every
//! build, which is what keeps wire ids stable across releases.

use crate::error::IdError;
use std::collections::BTreeSet;

/// An inclusive ID range for one symbol kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSpace {
    pub label: &'static str,
    pub min: u32,
    pub max: u32,
}

impl IdSpace {
    pub const fn size(&self) -> u32 {
        self.max - self.min + 1
    }

    pub fn contains(&self, id: u32) -> bool {
        id >= self.min && id <= self.max
    }
}

/// Service ids: global space.
pub const SERVICE_SPACE: IdSpace = IdSpace {
    label: "service",
    min: 32,
    max: 64999,
};

/// Method ids: per-service space.
pub const METHOD_SPACE: IdSpace = IdSpace {
    label: "method",
    min: 16,
    max: 239,
};

/// Message ids: global space.
pub const MESSAGE_SPACE: IdSpace = IdSpace {
    label: "message",
    min: 32,
    max: 64000,
};

/// Probe cap for the global (service/message) spaces.
pub const GLOBAL_PROBE_LIMIT: u32 = 4096;

/// Probe cap for the per-service method space.
pub const METHOD_PROBE_LIMIT: u32 = 1024;

/// 32-bit FNV-1a over the UTF-8 bytes of `s`.
pub fn fnv1a32(s: &str) -> u32 {
    const FNV_OFFSET_BASIS: u32 = 0x811C_9DC5;
    const FNV_PRIME: u32 = 0x0100_0193;

    let mut hash = FNV_OFFSET_BASIS;
    for byte in s.as_bytes() {
        hash ^= u32::from(*byte);
        hash = hash.wrapping_mul(FNV_PRIME);
    }
    hash
}

/// Canonical hash name for a service.
pub fn service_canonical_name(service: &str) -> String {
    format!("Service:{service}")
}

/// Canonical hash name for a message.
pub fn message_canonical_name(message: &str) -> String {
    format!("Message:{message}")
}

/// Canonical hash name for a method, qualified by its service.
pub fn method_canonical_name(service: &str, method: &str) -> String {
    format!("{service}.{method}")
}

fn candidate(canonical: &str, space: &IdSpace) -> u32 {
    let positive = fnv1a32(canonical) & 0x7FFF_FFFF;
    space.min + positive % space.size()
}

/// Deterministically allocates an id for `canonical` in `space`, skipping
/// ids in `used` or `tombstoned`.
pub fn allocate(
    canonical: &str,
    space: &IdSpace,
    used: &BTreeSet<u32>,
    tombstoned: &BTreeSet<u32>,
    probe_limit: u32,
) -> Result<u32, IdError> {
    let free = |id: u32| !used.contains(&id) && !tombstoned.contains(&id);

    let first = candidate(canonical, space);
    if free(first) {
        return Ok(first);
    }

    for k in 1..=probe_limit {
        let probed = candidate(&format!("{canonical}#{k}"), space);
        if free(probed) {
            return Ok(probed);
        }
    }

    Err(IdError::ProbeExhausted(canonical.to_string()))
}

/// Validates an explicitly assigned id: in range, not held by another
/// symbol, not tombstoned.
pub fn validate_explicit(
    id: u32,
    space: &IdSpace,
    used_by_other: Option<&str>,
    tombstoned: &BTreeSet<u32>,
) -> Result<u32, IdError> {
    if !space.contains(id) {
        return Err(IdError::OutOfRange {
            label: space.label,
            id,
            min: space.min,
            max: space.max,
        });
    }
    if tombstoned.contains(&id) {
        return Err(IdError::Tombstoned {
            label: space.label,
            id,
        });
    }
    if let Some(holder) = used_by_other {
        return Err(IdError::AlreadyInUse {
            label: space.label,
            id,
            holder: holder.to_string(),
        });
    }
    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_space_constants() {
        assert_eq!(SERVICE_SPACE.min, 32);
        assert_eq!(SERVICE_SPACE.max, 64999);
        assert_eq!(METHOD_SPACE.min, 16);
        assert_eq!(METHOD_SPACE.max, 239);
        assert_eq!(MESSAGE_SPACE.min, 32);
        assert_eq!(MESSAGE_SPACE.max, 64000);
    }

    #[test]
    fn test_fnv1a32_reference_values() {
        // Standard FNV-1a test vectors.
        assert_eq!(fnv1a32(""), 0x811C_9DC5);
        assert_eq!(fnv1a32("a"), 0xE40C_292C);
        assert_eq!(fnv1a32("foobar"), 0xBF9C_F968);
    }

    #[test]
    fn test_allocation_is_deterministic() {
        let used = BTreeSet::new();
        let tombs = BTreeSet::new();

        let a = allocate(
            "Service:AccountService",
            &SERVICE_SPACE,
            &used,
            &tombs,
            GLOBAL_PROBE_LIMIT,
        )
        .unwrap();
        let b = allocate(
            "Service:AccountService",
            &SERVICE_SPACE,
            &used,
            &tombs,
            GLOBAL_PROBE_LIMIT,
        )
        .unwrap();

        assert_eq!(a, b);
        assert!(SERVICE_SPACE.contains(a));
    }

    #[test]
    fn test_allocation_probes_past_used() {
        let tombs = BTreeSet::new();
        let mut used = BTreeSet::new();

        let first = allocate("Message:Event", &MESSAGE_SPACE, &used, &tombs, 16).unwrap();
        used.insert(first);

        let second = allocate("Message:Event", &MESSAGE_SPACE, &used, &tombs, 16).unwrap();
        assert_ne!(first, second);
        assert!(MESSAGE_SPACE.contains(second));
    }

    #[test]
    fn test_allocation_probes_past_tombstones() {
        let used = BTreeSet::new();
        let mut tombs = BTreeSet::new();

        let natural = allocate("Service:Old", &SERVICE_SPACE, &used, &tombs, 16).unwrap();
        tombs.insert(natural);

        let rerouted = allocate("Service:Old", &SERVICE_SPACE, &used, &tombs, 16).unwrap();
        assert_ne!(natural, rerouted);
    }

    #[test]
    fn test_probe_exhaustion() {
        let space = IdSpace {
            label: "method",
            min: 16,
            max: 17,
        };
        let used: BTreeSet<u32> = [16, 17].into_iter().collect();
        let tombs = BTreeSet::new();

        let result = allocate("Svc.M", &space, &used, &tombs, 8);
        assert!(matches!(result, Err(IdError::ProbeExhausted(_))));
    }

    #[test]
    fn test_explicit_validation() {
        let tombs: BTreeSet<u32> = [500].into_iter().collect();

        assert_eq!(
            validate_explicit(1000, &SERVICE_SPACE, None, &tombs).unwrap(),
            1000
        );

        assert!(matches!(
            validate_explicit(10, &SERVICE_SPACE, None, &tombs),
            Err(IdError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_explicit(70000, &SERVICE_SPACE, None, &tombs),
            Err(IdError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_explicit(1000, &SERVICE_SPACE, Some("OtherService"), &tombs),
            Err(IdError::AlreadyInUse { .. })
        ));
        assert!(matches!(
            validate_explicit(500, &SERVICE_SPACE, None, &tombs),
            Err(IdError::Tombstoned { .. })
        ));
    }

    #[test]
    fn test_canonical_names() {
        assert_eq!(service_canonical_name("Svc"), "Service:Svc");
        assert_eq!(message_canonical_name("Msg"), "Message:Msg");
        assert_eq!(method_canonical_name("Svc", "Do"), "Svc.Do");
    }
}
