//! Record descriptors and the per-type layout cache.
//!
//! Generated message types implement [`MyraRecord`], which carries the
//! declared field order and the per-type encode/decode pair at compile
//! time. The [`LayoutCache`] erases those into [`RecordLayout`] entries on
//! first use, so steady-state encode/decode costs a single map lookup.

use crate::error::CodecError;
use crate::registry::MessageRegistry;
use crate::wire::{BinaryReader, BinaryWriter};
use dashmap::DashMap;
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Wire-level type tag of a record field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireType {
    I8,
    I16,
    I32,
    I64,
    Bool,
    F32,
    F64,
    Bytes,
    String,
}

/// A single field in a record's declared order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: &'static str,
    pub wire_type: WireType,
    pub optional: bool,
}

impl FieldDescriptor {
    pub const fn new(name: &'static str, wire_type: WireType, optional: bool) -> Self {
        Self {
            name,
            wire_type,
            optional,
        }
    }
}

/// A value type that can travel as a MYRA payload.
///
/// Implementations are emitted by the schema compiler; hand-written
/// implementations must encode and decode fields in exactly the declared
/// order of [`MyraRecord::FIELDS`].
pub trait MyraRecord: Any + Send + Sync + Sized {
    /// Display name used in the registry and in diagnostics.
    const NAME: &'static str;

    /// Field descriptors in declared order.
    const FIELDS: &'static [FieldDescriptor];

    /// Writes the record's fields in declared order.
    fn encode_fields(&self, w: &mut BinaryWriter<'_>) -> Result<(), CodecError>;

    /// Reads the record's fields in declared order.
    fn decode_fields(r: &mut BinaryReader<'_>) -> Result<Self, CodecError>;
}

type ErasedEncode = fn(&(dyn Any + Send), &mut BinaryWriter<'_>) -> Result<(), CodecError>;
type ErasedDecode = fn(&mut BinaryReader<'_>) -> Result<Box<dyn Any + Send>, CodecError>;

/// Cached layout for one registered record type: ordered field
/// descriptors plus the erased encode/decode pair.
pub struct RecordLayout {
    pub id: u16,
    pub name: &'static str,
    pub type_id: TypeId,
    pub fields: &'static [FieldDescriptor],
    pub(crate) encode: ErasedEncode,
    pub(crate) decode: ErasedDecode,
}

impl RecordLayout {
    pub(crate) fn of<T: MyraRecord>(id: u16) -> Self {
        Self {
            id,
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            fields: T::FIELDS,
            encode: |value, w| {
                value
                    .downcast_ref::<T>()
                    .ok_or(CodecError::UnregisteredMessage(T::NAME))?
                    .encode_fields(w)
            },
            decode: |r| Ok(Box::new(T::decode_fields(r)?)),
        }
    }
}

impl std::fmt::Debug for RecordLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordLayout")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("fields", &self.fields.len())
            .finish()
    }
}

/// Concurrent, grow-only cache of [`RecordLayout`]s keyed both by type
/// identity and by message id.
///
/// Entries are populated lazily from the registry on first use; a second
/// insertion of the same key is a benign no-op.
#[derive(Default)]
pub struct LayoutCache {
    by_type: DashMap<TypeId, Arc<RecordLayout>>,
    by_id: DashMap<u16, Arc<RecordLayout>>,
}

impl LayoutCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up (building on miss) the layout for a type identity.
    pub fn for_type(
        &self,
        registry: &MessageRegistry,
        type_id: TypeId,
    ) -> Option<Arc<RecordLayout>> {
        if let Some(layout) = self.by_type.get(&type_id) {
            return Some(Arc::clone(&layout));
        }

        let layout = Arc::new(registry.build_layout_for_type(type_id)?);
        self.insert(&layout);
        Some(layout)
    }

    /// Looks up (building on miss) the layout for a message id.
    pub fn for_id(&self, registry: &MessageRegistry, id: u16) -> Option<Arc<RecordLayout>> {
        if let Some(layout) = self.by_id.get(&id) {
            return Some(Arc::clone(&layout));
        }

        let layout = Arc::new(registry.build_layout_for_id(id)?);
        self.insert(&layout);
        Some(layout)
    }

    fn insert(&self, layout: &Arc<RecordLayout>) {
        self.by_type
            .entry(layout.type_id)
            .or_insert_with(|| Arc::clone(layout));
        self.by_id
            .entry(layout.id)
            .or_insert_with(|| Arc::clone(layout));
    }

    /// Number of cached record types.
    pub fn len(&self) -> usize {
        self.by_type.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_type.is_empty()
    }

    /// Drops every cached layout. Diagnostic use only; entries repopulate
    /// lazily on the next encode/decode.
    pub fn clear(&self) {
        self.by_type.clear();
        self.by_id.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Probe {
        value: i32,
    }

    impl MyraRecord for Probe {
        const NAME: &'static str = "Probe";
        const FIELDS: &'static [FieldDescriptor] =
            &[FieldDescriptor::new("value", WireType::I32, false)];

        fn encode_fields(&self, w: &mut BinaryWriter<'_>) -> Result<(), CodecError> {
            w.write_i32(self.value)
        }

        fn decode_fields(r: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
            Ok(Self {
                value: r.read_i32()?,
            })
        }
    }

    #[test]
    fn test_cache_populates_lazily() {
        let registry = MessageRegistry::new();
        registry.register::<Probe>(40).unwrap();

        let cache = LayoutCache::new();
        assert_eq!(cache.len(), 0);

        let layout = cache.for_type(&registry, TypeId::of::<Probe>()).unwrap();
        assert_eq!(layout.id, 40);
        assert_eq!(layout.name, "Probe");
        assert_eq!(cache.len(), 1);

        // Hit goes through the cache, not the registry.
        let again = cache.for_id(&registry, 40).unwrap();
        assert_eq!(again.id, 40);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_unknown_type_is_none() {
        let registry = MessageRegistry::new();
        let cache = LayoutCache::new();
        assert!(cache.for_id(&registry, 9999).is_none());
        assert!(cache.for_type(&registry, TypeId::of::<Probe>()).is_none());
    }

    #[test]
    fn test_clear_then_repopulate() {
        let registry = MessageRegistry::new();
        registry.register::<Probe>(41).unwrap();

        let cache = LayoutCache::new();
        cache.for_id(&registry, 41).unwrap();
        assert_eq!(cache.len(), 1);

        cache.clear();
        assert!(cache.is_empty());

        cache.for_id(&registry, 41).unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_erased_roundtrip() {
        let registry = MessageRegistry::new();
        registry.register::<Probe>(42).unwrap();
        let cache = LayoutCache::new();
        let layout = cache.for_id(&registry, 42).unwrap();

        let mut buf = [0u8; 16];
        let probe = Probe { value: -9 };
        let mut w = BinaryWriter::new(&mut buf);
        (layout.encode)(&probe, &mut w).unwrap();

        let mut r = BinaryReader::new(&buf[..4]);
        let decoded = (layout.decode)(&mut r).unwrap();
        assert_eq!(decoded.downcast_ref::<Probe>(), Some(&probe));
    }
}
