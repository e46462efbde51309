//! Message registry: numeric message id ↔ record type mapping.
//!
//! Registration is append-only for the process lifetime. Reads are
//! lock-free; a registration happens-before every lookup that observes it.

use crate::error::CodecError;
use crate::layout::{MyraRecord, RecordLayout};
use dashmap::DashMap;
use std::any::TypeId;
use std::sync::Arc;

/// Metadata recorded for one registered message type.
pub struct MessageTypeInfo {
    id: u16,
    name: &'static str,
    type_id: TypeId,
    make_layout: fn(u16) -> RecordLayout,
}

impl MessageTypeInfo {
    pub fn id(&self) -> u16 {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }
}

impl std::fmt::Debug for MessageTypeInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageTypeInfo")
            .field("id", &self.id)
            .field("name", &self.name)
            .finish()
    }
}

/// Bidirectional, append-only mapping between message ids and record types.
#[derive(Default)]
pub struct MessageRegistry {
    by_id: DashMap<u16, Arc<MessageTypeInfo>>,
    by_type: DashMap<TypeId, Arc<MessageTypeInfo>>,
}

impl MessageRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `T` under `message_id`.
    ///
    /// Each id and each type may appear at most once.
    pub fn register<T: MyraRecord>(&self, message_id: u16) -> Result<(), CodecError> {
        let info = Arc::new(MessageTypeInfo {
            id: message_id,
            name: T::NAME,
            type_id: TypeId::of::<T>(),
            make_layout: RecordLayout::of::<T>,
        });

        match self.by_id.entry(message_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                return Err(CodecError::DuplicateMessageId(message_id));
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&info));
            }
        }

        match self.by_type.entry(info.type_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => {
                self.by_id.remove(&message_id);
                Err(CodecError::DuplicateMessageType(T::NAME))
            }
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                slot.insert(info);
                Ok(())
            }
        }
    }

    /// Looks up the metadata for a message id.
    pub fn info_by_id(&self, message_id: u16) -> Option<Arc<MessageTypeInfo>> {
        self.by_id.get(&message_id).map(|e| Arc::clone(&e))
    }

    /// Looks up the message id registered for `T`.
    pub fn id_of<T: MyraRecord>(&self) -> Option<u16> {
        self.id_of_type(TypeId::of::<T>())
    }

    /// Looks up the message id registered for a type identity.
    pub fn id_of_type(&self, type_id: TypeId) -> Option<u16> {
        self.by_type.get(&type_id).map(|e| e.id)
    }

    pub fn is_registered_id(&self, message_id: u16) -> bool {
        self.by_id.contains_key(&message_id)
    }

    pub fn is_registered<T: MyraRecord>(&self) -> bool {
        self.by_type.contains_key(&TypeId::of::<T>())
    }

    /// Number of registered message types.
    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All registered message ids, in ascending order.
    pub fn registered_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self.by_id.iter().map(|e| *e.key()).collect();
        ids.sort_unstable();
        ids
    }

    pub(crate) fn build_layout_for_id(&self, message_id: u16) -> Option<RecordLayout> {
        let info = self.by_id.get(&message_id)?;
        Some((info.make_layout)(info.id))
    }

    pub(crate) fn build_layout_for_type(&self, type_id: TypeId) -> Option<RecordLayout> {
        let info = self.by_type.get(&type_id)?;
        Some((info.make_layout)(info.id))
    }
}

impl std::fmt::Debug for MessageRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageRegistry")
            .field("registered", &self.len())
            .finish()
    }
}
