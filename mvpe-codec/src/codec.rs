//! MYRA record codec.
//!
//! Payload layout inside an envelope:
//!
//! ```text
//! +----------------+----------------------------+----------+
//! | payload_length | field_0 .. field_n-1       | checksum |
//! |    4 bytes     | payload_length bytes       | 4 bytes  |
//! +----------------+----------------------------+----------+
//! ```
//!
//! Fields are encoded in declared order. The checksum is CRC32C over the
//! field region (everything after the length prefix); the algorithm is
//! fixed for wire version 1.

use crate::envelope::{Envelope, HEADER_SIZE, MAX_FRAME_SIZE};
use crate::error::CodecError;
use crate::layout::{LayoutCache, MyraRecord, RecordLayout};
use crate::registry::MessageRegistry;
use crate::wire::{BinaryReader, BinaryWriter};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Size of the reserved payload-length prefix.
const LENGTH_PREFIX_SIZE: usize = 4;

/// Size of the trailing checksum.
const CHECKSUM_SIZE: usize = 4;

/// Encodes registered record values into envelopes and back.
///
/// Safe to share across threads; the layout cache warms up on first use
/// of each message type.
pub struct MyraCodec {
    registry: Arc<MessageRegistry>,
    layouts: LayoutCache,
}

impl MyraCodec {
    pub fn new(registry: Arc<MessageRegistry>) -> Self {
        Self {
            registry,
            layouts: LayoutCache::new(),
        }
    }

    pub fn registry(&self) -> &MessageRegistry {
        &self.registry
    }

    /// Encodes `value` into the envelope's payload region and stamps the
    /// method id and frame length.
    pub fn encode<T: MyraRecord>(
        &self,
        value: &T,
        envelope: &mut Envelope,
    ) -> Result<(), CodecError> {
        let layout = self
            .layouts
            .for_type(&self.registry, TypeId::of::<T>())
            .ok_or(CodecError::UnregisteredMessage(T::NAME))?;

        self.encode_fields(&layout, envelope, |w| value.encode_fields(w))
    }

    /// Encodes a type-erased record value, as produced by a dispatcher.
    pub fn encode_any(
        &self,
        value: &(dyn Any + Send),
        envelope: &mut Envelope,
    ) -> Result<(), CodecError> {
        let layout = self
            .layouts
            .for_type(&self.registry, value.type_id())
            .ok_or(CodecError::UnregisteredMessage("<unregistered>"))?;

        self.encode_fields(&layout, envelope, |w| (layout.encode)(value, w))
    }

    fn encode_fields(
        &self,
        layout: &RecordLayout,
        envelope: &mut Envelope,
        encode: impl FnOnce(&mut BinaryWriter<'_>) -> Result<(), CodecError>,
    ) -> Result<(), CodecError> {
        envelope.set_method_id(layout.id);

        let payload = envelope.payload_mut();
        let mut writer = BinaryWriter::new(payload);

        let prefix_at = writer.reserve_u32()?;
        encode(&mut writer)?;
        let field_len = writer.position() - LENGTH_PREFIX_SIZE;
        writer.patch_u32(prefix_at, field_len as u32)?;
        writer.write_checksum_from(LENGTH_PREFIX_SIZE)?;

        let total = HEADER_SIZE + writer.position();
        if total > MAX_FRAME_SIZE {
            return Err(CodecError::FrameTooLarge {
                size: total,
                max: MAX_FRAME_SIZE,
            });
        }
        envelope.set_length(total as u16);
        Ok(())
    }

    /// Decodes the envelope's payload into the registered record value.
    ///
    /// The method id is resolved before any payload byte is read; the
    /// checksum is validated before any field is decoded.
    pub fn decode(&self, envelope: &Envelope) -> Result<Box<dyn Any + Send>, CodecError> {
        let method_id = envelope.method_id();
        let layout = self
            .layouts
            .for_id(&self.registry, method_id)
            .ok_or(CodecError::UnknownMessageId(method_id))?;

        let payload = envelope.payload();
        let mut reader = BinaryReader::new(payload);

        let declared = reader.read_u32()? as usize;
        let available = reader.remaining();
        if declared + CHECKSUM_SIZE > available {
            return Err(CodecError::TruncatedPayload {
                needed: declared + CHECKSUM_SIZE,
                available,
            });
        }

        // Validate before touching field bytes so any corruption surfaces
        // as a checksum failure rather than a field-level decode error.
        reader.set_position(LENGTH_PREFIX_SIZE + declared)?;
        reader.validate_checksum_from(LENGTH_PREFIX_SIZE)?;
        reader.set_position(LENGTH_PREFIX_SIZE)?;

        (layout.decode)(&mut reader)
    }

    /// Decodes and downcasts to a concrete record type.
    pub fn decode_as<T: MyraRecord>(&self, envelope: &Envelope) -> Result<T, CodecError> {
        let method_id = envelope.method_id();
        let value = self.decode(envelope)?;
        value
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| CodecError::UnexpectedMessage {
                expected: T::NAME,
                id: method_id,
            })
    }

    /// Number of record types the layout cache currently holds.
    pub fn cache_size(&self) -> usize {
        self.layouts.len()
    }

    /// Drops all cached layouts. Diagnostic use only.
    pub fn clear_cache(&self) {
        self.layouts.clear();
    }
}

impl std::fmt::Debug for MyraCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MyraCodec")
            .field("registered", &self.registry.len())
            .field("cached_layouts", &self.cache_size())
            .finish()
    }
}
