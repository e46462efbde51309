//! # mvpe-codec
//!
//! MYRA wire codec for MVP.Express (wire version 1).
//!
//! This crate provides:
//! - A lock-free pool of pre-allocated byte segments
//! - The 29-byte envelope frame format with routing and correlation metadata
//! - Record ↔ binary encoding with per-type layouts and CRC32C validation
//! - The message registry mapping numeric ids to record types
//! - Incremental frame assembly for stream transports

pub mod codec;
pub mod envelope;
pub mod error;
pub mod framing;
pub mod layout;
pub mod pool;
pub mod registry;
pub mod transport;
pub mod wire;

pub use codec::MyraCodec;
pub use framing::FrameAssembler;
pub use envelope::{Envelope, EnvelopeFlags, HEADER_SIZE, MAX_FRAME_SIZE};
pub use error::{CodecError, PoolError};
pub use layout::{FieldDescriptor, LayoutCache, MyraRecord, RecordLayout, WireType};
pub use pool::{Segment, SegmentPool, DEFAULT_POOL_SIZE, DEFAULT_SEGMENT_SIZE};
pub use registry::{MessageRegistry, MessageTypeInfo};
pub use transport::Transport;
pub use wire::{BinaryReader, BinaryWriter};

/// MYRA wire format version implemented by this crate.
///
/// The checksum algorithm (CRC32C) and all field encodings are fixed for
/// a given wire version.
pub const WIRE_VERSION: u16 = 1;
