//! Transport seam for generated client stubs.
//!
//! The codec does not perform I/O. Generated clients encode a request into
//! an envelope and hand it to a [`Transport`]; how frames move between
//! peers is entirely the transport's concern.

use crate::envelope::Envelope;
use crate::error::CodecError;

/// Carries request envelopes to a peer and returns the response envelope.
pub trait Transport {
    /// Transport-level error type. Codec failures on the client path are
    /// converted into it.
    type Error: From<CodecError>;

    /// Sends a request frame and blocks until the matching response frame
    /// (correlated by the envelope's correlation id) arrives.
    fn round_trip(&mut self, request: Envelope) -> Result<Envelope, Self::Error>;
}
