//! Shared fixtures for the mvpe benchmarks.

use mvpe_codec::error::CodecError;
use mvpe_codec::layout::{FieldDescriptor, MyraRecord, WireType};
use mvpe_codec::wire::{BinaryReader, BinaryWriter};

/// A representative transfer-shaped record used across benchmarks.
#[derive(Debug, Clone, PartialEq)]
pub struct TransferFundsRequest {
    pub from_account: String,
    pub to_account: String,
    pub amount: i64,
    pub memo: Option<String>,
}

impl MyraRecord for TransferFundsRequest {
    const NAME: &'static str = "TransferFundsRequest";
    const FIELDS: &'static [FieldDescriptor] = &[
        FieldDescriptor::new("fromAccount", WireType::String, false),
        FieldDescriptor::new("toAccount", WireType::String, false),
        FieldDescriptor::new("amount", WireType::I64, false),
        FieldDescriptor::new("memo", WireType::String, true),
    ];

    fn encode_fields(&self, w: &mut BinaryWriter<'_>) -> Result<(), CodecError> {
        w.write_string(&self.from_account)?;
        w.write_string(&self.to_account)?;
        w.write_i64(self.amount)?;
        w.write_nullable_string(self.memo.as_deref())
    }

    fn decode_fields(r: &mut BinaryReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            from_account: r.read_string()?,
            to_account: r.read_string()?,
            amount: r.read_i64()?,
            memo: r.read_nullable_string()?,
        })
    }
}

impl TransferFundsRequest {
    /// A request whose memo pads the payload to roughly `payload_size` bytes.
    pub fn with_payload_size(payload_size: usize) -> Self {
        Self {
            from_account: "acc-000001".to_string(),
            to_account: "acc-000002".to_string(),
            amount: 125_000,
            memo: Some("x".repeat(payload_size.saturating_sub(48))),
        }
    }
}
