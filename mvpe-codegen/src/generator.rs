//! Rust stub generation.
//!
//! For a validated, id-assigned schema the generator emits one module
//! containing:
//!
//! - a value-type struct per message with its `MyraRecord` implementation
//!   (the per-type encode/decode pair, registered by message id)
//! - the service trait, one operation per method
//! - a dispatcher routing method ids through a closed `match`
//! - a client stub serializing calls through a [`Transport`] seam
//! - named id constants and a `register_messages` wiring function
//!
//! Output is deterministic: regenerating from the same inputs yields
//! byte-identical files.
//!
//! [`Transport`]: ../../mvpe_codec/transport/trait.Transport.html

use crate::assign::IdTable;
use crate::error::CodegenError;
use crate::schema::{Field, FieldType, Message, Schema};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Converts PascalCase or camelCase to snake_case.
pub fn to_snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.push(c.to_ascii_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_ascii_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

/// Converts PascalCase or camelCase to SCREAMING_SNAKE_CASE.
pub fn to_const_case(name: &str) -> String {
    to_snake_case(name).to_ascii_uppercase()
}

fn id_for(map: &BTreeMap<String, u32>, name: &str, kind: &str) -> Result<u32, CodegenError> {
    map.get(name)
        .copied()
        .ok_or_else(|| CodegenError::InvalidState(format!("no assigned id for {kind} {name}")))
}

fn wire_type_name(field_type: FieldType) -> &'static str {
    match field_type {
        FieldType::String => "String",
        FieldType::Int32 => "I32",
        FieldType::Int64 => "I64",
        FieldType::Boolean => "Bool",
        FieldType::Float => "F32",
        FieldType::Double => "F64",
        FieldType::Bytes => "Bytes",
    }
}

fn write_call(field: &Field) -> String {
    let name = to_snake_case(&field.name);
    if field.optional {
        match field.field_type {
            FieldType::String => format!("w.write_nullable_string(self.{name}.as_deref())?;"),
            FieldType::Bytes => format!("w.write_nullable_bytes(self.{name}.as_deref())?;"),
            FieldType::Int32 => format!("w.write_nullable_i32(self.{name})?;"),
            FieldType::Int64 => format!("w.write_nullable_i64(self.{name})?;"),
            FieldType::Boolean => format!("w.write_nullable_bool(self.{name})?;"),
            FieldType::Float => format!("w.write_nullable_f32(self.{name})?;"),
            FieldType::Double => format!("w.write_nullable_f64(self.{name})?;"),
        }
    } else {
        match field.field_type {
            FieldType::String => format!("w.write_string(&self.{name})?;"),
            FieldType::Bytes => format!("w.write_bytes(&self.{name})?;"),
            FieldType::Int32 => format!("w.write_i32(self.{name})?;"),
            FieldType::Int64 => format!("w.write_i64(self.{name})?;"),
            FieldType::Boolean => format!("w.write_bool(self.{name})?;"),
            FieldType::Float => format!("w.write_f32(self.{name})?;"),
            FieldType::Double => format!("w.write_f64(self.{name})?;"),
        }
    }
}

fn read_call(field: &Field) -> &'static str {
    if field.optional {
        match field.field_type {
            FieldType::String => "r.read_nullable_string()?",
            FieldType::Bytes => "r.read_nullable_bytes()?",
            FieldType::Int32 => "r.read_nullable_i32()?",
            FieldType::Int64 => "r.read_nullable_i64()?",
            FieldType::Boolean => "r.read_nullable_bool()?",
            FieldType::Float => "r.read_nullable_f32()?",
            FieldType::Double => "r.read_nullable_f64()?",
        }
    } else {
        match field.field_type {
            FieldType::String => "r.read_string()?",
            FieldType::Bytes => "r.read_bytes()?",
            FieldType::Int32 => "r.read_i32()?",
            FieldType::Int64 => "r.read_i64()?",
            FieldType::Boolean => "r.read_bool()?",
            FieldType::Float => "r.read_f32()?",
            FieldType::Double => "r.read_f64()?",
        }
    }
}

fn rust_field_type(field: &Field) -> String {
    let base = field.field_type.rust_type();
    if field.optional {
        format!("Option<{base}>")
    } else {
        base.to_string()
    }
}

fn render_message(out: &mut String, message: &Message) {
    let _ = writeln!(out, "#[derive(Debug, Clone, PartialEq)]");
    let _ = writeln!(out, "pub struct {} {{", message.name);
    for field in &message.fields {
        if let Some(default) = &field.default {
            let _ = writeln!(out, "    /// Default: `{default}`");
        }
        let _ = writeln!(
            out,
            "    pub {}: {},",
            to_snake_case(&field.name),
            rust_field_type(field)
        );
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    let _ = writeln!(out, "impl MyraRecord for {} {{", message.name);
    let _ = writeln!(out, "    const NAME: &'static str = \"{}\";", message.name);
    let _ = writeln!(out, "    const FIELDS: &'static [FieldDescriptor] = &[");
    for field in &message.fields {
        let _ = writeln!(
            out,
            "        FieldDescriptor::new(\"{}\", WireType::{}, {}),",
            field.name,
            wire_type_name(field.field_type),
            field.optional
        );
    }
    let _ = writeln!(out, "    ];");
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "    fn encode_fields(&self, w: &mut BinaryWriter<'_>) -> Result<(), CodecError> {{"
    );
    for field in &message.fields {
        let _ = writeln!(out, "        {}", write_call(field));
    }
    let _ = writeln!(out, "        Ok(())");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);

    let _ = writeln!(
        out,
        "    fn decode_fields(r: &mut BinaryReader<'_>) -> Result<Self, CodecError> {{"
    );
    let _ = writeln!(out, "        Ok(Self {{");
    for field in &message.fields {
        let _ = writeln!(
            out,
            "            {}: {},",
            to_snake_case(&field.name),
            read_call(field)
        );
    }
    let _ = writeln!(out, "        }})");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
}

/// Renders the complete generated module for one schema.
pub fn render_module(schema: &Schema, table: &IdTable) -> Result<String, CodegenError> {
    let service = &schema.service;
    let mut out = String::new();

    let _ = writeln!(out, "// @generated by mvpe-codegen for service {service}. Do not edit.");
    let _ = writeln!(out);
    let _ = writeln!(out, "use mvpe_codec::codec::MyraCodec;");
    let _ = writeln!(out, "use mvpe_codec::envelope::{{Envelope, HEADER_SIZE}};");
    let _ = writeln!(out, "use mvpe_codec::error::CodecError;");
    let _ = writeln!(
        out,
        "use mvpe_codec::layout::{{FieldDescriptor, MyraRecord, WireType}};"
    );
    let _ = writeln!(out, "use mvpe_codec::pool::SegmentPool;");
    let _ = writeln!(out, "use mvpe_codec::registry::MessageRegistry;");
    let _ = writeln!(out, "use mvpe_codec::transport::Transport;");
    let _ = writeln!(out, "use mvpe_codec::wire::{{BinaryReader, BinaryWriter}};");
    let _ = writeln!(out, "use std::any::Any;");
    let _ = writeln!(out, "use std::sync::atomic::{{AtomicU64, Ordering}};");
    let _ = writeln!(out, "use std::sync::Arc;");
    let _ = writeln!(out);

    // Wire-compat id constants.
    let _ = writeln!(out, "/// Numeric service id of {service}.");
    let _ = writeln!(
        out,
        "pub const SERVICE_ID: u16 = {};",
        table.service_id
    );
    let _ = writeln!(out);

    let _ = writeln!(out, "/// Method ids of {service}.");
    let _ = writeln!(out, "pub mod method_ids {{");
    for method in &schema.methods {
        let id = id_for(&table.method_ids, &method.name, "method")?;
        let _ = writeln!(
            out,
            "    pub const {}: u16 = {};",
            to_const_case(&method.name),
            id
        );
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    let _ = writeln!(out, "/// Message ids referenced by {service}.");
    let _ = writeln!(out, "pub mod message_ids {{");
    for message in &schema.messages {
        let id = id_for(&table.message_ids, &message.name, "message")?;
        let _ = writeln!(
            out,
            "    pub const {}: u16 = {};",
            to_const_case(&message.name),
            id
        );
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    for message in &schema.messages {
        render_message(&mut out, message);
    }

    // Service trait.
    let _ = writeln!(out, "/// Generated service interface for {service}.");
    let _ = writeln!(out, "pub trait {service} {{");
    for method in &schema.methods {
        let id = id_for(&table.method_ids, &method.name, "method")?;
        let _ = writeln!(out, "    /// Method ID: {id}");
        let _ = writeln!(
            out,
            "    fn {}(&self, request: {}) -> {};",
            to_snake_case(&method.name),
            method.request,
            method.response
        );
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    // Dispatcher.
    let _ = writeln!(out, "/// Routes method ids to a {service} implementation.");
    let _ = writeln!(out, "///");
    let _ = writeln!(
        out,
        "/// The routing table is closed at generation time; no runtime"
    );
    let _ = writeln!(out, "/// introspection is involved.");
    let _ = writeln!(out, "pub struct {service}Dispatcher<S: {service}> {{");
    let _ = writeln!(out, "    service: S,");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "impl<S: {service}> {service}Dispatcher<S> {{");
    let _ = writeln!(out, "    pub fn new(service: S) -> Self {{");
    let _ = writeln!(out, "        Self {{ service }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out);
    let _ = writeln!(out, "    pub fn dispatch(");
    let _ = writeln!(out, "        &self,");
    let _ = writeln!(out, "        method_id: u16,");
    let _ = writeln!(out, "        request: Box<dyn Any + Send>,");
    let _ = writeln!(out, "    ) -> Result<Box<dyn Any + Send>, CodecError> {{");
    let _ = writeln!(out, "        match method_id {{");
    for method in &schema.methods {
        let _ = writeln!(
            out,
            "            method_ids::{} => {{",
            to_const_case(&method.name)
        );
        let _ = writeln!(
            out,
            "                let request = request.downcast::<{}>().map_err(|_| {{",
            method.request
        );
        let _ = writeln!(out, "                    CodecError::UnexpectedMessage {{");
        let _ = writeln!(
            out,
            "                        expected: \"{}\",",
            method.request
        );
        let _ = writeln!(out, "                        id: method_id,");
        let _ = writeln!(out, "                    }}");
        let _ = writeln!(out, "                }})?;");
        let _ = writeln!(
            out,
            "                Ok(Box::new(self.service.{}(*request)))",
            to_snake_case(&method.name)
        );
        let _ = writeln!(out, "            }}");
    }
    let _ = writeln!(
        out,
        "            _ => Err(CodecError::UnknownMessageId(method_id)),"
    );
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    // Client stub.
    let _ = writeln!(out, "/// Client stub for {service} over an external transport.");
    let _ = writeln!(out, "pub struct {service}Client<T: Transport> {{");
    let _ = writeln!(out, "    codec: Arc<MyraCodec>,");
    let _ = writeln!(out, "    pool: SegmentPool,");
    let _ = writeln!(out, "    transport: T,");
    let _ = writeln!(out, "    correlation: AtomicU64,");
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);
    let _ = writeln!(out, "impl<T: Transport> {service}Client<T> {{");
    let _ = writeln!(
        out,
        "    pub fn new(codec: Arc<MyraCodec>, pool: SegmentPool, transport: T) -> Self {{"
    );
    let _ = writeln!(out, "        Self {{");
    let _ = writeln!(out, "            codec,");
    let _ = writeln!(out, "            pool,");
    let _ = writeln!(out, "            transport,");
    let _ = writeln!(out, "            correlation: AtomicU64::new(1),");
    let _ = writeln!(out, "        }}");
    let _ = writeln!(out, "    }}");
    for method in &schema.methods {
        let id = id_for(&table.method_ids, &method.name, "method")?;
        let _ = writeln!(out);
        let _ = writeln!(out, "    /// Method ID: {id}");
        let _ = writeln!(
            out,
            "    pub fn {}(&mut self, request: {}) -> Result<{}, T::Error> {{",
            to_snake_case(&method.name),
            method.request,
            method.response
        );
        let _ = writeln!(
            out,
            "        let payload_size = self.pool.segment_size().saturating_sub(HEADER_SIZE);"
        );
        let _ = writeln!(
            out,
            "        let mut envelope = Envelope::allocate(payload_size, &self.pool).map_err(T::Error::from)?;"
        );
        let _ = writeln!(
            out,
            "        self.codec.encode(&request, &mut envelope).map_err(T::Error::from)?;"
        );
        let _ = writeln!(
            out,
            "        envelope.set_correlation_id(self.correlation.fetch_add(1, Ordering::Relaxed));"
        );
        let _ = writeln!(
            out,
            "        let response = self.transport.round_trip(envelope)?;"
        );
        let _ = writeln!(
            out,
            "        self.codec.decode_as::<{}>(&response).map_err(T::Error::from)",
            method.response
        );
        let _ = writeln!(out, "    }}");
    }
    let _ = writeln!(out, "}}");
    let _ = writeln!(out);

    // Registration wiring.
    let _ = writeln!(
        out,
        "/// Registers every {service} message under its stable id."
    );
    let _ = writeln!(
        out,
        "pub fn register_messages(registry: &MessageRegistry) -> Result<(), CodecError> {{"
    );
    for message in &schema.messages {
        let _ = writeln!(
            out,
            "    registry.register::<{}>(message_ids::{})?;",
            message.name,
            to_const_case(&message.name)
        );
    }
    let _ = writeln!(out, "    Ok(())");
    let _ = writeln!(out, "}}");

    Ok(out)
}

/// Renders and writes the generated module, returning the written paths.
///
/// `module` optionally nests the output under `a::b` subdirectories.
pub fn emit(
    schema: &Schema,
    table: &IdTable,
    output_dir: &Path,
    module: Option<&str>,
) -> Result<Vec<PathBuf>, CodegenError> {
    let mut dir = output_dir.to_path_buf();
    if let Some(module) = module {
        for part in module.split("::").filter(|p| !p.is_empty()) {
            dir.push(part);
        }
    }
    std::fs::create_dir_all(&dir).map_err(|source| CodegenError::Io {
        context: "creating output directory",
        path: dir.clone(),
        source,
    })?;

    let content = render_module(schema, table)?;
    let file = dir.join(format!("{}.rs", to_snake_case(&schema.service)));
    std::fs::write(&file, &content).map_err(|source| CodegenError::Io {
        context: "writing generated code",
        path: file.clone(),
        source,
    })?;

    tracing::info!(path = %file.display(), bytes = content.len(), "Emitted generated module");
    Ok(vec![file])
}
