//! # mvpe-codegen
//!
//! Schema compiler for MVP.Express `.mvpe.yaml` interface definitions.
//!
//! This crate provides:
//! - YAML/JSON schema parsing and batched validation
//! - Deterministic FNV-1a id allocation with probing
//! - The persistent `.mvpe.ids.lock` lockfile with tombstones and aliases
//! - OFF/CHECK/WRITE lockfile reconciliation modes
//! - Rust stub generation: records, service traits, dispatchers, clients

pub mod assign;
pub mod error;
pub mod generator;
pub mod ids;
pub mod lock;
pub mod lockfile;
pub mod orchestrator;
pub mod parser;
pub mod schema;

pub use assign::{assign_ids, assign_with_lockfile, IdTable, LockMode};
pub use error::{CodegenError, IdError, SchemaError, ValidationErrors};
pub use ids::{IdSpace, MESSAGE_SPACE, METHOD_SPACE, SERVICE_SPACE};
pub use lock::IdsLock;
pub use lockfile::DEFAULT_LOCKFILE;
pub use orchestrator::{generate, schema_info, validate_schema, GenerateOptions, GenerateReport};
pub use schema::{Field, FieldType, Message, Method, Schema, SchemaDoc};
