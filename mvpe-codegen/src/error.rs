//! Build-time error types for schema validation, ID assignment, and
//! code emission.

use std::path::PathBuf;
use thiserror::Error;

/// A single schema validation issue.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("unknown field type '{type_name}' at {path}")]
    UnknownFieldType { path: String, type_name: String },

    #[error("id must be positive at {path}: {value}")]
    InvalidId { path: String, value: i64 },

    #[error("default value at {path} must be a scalar literal")]
    InvalidDefault { path: String },

    #[error("duplicate method id {id} in service {service}")]
    DuplicateMethodId { service: String, id: u32 },

    #[error("duplicate message name: {0}")]
    DuplicateMessageName(String),

    #[error("undefined message reference: {0}")]
    UndefinedMessageReference(String),
}

/// Batch of validation issues; schema validation reports everything it
/// finds rather than stopping at the first problem.
#[derive(Debug, Error)]
#[error("schema validation failed with {} issue(s)", .0.len())]
pub struct ValidationErrors(pub Vec<SchemaError>);

/// Errors from ID allocation and lockfile reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{label} id {id} out of range [{min}..{max}]")]
    OutOfRange {
        label: &'static str,
        id: u32,
        min: u32,
        max: u32,
    },

    #[error("{label} id {id} already in use by {holder}")]
    AlreadyInUse {
        label: &'static str,
        id: u32,
        holder: String,
    },

    #[error("{label} id {id} is tombstoned")]
    Tombstoned { label: &'static str, id: u32 },

    #[error("lock drift for {symbol}: lock={locked}, schema={schema}")]
    LockDrift {
        symbol: String,
        locked: u32,
        schema: u32,
    },

    #[error("{symbol} has no id in the lockfile (CHECK mode); run WRITE mode locally and commit the lockfile")]
    MissingInLockCheckMode { symbol: String },

    #[error("alias chain for {0} does not terminate within 10 hops")]
    AliasCycle(String),

    #[error("could not allocate an id for {0}: probing exhausted")]
    ProbeExhausted(String),
}

/// Top-level error for a generation run.
#[derive(Debug, Error)]
pub enum CodegenError {
    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Id(#[from] IdError),

    #[error("{context} {path}: {source}")]
    Io {
        context: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid lockfile {path}: {reason}")]
    InvalidLockfile { path: PathBuf, reason: String },

    #[error("YAML error in {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported schema format: {0}")]
    UnsupportedFormat(PathBuf),

    #[error("invalid generator input: {0}")]
    InvalidState(String),
}

impl CodegenError {
    /// Maps an error to the build tool's process exit code.
    ///
    /// 1 = validation error, 2 = lockfile drift (CHECK), 3 = I/O failure,
    /// 4 = probing exhaustion.
    pub fn exit_code(&self) -> i32 {
        match self {
            CodegenError::Validation(_)
            | CodegenError::Yaml { .. }
            | CodegenError::Json { .. }
            | CodegenError::UnsupportedFormat(_)
            | CodegenError::InvalidState(_) => 1,
            CodegenError::Id(id) => match id {
                IdError::LockDrift { .. } | IdError::MissingInLockCheckMode { .. } => 2,
                IdError::ProbeExhausted(_) => 4,
                _ => 1,
            },
            CodegenError::Io { .. } | CodegenError::InvalidLockfile { .. } => 3,
        }
    }
}
