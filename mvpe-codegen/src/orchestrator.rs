//! Build entry point: parse, validate, assign ids, emit.

use crate::assign::{self, IdTable, LockMode};
use crate::error::CodegenError;
use crate::generator;
use crate::lockfile::DEFAULT_LOCKFILE;
use crate::parser;
use crate::schema::Schema;
use std::path::{Path, PathBuf};

/// Options for one generation run.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    pub schema_path: PathBuf,
    pub output_dir: PathBuf,
    /// Optional `a::b` module nesting for the emitted file.
    pub module: Option<String>,
    pub mode: LockMode,
    /// Defaults to `.mvpe.ids.lock` next to the schema file.
    pub lockfile_path: Option<PathBuf>,
}

/// Outcome of a successful generation run.
#[derive(Debug, Clone)]
pub struct GenerateReport {
    pub service: String,
    pub ids: IdTable,
    pub files: Vec<PathBuf>,
}

/// Resolves the lockfile next to the schema when none was given.
pub fn default_lockfile_path(schema_path: &Path) -> PathBuf {
    schema_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(DEFAULT_LOCKFILE)
}

/// Parses, validates, assigns ids, and emits stubs for one schema.
pub fn generate(options: &GenerateOptions) -> Result<GenerateReport, CodegenError> {
    let mut schema = parser::load_schema(&options.schema_path)?;

    let lockfile_path = options
        .lockfile_path
        .clone()
        .unwrap_or_else(|| default_lockfile_path(&options.schema_path));

    let ids = assign::assign_with_lockfile(&mut schema, &lockfile_path, options.mode)?;

    let files = generator::emit(
        &schema,
        &ids,
        &options.output_dir,
        options.module.as_deref(),
    )?;

    tracing::info!(
        service = %schema.service,
        files = files.len(),
        mode = %options.mode,
        "Generation complete"
    );

    Ok(GenerateReport {
        service: schema.service,
        ids,
        files,
    })
}

/// Validates a schema file without generating code.
pub fn validate_schema(schema_path: &Path) -> Result<Schema, CodegenError> {
    parser::load_schema(schema_path)
}

/// Parses and validates a schema, returning it for inspection.
///
/// Ids are reported as declared; run [`generate`] to see assigned ids.
pub fn schema_info(schema_path: &Path) -> Result<Schema, CodegenError> {
    parser::load_schema(schema_path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const SCHEMA: &str = r#"
service: AccountService
methods:
  - name: GetBalance
    request: GetBalanceRequest
    response: GetBalanceResponse
messages:
  - name: GetBalanceRequest
    fields:
      - name: accountId
        type: string
  - name: GetBalanceResponse
    fields:
      - name: balance
        type: int64
"#;

    fn write_schema(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("account.mvpe.yaml");
        fs::write(&path, SCHEMA).unwrap();
        path
    }

    #[test]
    fn test_generate_write_mode_end_to_end() {
        let dir = TempDir::new().unwrap();
        let schema_path = write_schema(&dir);
        let out = dir.path().join("generated");

        let report = generate(&GenerateOptions {
            schema_path: schema_path.clone(),
            output_dir: out.clone(),
            module: None,
            mode: LockMode::Write,
            lockfile_path: None,
        })
        .unwrap();

        assert_eq!(report.service, "AccountService");
        assert_eq!(report.files.len(), 1);
        assert!(report.files[0].exists());

        // The default lockfile landed next to the schema.
        let lockfile = dir.path().join(".mvpe.ids.lock");
        assert!(lockfile.exists());
        let lock_text = fs::read_to_string(&lockfile).unwrap();
        assert!(lock_text.contains("services.AccountService = "));
        assert!(lock_text.contains("messages.GetBalanceRequest = "));
    }

    #[test]
    fn test_check_after_write_succeeds() {
        let dir = TempDir::new().unwrap();
        let schema_path = write_schema(&dir);
        let out = dir.path().join("generated");

        let write = |mode| {
            generate(&GenerateOptions {
                schema_path: schema_path.clone(),
                output_dir: out.clone(),
                module: None,
                mode,
                lockfile_path: None,
            })
        };

        let written = write(LockMode::Write).unwrap();
        let checked = write(LockMode::Check).unwrap();
        assert_eq!(written.ids, checked.ids);
    }

    #[test]
    fn test_check_without_lock_fails_with_exit_code_2() {
        let dir = TempDir::new().unwrap();
        let schema_path = write_schema(&dir);

        let err = generate(&GenerateOptions {
            schema_path,
            output_dir: dir.path().join("generated"),
            module: None,
            mode: LockMode::Check,
            lockfile_path: None,
        })
        .unwrap_err();

        assert_eq!(err.exit_code(), 2);
    }

    #[test]
    fn test_regeneration_is_byte_identical() {
        let dir = TempDir::new().unwrap();
        let schema_path = write_schema(&dir);
        let out = dir.path().join("generated");

        let options = GenerateOptions {
            schema_path,
            output_dir: out,
            module: Some("bank".to_string()),
            mode: LockMode::Write,
            lockfile_path: None,
        };

        let first = generate(&options).unwrap();
        let first_bytes = fs::read(&first.files[0]).unwrap();
        let first_lock = fs::read(dir.path().join(".mvpe.ids.lock")).unwrap();

        let second = generate(&options).unwrap();
        let second_bytes = fs::read(&second.files[0]).unwrap();
        let second_lock = fs::read(dir.path().join(".mvpe.ids.lock")).unwrap();

        assert_eq!(first_bytes, second_bytes);
        assert_eq!(first_lock, second_lock);
    }

    #[test]
    fn test_validation_failure_exit_code() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("bad.mvpe.yaml");
        fs::write(&path, "service: ''\nmethods: []\n").unwrap();

        let err = validate_schema(&path).unwrap_err();
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_off_mode_leaves_no_lockfile() {
        let dir = TempDir::new().unwrap();
        let schema_path = write_schema(&dir);

        generate(&GenerateOptions {
            schema_path,
            output_dir: dir.path().join("generated"),
            module: None,
            mode: LockMode::Off,
            lockfile_path: None,
        })
        .unwrap();

        assert!(!dir.path().join(".mvpe.ids.lock").exists());
    }
}
