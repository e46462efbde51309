//! Command execution and diagnostics output.

use colored::Colorize;
use mvpe_codegen::orchestrator::{self, default_lockfile_path};
use mvpe_codegen::{
    assign_with_lockfile, schema_info, validate_schema, CodegenError, GenerateOptions, LockMode,
};
use std::path::PathBuf;

pub fn generate(
    schema: PathBuf,
    out: PathBuf,
    module: Option<String>,
    mode: LockMode,
    lockfile: Option<PathBuf>,
) -> Result<(), CodegenError> {
    let report = orchestrator::generate(&GenerateOptions {
        schema_path: schema,
        output_dir: out,
        module,
        mode,
        lockfile_path: lockfile,
    })?;

    println!(
        "{} code for service {} (id {})",
        "Generated".green(),
        report.service.cyan(),
        report.ids.service_id
    );
    for file in &report.files {
        println!("  {}", file.display());
    }
    Ok(())
}

pub fn check(schema_path: PathBuf, lockfile: Option<PathBuf>) -> Result<(), CodegenError> {
    let mut schema = validate_schema(&schema_path)?;
    let lockfile = lockfile.unwrap_or_else(|| default_lockfile_path(&schema_path));

    let ids = assign_with_lockfile(&mut schema, &lockfile, LockMode::Check)?;

    println!(
        "{} {} against {} ({} method(s), {} message(s))",
        "Checked".green(),
        schema.service.cyan(),
        lockfile.display(),
        ids.method_ids.len(),
        ids.message_ids.len()
    );
    Ok(())
}

pub fn validate(schema_path: PathBuf) -> Result<(), CodegenError> {
    let schema = validate_schema(&schema_path)?;
    println!(
        "{} schema for {}",
        "Valid".green(),
        schema.service.cyan()
    );
    Ok(())
}

pub fn info(schema_path: PathBuf) -> Result<(), CodegenError> {
    let schema = schema_info(&schema_path)?;

    println!("{}", format!("Service: {}", schema.service).bold());
    match schema.id {
        Some(id) => println!("  id: {id}"),
        None => println!("  id: (assigned from lockfile)"),
    }

    println!("  methods: {}", schema.methods.len());
    for method in &schema.methods {
        match method.id {
            Some(id) => println!("    - {} (id {})", method.name, id),
            None => println!("    - {}", method.name),
        }
        println!("      request:  {}", method.request);
        println!("      response: {}", method.response);
    }

    println!("  messages: {}", schema.messages.len());
    for message in &schema.messages {
        println!("    - {}", message.name);
        for field in &message.fields {
            let optional = if field.optional { "?" } else { "" };
            println!(
                "      * {}: {}{}",
                field.name,
                field.field_type,
                optional
            );
        }
    }
    Ok(())
}

/// Prints one diagnostic line per issue.
pub fn report_error(err: &CodegenError) {
    match err {
        CodegenError::Validation(batch) => {
            for issue in &batch.0 {
                eprintln!("{} {}", "error:".red().bold(), issue);
            }
        }
        other => {
            eprintln!("{} {}", "error:".red().bold(), other);
        }
    }
}
