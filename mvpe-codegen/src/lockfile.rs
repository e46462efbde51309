//! Lockfile persistence.
//!
//! The lock is stored as a sorted key-value text file:
//!
//! ```text
//! version = 1
//! services.AccountService = 42
//! methods.AccountService%2EGetBalance = 17
//! messages.GetBalanceRequest = 101
//! tombstones.services = 5,6
//! tombstones.messages = 999,1000
//! tombstones.methods.AccountService = 15,16
//! aliases.services.Accounts = AccountService
//! aliases.messages.BalanceResp = GetBalanceResponse
//! ```
//!
//! Names are escaped (`%` → `%25`, then `.` → `%2E`) to keep the dotted
//! key structure parseable. Tombstone lists are emitted in ascending order
//! and keys are sorted, so rewriting an unchanged lock is byte-identical.
//! An absent file is an empty lock at version 1.

use crate::error::CodegenError;
use crate::lock::IdsLock;
use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::Path;

/// Default lockfile name, resolved next to the schema file.
pub const DEFAULT_LOCKFILE: &str = ".mvpe.ids.lock";

fn escape(name: &str) -> String {
    name.replace('%', "%25").replace('.', "%2E")
}

fn unescape(name: &str) -> String {
    name.replace("%2E", ".").replace("%25", "%")
}

fn join_ids(ids: &BTreeSet<u32>) -> String {
    let mut out = String::new();
    for (i, id) in ids.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        let _ = write!(out, "{id}");
    }
    out
}

fn parse_ids(value: &str, path: &Path) -> Result<BTreeSet<u32>, CodegenError> {
    let mut ids = BTreeSet::new();
    for part in value.split(',') {
        let part = part.trim();
        if part.is_empty() {
            continue;
        }
        let id = part.parse().map_err(|_| CodegenError::InvalidLockfile {
            path: path.to_path_buf(),
            reason: format!("invalid id list entry '{part}'"),
        })?;
        ids.insert(id);
    }
    Ok(ids)
}

/// Loads a lock from disk. A missing file yields an empty lock.
pub fn load(path: &Path) -> Result<IdsLock, CodegenError> {
    let mut lock = IdsLock::new();
    if !path.exists() {
        tracing::debug!(path = %path.display(), "No lockfile; starting from an empty lock");
        return Ok(lock);
    }

    let content = std::fs::read_to_string(path).map_err(|source| CodegenError::Io {
        context: "reading lockfile",
        path: path.to_path_buf(),
        source,
    })?;

    for (line_no, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line.split_once('=').ok_or_else(|| CodegenError::InvalidLockfile {
            path: path.to_path_buf(),
            reason: format!("line {}: expected 'key = value'", line_no + 1),
        })?;
        let key = key.trim();
        let value = value.trim();

        let parse_id = |value: &str| -> Result<u32, CodegenError> {
            value.parse().map_err(|_| CodegenError::InvalidLockfile {
                path: path.to_path_buf(),
                reason: format!("line {}: invalid id '{value}'", line_no + 1),
            })
        };

        if key == "version" {
            lock.version = parse_id(value)?;
        } else if let Some(name) = key.strip_prefix("services.") {
            lock.services.insert(unescape(name), parse_id(value)?);
        } else if let Some(name) = key.strip_prefix("methods.") {
            lock.methods.insert(unescape(name), parse_id(value)?);
        } else if let Some(name) = key.strip_prefix("messages.") {
            lock.messages.insert(unescape(name), parse_id(value)?);
        } else if key == "tombstones.services" {
            lock.tombstone_services = parse_ids(value, path)?;
        } else if key == "tombstones.messages" {
            lock.tombstone_messages = parse_ids(value, path)?;
        } else if let Some(service) = key.strip_prefix("tombstones.methods.") {
            lock.tombstone_methods
                .insert(unescape(service), parse_ids(value, path)?);
        } else if let Some(old) = key.strip_prefix("aliases.services.") {
            lock.alias_services
                .insert(unescape(old), value.to_string());
        } else if let Some(old) = key.strip_prefix("aliases.messages.") {
            lock.alias_messages
                .insert(unescape(old), value.to_string());
        }
        // Unknown keys are ignored for forward compatibility.
    }

    tracing::debug!(
        path = %path.display(),
        services = lock.services.len(),
        methods = lock.methods.len(),
        messages = lock.messages.len(),
        "Loaded lockfile"
    );
    Ok(lock)
}

/// Renders a lock into its on-disk text form.
pub fn render(lock: &IdsLock) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "version = {}", lock.version);

    for (name, id) in &lock.services {
        let _ = writeln!(out, "services.{} = {id}", escape(name));
    }
    for (name, id) in &lock.methods {
        let _ = writeln!(out, "methods.{} = {id}", escape(name));
    }
    for (name, id) in &lock.messages {
        let _ = writeln!(out, "messages.{} = {id}", escape(name));
    }

    let _ = writeln!(out, "tombstones.services = {}", join_ids(&lock.tombstone_services));
    let _ = writeln!(out, "tombstones.messages = {}", join_ids(&lock.tombstone_messages));
    for (service, ids) in &lock.tombstone_methods {
        let _ = writeln!(out, "tombstones.methods.{} = {}", escape(service), join_ids(ids));
    }

    for (old, new) in &lock.alias_services {
        let _ = writeln!(out, "aliases.services.{} = {new}", escape(old));
    }
    for (old, new) in &lock.alias_messages {
        let _ = writeln!(out, "aliases.messages.{} = {new}", escape(old));
    }

    out
}

/// Persists a lock to disk.
pub fn save(lock: &IdsLock, path: &Path) -> Result<(), CodegenError> {
    std::fs::write(path, render(lock)).map_err(|source| CodegenError::Io {
        context: "writing lockfile",
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "Saved lockfile");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn sample_lock() -> IdsLock {
        let mut lock = IdsLock::new();
        lock.services.insert("AccountService".to_string(), 42);
        lock.methods
            .insert("AccountService.GetBalance".to_string(), 17);
        lock.methods
            .insert("AccountService.TransferFunds".to_string(), 18);
        lock.messages.insert("GetBalanceRequest".to_string(), 101);
        lock.tombstone_services.extend([5, 6]);
        lock.tombstone_messages.extend([1000, 999]);
        lock.tombstone_methods
            .entry("AccountService".to_string())
            .or_default()
            .extend([15, 16]);
        lock.alias_services
            .insert("Accounts".to_string(), "AccountService".to_string());
        lock.alias_messages
            .insert("BalanceResp".to_string(), "GetBalanceResponse".to_string());
        lock
    }

    #[test]
    fn test_roundtrip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(DEFAULT_LOCKFILE);

        let lock = sample_lock();
        save(&lock, &path).unwrap();
        let loaded = load(&path).unwrap();

        assert_eq!(loaded, lock);
    }

    #[test]
    fn test_absent_file_is_empty_lock() {
        let lock = load(Path::new("/nonexistent/.mvpe.ids.lock")).unwrap();
        assert_eq!(lock.version, 1);
        assert!(lock.services.is_empty());
        assert!(lock.messages.is_empty());
    }

    #[test]
    fn test_render_is_stable() {
        let lock = sample_lock();
        assert_eq!(render(&lock), render(&lock));

        let text = render(&lock);
        // Tombstone lists are ascending regardless of insertion order.
        assert!(text.contains("tombstones.messages = 999,1000"));
        assert!(text.contains("tombstones.services = 5,6"));
        assert!(text.contains("tombstones.methods.AccountService = 15,16"));
    }

    #[test]
    fn test_method_keys_escape_dots() {
        let lock = sample_lock();
        let text = render(&lock);
        assert!(text.contains("methods.AccountService%2EGetBalance = 17"));
    }

    #[test]
    fn test_escape_roundtrip_with_percent() {
        let mut lock = IdsLock::new();
        lock.messages.insert("Odd%2EName.WithDot".to_string(), 40);

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock");
        save(&lock, &path).unwrap();

        let loaded = load(&path).unwrap();
        assert_eq!(loaded.messages.get("Odd%2EName.WithDot"), Some(&40));
    }

    #[test]
    fn test_malformed_line() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock");
        std::fs::write(&path, "version = 1\nno-equals-here\n").unwrap();

        assert!(matches!(
            load(&path),
            Err(CodegenError::InvalidLockfile { .. })
        ));
    }

    #[test]
    fn test_bad_id_value() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock");
        std::fs::write(&path, "services.X = not-a-number\n").unwrap();

        assert!(matches!(
            load(&path),
            Err(CodegenError::InvalidLockfile { .. })
        ));
    }

    #[test]
    fn test_comments_and_blanks_ignored() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("lock");
        std::fs::write(&path, "# header\n\nversion = 1\nservices.S = 40\n").unwrap();

        let lock = load(&path).unwrap();
        assert_eq!(lock.services.get("S"), Some(&40));
    }
}
