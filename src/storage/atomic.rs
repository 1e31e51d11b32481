//! Crash-safe file publication
//! ---------------------------
//! Content is staged in a uniquely named temp file next to its target, flushed
//! to disk, then swapped into place with a single rename (or hard link for
//! no-overwrite publication). Readers see either the old file or the complete
//! new one.
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialize `value` as JSON indented with four spaces.
pub fn to_pretty_json<T: Serialize + ?Sized>(value: &T) -> serde_json::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(256);
    let fmt = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut out, fmt);
    value.serialize(&mut ser)?;
    Ok(out)
}

/// Temp path for `target`: `.<uuid>.tmp` in the same directory.
/// Same directory keeps the final rename on one filesystem. The name length is
/// fixed so staging never fails on a target whose own name is at the limit.
fn staging_path(target: &Path) -> io::Result<PathBuf> {
    let parent = target
        .parent()
        .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "Path has no parent directory"))?;
    if target.file_name().is_none() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "Path has no file name"));
    }
    Ok(parent.join(format!(".{}.tmp", uuid::Uuid::new_v4().simple())))
}

/// Write `bytes` to a fresh staging file and fsync it.
fn stage(target: &Path, bytes: &[u8]) -> io::Result<PathBuf> {
    let tmp = staging_path(target)?;
    let res = (|| {
        let mut f = File::options().write(true).create_new(true).open(&tmp)?;
        f.write_all(bytes)?;
        f.sync_all()
    })();
    if let Err(e) = res {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    Ok(tmp)
}

/// Replace `target` with `bytes` atomically, creating it if missing.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = stage(target, bytes)?;
    if let Err(e) = fs::rename(&tmp, target) {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    sync_parent(target);
    Ok(())
}

/// Publish `bytes` at `target` only if nothing exists there yet.
///
/// Fails with `ErrorKind::AlreadyExists` when `target` is taken; the existing
/// file is never touched. The hard link makes create-if-absent a single
/// filesystem operation. Filesystems without hard links fall back to an
/// existence check followed by rename, which is racy against a concurrent
/// publisher of the same name.
pub fn write_exclusive(target: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = stage(target, bytes)?;
    let res = match fs::hard_link(&tmp, target) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => Err(e),
        Err(e) => {
            debug!(target: "presetd::storage", "hard_link unavailable ({}), falling back to rename for {}", e, target.display());
            if target.exists() {
                Err(io::Error::new(io::ErrorKind::AlreadyExists, "destination already exists"))
            } else {
                fs::rename(&tmp, target)
            }
        }
    };
    // After a successful link the staging name is a second link to the same inode.
    let _ = fs::remove_file(&tmp);
    res?;
    sync_parent(target);
    Ok(())
}

/// Best-effort directory flush so the rename itself is durable.
fn sync_parent(target: &Path) {
    if let Some(dir) = target.parent() {
        if let Ok(f) = File::open(dir) {
            let _ = f.sync_all();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn leftovers(dir: &Path) -> Vec<String> {
        fs::read_dir(dir)
            .unwrap()
            .flatten()
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|n| n.ends_with(".tmp"))
            .collect()
    }

    #[test]
    fn pretty_json_uses_four_spaces() {
        let bytes = to_pretty_json(&json!({"temp": 0.7})).unwrap();
        assert_eq!(String::from_utf8(bytes).unwrap(), "{\n    \"temp\": 0.7\n}");
    }

    #[test]
    fn write_atomic_creates_and_replaces() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("p.json");
        write_atomic(&target, b"one").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"one");
        write_atomic(&target, b"two").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"two");
        assert!(leftovers(tmp.path()).is_empty());
    }

    #[test]
    fn write_exclusive_refuses_existing_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("taken.json");
        fs::write(&target, b"original").unwrap();
        let err = write_exclusive(&target, b"intruder").unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&target).unwrap(), b"original");
        assert!(leftovers(tmp.path()).is_empty());
    }

    #[test]
    fn write_exclusive_publishes_new_target() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("fresh.json");
        write_exclusive(&target, b"fresh").unwrap();
        assert_eq!(fs::read(&target).unwrap(), b"fresh");
        assert!(leftovers(tmp.path()).is_empty());
    }

    #[test]
    fn target_at_name_limit_is_writable() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join(format!("{}.json", "n".repeat(250)));
        write_atomic(&target, b"long").unwrap();
        let renamed = tmp.path().join(format!("{}.json", "m".repeat(250)));
        write_exclusive(&renamed, b"long").unwrap();
        assert_eq!(fs::read(&renamed).unwrap(), b"long");
        assert!(leftovers(tmp.path()).is_empty());
    }

    #[test]
    fn missing_parent_is_an_error() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("nope").join("p.json");
        assert!(write_atomic(&target, b"x").is_err());
    }
}
