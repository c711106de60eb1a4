use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

/// Hard upper bound for any record file we will read back from disk.
///
/// Cache corruption should degrade to a cache miss, not an out-of-memory
/// crash: a garbage file must never make us allocate an unbounded buffer.
pub const RECORD_SIZE_LIMIT_BYTES: u64 = 64 * 1024 * 1024;

pub(crate) fn now_secs() -> u64 {
    match SystemTime::now().duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs(),
        Err(err) => {
            // This should be extremely rare (system clock set before 1970).
            // Avoid spamming logs in hot call sites by logging at most once.
            static REPORTED: OnceLock<()> = OnceLock::new();
            if REPORTED.set(()).is_ok() {
                tracing::debug!(
                    target = "hoard.cache",
                    error = %err,
                    "system time is before unix epoch; using 0 for now_secs"
                );
            }
            0
        }
    }
}

/// Create every missing directory component of `root/relative`.
///
/// Returns false when `root` itself is missing or not a directory, or when a
/// component cannot be created. An empty `relative` is a no-op success. A
/// component materializing concurrently is not an error: `create_dir_all`
/// already treats "already exists" as success.
pub(crate) fn ensure_path(root: &Path, relative: &Path) -> bool {
    match fs::metadata(root) {
        Ok(meta) if meta.is_dir() => {}
        Ok(_) => return false,
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target = "hoard.cache",
                    root = %root.display(),
                    error = %err,
                    "failed to stat cache root"
                );
            }
            return false;
        }
    }

    if relative.as_os_str().is_empty() {
        return true;
    }

    let full = root.join(relative);
    match fs::create_dir_all(&full) {
        Ok(()) => true,
        Err(err) => {
            tracing::debug!(
                target = "hoard.cache",
                path = %full.display(),
                error = %err,
                "failed to create shard directory"
            );
            false
        }
    }
}

/// Depth-first removal of the tree rooted at `path`.
///
/// Symlinks are never followed: the link itself is removed, whatever it
/// points at survives. A plain file is removed directly, and a missing path
/// is not an error.
pub(crate) fn remove_tree(path: &Path) -> io::Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(()),
        Err(err) => return Err(err),
    };

    let file_type = meta.file_type();
    if file_type.is_symlink() || !file_type.is_dir() {
        return fs::remove_file(path);
    }

    for entry in fs::read_dir(path)? {
        remove_tree(&entry?.path())?;
    }
    fs::remove_dir(path)
}

/// Read a record file defensively: refuse symlinks and non-files, cap the
/// size, and treat anything unreadable as a miss.
pub(crate) fn read_record_file(path: &Path) -> Option<String> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(err) => {
            // Misses are expected; only log unexpected filesystem errors.
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target = "hoard.cache",
                    path = %path.display(),
                    error = %err,
                    "failed to stat record file"
                );
            }
            return None;
        }
    };
    if meta.file_type().is_symlink() || !meta.is_file() {
        remove_file_best_effort(path, "read_record_file.invalid_type");
        return None;
    }
    if meta.len() > RECORD_SIZE_LIMIT_BYTES {
        remove_file_best_effort(path, "read_record_file.oversize");
        return None;
    }

    match fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(err) => {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::debug!(
                    target = "hoard.cache",
                    path = %path.display(),
                    error = %err,
                    "failed to read record file"
                );
            }
            None
        }
    }
}

pub(crate) fn remove_file_best_effort(path: &Path, reason: &'static str) -> bool {
    match fs::remove_file(path) {
        Ok(()) => true,
        Err(err) if err.kind() == io::ErrorKind::NotFound => true,
        Err(err) => {
            tracing::debug!(
                target = "hoard.cache",
                path = %path.display(),
                reason,
                error = %err,
                "failed to remove record file"
            );
            false
        }
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write `bytes` to `path` via a uniquely named tempfile plus rename, so a
/// concurrent reader only ever sees the old record or the complete new one.
///
/// The parent directory must already exist; writers ensure their shard
/// directories up front and readers never create directories.
pub(crate) fn atomic_write(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let parent = path
        .parent()
        .ok_or_else(|| io::Error::other("record path has no parent"))?;

    let (tmp_path, mut file) = open_unique_tmp_file(path, parent)?;
    let write_result = (|| -> io::Result<()> {
        file.write_all(bytes)?;
        file.sync_all()?;
        Ok(())
    })();
    drop(file);
    if let Err(err) = write_result {
        remove_file_best_effort(&tmp_path, "atomic_write.write_failed");
        return Err(err);
    }

    match fs::rename(&tmp_path, path) {
        Ok(()) => {
            sync_dir_best_effort(parent);
            Ok(())
        }
        Err(err)
            if cfg!(windows) && (err.kind() == io::ErrorKind::AlreadyExists || path.exists()) =>
        {
            // On Windows, `rename` doesn't overwrite; retry once after a
            // remove. A concurrent writer winning the race surfaces as an
            // ordinary failed write.
            match fs::remove_file(path) {
                Ok(()) => {}
                Err(remove_err) if remove_err.kind() == io::ErrorKind::NotFound => {}
                Err(remove_err) => {
                    remove_file_best_effort(&tmp_path, "atomic_write.rename_failed");
                    return Err(remove_err);
                }
            }
            match fs::rename(&tmp_path, path) {
                Ok(()) => {
                    sync_dir_best_effort(parent);
                    Ok(())
                }
                Err(err) => {
                    remove_file_best_effort(&tmp_path, "atomic_write.rename_failed");
                    Err(err)
                }
            }
        }
        Err(err) => {
            remove_file_best_effort(&tmp_path, "atomic_write.rename_failed");
            Err(err)
        }
    }
}

fn sync_dir_best_effort(dir: &Path) {
    // Best-effort durability: fsync the directory entry after a rename so
    // the publish survives a crash. Failure here never fails the write.
    #[cfg(unix)]
    {
        match fs::File::open(dir).and_then(|dir| dir.sync_all()) {
            Ok(()) => {}
            Err(err) if err.kind() == io::ErrorKind::NotFound => {}
            Err(err) => {
                static REPORTED: OnceLock<()> = OnceLock::new();
                if REPORTED.set(()).is_ok() {
                    tracing::debug!(
                        target = "hoard.cache",
                        dir = %dir.display(),
                        error = %err,
                        "failed to sync shard directory (best effort)"
                    );
                }
            }
        }
    }

    #[cfg(not(unix))]
    let _ = dir;
}

fn open_unique_tmp_file(dest: &Path, parent: &Path) -> io::Result<(PathBuf, fs::File)> {
    let file_name = dest
        .file_name()
        .ok_or_else(|| io::Error::other("record path has no file name"))?;
    let pid = std::process::id();

    loop {
        let counter = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
        let mut tmp_name = file_name.to_os_string();
        tmp_name.push(format!(".tmp.{pid}.{counter}"));
        let tmp_path = parent.join(tmp_name);

        match fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&tmp_path)
        {
            Ok(file) => return Ok((tmp_path, file)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => continue,
            Err(err) => return Err(err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_path_creates_nested_components() {
        let tmp = tempfile::tempdir().unwrap();
        let relative = Path::new("ab").join("cd");
        assert!(ensure_path(tmp.path(), &relative));
        assert!(tmp.path().join("ab").join("cd").is_dir());
        // Idempotent: the full path already existing is not an error.
        assert!(ensure_path(tmp.path(), &relative));
    }

    #[test]
    fn ensure_path_with_empty_relative_is_a_noop_success() {
        let tmp = tempfile::tempdir().unwrap();
        assert!(ensure_path(tmp.path(), Path::new("")));
    }

    #[test]
    fn ensure_path_fails_when_root_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let missing = tmp.path().join("no").join("such").join("root");
        assert!(!ensure_path(&missing, Path::new("ab")));
    }

    #[test]
    fn ensure_path_fails_when_root_is_a_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("plain");
        fs::write(&file, b"x").unwrap();
        assert!(!ensure_path(&file, Path::new("ab")));
    }

    #[test]
    fn remove_tree_deletes_files_and_nested_directories() {
        let tmp = tempfile::tempdir().unwrap();
        let root = tmp.path().join("tree");
        fs::create_dir_all(root.join("dir").join("sub")).unwrap();
        fs::write(root.join("one"), b"1").unwrap();
        fs::write(root.join("dir").join("two"), b"2").unwrap();
        fs::write(root.join("dir").join("sub").join("three"), b"3").unwrap();

        remove_tree(&root).unwrap();
        assert!(!root.exists());
    }

    #[test]
    fn remove_tree_on_a_plain_file_removes_just_that_file() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("single");
        fs::write(&file, b"x").unwrap();
        remove_tree(&file).unwrap();
        assert!(!file.exists());
        assert!(tmp.path().exists());
    }

    #[test]
    fn remove_tree_on_a_missing_path_is_ok() {
        let tmp = tempfile::tempdir().unwrap();
        remove_tree(&tmp.path().join("missing")).unwrap();
    }

    #[cfg(unix)]
    #[test]
    fn remove_tree_does_not_follow_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("target");
        fs::create_dir(&target).unwrap();
        fs::write(target.join("keep"), b"k").unwrap();

        let root = tmp.path().join("tree");
        fs::create_dir(&root).unwrap();
        std::os::unix::fs::symlink(&target, root.join("link")).unwrap();

        remove_tree(&root).unwrap();
        assert!(!root.exists());
        // The symlink target and its contents survive.
        assert!(target.join("keep").exists());
    }

    #[cfg(unix)]
    #[test]
    fn read_record_file_refuses_symlinks() {
        let tmp = tempfile::tempdir().unwrap();
        let target = tmp.path().join("target");
        fs::write(&target, b"123\n\"v\"").unwrap();
        let link = tmp.path().join("link");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        assert!(read_record_file(&link).is_none());
        // The link is cleaned up, the target is untouched.
        assert!(!link.exists());
        assert!(target.exists());
    }

    #[test]
    fn atomic_write_replaces_existing_content() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("record");
        atomic_write(&path, b"old").unwrap();
        atomic_write(&path, b"new").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"new");
        // No tempfiles left behind.
        let names: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["record".to_string()]);
    }

    #[test]
    fn atomic_write_fails_when_parent_is_missing() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("no-such-dir").join("record");
        assert!(atomic_write(&path, b"x").is_err());
    }
}
