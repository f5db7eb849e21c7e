//! # Storage Layer
//!
//! Persistence for the graph with git-friendly file formats.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Snapshot | YAML-compatible text | `.todo-graph` |
//! | Snapshot (alternate) | JSON | `.todo-graph.json` |
//! | Error export | JSON | `todo-graph.errors.json` |
//! | Config | TOML | `.todo-graph.toml` |
//!
//! ## Concurrency Safety
//!
//! All writes are atomic (temp file + rename) and hold an exclusive `fs2`
//! lock on the temp file while writing. Source rewrites by the editors go
//! through the same [`write_atomic`].
//!
//! ## Key Types
//!
//! - [`Config`] - Project and global configuration
//! - [`SnapshotError`] - Failures reading or writing snapshots

mod config;
mod json;
mod snapshot;

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

pub use config::{Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, CONFIG_FILE};
pub use json::{
    parse_graph_json, render_graph_json, render_payload_json, render_report_json, write_errors_json,
    write_graph_json, GraphDocument, Payload,
};
pub use snapshot::{
    parse_snapshot, quote, read_snapshot, render_snapshot, unquote, write_snapshot, SnapshotError,
    SnapshotFormat, ERRORS_FILE, SNAPSHOT_FILE, SNAPSHOT_JSON_FILE, SNAPSHOT_VERSION,
};

/// Resolves an explicit output path against `root`, or falls back to
/// `root/default_name`
pub fn resolve_output(root: &Path, output: Option<&Path>, default_name: &str) -> PathBuf {
    match output {
        Some(path) if path.is_absolute() => path.to_path_buf(),
        Some(path) => root.join(path),
        None => root.join(default_name),
    }
}

/// Replaces `path` with `contents` in one step.
///
/// Missing parent directories are created and an existing file keeps its
/// permissions.
pub fn write_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.file_name().unwrap_or_default().to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)?;

        file.lock_exclusive()?;

        let mut writer = BufWriter::new(&file);
        writer.write_all(contents)?;
        writer.flush()?;

        if let Ok(metadata) = fs::metadata(path) {
            file.set_permissions(metadata.permissions())?;
        }
    }

    fs::rename(&temp_path, path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn resolve_output_paths() {
        let root = Path::new("/repo");
        assert_eq!(resolve_output(root, None, SNAPSHOT_FILE), PathBuf::from("/repo/.todo-graph"));
        assert_eq!(
            resolve_output(root, Some(Path::new("out/g.yaml")), SNAPSHOT_FILE),
            PathBuf::from("/repo/out/g.yaml")
        );
        assert_eq!(
            resolve_output(root, Some(Path::new("/tmp/g")), SNAPSHOT_FILE),
            PathBuf::from("/tmp/g")
        );
    }

    #[test]
    fn write_atomic_creates_parents_and_replaces() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/deeper/file.txt");

        write_atomic(&path, b"one").unwrap();
        write_atomic(&path, b"two").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "two");
        assert!(!dir.path().join("nested/deeper/file.txt.tmp").exists());
    }

    #[cfg(unix)]
    #[test]
    fn write_atomic_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("script.sh");
        fs::write(&path, "#!/bin/sh\n").unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();

        write_atomic(&path, b"#!/bin/sh\necho hi\n").unwrap();

        let mode = fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o755);
    }
}
