use std::{
    fs::{self, File, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};

use parking_lot::Mutex;
use serde_json::Value;
use tracing::warn;

use act_protocol::AuditRecord;

/// Append-only NDJSON audit log. Write failures are swallowed: they must
/// never affect request semantics.
pub struct AuditLog {
    path: PathBuf,
    file: Mutex<Option<File>>,
}

impl AuditLog {
    /// Open (creating if absent) the audit log at `dir/audit.log`. `dir` is
    /// created at mode `0o700` if it does not exist.
    pub fn open(dir: &Path) -> std::io::Result<Self> {
        fs::create_dir_all(dir)?;
        set_dir_mode(dir, 0o700);
        let path = dir.join("audit.log");
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        set_file_mode(&path, 0o600);
        Ok(Self {
            path,
            file: Mutex::new(Some(file)),
        })
    }

    /// Path to the underlying log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record for a dispatched command.
    pub fn record_command(&self, action: &str, params: &Value) {
        self.append(&AuditRecord::command(action, params));
    }

    /// Append a record for a failed handshake.
    pub fn record_auth_failed(&self, extension_id: Option<&str>) {
        self.append(&AuditRecord::auth_failed(extension_id));
    }

    fn append(&self, record: &AuditRecord) {
        let Ok(mut line) = serde_json::to_string(record) else {
            warn!("failed to serialize audit record");
            return;
        };
        line.push('\n');
        let mut guard = self.file.lock();
        if let Some(file) = guard.as_mut()
            && let Err(err) = file.write_all(line.as_bytes())
        {
            warn!(%err, "audit log write failed, dropping record");
        }
    }
}

#[cfg(unix)]
fn set_dir_mode(dir: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = fs::set_permissions(dir, fs::Permissions::from_mode(mode)) {
        warn!(%err, path = %dir.display(), "failed to set audit directory permissions");
    }
}

#[cfg(not(unix))]
fn set_dir_mode(_dir: &Path, _mode: u32) {}

#[cfg(unix)]
fn set_file_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        warn!(%err, path = %path.display(), "failed to set audit log permissions");
    }
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _mode: u32) {}
