use std::{
    fs,
    path::{Path, PathBuf},
};

use crate::error::{Error, Result};

/// Reject names that could escape the baseline root.
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || name.contains('/') || name.contains('\\') || name.contains("..") {
        return Err(Error::InvalidInput(format!(
            "invalid baseline name: {name:?}"
        )));
    }
    Ok(())
}

/// A named-PNG store for visual regression baselines (spec.md §4.4).
///
/// Every operation validates the baseline name before touching the
/// filesystem: a name containing `..`, `/`, or `\` fails without creating or
/// reading anything.
pub struct BaselineStore {
    root: PathBuf,
}

impl BaselineStore {
    /// Open a store rooted at `root`, creating `root` and `root/diffs` at
    /// mode `0o700` on first use.
    pub fn open(root: impl Into<PathBuf>) -> std::io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        set_dir_mode(&root, 0o700);
        let diffs = root.join("diffs");
        fs::create_dir_all(&diffs)?;
        set_dir_mode(&diffs, 0o700);
        Ok(Self { root })
    }

    /// Root directory this store was opened with.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn baseline_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.png"))
    }

    fn diff_path(&self, name: &str) -> PathBuf {
        self.root.join("diffs").join(format!("{name}.diff.png"))
    }

    /// Save `png` as the baseline `name`, overwriting any existing baseline.
    pub fn save(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        validate_name(name)?;
        let path = self.baseline_path(name);
        fs::write(&path, png).map_err(|err| Error::Storage(err.to_string()))?;
        set_file_mode(&path, 0o600);
        Ok(path)
    }

    /// Load baseline `name`, or `None` if it doesn't exist yet.
    pub fn load(&self, name: &str) -> Result<Option<Vec<u8>>> {
        validate_name(name)?;
        match fs::read(self.baseline_path(name)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::Storage(err.to_string())),
        }
    }

    /// Whether baseline `name` has been saved.
    pub fn exists(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        Ok(self.baseline_path(name).is_file())
    }

    /// List the names of all saved baselines.
    pub fn list(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        let entries = fs::read_dir(&self.root).map_err(|err| Error::Storage(err.to_string()))?;
        for entry in entries {
            let entry = entry.map_err(|err| Error::Storage(err.to_string()))?;
            let path = entry.path();
            if path.extension().and_then(|ext| ext.to_str()) != Some("png") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                names.push(stem.to_string());
            }
        }
        names.sort();
        Ok(names)
    }

    /// Save a diff image for `name` under `root/diffs`, mode `0o600`.
    pub fn save_diff(&self, name: &str, png: &[u8]) -> Result<PathBuf> {
        validate_name(name)?;
        let path = self.diff_path(name);
        fs::write(&path, png).map_err(|err| Error::Storage(err.to_string()))?;
        set_file_mode(&path, 0o600);
        Ok(path)
    }
}

#[cfg(unix)]
fn set_dir_mode(dir: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = fs::set_permissions(dir, fs::Permissions::from_mode(mode)) {
        tracing::warn!(%err, path = %dir.display(), "failed to set baseline directory permissions");
    }
}

#[cfg(not(unix))]
fn set_dir_mode(_dir: &Path, _mode: u32) {}

#[cfg(unix)]
fn set_file_mode(path: &Path, mode: u32) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = fs::set_permissions(path, fs::Permissions::from_mode(mode)) {
        tracing::warn!(%err, path = %path.display(), "failed to set baseline file permissions");
    }
}

#[cfg(not(unix))]
fn set_file_mode(_path: &Path, _mode: u32) {}
