//! Writes rendered environments to disk.

use std::path::{Component, Path, PathBuf};

use topoc_common::error::{Result, TopocError};

use crate::driver::{EnvironmentOutput, GeneratedFile};

/// Replaces `root/<environment>` with the rendered files.
///
/// An existing directory is removed first so stale artifacts from earlier
/// runs never survive. Returns the environment directory.
///
/// # Errors
///
/// Returns [`TopocError::Schema`] if the environment name is not a plain
/// directory name, or [`TopocError::Io`] if the directory cannot be
/// removed or created, or a file cannot be written.
pub fn write_environment(root: &Path, output: &EnvironmentOutput) -> Result<PathBuf> {
    let mut components = Path::new(&output.name).components();
    if !matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    ) {
        return Err(TopocError::schema(format!(
            "environment name \"{}\" cannot be used as a directory name",
            output.name
        )));
    }
    let dir = root.join(&output.name);
    if dir.exists() {
        std::fs::remove_dir_all(&dir).map_err(|e| TopocError::io(&dir, e))?;
        tracing::debug!(path = %dir.display(), "removed previous output");
    }
    std::fs::create_dir_all(&dir).map_err(|e| TopocError::io(&dir, e))?;

    for file in &output.files {
        write_file(&dir, file)?;
    }
    tracing::info!(
        environment = %output.name,
        path = %dir.display(),
        files = output.files.len(),
        "environment written"
    );
    Ok(dir)
}

fn write_file(dir: &Path, file: &GeneratedFile) -> Result<()> {
    let path = dir.join(&file.file_name);
    std::fs::write(&path, &file.contents).map_err(|e| TopocError::io(&path, e))?;
    if file.executable {
        mark_executable(&path)?;
    }
    Ok(())
}

#[cfg(unix)]
fn mark_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = std::fs::metadata(path)
        .map_err(|e| TopocError::io(path, e))?
        .permissions();
    permissions.set_mode(permissions.mode() | 0o111);
    std::fs::set_permissions(path, permissions).map_err(|e| TopocError::io(path, e))
}

#[cfg(not(unix))]
fn mark_executable(path: &Path) -> Result<()> {
    tracing::debug!(path = %path.display(), "executable bit not supported on this platform");
    Ok(())
}
