//! Path confinement for the file tools.

use orchestra_core::error::ToolError;
use std::path::{Component, Path, PathBuf};

/// Resolve `file_path` inside `root`.
///
/// Relative paths are joined onto the root; absolute paths are accepted only
/// when they already point inside it. Any `..` component is rejected.
pub(crate) fn resolve(root: &Path, file_path: &str, tool_name: &str) -> Result<PathBuf, ToolError> {
    let denied = |reason: &str| ToolError::PermissionDenied {
        tool_name: tool_name.into(),
        reason: format!("{reason}: {file_path}"),
    };

    if file_path.trim().is_empty() {
        return Err(ToolError::InvalidArguments("'file_path' must not be empty".into()));
    }

    let candidate = Path::new(file_path);
    let relative = match candidate.strip_prefix(root) {
        Ok(inside) => inside,
        Err(_) if candidate.is_absolute() => return Err(denied("path is outside the workspace")),
        Err(_) => candidate,
    };

    if relative
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
    {
        return Err(denied("path escapes the workspace"));
    }

    Ok(root.join(relative))
}
