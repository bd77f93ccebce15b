use crate::error::ToolError;
use std::fmt;
use std::fs;
use std::path::{Component, Path, PathBuf};

pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "tiff", "tif", "heic", "heif", "webp", "avif",
];

/// An absolute path inside the authorized root that existed when it was
/// validated. Only [`PathValidator::validate`] can build one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SafePath(PathBuf);

impl SafePath {
    pub fn as_path(&self) -> &Path {
        &self.0
    }

    pub fn file_name(&self) -> String {
        self.0
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    pub fn file_stem(&self) -> String {
        self.0
            .file_stem()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Extension including the leading dot, as written on disk.
    pub fn extension_with_dot(&self) -> String {
        self.0
            .extension()
            .map(|v| format!(".{}", v.to_string_lossy()))
            .unwrap_or_default()
    }
}

impl AsRef<Path> for SafePath {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl fmt::Display for SafePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

#[derive(Debug, Clone)]
pub struct PathValidator {
    root: PathBuf,
}

impl PathValidator {
    pub fn new(root: impl AsRef<Path>) -> Result<Self, ToolError> {
        let root = root.as_ref();
        let root = fs::canonicalize(root).map_err(|err| {
            ToolError::InvalidInput(format!(
                "authorized root cannot be resolved: {} ({err})",
                root.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn from_current_dir() -> Result<Self, ToolError> {
        let cwd = std::env::current_dir().map_err(|err| {
            ToolError::InvalidInput(format!("working directory is unavailable: {err}"))
        })?;
        Self::new(cwd)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn validate(&self, raw: &str) -> Result<SafePath, ToolError> {
        let resolved = self.resolve_inside_root(raw)?;

        if !resolved.exists() {
            return Err(ToolError::NotFound(raw.to_string()));
        }
        if !has_supported_extension(&resolved) {
            return Err(ToolError::UnsupportedType(format!(
                "{raw} (supported: {})",
                SUPPORTED_EXTENSIONS.join(", ")
            )));
        }
        if !resolved.is_file() {
            return Err(ToolError::UnsupportedType(format!("{raw} is not a file")));
        }

        let canonical = fs::canonicalize(&resolved)
            .map_err(|err| ToolError::NotFound(format!("{raw} ({err})")))?;
        if !canonical.starts_with(&self.root) {
            return Err(ToolError::PathTraversal(format!(
                "{raw} resolves outside {}",
                self.root.display()
            )));
        }

        Ok(SafePath(resolved))
    }

    /// Checks a path that is about to be written. The file itself may not
    /// exist yet, but its parent directory must.
    pub fn validate_output(&self, raw: &str, extension: &str) -> Result<PathBuf, ToolError> {
        let resolved = self.resolve_inside_root(raw)?;

        let matches_extension = resolved
            .extension()
            .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(extension))
            .unwrap_or(false);
        if !matches_extension {
            return Err(ToolError::InvalidInput(format!(
                "output path must end with .{extension}: {raw}"
            )));
        }
        if resolved.is_dir() {
            return Err(ToolError::InvalidInput(format!(
                "output path is a directory: {raw}"
            )));
        }

        let parent = resolved
            .parent()
            .ok_or_else(|| ToolError::InvalidInput(format!("output path has no parent: {raw}")))?;
        let parent_canonical = fs::canonicalize(parent).map_err(|_| {
            ToolError::NotFound(format!("output directory does not exist: {}", parent.display()))
        })?;
        if !parent_canonical.starts_with(&self.root) {
            return Err(ToolError::PathTraversal(format!(
                "{raw} resolves outside {}",
                self.root.display()
            )));
        }

        Ok(resolved)
    }

    fn resolve_inside_root(&self, raw: &str) -> Result<PathBuf, ToolError> {
        if raw.trim().is_empty() {
            return Err(ToolError::InvalidInput(
                "filepath must be a non-empty string".to_string(),
            ));
        }

        let joined = self.root.join(raw);
        let normalized = normalize_lexically(&joined)
            .ok_or_else(|| ToolError::PathTraversal(raw.to_string()))?;

        let has_parent_marker = normalized
            .components()
            .any(|c| matches!(c, Component::ParentDir));
        if has_parent_marker || !normalized.starts_with(&self.root) {
            return Err(ToolError::PathTraversal(raw.to_string()));
        }

        Ok(normalized)
    }
}

pub fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy();
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| ext.eq_ignore_ascii_case(supported))
        })
        .unwrap_or(false)
}

/// Resolves `.` and `..` without touching the filesystem. Returns `None`
/// when a `..` would climb above the filesystem root.
fn normalize_lexically(path: &Path) -> Option<PathBuf> {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let at_root = out.parent().is_none();
                if at_root || !out.pop() {
                    return None;
                }
            }
            Component::Normal(part) => out.push(part),
        }
    }
    Some(out)
}
