use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ToolError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("path traversal denied: {0}")]
    PathTraversal(String),
    #[error("file not found: {0}")]
    NotFound(String),
    #[error("unsupported file type: {0}")]
    UnsupportedType(String),
    #[error("metadata extraction failed: {0}")]
    Extraction(String),
    #[error("rename failed: {0}")]
    Rename(String),
    #[error("packaging failed: {0}")]
    Packaging(String),
}

impl ToolError {
    /// Stable identifier surfaced in error payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::InvalidInput(_) => "invalid_input",
            ToolError::PathTraversal(_) => "path_traversal",
            ToolError::NotFound(_) => "not_found",
            ToolError::UnsupportedType(_) => "unsupported_type",
            ToolError::Extraction(_) => "extraction_error",
            ToolError::Rename(_) => "rename_error",
            ToolError::Packaging(_) => "packaging_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::ToolError;

    #[test]
    fn kind_is_stable_per_variant() {
        assert_eq!(ToolError::NotFound("a".into()).kind(), "not_found");
        assert_eq!(
            ToolError::PathTraversal("../x".into()).kind(),
            "path_traversal"
        );
        assert_eq!(ToolError::Packaging("zip".into()).kind(), "packaging_error");
    }

    #[test]
    fn display_carries_message() {
        let err = ToolError::UnsupportedType("notes.txt".into());
        assert_eq!(err.to_string(), "unsupported file type: notes.txt");
    }
}
