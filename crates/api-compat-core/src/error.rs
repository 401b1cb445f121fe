use thiserror::Error;

/// api-compat 的错误类型定义
#[derive(Error, Debug)]
pub enum ApiCompatError {
    #[error("Git repository error: {0}")]
    GitError(String),

    #[error("Invalid revision: {0}")]
    InvalidRevision(String),

    #[error("Header parsing error: {0}")]
    ParseError(String),

    #[error("File I/O error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Malformed declaration snapshot: {0}")]
    SnapshotFormat(#[from] serde_json::Error),

    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    #[error("Tree-sitter parsing failed: {0}")]
    TreeSitterError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// 项目通用的 Result 类型别名
pub type Result<T> = std::result::Result<T, ApiCompatError>;
