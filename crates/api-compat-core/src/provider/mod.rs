//! 声明提供者
//!
//! 提供者把一个头文件快照转换为 [`DeclarationStore`]。差异核心只依赖
//! 这里的接口，具体来源（头文件解析、序列化快照回放、手工构建）可以互换。

pub mod header;
pub mod qualified_name;
pub mod snapshot;

pub use header::{HeaderProvider, HeaderProviderConfig};
pub use qualified_name::QualifiedNameBuilder;
pub use snapshot::SnapshotProvider;

use crate::error::{ApiCompatError, Result};
use crate::store::DeclarationStore;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// 头文件扩展名
pub const HEADER_EXTENSIONS: &[&str] = &["h", "hh", "hpp", "hxx", "inl"];

/// 快照文件扩展名
pub const SNAPSHOT_EXTENSIONS: &[&str] = &["json"];

/// 输入格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputFormat {
    /// C/C++ 头文件源码
    Header,
    /// 序列化的声明快照
    Snapshot,
}

impl InputFormat {
    /// 根据文件路径检测输入格式
    pub fn detect(path: &Path) -> Option<Self> {
        let extension = path.extension()?.to_str()?.to_ascii_lowercase();
        if HEADER_EXTENSIONS.contains(&extension.as_str()) {
            Some(InputFormat::Header)
        } else if SNAPSHOT_EXTENSIONS.contains(&extension.as_str()) {
            Some(InputFormat::Snapshot)
        } else {
            None
        }
    }

    /// 该格式对应的文件扩展名
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            InputFormat::Header => HEADER_EXTENSIONS,
            InputFormat::Snapshot => SNAPSHOT_EXTENSIONS,
        }
    }
}

/// 一个头文件快照：报告中使用的标签、来源路径和文本内容
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderSource {
    pub label: String,
    pub path: PathBuf,
    pub contents: String,
}

impl HeaderSource {
    pub fn new(label: impl Into<String>, path: impl Into<PathBuf>, contents: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            path: path.into(),
            contents: contents.into(),
        }
    }

    /// 从文件系统读取，标签为给定的相对路径
    pub fn read(label: impl Into<String>, path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(Self::new(label, path, contents))
    }
}

/// 声明提供者接口
pub trait DeclarationProvider: Send + Sync {
    /// 提供者名称
    fn name(&self) -> &'static str;

    /// 将 `source` 中的声明填充到 `store`
    fn populate(&self, source: &HeaderSource, store: &mut DeclarationStore) -> Result<()>;
}

/// 提供者工厂
pub struct ProviderFactory;

impl ProviderFactory {
    /// 根据输入格式创建提供者
    pub fn create_provider(
        format: InputFormat,
        config: &HeaderProviderConfig,
    ) -> Box<dyn DeclarationProvider> {
        match format {
            InputFormat::Header => Box::new(HeaderProvider::new(config.clone())),
            InputFormat::Snapshot => Box::new(SnapshotProvider::new()),
        }
    }

    /// 根据文件路径创建对应的提供者
    pub fn create_provider_for_file(
        path: &Path,
        config: &HeaderProviderConfig,
    ) -> Result<Box<dyn DeclarationProvider>> {
        let format = InputFormat::detect(path).ok_or_else(|| {
            ApiCompatError::UnsupportedFileType(path.to_string_lossy().to_string())
        })?;
        Ok(Self::create_provider(format, config))
    }
}
