//! api-compat-core - C/C++ 头文件 API 兼容性分析核心库
//!
//! 基于 Tree-sitter 从头文件中抽取声明树，按限定名做结构化差异，
//! 再把差异归类为破坏兼容或新增功能的报告记录。

pub mod analyzer;
pub mod classifier;
pub mod diagnostics;
pub mod diff;
pub mod error;
pub mod formatter;
pub mod git;
pub mod node;
pub mod performance;
pub mod provider;
pub mod report;
pub mod session;
pub mod sources;
pub mod store;

#[cfg(test)]
mod fixtures;

// 重新导出主要的公共 API
pub use analyzer::{CompatibilityAnalyzer, HeaderComparison};
pub use classifier::{AtomicChange, ChangeCategory, ChangeClassifier, ChangeKind, Compatibility};
pub use diagnostics::{CollectingSink, Diagnostic, DiagnosticLevel, DiagnosticSink, TracingSink};
pub use diff::{Attribute, DiffEngine, DiffEntry, DiffTree, Tag};
pub use error::{ApiCompatError, Result};
pub use formatter::{FormattedOutput, FormatterConfig, OutputFormat, OutputRenderer, render_diff_tree};
pub use git::GitSnapshotReader;
pub use node::{Node, NodeBody, NodeBuilder, NodeKind};
pub use performance::{ComparisonResult, ConcurrentComparator, PerformanceMonitor, PerformanceStats};
pub use provider::{
    DeclarationProvider, HeaderProvider, HeaderProviderConfig, HeaderSource, InputFormat,
    ProviderFactory, SnapshotProvider,
};
pub use report::{GroupChangeType, ReportAggregator, ReportRecord};
pub use session::{Session, Snapshot};
pub use sources::{HeaderPair, discover_pairs, git_pairs};
pub use store::{DeclarationStore, StoreSnapshot};
