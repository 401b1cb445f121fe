//! 诊断输出
//!
//! 差异流水线通过显式传入的 [`DiagnosticSink`] 报告排除命中、名称冲突等信息，
//! 不依赖全局状态。诊断只是旁路输出，不影响比较结果。

use std::sync::Mutex;
use tracing::{debug, info, warn};

/// 诊断级别
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DiagnosticLevel {
    Debug,
    Info,
    Warning,
}

/// 一条诊断信息
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
        }
    }

    pub fn debug(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Debug,
            message: message.into(),
        }
    }
}

/// 诊断接收端
pub trait DiagnosticSink: Send + Sync {
    fn record(&self, diagnostic: Diagnostic);
}

/// 转发到 tracing 的默认接收端
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match diagnostic.level {
            DiagnosticLevel::Debug => debug!("{}", diagnostic.message),
            DiagnosticLevel::Info => info!("{}", diagnostic.message),
            DiagnosticLevel::Warning => warn!("{}", diagnostic.message),
        }
    }
}

/// 收集诊断的接收端，便于检查流水线报告了什么
#[derive(Debug, Default)]
pub struct CollectingSink {
    diagnostics: Mutex<Vec<Diagnostic>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出目前收集到的诊断
    pub fn take(&self) -> Vec<Diagnostic> {
        match self.diagnostics.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }
}

impl DiagnosticSink for CollectingSink {
    fn record(&self, diagnostic: Diagnostic) {
        match self.diagnostics.lock() {
            Ok(mut guard) => guard.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}
