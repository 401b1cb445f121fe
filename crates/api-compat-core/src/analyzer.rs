//! 兼容性分析
//!
//! 把差异、分类与聚合串成一条流水线，对会话中的一个头文件给出报告。

use crate::classifier::{AtomicChange, ChangeClassifier};
use crate::diagnostics::DiagnosticSink;
use crate::diff::{DiffEngine, DiffTree};
use crate::error::Result;
use crate::report::{ReportAggregator, ReportRecord};
use crate::session::{Session, Snapshot};
use crate::store::DeclarationStore;
use std::sync::Arc;
use tracing::{debug, info};

/// 一个头文件的比较结果
#[derive(Debug, Clone, Default)]
pub struct HeaderComparison {
    pub label: String,
    pub diff: DiffTree,
    pub changes: Vec<AtomicChange>,
    pub records: Vec<ReportRecord>,
}

impl HeaderComparison {
    pub fn has_changes(&self) -> bool {
        !self.records.is_empty()
    }

    pub fn incompatible_count(&self) -> usize {
        self.records
            .iter()
            .filter(|record| record.is_incompatible())
            .count()
    }
}

/// 兼容性分析器
#[derive(Debug, Clone, Default)]
pub struct CompatibilityAnalyzer {
    engine: DiffEngine,
    classifier: ChangeClassifier,
    aggregator: ReportAggregator,
}

impl CompatibilityAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// 使用指定诊断接收端
    pub fn with_sink(sink: Arc<dyn DiagnosticSink>) -> Self {
        Self {
            engine: DiffEngine::with_sink(sink),
            ..Self::default()
        }
    }

    /// 比较会话中 `label` 的新旧两侧；任一侧缺少存储时返回配置错误
    pub fn compare(&self, session: &Session, label: &str) -> Result<HeaderComparison> {
        let old = session.context(Snapshot::Old, label)?;
        let new = session.context(Snapshot::New, label)?;
        Ok(self.compare_stores(old, new, label))
    }

    /// 直接比较两个存储
    pub fn compare_stores(
        &self,
        old: &DeclarationStore,
        new: &DeclarationStore,
        label: &str,
    ) -> HeaderComparison {
        let diff = self.engine.diff_stores(old, new);
        debug!("{label}: {} top-level diff entries", diff.len());

        let changes = self.classifier.classify(&diff, label);
        let records = self.aggregator.aggregate(&changes);
        info!(
            "{label}: {} atomic changes in {} APIs",
            changes.len(),
            records.len()
        );

        HeaderComparison {
            label: label.to_string(),
            diff,
            changes,
            records,
        }
    }
}
