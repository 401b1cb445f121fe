//! 批量比较
//!
//! 使用 rayon 并发比较多个头文件对。每一对在自己的会话中完成解析与比较，
//! 单个头文件失败只记录下来，不影响其他头文件。

use crate::analyzer::{CompatibilityAnalyzer, HeaderComparison};
use crate::diagnostics::{DiagnosticSink, TracingSink};
use crate::error::{ApiCompatError, Result};
use crate::provider::{HeaderProviderConfig, HeaderSource, InputFormat, ProviderFactory};
use crate::report::ReportRecord;
use crate::session::{Session, Snapshot};
use crate::sources::HeaderPair;
use rayon::prelude::*;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// 并发比较器
pub struct ConcurrentComparator {
    /// 线程池大小
    thread_pool_size: usize,
    /// 固定输入格式；为空时按扩展名检测
    format: Option<InputFormat>,
    provider_config: HeaderProviderConfig,
    old_exclusions: Vec<String>,
    new_exclusions: Vec<String>,
    sink: Arc<dyn DiagnosticSink>,
}

/// 批量比较结果
#[derive(Debug)]
pub struct ComparisonResult {
    /// 成功比较的头文件，按标签排序
    pub reports: Vec<HeaderComparison>,
    /// 比较失败的头文件及错误
    pub failed: Vec<(String, ApiCompatError)>,
    pub stats: PerformanceStats,
}

impl ComparisonResult {
    /// 全部报告记录
    pub fn records(&self) -> Vec<ReportRecord> {
        self.reports
            .iter()
            .flat_map(|report| report.records.iter().cloned())
            .collect()
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

/// 性能统计信息
#[derive(Debug, Clone, Default)]
pub struct PerformanceStats {
    /// 总处理时间
    pub total_duration: Duration,
    /// 处理的头文件数量
    pub headers_processed: u64,
    pub successful_headers: u64,
    pub failed_headers: u64,
    /// 平均每个头文件的处理时间
    pub avg_header_time: Duration,
    /// 使用的线程数
    pub threads: usize,
}

/// 性能监控器
pub struct PerformanceMonitor {
    start_time: Instant,
    headers_processed: AtomicU64,
    error_count: AtomicU64,
    total_processing_time: Mutex<Duration>,
}

impl Default for PerformanceMonitor {
    fn default() -> Self {
        Self::new()
    }
}

impl PerformanceMonitor {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            headers_processed: AtomicU64::new(0),
            error_count: AtomicU64::new(0),
            total_processing_time: Mutex::new(Duration::ZERO),
        }
    }

    /// 记录一个头文件处理完成
    pub fn record_header_processed(&self, processing_time: Duration) {
        self.headers_processed.fetch_add(1, Ordering::Relaxed);
        let mut total = self
            .total_processing_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *total += processing_time;
    }

    /// 记录错误
    pub fn record_error(&self) {
        self.error_count.fetch_add(1, Ordering::Relaxed);
    }

    /// 获取性能统计信息
    pub fn get_stats(&self, threads: usize) -> PerformanceStats {
        let headers_processed = self.headers_processed.load(Ordering::Relaxed);
        let failed_headers = self.error_count.load(Ordering::Relaxed);
        let total = *self
            .total_processing_time
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let avg_header_time = u32::try_from(headers_processed)
            .ok()
            .filter(|count| *count > 0)
            .map(|count| total / count)
            .unwrap_or(Duration::ZERO);

        PerformanceStats {
            total_duration: self.start_time.elapsed(),
            headers_processed,
            successful_headers: headers_processed.saturating_sub(failed_headers),
            failed_headers,
            avg_header_time,
            threads,
        }
    }
}

impl Default for ConcurrentComparator {
    fn default() -> Self {
        Self::new()
    }
}

impl ConcurrentComparator {
    /// 线程数默认为 CPU 核数
    pub fn new() -> Self {
        Self {
            thread_pool_size: num_cpus::get(),
            format: None,
            provider_config: HeaderProviderConfig::default(),
            old_exclusions: Vec::new(),
            new_exclusions: Vec::new(),
            sink: Arc::new(TracingSink),
        }
    }

    /// 设置线程池大小；0 表示使用 CPU 核数
    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = if size == 0 { num_cpus::get() } else { size };
        self
    }

    pub fn with_format(mut self, format: Option<InputFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn with_provider_config(mut self, config: HeaderProviderConfig) -> Self {
        self.provider_config = config;
        self
    }

    /// 新旧两侧各自排除的限定名
    pub fn with_exclusions(mut self, old: Vec<String>, new: Vec<String>) -> Self {
        self.old_exclusions = old;
        self.new_exclusions = new;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn DiagnosticSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn thread_pool_size(&self) -> usize {
        self.thread_pool_size
    }

    /// 并发比较全部头文件对
    pub fn compare(&self, pairs: &[HeaderPair]) -> Result<ComparisonResult> {
        let monitor = PerformanceMonitor::new();
        info!(
            "Comparing {} headers on {} threads",
            pairs.len(),
            self.thread_pool_size
        );

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.thread_pool_size)
            .build()
            .map_err(|e| ApiCompatError::ConfigError(format!("Failed to create thread pool: {e}")))?;

        let analyzer = CompatibilityAnalyzer::with_sink(Arc::clone(&self.sink));
        let results: Vec<_> = pool.install(|| {
            pairs
                .par_iter()
                .map(|pair| self.compare_with_monitor(&analyzer, pair, &monitor))
                .collect()
        });

        let mut reports = Vec::new();
        let mut failed = Vec::new();
        for result in results {
            match result {
                Ok(report) => reports.push(report),
                Err(failure) => failed.push(failure),
            }
        }
        reports.sort_by(|a, b| a.label.cmp(&b.label));
        failed.sort_by(|a, b| a.0.cmp(&b.0));

        let stats = monitor.get_stats(self.thread_pool_size);
        info!(
            "Comparison finished: {} succeeded, {} failed in {:?}",
            reports.len(),
            failed.len(),
            stats.total_duration
        );

        Ok(ComparisonResult {
            reports,
            failed,
            stats,
        })
    }

    fn compare_with_monitor(
        &self,
        analyzer: &CompatibilityAnalyzer,
        pair: &HeaderPair,
        monitor: &PerformanceMonitor,
    ) -> std::result::Result<HeaderComparison, (String, ApiCompatError)> {
        let start_time = Instant::now();
        let result = self.compare_pair(analyzer, pair);
        let processing_time = start_time.elapsed();
        monitor.record_header_processed(processing_time);

        match result {
            Ok(report) => {
                debug!("Compared {} in {:?}", pair.label, processing_time);
                Ok(report)
            }
            Err(error) => {
                warn!("Failed to compare {}: {error}", pair.label);
                monitor.record_error();
                Err((pair.label.clone(), error))
            }
        }
    }

    /// 在独立会话中比较一对头文件；缺失的一侧为空存储
    pub fn compare_pair(
        &self,
        analyzer: &CompatibilityAnalyzer,
        pair: &HeaderPair,
    ) -> Result<HeaderComparison> {
        let mut session = Session::new();
        self.load_side(&mut session, Snapshot::Old, pair, pair.old.as_ref())?;
        self.load_side(&mut session, Snapshot::New, pair, pair.new.as_ref())?;
        analyzer.compare(&session, &pair.label)
    }

    fn load_side(
        &self,
        session: &mut Session,
        snapshot: Snapshot,
        pair: &HeaderPair,
        source: Option<&HeaderSource>,
    ) -> Result<()> {
        let exclusions = match snapshot {
            Snapshot::Old => &self.old_exclusions,
            Snapshot::New => &self.new_exclusions,
        };
        let Some(source) = source else {
            debug!("{} has no {snapshot} version", pair.label);
            let store = session.create_context(snapshot, &pair.label);
            for name in exclusions {
                store.exclude(name.clone());
            }
            return Ok(());
        };

        let provider = match self.format {
            Some(format) => ProviderFactory::create_provider(format, &self.provider_config),
            None => ProviderFactory::create_provider_for_file(&source.path, &self.provider_config)?,
        };
        // 报告统一使用头文件对的标签
        let labeled = HeaderSource {
            label: pair.label.clone(),
            ..source.clone()
        };
        session.load(snapshot, &labeled, provider.as_ref(), exclusions)
    }
}
