//! 比较会话
//!
//! 会话按 (快照, 头文件标签) 持有声明存储。比较某个头文件前，
//! 新旧两侧的存储都必须已经创建，否则属于配置错误。

use crate::error::{ApiCompatError, Result};
use crate::provider::{DeclarationProvider, HeaderSource};
use crate::store::DeclarationStore;
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use tracing::debug;

/// 比较的一侧
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Snapshot {
    Old,
    New,
}

impl Snapshot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Snapshot::Old => "old",
            Snapshot::New => "new",
        }
    }
}

impl fmt::Display for Snapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 比较会话
#[derive(Debug, Default)]
pub struct Session {
    contexts: HashMap<(Snapshot, String), DeclarationStore>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    /// 为 (快照, 标签) 创建空存储；已存在时清空重建
    pub fn create_context(&mut self, snapshot: Snapshot, label: &str) -> &mut DeclarationStore {
        debug!("Creating {snapshot} declaration context for {label}");
        let store = self
            .contexts
            .entry((snapshot, label.to_string()))
            .or_default();
        *store = DeclarationStore::new();
        store
    }

    /// 取出已创建的存储
    pub fn context(&self, snapshot: Snapshot, label: &str) -> Result<&DeclarationStore> {
        self.contexts
            .get(&(snapshot, label.to_string()))
            .ok_or_else(|| missing_context(snapshot, label))
    }

    pub fn context_mut(&mut self, snapshot: Snapshot, label: &str) -> Result<&mut DeclarationStore> {
        self.contexts
            .get_mut(&(snapshot, label.to_string()))
            .ok_or_else(|| missing_context(snapshot, label))
    }

    pub fn has_context(&self, snapshot: Snapshot, label: &str) -> bool {
        self.contexts.contains_key(&(snapshot, label.to_string()))
    }

    /// 创建存储、登记排除名称并用提供者填充
    pub fn load(
        &mut self,
        snapshot: Snapshot,
        source: &HeaderSource,
        provider: &dyn DeclarationProvider,
        exclusions: &[String],
    ) -> Result<()> {
        let store = self.create_context(snapshot, &source.label);
        for name in exclusions {
            store.exclude(name.clone());
        }
        provider.populate(source, store)?;
        debug!(
            "Loaded {} roots into {snapshot} context for {} via {} provider",
            store.roots().len(),
            source.label,
            provider.name()
        );
        Ok(())
    }

    /// 会话中出现过的全部头文件标签，已排序去重
    pub fn labels(&self) -> Vec<&str> {
        let labels: BTreeSet<&str> = self
            .contexts
            .keys()
            .map(|(_, label)| label.as_str())
            .collect();
        labels.into_iter().collect()
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contexts.is_empty()
    }
}

fn missing_context(snapshot: Snapshot, label: &str) -> ApiCompatError {
    ApiCompatError::ConfigError(format!(
        "No declaration context was created for {label} ({snapshot} snapshot)"
    ))
}
