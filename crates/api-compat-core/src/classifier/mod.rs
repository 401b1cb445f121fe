//! 变更分类
//!
//! 遍历差异树，为每个受影响的 API 生成可读的原子变更，并按统一规则
//! 判定兼容性：只有顶层新增是向后兼容的，其余一律视为破坏兼容。

mod describe;
mod function;

#[cfg(test)]
mod tests;

use crate::diff::{DiffEntry, Tag};
use crate::node::NodeKind;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// 原子变更的原始类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    Added,
    Removed,
    Modified,
    AttrChanged,
    Unknown,
}

impl From<Option<Tag>> for ChangeKind {
    fn from(tag: Option<Tag>) -> Self {
        match tag {
            Some(Tag::Added) => ChangeKind::Added,
            Some(Tag::Removed) => ChangeKind::Removed,
            Some(Tag::Modified) => ChangeKind::Modified,
            None => ChangeKind::Unknown,
        }
    }
}

/// 变更类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeCategory {
    #[serde(rename = "Functionality_changed")]
    FunctionalityChanged,
    #[serde(rename = "Compatibility_changed")]
    CompatibilityChanged,
}

impl ChangeCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeCategory::FunctionalityChanged => "Functionality_changed",
            ChangeCategory::CompatibilityChanged => "Compatibility_changed",
        }
    }
}

/// 兼容性结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Compatibility {
    BackwardCompatible,
    BackwardIncompatible,
}

impl Compatibility {
    pub fn as_str(&self) -> &'static str {
        match self {
            Compatibility::BackwardCompatible => "backward_compatible",
            Compatibility::BackwardIncompatible => "backward_incompatible",
        }
    }
}

/// 一条不可再分的 API 变更
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtomicChange {
    pub headerfile: String,
    pub api_name: String,
    pub detail: String,
    pub raw_change: ChangeKind,
    /// 是否为根级新增
    pub top_level: bool,
}

/// 未分组的报告行
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeRow {
    pub headerfile: String,
    pub name: String,
    pub description: String,
    pub changetype: ChangeCategory,
    pub compatibility: Compatibility,
}

impl AtomicChange {
    /// 只有根级新增属于功能变化，其余都影响兼容性
    pub fn category(&self) -> ChangeCategory {
        if self.raw_change == ChangeKind::Added && self.top_level {
            ChangeCategory::FunctionalityChanged
        } else {
            ChangeCategory::CompatibilityChanged
        }
    }

    pub fn compatibility(&self) -> Compatibility {
        match self.category() {
            ChangeCategory::FunctionalityChanged => Compatibility::BackwardCompatible,
            ChangeCategory::CompatibilityChanged => Compatibility::BackwardIncompatible,
        }
    }

    /// 转换为报告行
    pub fn to_row(&self) -> ChangeRow {
        ChangeRow {
            headerfile: self.headerfile.clone(),
            name: self.api_name.clone(),
            description: self.detail.clone(),
            changetype: self.category(),
            compatibility: self.compatibility(),
        }
    }
}

/// 差异树分类器
#[derive(Debug, Default, Clone, Copy)]
pub struct ChangeClassifier;

impl ChangeClassifier {
    pub fn new() -> Self {
        Self
    }

    /// 将差异树转换为原子变更列表，`label` 作为每条变更的头文件名
    pub fn classify(&self, tree: &[DiffEntry], label: &str) -> Vec<AtomicChange> {
        let mut changes = Vec::new();

        for entry in tree {
            let api_name = if entry.qualified_name.is_empty() {
                "Unknown"
            } else {
                entry.qualified_name.as_str()
            };
            let change = |detail: String, raw_change: ChangeKind, top_level: bool| AtomicChange {
                headerfile: label.to_string(),
                api_name: api_name.to_string(),
                detail,
                raw_change,
                top_level,
            };

            if entry.node_type != NodeKind::Function {
                changes.push(change(
                    describe::describe(entry),
                    ChangeKind::from(entry.tag),
                    entry.has_tag(Tag::Added),
                ));
                continue;
            }

            match entry.tag {
                Some(Tag::Added) => {
                    changes.push(change("Function added".to_string(), ChangeKind::Added, true))
                }
                Some(Tag::Removed) => changes.push(change(
                    "Function removed".to_string(),
                    ChangeKind::Removed,
                    false,
                )),
                _ => {
                    let mut rows = function::function_changes(entry);
                    if rows.is_empty() {
                        rows.push((ChangeKind::Modified, "Function modified".to_string()));
                    }
                    changes.extend(
                        rows.into_iter()
                            .map(|(raw_change, detail)| change(detail, raw_change, false)),
                    );
                }
            }
        }

        debug!("Classified {} diff entries into {} changes", tree.len(), changes.len());
        changes
    }
}

/// 属性变化的描述短语：一侧为空时用 added/removed 措辞
fn attribute_phrase(subject: &str, attribute: &str, before: &str, after: &str) -> String {
    if !before.is_empty() && after.is_empty() {
        format!("{subject} {attribute} removed '{before}'")
    } else if before.is_empty() && !after.is_empty() {
        format!("{subject} {attribute} added '{after}'")
    } else {
        format!("{subject} {attribute} changed from '{before}' to '{after}'")
    }
}

/// 取出 `modified` 条目下的 removed/added 快照（各取最后一个）
fn removed_added_pair(entry: &DiffEntry) -> (Option<&DiffEntry>, Option<&DiffEntry>) {
    let mut removed = None;
    let mut added = None;
    for child in &entry.children {
        match child.tag {
            Some(Tag::Removed) => removed = Some(child),
            Some(Tag::Added) => added = Some(child),
            _ => {}
        }
    }
    (removed, added)
}

/// 函数快照中 inline 标志的文本形式；缺失时为空串
fn inline_text(entry: Option<&DiffEntry>) -> &'static str {
    match entry.and_then(|snapshot| snapshot.inline) {
        Some(true) => "true",
        Some(false) => "false",
        None => "",
    }
}
