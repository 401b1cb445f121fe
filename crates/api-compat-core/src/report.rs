//! 报告聚合
//!
//! 按 (头文件, API 名) 合并原子变更：描述按处理顺序逐行拼接，
//! 只要组内有任一破坏兼容的变更，整组即判定为破坏兼容。

use crate::classifier::{AtomicChange, ChangeCategory, Compatibility};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 分组后的类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GroupChangeType {
    #[serde(rename = "Compatibility Changed")]
    CompatibilityChanged,
    #[serde(rename = "Functionality Added")]
    FunctionalityAdded,
}

impl GroupChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupChangeType::CompatibilityChanged => "Compatibility Changed",
            GroupChangeType::FunctionalityAdded => "Functionality Added",
        }
    }
}

/// 每个 API 一条的最终报告记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportRecord {
    pub headerfile: String,
    pub name: String,
    pub description: String,
    pub changetype: GroupChangeType,
    pub compatibility: Compatibility,
}

impl ReportRecord {
    pub fn is_incompatible(&self) -> bool {
        self.compatibility == Compatibility::BackwardIncompatible
    }
}

#[derive(Default)]
struct Group {
    descriptions: Vec<String>,
    any_compatibility_changed: bool,
}

/// 报告聚合器
#[derive(Debug, Default, Clone, Copy)]
pub struct ReportAggregator;

impl ReportAggregator {
    pub fn new() -> Self {
        Self
    }

    /// 分组合并，输出按 (头文件, API 名) 排序
    pub fn aggregate(&self, changes: &[AtomicChange]) -> Vec<ReportRecord> {
        let mut groups: BTreeMap<(&str, &str), Group> = BTreeMap::new();

        for change in changes {
            let group = groups
                .entry((change.headerfile.as_str(), change.api_name.as_str()))
                .or_default();
            if !change.detail.is_empty() {
                group.descriptions.push(change.detail.clone());
            }
            if change.category() == ChangeCategory::CompatibilityChanged {
                group.any_compatibility_changed = true;
            }
        }

        groups
            .into_iter()
            .map(|((headerfile, name), group)| {
                let (changetype, compatibility) = if group.any_compatibility_changed {
                    (
                        GroupChangeType::CompatibilityChanged,
                        Compatibility::BackwardIncompatible,
                    )
                } else {
                    (
                        GroupChangeType::FunctionalityAdded,
                        Compatibility::BackwardCompatible,
                    )
                };
                ReportRecord {
                    headerfile: headerfile.to_string(),
                    name: name.to_string(),
                    description: group.descriptions.join("\n"),
                    changetype,
                    compatibility,
                }
            })
            .collect()
    }
}
