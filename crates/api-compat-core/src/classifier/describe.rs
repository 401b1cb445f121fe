//! 非函数条目的描述生成
//!
//! 递归遍历条目，每个叶子级变化输出一行。

use super::{attribute_phrase, inline_text, removed_added_pair};
use crate::diff::{Attribute, DiffEntry, Tag};
use crate::node::{NodeKind, leaf_segment, scope_stem};
use std::collections::{BTreeMap, VecDeque};

/// (限定名, 种类名) 排序键
type EntryKey<'e> = (&'e str, &'static str);

/// 生成条目的多行描述；遍历无结果时退回 `"<kind> <tag>: '<name>'"`
pub(super) fn describe(entry: &DiffEntry) -> String {
    let mut lines = Vec::new();
    describe_entry(entry, &mut lines);
    if lines.is_empty() {
        return format!(
            "{} {}: '{}'",
            entry.node_type,
            entry.tag_str(),
            entry.qualified_name
        );
    }
    lines.join("\n")
}

fn describe_entry(entry: &DiffEntry, lines: &mut Vec<String>) {
    match entry.tag {
        Some(tag @ (Tag::Added | Tag::Removed)) => {
            lines.push(presence_line(entry, tag));
            describe_subtree(entry, Some(tag), lines);
        }
        Some(Tag::Modified) => describe_modified(entry, lines),
        None => {}
    }
}

/// 列举新增/删除容器下的子节点；子节点没有标记时沿用父节点的标记
fn describe_subtree(entry: &DiffEntry, inherited: Option<Tag>, lines: &mut Vec<String>) {
    for child in &entry.children {
        let effective = child.tag.or(inherited);
        match effective {
            Some(tag @ (Tag::Added | Tag::Removed)) => lines.push(presence_line(child, tag)),
            Some(Tag::Modified) => {
                describe_modified(child, lines);
                continue;
            }
            None if child.data_type.is_empty() => lines.push(format!(
                "{} present: '{}'",
                child.node_type, child.qualified_name
            )),
            None => lines.push(format!(
                "{} present: '{}' (type '{}')",
                child.node_type, child.qualified_name, child.data_type
            )),
        }
        if !child.children.is_empty() {
            describe_subtree(child, effective, lines);
        }
    }
}

fn describe_modified(entry: &DiffEntry, lines: &mut Vec<String>) {
    if let Some(line) = attribute_line(entry) {
        lines.push(line);
        return;
    }

    // 同名条目（如重载方法）按出现顺序排队，逐个配对
    let mut removed_items: BTreeMap<EntryKey<'_>, Vec<&DiffEntry>> = BTreeMap::new();
    let mut added_items: BTreeMap<EntryKey<'_>, VecDeque<&DiffEntry>> = BTreeMap::new();

    for child in &entry.children {
        let key = (child.qualified_name.as_str(), child.node_type.as_str());
        match child.tag {
            Some(Tag::Removed) => removed_items.entry(key).or_default().push(child),
            Some(Tag::Added) => added_items.entry(key).or_default().push_back(child),
            Some(Tag::Modified) => describe_modified(child, lines),
            None => {}
        }
    }

    for (key, removed_group) in &removed_items {
        for removed in removed_group {
            if let Some(added) = added_items.get_mut(key).and_then(VecDeque::pop_front) {
                pair_lines(removed, added, lines);
                continue;
            }

            if removed.node_type == NodeKind::Parameter {
                let stem = scope_stem(&removed.qualified_name);
                let partner = added_items
                    .values_mut()
                    .find(|queue| {
                        queue.front().is_some_and(|added| {
                            added.node_type == NodeKind::Parameter
                                && scope_stem(&added.qualified_name) == stem
                        })
                    })
                    .and_then(VecDeque::pop_front);
                if let Some(added) = partner {
                    lines.push(relaxed_parameter_line(stem, removed, added));
                    continue;
                }
            }

            lines.push(presence_line(removed, Tag::Removed));
        }
    }

    for added in added_items.values().flatten() {
        lines.push(presence_line(added, Tag::Added));
    }
}

/// 同一作用域内名称不同的参数配对；类型未变时按改名描述
fn relaxed_parameter_line(stem: &str, removed: &DiffEntry, added: &DiffEntry) -> String {
    if removed.data_type.is_empty() || added.data_type.is_empty() {
        return format!("Parameter modified: '{stem}'");
    }
    if removed.data_type == added.data_type {
        return format!(
            "Parameter renamed from '{}' to '{}' (type '{}')",
            leaf_segment(&removed.qualified_name),
            leaf_segment(&added.qualified_name),
            removed.data_type
        );
    }
    format!(
        "Parameter modified: '{stem}' type changed from '{}' to '{}'",
        removed.data_type, added.data_type
    )
}

/// 非类型属性的变化条目单独成行
fn attribute_line(entry: &DiffEntry) -> Option<String> {
    let attribute = entry.attribute.filter(|attribute| *attribute != Attribute::DataType)?;
    let (removed, added) = removed_added_pair(entry);
    let subject = format!("{} '{}'", entry.node_type, entry.qualified_name);
    if attribute == Attribute::Hash {
        return Some(format!("{subject} body changed"));
    }
    Some(attribute_phrase(
        &subject,
        attribute.label(),
        removed.map(DiffEntry::value_str).unwrap_or_default(),
        added.map(DiffEntry::value_str).unwrap_or_default(),
    ))
}

/// 同名同种类的 removed/added 快照
fn pair_lines(removed: &DiffEntry, added: &DiffEntry, lines: &mut Vec<String>) {
    let display_name = if removed.node_type == NodeKind::ReturnType {
        scope_stem(&removed.qualified_name)
    } else {
        removed.qualified_name.as_str()
    };
    let subject = format!("{} '{display_name}'", removed.node_type);

    if removed.is_function_snapshot() || added.is_function_snapshot() {
        let fields = [
            (
                Attribute::StorageClass,
                removed.storage_qualifier.as_deref().unwrap_or_default(),
                added.storage_qualifier.as_deref().unwrap_or_default(),
            ),
            (
                Attribute::CallingConvention,
                removed
                    .function_calling_convention
                    .as_deref()
                    .unwrap_or_default(),
                added
                    .function_calling_convention
                    .as_deref()
                    .unwrap_or_default(),
            ),
            (
                Attribute::Inline,
                inline_text(Some(removed)),
                inline_text(Some(added)),
            ),
        ];
        lines.extend(
            fields
                .into_iter()
                .filter(|(_, before, after)| before != after)
                .map(|(attribute, before, after)| {
                    attribute_phrase(&subject, attribute.as_str(), before, after)
                }),
        );
        return;
    }

    if !removed.data_type.is_empty() && !added.data_type.is_empty() {
        lines.push(format!(
            "{subject} type changed from '{}' to '{}'",
            removed.data_type, added.data_type
        ));
    } else {
        lines.push(format!(
            "{} modified: '{display_name}'",
            removed.node_type
        ));
    }
}

/// `"<kind> added: '<name>'"`，有类型时附加 `with type '<type>'`
fn presence_line(entry: &DiffEntry, tag: Tag) -> String {
    if entry.data_type.is_empty() {
        format!(
            "{} {}: '{}'",
            entry.node_type,
            tag.as_str(),
            entry.qualified_name
        )
    } else {
        format!(
            "{} {}: '{}' with type '{}'",
            entry.node_type,
            tag.as_str(),
            entry.qualified_name,
            entry.data_type
        )
    }
}
