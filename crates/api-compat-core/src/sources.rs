//! 头文件快照来源
//!
//! 把文件系统中的两个路径或 Git 中的两个修订整理成待比较的头文件对。
//! 只在一侧出现的头文件另一侧为空，比较时表现为整体新增或删除。

use crate::error::{ApiCompatError, Result};
use crate::git::GitSnapshotReader;
use crate::provider::{HEADER_EXTENSIONS, HeaderSource};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// 一对待比较的头文件
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderPair {
    /// 报告中的 headerfile
    pub label: String,
    pub old: Option<HeaderSource>,
    pub new: Option<HeaderSource>,
}

impl HeaderPair {
    pub fn new(label: impl Into<String>, old: Option<HeaderSource>, new: Option<HeaderSource>) -> Self {
        Self {
            label: label.into(),
            old,
            new,
        }
    }

    pub fn is_one_sided(&self) -> bool {
        self.old.is_none() || self.new.is_none()
    }
}

/// 从文件系统整理头文件对
///
/// 两个路径都是文件时得到一对，标签为新文件的文件名；都是目录时递归查找
/// 扩展名在 `extensions` 中的文件，按相对路径配对。
pub fn discover_pairs(old: &Path, new: &Path, extensions: &[&str]) -> Result<Vec<HeaderPair>> {
    match (old.is_file(), new.is_file()) {
        (true, true) => {
            let label = new
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| new.to_string_lossy().into_owned());
            Ok(vec![HeaderPair::new(
                label.clone(),
                Some(HeaderSource::read(label.clone(), old)?),
                Some(HeaderSource::read(label, new)?),
            )])
        }
        (false, false) if old.is_dir() && new.is_dir() => {
            let old_files = collect_files(old, extensions)?;
            let new_files = collect_files(new, extensions)?;
            info!(
                "Found {} old and {} new files to compare",
                old_files.len(),
                new_files.len()
            );

            let mut labels: BTreeMap<String, (Option<PathBuf>, Option<PathBuf>)> = BTreeMap::new();
            for (label, path) in old_files {
                labels.entry(label).or_default().0 = Some(path);
            }
            for (label, path) in new_files {
                labels.entry(label).or_default().1 = Some(path);
            }

            labels
                .into_iter()
                .map(|(label, (old_path, new_path))| {
                    let old = old_path
                        .map(|path| HeaderSource::read(label.clone(), &path))
                        .transpose()?;
                    let new = new_path
                        .map(|path| HeaderSource::read(label.clone(), &path))
                        .transpose()?;
                    Ok(HeaderPair::new(label, old, new))
                })
                .collect()
        }
        _ => Err(ApiCompatError::ConfigError(format!(
            "--old and --new must both be files or both be directories: {} / {}",
            old.display(),
            new.display()
        ))),
    }
}

/// 递归收集文件，返回 (以 `/` 分隔的相对路径, 完整路径)，按相对路径排序
fn collect_files(root: &Path, extensions: &[&str]) -> Result<Vec<(String, PathBuf)>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            ApiCompatError::IoError(std::io::Error::other(format!(
                "Failed to walk {}: {e}",
                root.display()
            )))
        })?;
        if !entry.file_type().is_file() || !has_extension(entry.path(), extensions) {
            continue;
        }
        let relative = entry.path().strip_prefix(root).unwrap_or(entry.path());
        let label = relative
            .components()
            .map(|component| component.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");
        debug!("Discovered {label}");
        files.push((label, entry.path().to_path_buf()));
    }
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extensions.contains(&extension.to_ascii_lowercase().as_str()))
}

/// 从 Git 的两个修订整理头文件对
///
/// `path` 带头文件扩展名时只比较这一个文件，否则比较该目录下的全部头文件。
pub fn git_pairs(
    reader: &GitSnapshotReader,
    old_rev: &str,
    new_rev: &str,
    path: &Path,
) -> Result<Vec<HeaderPair>> {
    if has_extension(path, HEADER_EXTENSIONS) {
        let old = reader.read_source(old_rev, path)?;
        let new = reader.read_source(new_rev, path)?;
        return Ok(vec![HeaderPair::new(new.label.clone(), Some(old), Some(new))]);
    }

    let mut labels: BTreeMap<PathBuf, (bool, bool)> = BTreeMap::new();
    for header in reader.list_headers(old_rev, path)? {
        labels.entry(header).or_default().0 = true;
    }
    for header in reader.list_headers(new_rev, path)? {
        labels.entry(header).or_default().1 = true;
    }
    info!(
        "Comparing {} headers between {old_rev} and {new_rev}",
        labels.len()
    );

    labels
        .into_iter()
        .map(|(header, (in_old, in_new))| {
            let old = in_old
                .then(|| reader.read_source(old_rev, &header))
                .transpose()?;
            let new = in_new
                .then(|| reader.read_source(new_rev, &header))
                .transpose()?;
            let label = header.to_string_lossy().replace('\\', "/");
            Ok(HeaderPair::new(label, old, new))
        })
        .collect()
}
