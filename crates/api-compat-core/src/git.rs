//! Git 仓库中的头文件快照
//!
//! 按修订读取头文件内容、列出目录下的头文件，用于比较两个修订之间的 API。

use crate::error::{ApiCompatError, Result};
use crate::provider::{HEADER_EXTENSIONS, HeaderSource};
use gix::ThreadSafeRepository;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Git 快照读取器
pub struct GitSnapshotReader {
    repo: ThreadSafeRepository,
    repo_path: PathBuf,
}

impl GitSnapshotReader {
    /// 打开仓库
    pub fn new(repo_path: PathBuf) -> Result<Self> {
        let repo = ThreadSafeRepository::open(repo_path.clone()).map_err(|e| {
            ApiCompatError::GitError(format!(
                "Failed to open repository at {}: {}",
                repo_path.display(),
                e
            ))
        })?;

        Ok(Self { repo, repo_path })
    }

    pub fn repo_path(&self) -> &Path {
        &self.repo_path
    }

    /// 读取 `path` 在修订 `rev` 中的内容
    pub fn read_header(&self, rev: &str, path: &Path) -> Result<Vec<u8>> {
        let repo = self.repo.to_thread_local();
        let tree = self.resolve_tree(&repo, rev)?;

        let entry = tree
            .lookup_entry_by_path(path)
            .map_err(|e| {
                ApiCompatError::GitError(format!(
                    "Failed to look up {} at {rev}: {e}",
                    path.display()
                ))
            })?
            .ok_or_else(|| {
                ApiCompatError::GitError(format!("{} does not exist at {rev}", path.display()))
            })?;

        if !entry.mode().is_blob() {
            return Err(ApiCompatError::GitError(format!(
                "{} is not a file at {rev}",
                path.display()
            )));
        }

        let blob = entry
            .object()
            .map_err(|e| ApiCompatError::GitError(format!("Failed to find blob: {e}")))?;
        debug!("Read {} ({} bytes) at {rev}", path.display(), blob.data.len());
        Ok(blob.data.clone())
    }

    /// 读取为 [`HeaderSource`]，标签取仓库内的相对路径
    pub fn read_source(&self, rev: &str, path: &Path) -> Result<HeaderSource> {
        let bytes = self.read_header(rev, path)?;
        let label = path.to_string_lossy().replace('\\', "/");
        Ok(HeaderSource::new(
            label,
            path,
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    }

    /// 列出修订 `rev` 中 `dir` 下（递归）的全部头文件，按路径排序
    pub fn list_headers(&self, rev: &str, dir: &Path) -> Result<Vec<PathBuf>> {
        let repo = self.repo.to_thread_local();
        let tree = self.resolve_tree(&repo, rev)?;

        let files = tree
            .traverse()
            .breadthfirst
            .files()
            .map_err(|e| ApiCompatError::GitError(format!("Failed to traverse tree: {e}")))?;

        let mut headers: Vec<PathBuf> = files
            .into_iter()
            .filter(|entry| entry.mode.is_blob())
            .map(|entry| PathBuf::from(entry.filepath.to_string()))
            .filter(|path| dir.as_os_str().is_empty() || path.starts_with(dir))
            .filter(|path| is_header(path))
            .collect();
        headers.sort();

        debug!(
            "Found {} headers under '{}' at {rev}",
            headers.len(),
            dir.display()
        );
        Ok(headers)
    }

    fn resolve_tree<'repo>(&self, repo: &'repo gix::Repository, rev: &str) -> Result<gix::Tree<'repo>> {
        validate_revision(rev)?;

        let id = repo.rev_parse_single(rev).map_err(|e| {
            ApiCompatError::InvalidRevision(format!("Failed to resolve revision {rev}: {e}"))
        })?;
        let object = id
            .object()
            .map_err(|e| ApiCompatError::GitError(format!("Failed to find object {rev}: {e}")))?;
        object.peel_to_tree().map_err(|e| {
            ApiCompatError::InvalidRevision(format!("Revision {rev} does not name a tree: {e}"))
        })
    }
}

/// 只接受单个修订；区间与空白会被拒绝
pub fn validate_revision(rev: &str) -> Result<()> {
    if rev.trim().is_empty() {
        return Err(ApiCompatError::InvalidRevision("Empty revision".to_string()));
    }
    if rev.chars().any(char::is_whitespace) {
        return Err(ApiCompatError::InvalidRevision(format!(
            "Revision must not contain whitespace: {rev:?}"
        )));
    }
    if rev.contains("..") {
        return Err(ApiCompatError::InvalidRevision(format!(
            "Revision ranges are not supported: {rev}"
        )));
    }
    Ok(())
}

/// 按扩展名判断是否为头文件
pub fn is_header(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| {
            HEADER_EXTENSIONS.contains(&extension.to_ascii_lowercase().as_str())
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    fn git(repo_path: &Path, args: &[&str]) -> String {
        let output = Command::new("git")
            .args(args)
            .current_dir(repo_path)
            .output()
            .expect("Failed to run git");
        assert!(
            output.status.success(),
            "git {args:?} failed: {}",
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    }

    /// 创建一个临时的 Git 仓库用于测试
    fn create_test_repo() -> (TempDir, PathBuf) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let repo_path = temp_dir.path().to_path_buf();
        git(&repo_path, &["init", "-q"]);
        git(&repo_path, &["config", "user.name", "Test User"]);
        git(&repo_path, &["config", "user.email", "test@example.com"]);
        (temp_dir, repo_path)
    }

    fn commit_file(repo_path: &Path, file_name: &str, content: &str) -> String {
        let file_path = repo_path.join(file_name);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create directories");
        }
        std::fs::write(&file_path, content).expect("Failed to write file");
        git(repo_path, &["add", file_name]);
        git(repo_path, &["commit", "-q", "-m", &format!("Update {file_name}")]);
        git(repo_path, &["rev-parse", "HEAD"])
    }

    #[test]
    fn test_open_invalid_repository() {
        let result = GitSnapshotReader::new(PathBuf::from("/nonexistent/path"));
        assert!(matches!(result, Err(ApiCompatError::GitError(_))));
    }

    #[test]
    fn test_read_header_at_two_revisions() {
        let (_temp_dir, repo_path) = create_test_repo();
        let first = commit_file(&repo_path, "include/api.h", "int open_device(int flags);\n");
        let second = commit_file(&repo_path, "include/api.h", "int open_device(long flags);\n");

        let reader = GitSnapshotReader::new(repo_path).unwrap();
        let old = reader.read_header(&first, Path::new("include/api.h")).unwrap();
        let new = reader.read_header(&second, Path::new("include/api.h")).unwrap();

        assert_eq!(old, b"int open_device(int flags);\n");
        assert_eq!(new, b"int open_device(long flags);\n");

        let source = reader.read_source("HEAD", Path::new("include/api.h")).unwrap();
        assert_eq!(source.label, "include/api.h");
        assert!(source.contents.contains("long flags"));
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let (_temp_dir, repo_path) = create_test_repo();
        commit_file(&repo_path, "api.h", "int a;\n");

        let reader = GitSnapshotReader::new(repo_path).unwrap();
        let result = reader.read_header("HEAD", Path::new("missing.h"));
        assert!(matches!(result, Err(ApiCompatError::GitError(_))));
    }

    #[test]
    fn test_list_headers_filters_by_directory_and_extension() {
        let (_temp_dir, repo_path) = create_test_repo();
        commit_file(&repo_path, "include/b.hpp", "int b;\n");
        commit_file(&repo_path, "include/nested/a.h", "int a;\n");
        commit_file(&repo_path, "include/readme.txt", "docs\n");
        commit_file(&repo_path, "src/impl.h", "int hidden;\n");

        let reader = GitSnapshotReader::new(repo_path).unwrap();
        let headers = reader.list_headers("HEAD", Path::new("include")).unwrap();

        assert_eq!(
            headers,
            vec![
                PathBuf::from("include/b.hpp"),
                PathBuf::from("include/nested/a.h")
            ]
        );
        assert_eq!(reader.list_headers("HEAD", Path::new("")).unwrap().len(), 3);
    }

    #[test]
    fn test_revision_validation() {
        assert!(validate_revision("HEAD~1").is_ok());
        assert!(validate_revision("v1.2.0").is_ok());
        assert!(matches!(
            validate_revision(""),
            Err(ApiCompatError::InvalidRevision(_))
        ));
        assert!(matches!(
            validate_revision("main..feature"),
            Err(ApiCompatError::InvalidRevision(_))
        ));
        assert!(matches!(
            validate_revision("HEAD 1"),
            Err(ApiCompatError::InvalidRevision(_))
        ));
    }

    #[test]
    fn test_unknown_revision_is_invalid() {
        let (_temp_dir, repo_path) = create_test_repo();
        commit_file(&repo_path, "api.h", "int a;\n");

        let reader = GitSnapshotReader::new(repo_path).unwrap();
        let result = reader.read_header("no-such-branch", Path::new("api.h"));
        assert!(matches!(result, Err(ApiCompatError::InvalidRevision(_))));
    }

    #[test]
    fn test_is_header() {
        assert!(is_header(Path::new("a/b.H")));
        assert!(is_header(Path::new("x.inl")));
        assert!(!is_header(Path::new("x.cpp")));
        assert!(!is_header(Path::new("Makefile")));
    }
}
