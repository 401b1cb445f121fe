//! 命令行接口模块
//!
//! 提供命令行参数解析和参数校验

use api_compat_core::{ApiCompatError, InputFormat, Result};
use clap::{Parser, ValueEnum};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// api-compat - C/C++ 头文件 API 兼容性检查工具
#[derive(Parser, Debug)]
#[command(name = "api-compat")]
#[command(author = "api-compat contributors")]
#[command(version = "0.1.0")]
#[command(about = "Compare two versions of C/C++ headers and report API/ABI compatibility changes")]
#[command(
    long_about = "api-compat extracts declarations from two snapshots of C/C++ headers, diffs them structurally by qualified name and reports every changed API as backward compatible (functionality added) or backward incompatible."
)]
pub struct Cli {
    /// 旧版本头文件或目录
    #[arg(long = "old", value_name = "PATH", help = "Old header file or directory")]
    pub old: PathBuf,

    /// 新版本头文件或目录
    #[arg(long = "new", value_name = "PATH", help = "New header file or directory")]
    pub new: PathBuf,

    /// 输入格式
    #[arg(
        short = 'f',
        long = "format",
        value_enum,
        help = "Input format; detected from the file extension when omitted"
    )]
    pub format: Option<InputFormatArg>,

    /// Git 仓库路径
    #[arg(
        short = 'r',
        long = "repo",
        value_name = "PATH",
        help = "Read --old/--new from a Git repository instead of the file system"
    )]
    pub repo: Option<PathBuf>,

    #[arg(long = "old-rev", value_name = "REV", help = "Revision holding the old headers")]
    pub old_rev: Option<String>,

    #[arg(long = "new-rev", value_name = "REV", help = "Revision holding the new headers")]
    pub new_rev: Option<String>,

    /// 旧版本排除列表文件
    #[arg(
        long = "exclude-old",
        value_name = "FILE",
        help = "File listing qualified names to ignore in the old snapshot"
    )]
    pub exclude_old: Option<PathBuf>,

    /// 新版本排除列表文件
    #[arg(
        long = "exclude-new",
        value_name = "FILE",
        help = "File listing qualified names to ignore in the new snapshot"
    )]
    pub exclude_new: Option<PathBuf>,

    /// 两侧都排除的限定名
    #[arg(
        short = 'x',
        long = "exclude",
        value_name = "NAME",
        help = "Qualified name to ignore in both snapshots (repeatable)"
    )]
    pub exclude: Vec<String>,

    /// 预定义宏
    #[arg(
        short = 'D',
        long = "define",
        value_name = "NAME[=VALUE]",
        help = "Predefine a macro for conditional compilation (repeatable)"
    )]
    pub defines: Vec<String>,

    #[arg(long = "html", value_name = "FILE", help = "Write an HTML report")]
    pub html: Option<PathBuf>,

    #[arg(long = "json", value_name = "FILE", help = "Write a JSON report")]
    pub json: Option<PathBuf>,

    #[arg(
        long = "dump-diff",
        value_name = "FILE",
        help = "Write the raw structural diff tree as JSON"
    )]
    pub dump_diff: Option<PathBuf>,

    /// 并发线程数
    #[arg(
        short = 'j',
        long = "jobs",
        value_name = "N",
        help = "Number of headers compared in parallel (defaults to the CPU count)",
        value_parser = clap::value_parser!(u16).range(1..)
    )]
    pub jobs: Option<u16>,

    #[arg(
        long = "fail-on-incompatible",
        help = "Exit with status 2 when any backward incompatible change is found"
    )]
    pub fail_on_incompatible: bool,

    /// 详细输出
    #[arg(short = 'v', long = "verbose", help = "Enable verbose logging output")]
    pub verbose: bool,
}

/// 输入格式命令行参数
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum InputFormatArg {
    /// C/C++ 头文件
    #[value(name = "header")]
    Header,
    /// 声明快照 JSON
    #[value(name = "snapshot")]
    Snapshot,
}

impl From<InputFormatArg> for InputFormat {
    fn from(arg: InputFormatArg) -> Self {
        match arg {
            InputFormatArg::Header => InputFormat::Header,
            InputFormatArg::Snapshot => InputFormat::Snapshot,
        }
    }
}

/// Git 读取参数
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitOptions {
    pub repo: PathBuf,
    pub old_rev: String,
    pub new_rev: String,
}

/// 应用程序配置信息
#[derive(Debug, Clone)]
pub struct Config {
    pub old: PathBuf,
    pub new: PathBuf,
    pub format: Option<InputFormat>,
    pub git: Option<GitOptions>,
    pub exclude_old: Option<PathBuf>,
    pub exclude_new: Option<PathBuf>,
    pub exclude: Vec<String>,
    pub predefined_macros: BTreeMap<String, String>,
    pub html: Option<PathBuf>,
    pub json: Option<PathBuf>,
    pub dump_diff: Option<PathBuf>,
    /// 0 表示使用 CPU 核数
    pub jobs: usize,
    pub fail_on_incompatible: bool,
    pub verbose: bool,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let git = match (cli.repo, cli.old_rev, cli.new_rev) {
            (Some(repo), Some(old_rev), Some(new_rev)) => Some(GitOptions {
                repo,
                old_rev,
                new_rev,
            }),
            _ => None,
        };
        let predefined_macros = cli
            .defines
            .iter()
            .filter_map(|define| parse_define(define).ok())
            .collect();

        Config {
            old: cli.old,
            new: cli.new,
            format: cli.format.map(Into::into),
            git,
            exclude_old: cli.exclude_old,
            exclude_new: cli.exclude_new,
            exclude: cli.exclude,
            predefined_macros,
            html: cli.html,
            json: cli.json,
            dump_diff: cli.dump_diff,
            jobs: cli.jobs.map(usize::from).unwrap_or(0),
            fail_on_incompatible: cli.fail_on_incompatible,
            verbose: cli.verbose,
        }
    }
}

impl Cli {
    /// 解析命令行参数
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// 验证参数的有效性
    pub fn validate(&self) -> Result<()> {
        let git_flags = [
            self.repo.is_some(),
            self.old_rev.is_some(),
            self.new_rev.is_some(),
        ];
        let git_mode = git_flags.iter().all(|flag| *flag);
        if !git_mode && git_flags.iter().any(|flag| *flag) {
            return Err(ApiCompatError::ConfigError(
                "--repo, --old-rev and --new-rev must be given together".to_string(),
            ));
        }

        if let Some(repo) = &self.repo {
            require_exists(repo, "Repository path")?;
        }
        if let (Some(old_rev), Some(new_rev)) = (&self.old_rev, &self.new_rev) {
            api_compat_core::git::validate_revision(old_rev)?;
            api_compat_core::git::validate_revision(new_rev)?;
        }
        if !git_mode {
            require_exists(&self.old, "Old path")?;
            require_exists(&self.new, "New path")?;
        }

        for file in [&self.exclude_old, &self.exclude_new].into_iter().flatten() {
            require_exists(file, "Exclusion file")?;
        }
        for define in &self.defines {
            parse_define(define)?;
        }

        // 验证并创建输出文件路径
        for output_file in [&self.html, &self.json, &self.dump_diff].into_iter().flatten() {
            if let Some(parent) = output_file.parent() {
                // 只有当父目录不是空路径时才检查和创建
                if !parent.as_os_str().is_empty() && !parent.exists() {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        ApiCompatError::IoError(std::io::Error::new(
                            e.kind(),
                            format!(
                                "Failed to create output directory {}: {}",
                                parent.display(),
                                e
                            ),
                        ))
                    })?;
                }
            }
        }

        Ok(())
    }
}

fn require_exists(path: &Path, what: &str) -> Result<()> {
    if path.exists() {
        return Ok(());
    }
    Err(ApiCompatError::IoError(std::io::Error::new(
        std::io::ErrorKind::NotFound,
        format!("{what} does not exist: {}", path.display()),
    )))
}

/// 解析 `NAME` 或 `NAME=VALUE`；只有名称时值为 `1`
pub fn parse_define(define: &str) -> Result<(String, String)> {
    let (name, value) = match define.split_once('=') {
        Some((name, value)) => (name.trim(), value.trim()),
        None => (define.trim(), "1"),
    };
    let valid = name
        .chars()
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
        && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if !valid {
        return Err(ApiCompatError::ConfigError(format!(
            "Invalid macro definition: {define}"
        )));
    }
    Ok((name.to_string(), value.to_string()))
}

/// 排除列表：每行一个限定名，忽略空行与 `#` 注释
pub fn parse_exclusions(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| line.split('#').next().unwrap_or("").trim())
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// 读取排除列表文件
pub fn load_exclusions(path: &Path) -> Result<Vec<String>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        ApiCompatError::IoError(std::io::Error::new(
            e.kind(),
            format!("Failed to read exclusion file {}: {}", path.display(), e),
        ))
    })?;
    Ok(parse_exclusions(&text))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["api-compat"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("arguments should parse")
    }

    #[test]
    fn test_parse_define() {
        assert_eq!(
            parse_define("USE_SSL").unwrap(),
            ("USE_SSL".to_string(), "1".to_string())
        );
        assert_eq!(
            parse_define("API_LEVEL=3").unwrap(),
            ("API_LEVEL".to_string(), "3".to_string())
        );
        assert_eq!(
            parse_define("EMPTY=").unwrap(),
            ("EMPTY".to_string(), String::new())
        );
        assert!(parse_define("3D=1").is_err());
        assert!(parse_define("").is_err());
    }

    #[test]
    fn test_parse_exclusions() {
        let text = "# internal types\nDetail::Cache\n\n  Impl  # trailing note\n";
        assert_eq!(parse_exclusions(text), vec!["Detail::Cache", "Impl"]);
    }

    #[test]
    fn test_config_from_cli() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        let parsed = cli(&[
            "--old", &path, "--new", &path, "-D", "USE_SSL", "-D", "LEVEL=2", "-x", "Impl",
            "--jobs", "3", "--format", "snapshot",
        ]);
        assert!(parsed.validate().is_ok());

        let config: Config = parsed.into();
        assert_eq!(config.format, Some(InputFormat::Snapshot));
        assert_eq!(config.jobs, 3);
        assert_eq!(config.exclude, vec!["Impl"]);
        assert_eq!(config.predefined_macros.get("USE_SSL").map(String::as_str), Some("1"));
        assert_eq!(config.predefined_macros.get("LEVEL").map(String::as_str), Some("2"));
        assert!(config.git.is_none());
    }

    #[test]
    fn test_validate_rejects_missing_paths() {
        let parsed = cli(&["--old", "/nonexistent/old.h", "--new", "/nonexistent/new.h"]);
        assert!(matches!(parsed.validate(), Err(ApiCompatError::IoError(_))));
    }

    #[test]
    fn test_validate_requires_complete_git_options() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        let parsed = cli(&["--old", "a.h", "--new", "a.h", "--repo", &path, "--old-rev", "HEAD"]);
        assert!(matches!(parsed.validate(), Err(ApiCompatError::ConfigError(_))));

        let parsed = cli(&[
            "--old", "a.h", "--new", "a.h", "--repo", &path, "--old-rev", "HEAD~1",
            "--new-rev", "HEAD",
        ]);
        assert!(parsed.validate().is_ok());
        let config: Config = parsed.into();
        assert_eq!(config.git.unwrap().old_rev, "HEAD~1");
    }

    #[test]
    fn test_validate_creates_output_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().to_string_lossy().to_string();
        let report = dir.path().join("reports/nested/report.html");
        let parsed = cli(&[
            "--old",
            &path,
            "--new",
            &path,
            "--html",
            &report.to_string_lossy(),
        ]);

        assert!(parsed.validate().is_ok());
        assert!(dir.path().join("reports/nested").is_dir());
    }

    #[test]
    fn test_jobs_must_be_positive() {
        let result = Cli::try_parse_from(["api-compat", "--old", "a", "--new", "b", "--jobs", "0"]);
        assert!(result.is_err());
    }
}
