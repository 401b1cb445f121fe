//! api-compat - C/C++ 头文件 API 兼容性检查工具
//!
//! 比较两个版本的头文件，输出每个 API 的兼容性变化。

mod cli;

use api_compat_core::provider::HEADER_EXTENSIONS;
use api_compat_core::{
    ApiCompatError, ConcurrentComparator, DiffEntry, FormatterConfig, GitSnapshotReader, HeaderPair,
    HeaderProviderConfig, OutputFormat, OutputRenderer, Result, discover_pairs, git_pairs,
    render_diff_tree,
};
use cli::{Cli, Config, GitOptions, load_exclusions};
use std::process::ExitCode;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

/// 运行结果摘要，决定退出码
struct Outcome {
    failed_headers: usize,
    incompatible_records: usize,
}

fn main() -> ExitCode {
    // 解析命令行参数
    let cli = Cli::parse_args();

    // 初始化日志记录：RUST_LOG 优先，-v 把默认级别提高到 debug
    let default_level = if cli.verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    // 验证参数
    if let Err(e) = cli.validate() {
        error!("Invalid arguments: {e}");
        return ExitCode::from(1);
    }

    let config: Config = cli.into();
    debug!("Configuration: {config:?}");

    match run(&config) {
        Ok(outcome) if outcome.failed_headers > 0 => {
            error!("{} headers could not be compared", outcome.failed_headers);
            ExitCode::from(1)
        }
        Ok(outcome) if config.fail_on_incompatible && outcome.incompatible_records > 0 => {
            info!(
                "{} backward incompatible APIs found",
                outcome.incompatible_records
            );
            ExitCode::from(2)
        }
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Application error: {e}");
            ExitCode::from(1)
        }
    }
}

/// 主要应用逻辑
fn run(config: &Config) -> Result<Outcome> {
    let pairs = collect_pairs(config)?;
    if pairs.is_empty() {
        info!("No headers found to compare");
    }

    let mut old_exclusions = match &config.exclude_old {
        Some(path) => load_exclusions(path)?,
        None => Vec::new(),
    };
    let mut new_exclusions = match &config.exclude_new {
        Some(path) => load_exclusions(path)?,
        None => Vec::new(),
    };
    old_exclusions.extend(config.exclude.iter().cloned());
    new_exclusions.extend(config.exclude.iter().cloned());

    let comparator = ConcurrentComparator::new()
        .with_thread_pool_size(config.jobs)
        .with_format(config.format)
        .with_provider_config(HeaderProviderConfig {
            predefined_macros: config.predefined_macros.clone(),
        })
        .with_exclusions(old_exclusions, new_exclusions);
    let result = comparator.compare(&pairs)?;

    for (label, failure) in &result.failed {
        error!("{label}: {failure}");
    }

    if let Some(path) = &config.dump_diff {
        let tree: Vec<DiffEntry> = result
            .reports
            .iter()
            .flat_map(|report| report.diff.iter().cloned())
            .collect();
        std::fs::write(path, render_diff_tree(&tree)?)?;
        info!("Diff tree written to {}", path.display());
    }

    let records = result.records();
    let mut wrote_report = false;
    for (path, format) in [(&config.html, OutputFormat::Html), (&config.json, OutputFormat::Json)] {
        if let Some(path) = path {
            let output = OutputRenderer::new(FormatterConfig::for_format(format)).render(&records)?;
            output.save_to_file(path)?;
            info!("{format:?} report written to {}", path.display());
            wrote_report = true;
        }
    }
    if !wrote_report {
        let output =
            OutputRenderer::new(FormatterConfig::for_format(OutputFormat::PlainText)).render(&records)?;
        print!("{}", output.content);
    }

    Ok(Outcome {
        failed_headers: result.failed.len(),
        incompatible_records: records.iter().filter(|record| record.is_incompatible()).count(),
    })
}

/// 整理待比较的头文件对
fn collect_pairs(config: &Config) -> Result<Vec<HeaderPair>> {
    match &config.git {
        Some(git) => collect_git_pairs(config, git),
        None => {
            let extensions = config
                .format
                .map(|format| format.extensions())
                .unwrap_or(HEADER_EXTENSIONS);
            discover_pairs(&config.old, &config.new, extensions)
        }
    }
}

fn collect_git_pairs(config: &Config, git: &GitOptions) -> Result<Vec<HeaderPair>> {
    let reader = GitSnapshotReader::new(git.repo.clone())?;
    if config.old == config.new {
        return git_pairs(&reader, &git.old_rev, &git.new_rev, &config.old);
    }

    // 新旧路径不同：只支持单个文件（例如头文件被改名）
    if config.format.is_none() && !api_compat_core::git::is_header(&config.new) {
        return Err(ApiCompatError::ConfigError(format!(
            "Different --old and --new paths must both name header files: {}",
            config.new.display()
        )));
    }
    let old = reader.read_source(&git.old_rev, &config.old)?;
    let new = reader.read_source(&git.new_rev, &config.new)?;
    Ok(vec![HeaderPair::new(new.label.clone(), Some(old), Some(new))])
}
