//! C/C++ 头文件解析
//!
//! 基于 Tree-sitter 的头文件声明提供者。预处理条件按配置中的预定义宏
//! 求值，只抽取生效分支中的声明；条件块本身以内容哈希的形式保留。

mod declarator;
mod extractor;
mod preprocessor;


use super::{DeclarationProvider, HeaderSource};
use crate::error::{ApiCompatError, Result};
use crate::node::Node;
use crate::store::DeclarationStore;
use extractor::Extractor;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, warn};
use tree_sitter::Parser;

/// 头文件解析配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderProviderConfig {
    /// 预定义宏（名称 -> 替换文本），等价于命令行 `-D`
    pub predefined_macros: BTreeMap<String, String>,
}

impl HeaderProviderConfig {
    pub fn with_macro(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.predefined_macros.insert(name.into(), value.into());
        self
    }
}

/// 头文件声明提供者
#[derive(Debug, Clone, Default)]
pub struct HeaderProvider {
    config: HeaderProviderConfig,
}

impl HeaderProvider {
    pub fn new(config: HeaderProviderConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HeaderProviderConfig {
        &self.config
    }

    /// 解析头文件内容，返回按出现顺序排列的根声明
    pub fn extract(&self, label: &str, contents: &str) -> Result<Vec<Node>> {
        let language: tree_sitter::Language = tree_sitter_cpp::LANGUAGE.into();
        let mut parser = Parser::new();
        parser.set_language(&language).map_err(|e| {
            ApiCompatError::TreeSitterError(format!("Failed to set C++ language: {e}"))
        })?;

        let tree = parser
            .parse(contents, None)
            .ok_or_else(|| ApiCompatError::ParseError(format!("Failed to parse {label}")))?;
        let root = tree.root_node();
        if root.has_error() {
            warn!("Syntax errors in {label}; declarations around them may be incomplete");
        }

        let roots = Extractor::new(contents, &self.config).extract(root);
        debug!("Extracted {} root declarations from {label}", roots.len());
        Ok(roots)
    }
}

impl DeclarationProvider for HeaderProvider {
    fn name(&self) -> &'static str {
        "header"
    }

    fn populate(&self, source: &HeaderSource, store: &mut DeclarationStore) -> Result<()> {
        for root in self.extract(&source.label, &source.contents)? {
            let qualified_name = root.qualified_name().to_string();
            if !store.register_root(root) {
                debug!(
                    "Duplicate declaration '{qualified_name}' skipped in {}",
                    source.label
                );
            }
        }
        Ok(())
    }
}
