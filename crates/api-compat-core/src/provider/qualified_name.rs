//! 限定名构建

use crate::node::SCOPE_SEPARATOR;

/// 维护当前作用域栈并生成 `::` 分隔的限定名
#[derive(Debug, Clone, Default)]
pub struct QualifiedNameBuilder {
    segments: Vec<String>,
}

impl QualifiedNameBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 进入作用域；名称本身含 `::` 时按段拆开
    pub fn push(&mut self, name: &str) {
        self.segments.extend(
            name.split(SCOPE_SEPARATOR)
                .filter(|segment| !segment.is_empty())
                .map(str::to_string),
        );
    }

    /// 退出最内层作用域
    pub fn pop(&mut self) -> Option<String> {
        self.segments.pop()
    }

    /// 当前作用域的限定名
    pub fn get(&self) -> String {
        self.segments.join(SCOPE_SEPARATOR)
    }

    /// 当前作用域的深度
    pub fn depth(&self) -> usize {
        self.segments.len()
    }

    /// 截断到指定深度，用于退出一次压入的多段名称
    pub fn truncate(&mut self, depth: usize) {
        self.segments.truncate(depth);
    }

    /// 在当前作用域下限定 `name`
    pub fn qualify(&self, name: &str) -> String {
        if self.segments.is_empty() {
            name.to_string()
        } else if name.is_empty() {
            self.get()
        } else {
            format!("{}{SCOPE_SEPARATOR}{name}", self.get())
        }
    }
}
