//! 输出格式化模块
//!
//! 将聚合后的报告记录渲染为 HTML、JSON 或纯文本

use crate::classifier::Compatibility;
use crate::diff::DiffEntry;
use crate::error::Result;
use crate::report::ReportRecord;
use serde::{Deserialize, Serialize};

/// 输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutputFormat {
    PlainText,
    Json,
    Html,
}

/// 输出格式化器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// 输出格式
    pub output_format: OutputFormat,
    /// 报告标题
    pub title: String,
    /// 是否写入生成时间
    pub include_timestamp: bool,
    /// 自定义CSS样式（仅对HTML输出有效）
    pub custom_css: Option<String>,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            output_format: OutputFormat::PlainText,
            title: "API Compatibility Report".to_string(),
            include_timestamp: true,
            custom_css: None,
        }
    }
}

impl FormatterConfig {
    /// 以默认配置为基础指定输出格式
    pub fn for_format(output_format: OutputFormat) -> Self {
        Self {
            output_format,
            ..Self::default()
        }
    }
}

/// 输出渲染器
pub struct OutputRenderer {
    config: FormatterConfig,
}

/// 格式化结果
#[derive(Debug, Clone)]
pub struct FormattedOutput {
    /// 格式化后的内容
    pub content: String,
    /// 输出格式
    pub format: OutputFormat,
    /// 元数据
    pub metadata: OutputMetadata,
}

/// 输出元数据
#[derive(Debug, Clone)]
pub struct OutputMetadata {
    /// 记录数
    pub record_count: usize,
    /// 破坏兼容的记录数
    pub incompatible_count: usize,
    /// 生成时间戳
    pub generated_at: String,
    /// 内容大小（字节）
    pub content_size: usize,
}

/// 空报告的占位说明
const EMPTY_REPORT_MESSAGE: &str =
    "No API changes were detected between the compared header snapshots.";

const INCOMPATIBLE_COLOR: &str = "#d32f2f";
const COMPATIBLE_COLOR: &str = "#2e7d32";

impl OutputRenderer {
    /// 创建新的输出渲染器
    pub fn new(config: FormatterConfig) -> Self {
        Self { config }
    }

    /// 使用默认配置创建渲染器
    pub fn with_default_config() -> Self {
        Self::new(FormatterConfig::default())
    }

    /// 渲染报告记录
    pub fn render(&self, records: &[ReportRecord]) -> Result<FormattedOutput> {
        let generated_at = chrono::Utc::now().to_rfc3339();
        let content = match self.config.output_format {
            OutputFormat::PlainText => self.render_plain_text(records, &generated_at),
            OutputFormat::Json => render_json(records)?,
            OutputFormat::Html => self.render_html(records, &generated_at),
        };

        let metadata = OutputMetadata {
            record_count: records.len(),
            incompatible_count: records.iter().filter(|r| r.is_incompatible()).count(),
            generated_at,
            content_size: content.len(),
        };

        Ok(FormattedOutput {
            content,
            format: self.config.output_format,
            metadata,
        })
    }

    /// 渲染为纯文本格式
    fn render_plain_text(&self, records: &[ReportRecord], generated_at: &str) -> String {
        let mut output = String::new();

        output.push_str(&self.config.title);
        output.push('\n');
        output.push_str(&"=".repeat(self.config.title.chars().count()));
        output.push('\n');
        if self.config.include_timestamp {
            output.push_str(&format!("Generated at: {generated_at}\n"));
        }

        if records.is_empty() {
            output.push('\n');
            output.push_str(EMPTY_REPORT_MESSAGE);
            output.push('\n');
            return output;
        }

        let incompatible = records.iter().filter(|r| r.is_incompatible()).count();
        output.push_str(&format!(
            "APIs changed: {} ({incompatible} backward incompatible)\n",
            records.len()
        ));

        for record in records {
            output.push('\n');
            output.push_str(&format!(
                "[{}] {} :: {} ({})\n",
                record.compatibility.as_str(),
                record.headerfile,
                record.name,
                record.changetype.as_str()
            ));
            for line in record.description.lines() {
                output.push_str(&format!("    {line}\n"));
            }
        }

        output
    }

    /// 渲染为HTML格式
    fn render_html(&self, records: &[ReportRecord], generated_at: &str) -> String {
        let title = html_escape(&self.config.title);
        let mut output = String::new();

        // HTML文档头部
        output.push_str("<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n");
        output.push_str("    <meta charset=\"UTF-8\">\n");
        output.push_str(&format!("    <title>{title}</title>\n"));
        output.push_str("    <style>\n");
        output.push_str(DEFAULT_CSS);
        if let Some(custom_css) = &self.config.custom_css {
            output.push_str(custom_css);
        }
        output.push_str("    </style>\n");
        output.push_str("</head>\n<body>\n");

        output.push_str(&format!("    <h2>{title}</h2>\n"));
        if self.config.include_timestamp {
            output.push_str(&format!(
                "    <p class=\"generated\">Generated at {}</p>\n",
                html_escape(generated_at)
            ));
        }

        output.push_str("    <table>\n");
        if records.is_empty() {
            output.push_str("        <tr>\n");
            output.push_str(&format!(
                "            <td class=\"placeholder\">{}</td>\n",
                html_escape(EMPTY_REPORT_MESSAGE)
            ));
            output.push_str("        </tr>\n");
        } else {
            output.push_str("        <tr>\n");
            for heading in ["Header File", "API Name", "Description", "Change Type", "Compatibility"] {
                output.push_str(&format!("            <th>{heading}</th>\n"));
            }
            output.push_str("        </tr>\n");

            for record in records {
                output.push_str("        <tr>\n");
                for cell in [
                    record.headerfile.as_str(),
                    record.name.as_str(),
                    record.description.as_str(),
                    record.changetype.as_str(),
                ] {
                    output.push_str(&format!("            <td>{}</td>\n", escape_nl2br(cell)));
                }
                output.push_str(&format!(
                    "            <td>{}</td>\n",
                    colored_compatibility(record.compatibility)
                ));
                output.push_str("        </tr>\n");
            }
        }
        output.push_str("    </table>\n");

        // HTML文档尾部
        output.push_str("</body>\n</html>\n");
        output
    }
}

/// JSON 报告：4 空格缩进的记录数组
fn render_json(records: &[ReportRecord]) -> Result<String> {
    let mut buffer = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    records.serialize(&mut serializer)?;
    Ok(String::from_utf8_lossy(&buffer).into_owned())
}

/// 将原始差异树渲染为 JSON
pub fn render_diff_tree(tree: &[DiffEntry]) -> Result<String> {
    crate::diff::to_json(tree)
}

impl FormattedOutput {
    /// 保存到文件
    pub fn save_to_file(&self, path: &std::path::Path) -> Result<()> {
        std::fs::write(path, &self.content)?;
        Ok(())
    }

    /// 获取内容大小（字节）
    pub fn size(&self) -> usize {
        self.content.len()
    }

    /// 检查是否为空
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }
}

/// HTML转义函数
fn html_escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

/// 转义后把换行替换为 `<br/>`
fn escape_nl2br(text: &str) -> String {
    html_escape(text).replace('\n', "<br/>")
}

fn colored_compatibility(compatibility: Compatibility) -> String {
    let color = match compatibility {
        Compatibility::BackwardIncompatible => INCOMPATIBLE_COLOR,
        Compatibility::BackwardCompatible => COMPATIBLE_COLOR,
    };
    format!(
        "<span style=\"color:{color};font-weight:600\">{}</span>",
        escape_nl2br(compatibility.as_str())
    )
}

const DEFAULT_CSS: &str = r#"
        body {
            font-family: 'Segoe UI', Arial, sans-serif;
            margin: 0;
            padding: 20px;
            background-color: #f8f9fa;
        }
        h2 {
            color: #333;
            margin-bottom: 10px;
        }
        .generated {
            color: #6c757d;
            font-size: 0.9em;
        }
        table {
            border-collapse: collapse;
            width: 100%;
            background-color: white;
        }
        th, td {
            border: 1px solid #dee2e6;
            padding: 8px 12px;
            text-align: left;
            vertical-align: top;
        }
        th {
            background-color: #f2f2f2;
        }
        td.placeholder {
            text-align: center;
            padding: 10px;
            background-color: #f2f2f2;
        }
"#;
