// ==========================================
// 商品目录导入 - 导入报告
// ==========================================
// 职责: 运行终态的聚合结果 + 面向调用方的展示辅助
// 说明: 引擎始终返回完整的校验错误清单，截断展示由调用方决定
// ==========================================

use crate::domain::product::{ImportFailure, ImportStats, ValidationError};
use crate::i18n::t_with_args;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// 展示时默认保留的校验错误条数
pub const DEFAULT_ERROR_PREVIEW: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub run_id: String,
    pub stats: ImportStats,
    pub validation_errors: Vec<ValidationError>,
    pub failures: Vec<ImportFailure>,
    pub cancelled: bool,
    pub elapsed_ms: u64,
}

impl ImportReport {
    /// 一行汇总: "Successfully imported X of Y products; Z failed"
    pub fn summary_line(&self) -> String {
        t_with_args(
            "import.summary",
            &[
                ("success", &self.stats.success.to_string()),
                ("total", &self.stats.total.to_string()),
                ("failed", &self.stats.failed.to_string()),
            ],
        )
    }

    /// 全部校验错误，格式 "Row {n}: {message}"
    pub fn validation_messages(&self) -> Vec<String> {
        self.validation_errors.iter().map(|e| e.to_string()).collect()
    }

    /// 前 limit 条校验错误，超出部分追加一行 "+N more"
    pub fn preview_validation_messages(&self, limit: usize) -> Vec<String> {
        let mut lines: Vec<String> = self
            .validation_errors
            .iter()
            .take(limit)
            .map(|e| e.to_string())
            .collect();
        let hidden = self.validation_errors.len().saturating_sub(limit);
        if hidden > 0 {
            lines.push(t_with_args("import.more_errors", &[("count", &hidden.to_string())]));
        }
        lines
    }

    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }

    /// 未被处理的记录数（取消时非零）
    pub fn skipped(&self) -> usize {
        self.stats.total.saturating_sub(self.stats.processed())
    }

    /// 导出失败清单（name,error）
    pub fn write_failures_csv<W: Write>(&self, writer: W) -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_writer(writer);
        wtr.write_record(["name", "error"])?;
        for failure in &self.failures {
            wtr.write_record([failure.name.as_str(), failure.error.as_str()])?;
        }
        wtr.flush()?;
        Ok(())
    }
}
