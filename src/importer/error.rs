// ==========================================
// 商品目录导入 - 导入模块错误类型
// ==========================================
// 工具: thiserror 派生宏
// 说明: 只有致命错误走 Err；行级校验错误与记录级提交失败
//       作为值累积在 ImportReport 中
// ==========================================

use crate::domain::types::CanonicalField;
use thiserror::Error;

/// 导入模块错误类型
#[derive(Error, Debug)]
pub enum ImportError {
    // ===== 配置错误（致命，解析前终止）=====
    #[error("必填列缺失: {}（无法匹配任何列名别名）", format_fields(.missing))]
    MissingRequiredColumns { missing: Vec<CanonicalField> },

    #[error("导入配置无效: {0}")]
    InvalidConfig(String),

    #[error("单位规则表加载失败: {0}")]
    UnitRulesError(String),

    // ===== 并发控制 =====
    #[error("已有导入任务正在运行")]
    AlreadyRunning,
}

impl ImportError {
    /// 是否为配置错误（调用方据此区分退出码等）
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            ImportError::MissingRequiredColumns { .. }
                | ImportError::InvalidConfig(_)
                | ImportError::UnitRulesError(_)
        )
    }
}

fn format_fields(fields: &[CanonicalField]) -> String {
    fields
        .iter()
        .map(|f| f.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl From<serde_json::Error> for ImportError {
    fn from(err: serde_json::Error) -> Self {
        ImportError::UnitRulesError(err.to_string())
    }
}

/// Result 类型别名
pub type ImportResult<T> = Result<T, ImportError>;
