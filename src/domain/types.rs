// ==========================================
// 商品目录导入 - 领域类型定义
// ==========================================
// 导入阶段 / 标准字段
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 导入阶段 (Import Phase)
// ==========================================
// 状态机: Idle → Parsing → Validated → Importing → Completed
//         Idle → Failed（列解析失败，解析前终止）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ImportPhase {
    Idle,      // 未开始
    Parsing,   // 解析/校验中
    Validated, // 校验完成，待提交
    Importing, // 分批提交中
    Completed, // 已完成（可能含部分失败/已取消）
    Failed,    // 配置错误，未进入解析
}

impl ImportPhase {
    /// 是否为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, ImportPhase::Completed | ImportPhase::Failed)
    }
}

impl fmt::Display for ImportPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportPhase::Idle => write!(f, "IDLE"),
            ImportPhase::Parsing => write!(f, "PARSING"),
            ImportPhase::Validated => write!(f, "VALIDATED"),
            ImportPhase::Importing => write!(f, "IMPORTING"),
            ImportPhase::Completed => write!(f, "COMPLETED"),
            ImportPhase::Failed => write!(f, "FAILED"),
        }
    }
}

impl Default for ImportPhase {
    fn default() -> Self {
        ImportPhase::Idle
    }
}

// ==========================================
// 标准字段 (Canonical Field)
// ==========================================
// name / category 必填，其余可选
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CanonicalField {
    Id,
    Name,
    Category,
    Unit,
    Description,
}

impl CanonicalField {
    pub const ALL: [CanonicalField; 5] = [
        CanonicalField::Id,
        CanonicalField::Name,
        CanonicalField::Category,
        CanonicalField::Unit,
        CanonicalField::Description,
    ];

    pub fn is_required(&self) -> bool {
        matches!(self, CanonicalField::Name | CanonicalField::Category)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Id => "id",
            CanonicalField::Name => "name",
            CanonicalField::Category => "category",
            CanonicalField::Unit => "unit",
            CanonicalField::Description => "description",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
