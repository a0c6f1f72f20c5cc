// ==========================================
// 商品目录导入 - 商品领域模型
// ==========================================
// 数据流: RawRow → CandidateRecord → ResolvedProduct → NewProduct
// 生命周期: CandidateRecord 由行校验器生成，单位推断器补全一次，
//           分批导入器消费一次，不跨运行复用
// ==========================================

use crate::domain::types::CanonicalField;
use serde::{Deserialize, Serialize};
use std::fmt;

/// 单个物理行切分出的字段序列（已 trim）
pub type RawRow = Vec<String>;

// ==========================================
// HeaderMap - 标准字段 → 列位置
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMap {
    pub id: Option<usize>,
    pub name: Option<usize>,
    pub category: Option<usize>,
    pub unit: Option<usize>,
    pub description: Option<usize>,
}

impl HeaderMap {
    pub fn index_of(&self, field: CanonicalField) -> Option<usize> {
        match field {
            CanonicalField::Id => self.id,
            CanonicalField::Name => self.name,
            CanonicalField::Category => self.category,
            CanonicalField::Unit => self.unit,
            CanonicalField::Description => self.description,
        }
    }

    pub(crate) fn set(&mut self, field: CanonicalField, index: Option<usize>) {
        match field {
            CanonicalField::Id => self.id = index,
            CanonicalField::Name => self.name = index,
            CanonicalField::Category => self.category = index,
            CanonicalField::Unit => self.unit = index,
            CanonicalField::Description => self.description = index,
        }
    }

    /// 未解析的必填字段（按 name, category 顺序）
    pub fn missing_required(&self) -> Vec<CanonicalField> {
        CanonicalField::ALL
            .iter()
            .copied()
            .filter(|f| f.is_required() && self.index_of(*f).is_none())
            .collect()
    }
}

// ==========================================
// CandidateRecord - 通过校验、尚未提交的商品行
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub id: Option<String>, // 保留字段：解析但不下发
    pub name: String,
    pub category: String,
    pub unit: Option<String>,
    pub description: Option<String>,
    pub row_number: usize, // 数据区行号（1 起，不含表头）
}

impl CandidateRecord {
    /// 单位推断后固化为 ResolvedProduct（unit 必定非空）
    pub fn resolve(self, unit: String) -> ResolvedProduct {
        ResolvedProduct {
            id: self.id,
            name: self.name,
            category: self.category,
            unit,
            description: self.description,
            row_number: self.row_number,
        }
    }
}

// ==========================================
// ResolvedProduct - 单位已确定，可进入分批导入
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedProduct {
    pub id: Option<String>,
    pub name: String,
    pub category: String,
    pub unit: String,
    pub description: Option<String>,
    pub row_number: usize,
}

impl ResolvedProduct {
    /// 生成下游 create 调用参数
    ///
    /// description 缺省为 "{category} - {name}"
    pub fn to_new_product(&self) -> NewProduct {
        NewProduct {
            name: self.name.clone(),
            category: self.category.clone(),
            unit: self.unit.clone(),
            description: self
                .description
                .clone()
                .unwrap_or_else(|| format!("{} - {}", self.category, self.name)),
        }
    }
}

// ==========================================
// NewProduct - 下游 createRecord 调用形态
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub unit: String,
    pub description: String,
}

// ==========================================
// ValidationError - 行级校验错误（非致命）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationError {
    pub row_number: usize,
    pub message: String,
}

impl ValidationError {
    pub fn new(row_number: usize, message: impl Into<String>) -> Self {
        Self {
            row_number,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Row {}: {}", self.row_number, self.message)
    }
}

// ==========================================
// ImportOutcome - 单条记录提交结果
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportOutcome {
    pub record: ResolvedProduct,
    pub success: bool,
    pub error: Option<String>,
}

impl ImportOutcome {
    pub fn succeeded(record: ResolvedProduct) -> Self {
        Self {
            record,
            success: true,
            error: None,
        }
    }

    pub fn failed(record: ResolvedProduct, error: impl Into<String>) -> Self {
        Self {
            record,
            success: false,
            error: Some(error.into()),
        }
    }

    /// 失败结果转为 {name, error}；成功返回 None
    pub fn to_failure(&self) -> Option<ImportFailure> {
        if self.success {
            return None;
        }
        Some(ImportFailure {
            name: self.record.name.clone(),
            error: self.error.clone().unwrap_or_default(),
        })
    }
}

/// 导入失败项 {name, error}
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportFailure {
    pub name: String,
    pub error: String,
}

// ==========================================
// ImportStats - 运行统计
// ==========================================
// 不变量: success + failed <= total；success/failed 只增不减；
//         total 在校验完成后固定
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportStats {
    pub total: usize,
    pub success: usize,
    pub failed: usize,
}

impl ImportStats {
    pub fn with_total(total: usize) -> Self {
        Self {
            total,
            success: 0,
            failed: 0,
        }
    }

    pub fn processed(&self) -> usize {
        self.success + self.failed
    }

    /// 累加一个批次的结算结果
    pub fn record_batch(&mut self, successes: usize, failures: usize) {
        self.success += successes;
        self.failed += failures;
        debug_assert!(self.processed() <= self.total);
    }
}
