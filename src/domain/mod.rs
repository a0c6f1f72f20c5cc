// ==========================================
// 商品目录导入 - 领域模型层
// ==========================================
// 职责: 定义导入流水线中流转的实体与类型
// 红线: 不含解析/校验/提交逻辑
// ==========================================

pub mod product;
pub mod types;

// 重导出核心类型
pub use product::{
    CandidateRecord, HeaderMap, ImportFailure, ImportOutcome, ImportStats, NewProduct, RawRow,
    ResolvedProduct, ValidationError,
};
pub use types::{CanonicalField, ImportPhase};
