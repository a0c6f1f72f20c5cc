// ==========================================
// 商品目录导入 - 导入层
// ==========================================
// 职责: CSV 文本 → 已校验、已确定单位的商品 → 分批提交
// ==========================================

// 模块声明
pub mod batch_importer;
pub mod error;
pub mod field_mapper;
pub mod product_importer_impl;
pub mod product_importer_trait;
pub mod progress;
pub mod report;
pub mod row_validator;
pub mod tokenizer;
pub mod unit_inference;

// 重导出核心类型
pub use batch_importer::{BatchImportSummary, BatchImporter, BatchImporterOptions};
pub use error::{ImportError, ImportResult};
pub use field_mapper::{find_column_index, ColumnAliases, FieldMapper};
pub use product_importer_impl::ProductImportPipeline;
pub use progress::{ImportSession, SessionReporter};
pub use report::{ImportReport, DEFAULT_ERROR_PREVIEW};
pub use row_validator::RowValidator;
pub use tokenizer::{parse_row, split_document, TokenizedDocument};
pub use unit_inference::{normalize_unit_token, RuleTableUnitInferencer, UnitRuleSet};

// 重导出 Trait 接口
pub use product_importer_trait::{ProductCreator, UnitInferencer};
