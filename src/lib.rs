// ==========================================
// 商品目录导入 - 核心库
// ==========================================
// 技术栈: Rust + Tokio + SQLite
// 系统定位: 批量商品 CSV 导入管道（外部 create 能力可替换）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "en");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - CSV 导入管道
pub mod importer;

// 配置层 - 导入配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 文件入口
pub mod api;

// 应用层 - 组件装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{CanonicalField, ImportPhase};

// 领域实体
pub use domain::{
    CandidateRecord, HeaderMap, ImportFailure, ImportOutcome, ImportStats, NewProduct,
    ResolvedProduct, ValidationError,
};

// 导入管道
pub use importer::{
    ImportError, ImportReport, ImportResult, ImportSession, ProductCreator, ProductImportPipeline,
    UnitInferencer,
};

// 配置
pub use config::ImportConfig;

// API
pub use api::{ApiError, FileEncoding, ImportApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "catalog-import";
