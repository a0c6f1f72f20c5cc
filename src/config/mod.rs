// ==========================================
// 商品目录导入 - 配置层
// ==========================================
// 职责: 导入参数（批量/间隔/超时/单位规则/列别名）
// ==========================================

pub mod import_config;

// 重导出
pub use import_config::{config_keys, ImportConfig};
